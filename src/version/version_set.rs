//! Ordered candidate version sets.
//!
//! A [`ConcreteVersionSet`] holds the candidate versions the resolver still
//! considers for one package, split into three sorted buckets: semantic
//! releases, semantic pre-releases, and opaque pins. Iteration yields
//! releases in descending precedence, then pre-releases in descending
//! precedence, then opaque pins in ascending order - so the first element is
//! always the candidate the resolver prefers.
//!
//! Narrowing a set by a specifier ([`retain_versions_compatible_with`]) is a
//! contiguous range retention: the specifier's numeric bounds are located in
//! each bucket with binary search and everything outside the range is
//! dropped. Pre-releases are retained only when the range targets a
//! pre-release, bounded above by the next patch release of the target's
//! numeric triple.
//!
//! The set also remembers every requirement that was ever imposed on the
//! package as a [`SpecifierDefinition`], so a later conflict can name the
//! other party.
//!
//! [`retain_versions_compatible_with`]: ConcreteVersionSet::retain_versions_compatible_with

use semver::Version;
use std::cmp::Ordering;
use std::fmt;

use crate::core::Dependency;
use crate::version::concrete::{ConcreteVersion, PinnedVersion};
use crate::version::specifier::{VersionSpecifier, compatibility_upper_bound, intersection};
use crate::version::{is_pre_release, next_patch};

/// Records which parent package imposed which specifier on a package.
///
/// `defining_dependency` of `None` means the requirement came from the root
/// dependency list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecifierDefinition {
    /// The package that imposed the requirement; `None` for the root.
    pub defining_dependency: Option<Dependency>,
    /// The imposed requirement.
    pub specifier: VersionSpecifier,
}

impl SpecifierDefinition {
    /// A requirement imposed by the root dependency list.
    pub fn root(specifier: VersionSpecifier) -> Self {
        Self {
            defining_dependency: None,
            specifier,
        }
    }

    /// A requirement imposed by a parent package.
    pub fn imposed_by(dependency: Dependency, specifier: VersionSpecifier) -> Self {
        Self {
            defining_dependency: Some(dependency),
            specifier,
        }
    }
}

impl fmt::Display for SpecifierDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.defining_dependency {
            Some(dependency) => write!(f, "{} (required by {dependency})", self.specifier),
            None => write!(f, "{} (root requirement)", self.specifier),
        }
    }
}

/// The candidate versions still in play for one package.
#[derive(Debug, Clone, Default)]
pub struct ConcreteVersionSet {
    /// Semantic releases, descending precedence.
    releases: Vec<ConcreteVersion>,
    /// Semantic pre-releases, descending precedence.
    pre_releases: Vec<ConcreteVersion>,
    /// Opaque pins, ascending commit-ish.
    non_semantic: Vec<ConcreteVersion>,
    /// Every requirement ever imposed on the package, append-only.
    definitions: Vec<SpecifierDefinition>,
    /// Set when the candidates were seeded from a previously locked pin;
    /// records the specifier in effect at seeding time.
    pinned_version_specifier: Option<VersionSpecifier>,
}

impl ConcreteVersionSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of candidate versions across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.releases.len() + self.pre_releases.len() + self.non_semantic.len()
    }

    /// Whether no candidate versions remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The preferred candidate: the first in iteration order.
    #[must_use]
    pub fn first(&self) -> Option<&ConcreteVersion> {
        self.releases
            .first()
            .or_else(|| self.pre_releases.first())
            .or_else(|| self.non_semantic.first())
    }

    /// All candidates in preference order.
    pub fn iter(&self) -> impl Iterator<Item = &ConcreteVersion> {
        self.releases.iter().chain(&self.pre_releases).chain(&self.non_semantic)
    }

    /// Insert a candidate into its bucket. Returns `false` when an equal
    /// candidate (same precedence reading) was already present.
    pub fn insert(&mut self, version: ConcreteVersion) -> bool {
        let bucket = self.bucket_mut(&version);
        match bucket.binary_search(&version) {
            Ok(_) => false,
            Err(position) => {
                bucket.insert(position, version);
                true
            }
        }
    }

    /// Remove the candidate carrying this exact pin. Returns whether it was
    /// present.
    pub fn remove(&mut self, pinned: &PinnedVersion) -> bool {
        for bucket in [&mut self.releases, &mut self.pre_releases, &mut self.non_semantic] {
            if let Some(position) = bucket.iter().position(|v| v.pinned() == pinned) {
                bucket.remove(position);
                return true;
            }
        }
        false
    }

    /// Collapse the set to the single given candidate, keeping definitions
    /// and the pin flag intact.
    pub fn remove_all_except(&mut self, version: &ConcreteVersion) {
        self.releases.clear();
        self.pre_releases.clear();
        self.non_semantic.clear();
        self.insert(version.clone());
    }

    /// Drop every candidate the specifier does not admit. Returns whether
    /// any candidate survived.
    ///
    /// Opaque pins survive every version requirement; a git reference leaves
    /// the set untouched entirely (its candidates were produced by resolving
    /// the reference in the first place).
    pub fn retain_versions_compatible_with(&mut self, specifier: &VersionSpecifier) -> bool {
        match specifier {
            VersionSpecifier::GitReference(_) => {}
            VersionSpecifier::Any => {
                self.pre_releases.clear();
            }
            VersionSpecifier::Exactly(version) => {
                if is_pre_release(version) {
                    self.releases.clear();
                    retain_equal(&mut self.pre_releases, version);
                } else {
                    retain_equal(&mut self.releases, version);
                    self.pre_releases.clear();
                }
            }
            VersionSpecifier::AtLeast(version) => {
                retain_range(&mut self.releases, version, None);
                self.retain_pre_releases_for(version);
            }
            VersionSpecifier::CompatibleWith(version) => {
                let upper = compatibility_upper_bound(version);
                retain_range(&mut self.releases, version, Some(&upper));
                self.retain_pre_releases_for(version);
            }
        }
        !self.is_empty()
    }

    // Pre-releases qualify only when the range target is itself a
    // pre-release; the admitted window is [target, next patch release).
    fn retain_pre_releases_for(&mut self, lower: &Version) {
        if is_pre_release(lower) {
            let upper = next_patch(lower);
            retain_range(&mut self.pre_releases, lower, Some(&upper));
        } else {
            self.pre_releases.clear();
        }
    }

    /// Record a requirement imposed on this package.
    pub fn add_definition(&mut self, definition: SpecifierDefinition) {
        self.definitions.push(definition);
    }

    /// The requirements imposed so far, in arrival order.
    #[must_use]
    pub fn definitions(&self) -> &[SpecifierDefinition] {
        &self.definitions
    }

    /// The first recorded requirement that is disjoint with `specifier`,
    /// which is the other party of a two-sided conflict.
    #[must_use]
    pub fn conflicting_definition(
        &self,
        specifier: &VersionSpecifier,
    ) -> Option<&SpecifierDefinition> {
        self.definitions.iter().find(|d| intersection(&d.specifier, specifier).is_none())
    }

    /// The specifier under which this set was seeded from a locked pin, if
    /// it was.
    #[must_use]
    pub fn pinned_version_specifier(&self) -> Option<&VersionSpecifier> {
        self.pinned_version_specifier.as_ref()
    }

    /// Mark this set as seeded from a locked pin under `specifier`.
    pub fn set_pinned_version_specifier(&mut self, specifier: VersionSpecifier) {
        self.pinned_version_specifier = Some(specifier);
    }

    fn bucket_mut(&mut self, version: &ConcreteVersion) -> &mut Vec<ConcreteVersion> {
        match version.semantic() {
            Some(semantic) if !is_pre_release(semantic) => &mut self.releases,
            Some(_) => &mut self.pre_releases,
            None => &mut self.non_semantic,
        }
    }
}

// Keep the contiguous run of semantic versions in [lower, upper). The bucket
// is sorted by descending precedence, so candidates at or above the upper
// bound form a prefix and candidates below the lower bound form a suffix.
fn retain_range(bucket: &mut Vec<ConcreteVersion>, lower: &Version, upper: Option<&Version>) {
    let start = match upper {
        Some(upper) => bucket.partition_point(|candidate| {
            candidate
                .semantic()
                .is_some_and(|v| v.cmp_precedence(upper) != Ordering::Less)
        }),
        None => 0,
    };
    let end = bucket.partition_point(|candidate| {
        candidate.semantic().is_some_and(|v| v.cmp_precedence(lower) != Ordering::Less)
    });
    bucket.truncate(end);
    bucket.drain(..start.min(end));
}

// Keep only candidates precedence-equal to `version`.
fn retain_equal(bucket: &mut Vec<ConcreteVersion>, version: &Version) {
    let start = bucket.partition_point(|candidate| {
        candidate.semantic().is_some_and(|v| v.cmp_precedence(version) == Ordering::Greater)
    });
    let end = bucket.partition_point(|candidate| {
        candidate.semantic().is_some_and(|v| v.cmp_precedence(version) != Ordering::Less)
    });
    bucket.truncate(end);
    bucket.drain(..start.min(end));
}
