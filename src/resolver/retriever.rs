//! Caching facade between the search and the provider.
//!
//! One [`DependencyRetriever`] lives for the duration of one resolve call and
//! is shared by reference across every fork of the search. Its caches are the
//! only state that survives backtracking, and every mutation is a monotonic
//! addition, so memoized answers stay valid as the search unwinds:
//!
//! - **version sets** keyed by `(package, specifier, updatable)`
//! - **transitive requirement lists** keyed by `(package, pin)`
//! - **conflict cache**: rejections memoized per `(package, pin)`, acting as
//!   no-goods that later branches skip without re-exploring
//! - **problematic scoreboard**: how often each package has been party to a
//!   conflict, used to steer the search toward likely failures first

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::core::{Dependency, ResolverError};
use crate::resolver::provider::Provider;
use crate::version::concrete::{ConcreteVersion, PinnedVersion};
use crate::version::specifier::VersionSpecifier;
use crate::version::version_set::ConcreteVersionSet;

/// A package pinned at one specific version; the key unit of the conflict
/// cache and the parent handle passed through expansion.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConcreteVersionedDependency {
    dependency: Dependency,
    pinned: PinnedVersion,
}

impl ConcreteVersionedDependency {
    /// Pair a package with a pin.
    pub fn new(dependency: Dependency, pinned: PinnedVersion) -> Self {
        Self {
            dependency,
            pinned,
        }
    }

    /// The package.
    #[must_use]
    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    /// The pin.
    #[must_use]
    pub fn pinned(&self) -> &PinnedVersion {
        &self.pinned
    }
}

impl std::fmt::Display for ConcreteVersionedDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {}", self.dependency, self.pinned)
    }
}

/// A memoized rejection for one `(package, pin)` candidate.
#[derive(Debug, Clone)]
pub struct CachedConflict {
    /// The error originally recorded for the conflict.
    pub error: ResolverError,
    /// The other parties of the conflict. `None` means the candidate
    /// conflicts with the root requirements themselves and can never be part
    /// of a solution.
    pub conflicting: Option<BTreeSet<ConcreteVersionedDependency>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct VersionSetKey {
    dependency: Dependency,
    specifier: VersionSpecifier,
    updatable: bool,
}

/// Caching provider facade; see the module docs.
pub struct DependencyRetriever<'a, P> {
    provider: &'a P,
    last_resolved: BTreeMap<Dependency, PinnedVersion>,
    version_sets: DashMap<VersionSetKey, ConcreteVersionSet>,
    transitive: DashMap<ConcreteVersionedDependency, Vec<(Dependency, VersionSpecifier)>>,
    conflicts: DashMap<ConcreteVersionedDependency, CachedConflict>,
    problematic: DashMap<Dependency, usize>,
}

impl<'a, P: Provider> DependencyRetriever<'a, P> {
    /// Create a retriever for one resolve call, seeded with the pins of the
    /// previous resolution (empty when resolving from scratch).
    pub fn new(provider: &'a P, last_resolved: BTreeMap<Dependency, PinnedVersion>) -> Self {
        Self {
            provider,
            last_resolved,
            version_sets: DashMap::new(),
            transitive: DashMap::new(),
            conflicts: DashMap::new(),
            problematic: DashMap::new(),
        }
    }

    /// The candidate versions of `dependency` admitted by `specifier`.
    ///
    /// A non-updatable package that was pinned by the previous resolution
    /// keeps that pin: the result is a singleton carrying the pin, flagged
    /// with the specifier it was seeded under. Otherwise candidates come from
    /// the provider - the resolved reference when the specifier is a git
    /// reference, the version list otherwise - narrowed to the specifier.
    ///
    /// # Errors
    ///
    /// [`ResolverError::RequiredVersionNotFound`] when an updatable package
    /// ends up with no admitted candidate; [`ResolverError::Provider`] when
    /// the callback fails.
    pub async fn find_all_versions(
        &self,
        dependency: &Dependency,
        specifier: &VersionSpecifier,
        updatable: bool,
    ) -> Result<ConcreteVersionSet, ResolverError> {
        let key = VersionSetKey {
            dependency: dependency.clone(),
            specifier: specifier.clone(),
            updatable,
        };
        if let Some(cached) = self.version_sets.get(&key) {
            tracing::trace!(dependency = %dependency, %specifier, "version set cache hit");
            return Ok(cached.value().clone());
        }

        let set = if !updatable && self.last_resolved.contains_key(dependency) {
            let pin = &self.last_resolved[dependency];
            tracing::debug!(dependency = %dependency, %pin, "keeping previously resolved pin");
            let mut set = ConcreteVersionSet::new();
            set.insert(ConcreteVersion::new(pin.clone()));
            set.set_pinned_version_specifier(specifier.clone());
            set
        } else {
            let pins = match specifier {
                VersionSpecifier::GitReference(reference) => self
                    .provider
                    .resolve_git_reference(dependency, reference)
                    .await
                    .map_err(|e| ResolverError::provider(dependency, "resolve git reference", &e))?,
                _ => self
                    .provider
                    .list_versions(dependency)
                    .await
                    .map_err(|e| ResolverError::provider(dependency, "list versions", &e))?,
            };
            let mut set = ConcreteVersionSet::new();
            for pin in pins {
                set.insert(ConcreteVersion::new(pin));
            }
            set.retain_versions_compatible_with(specifier);
            tracing::debug!(
                dependency = %dependency,
                %specifier,
                candidates = set.len(),
                "fetched candidate versions"
            );
            if set.is_empty() && updatable {
                return Err(ResolverError::RequiredVersionNotFound {
                    dependency: dependency.clone(),
                    specifier: specifier.clone(),
                });
            }
            set
        };

        self.version_sets.insert(key, set.clone());
        Ok(set)
    }

    /// The direct dependencies of one pinned version of a package.
    ///
    /// Cache hits are reordered so that packages currently on the problematic
    /// scoreboard come first - expanding known troublemakers early prunes the
    /// search sooner.
    pub async fn find_dependencies(
        &self,
        versioned: &ConcreteVersionedDependency,
    ) -> Result<Vec<(Dependency, VersionSpecifier)>, ResolverError> {
        if let Some(cached) = self.transitive.get(versioned) {
            let mut requirements = cached.value().clone();
            drop(cached);
            self.reorder_problematic_first(&mut requirements);
            return Ok(requirements);
        }

        let requirements = self
            .provider
            .list_transitive_dependencies(versioned.dependency(), versioned.pinned())
            .await
            .map_err(|e| {
                ResolverError::provider(versioned.dependency(), "list transitive dependencies", &e)
            })?;
        tracing::debug!(
            parent = %versioned,
            count = requirements.len(),
            "fetched transitive dependencies"
        );
        self.transitive.insert(versioned.clone(), requirements.clone());
        Ok(requirements)
    }

    /// Count one more conflict against a package.
    pub fn add_problematic(&self, dependency: &Dependency) {
        *self.problematic.entry(dependency.clone()).or_insert(0) += 1;
    }

    /// Packages that have been party to conflicts, most frequent first; ties
    /// break by name so iteration is deterministic.
    #[must_use]
    pub fn problematic_dependencies(&self) -> Vec<Dependency> {
        let mut entries: Vec<(Dependency, usize)> =
            self.problematic.iter().map(|e| (e.key().clone(), *e.value())).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.into_iter().map(|(dependency, _)| dependency).collect()
    }

    /// The memoized rejection for a candidate, if one was recorded.
    #[must_use]
    pub fn cached_conflict(
        &self,
        versioned: &ConcreteVersionedDependency,
    ) -> Option<CachedConflict> {
        self.conflicts.get(versioned).map(|entry| entry.value().clone())
    }

    /// Memoize that this candidate conflicts with the root requirements and
    /// can never appear in a solution.
    pub fn add_root_conflict(&self, versioned: ConcreteVersionedDependency, error: ResolverError) {
        tracing::debug!(candidate = %versioned, "caching root-level conflict");
        self.conflicts.insert(
            versioned,
            CachedConflict {
                error,
                conflicting: None,
            },
        );
    }

    /// Memoize a pairwise conflict between two pinned candidates, in both
    /// directions so that whichever side a later branch meets first
    /// short-circuits.
    pub fn add_pairwise_conflict(
        &self,
        first: ConcreteVersionedDependency,
        second: ConcreteVersionedDependency,
        error: &ResolverError,
    ) {
        tracing::debug!(a = %first, b = %second, "caching pairwise conflict");
        self.record_conflict(first.clone(), second.clone(), error);
        self.record_conflict(second, first, error);
    }

    fn record_conflict(
        &self,
        key: ConcreteVersionedDependency,
        other: ConcreteVersionedDependency,
        error: &ResolverError,
    ) {
        match self.conflicts.entry(key) {
            Entry::Occupied(mut occupied) => {
                // A root-level conflict is strictly stronger; leave it alone.
                if let Some(conflicting) = &mut occupied.get_mut().conflicting {
                    conflicting.insert(other);
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CachedConflict {
                    error: error.clone(),
                    conflicting: Some(BTreeSet::from([other])),
                });
            }
        }
    }

    fn reorder_problematic_first(&self, requirements: &mut [(Dependency, VersionSpecifier)]) {
        if self.problematic.is_empty() {
            return;
        }
        let ranking: HashMap<Dependency, usize> = self
            .problematic_dependencies()
            .into_iter()
            .enumerate()
            .map(|(rank, dependency)| (dependency, rank))
            .collect();
        requirements.sort_by_key(|(dependency, _)| {
            ranking.get(dependency).copied().unwrap_or(usize::MAX)
        });
    }
}
