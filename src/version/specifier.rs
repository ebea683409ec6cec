//! Version specifiers and their intersection algebra.
//!
//! A [`VersionSpecifier`] is a predicate over pinned versions. The resolver
//! combines the specifiers imposed on a package by intersecting them, and
//! reports a conflict when an intersection comes out empty.
//!
//! # Specifier Kinds
//!
//! | Syntax       | Kind                | Matches                                     |
//! |--------------|---------------------|---------------------------------------------|
//! | *(empty)*    | `Any`               | every non-pre-release version               |
//! | `>= 1.2.0`   | `AtLeast`           | `1.2.0` and above                           |
//! | `~> 1.2.0`   | `CompatibleWith`    | `[1.2.0, 2.0.0)` (`[0.2.0, 0.3.0)` for 0.x) |
//! | `== 1.2.0`   | `Exactly`           | `1.2.0` only                                |
//! | `"develop"`  | `GitReference`      | whatever the reference resolves to          |
//!
//! # Pre-release Gating
//!
//! Range specifiers admit a pre-release only when the range target is itself
//! a pre-release with the same `(major, minor, patch)` triple: `>= 1.2.0`
//! never matches `1.3.0-beta.1`, but `>= 1.2.0-alpha.2` matches
//! `1.2.0-beta.1`. `Any` excludes pre-releases outright.
//!
//! # Opaque Pins
//!
//! A pin with no semantic reading (a branch name, a commit SHA) satisfies
//! every specifier: branches are opaque snapshots the requirement machinery
//! cannot see inside, and git-reference candidates arrive pre-filtered by the
//! provider.
//!
//! # Examples
//!
//! ```
//! use gantry::version::specifier::{VersionSpecifier, intersection};
//!
//! let at_least = VersionSpecifier::parse(">= 1.1.0").unwrap();
//! let compatible = VersionSpecifier::parse("~> 1.0").unwrap();
//!
//! // >= 1.1.0 within the 1.x line
//! let combined = intersection(&at_least, &compatible).unwrap();
//! assert_eq!(combined, VersionSpecifier::parse("~> 1.1.0").unwrap());
//!
//! // Disjoint requirements intersect to nothing
//! let exact = VersionSpecifier::parse("== 2.0.0").unwrap();
//! assert!(intersection(&compatible, &exact).is_none());
//! ```

use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::core::ResolverError;
use crate::version::concrete::ConcreteVersion;
use crate::version::{
    discard_build_metadata, has_same_numeric_components, is_pre_release, next_major, next_minor,
    parse_version,
};

/// A version requirement imposed on a package.
///
/// The variants form a closed set, so the satisfaction and intersection
/// tables below are exhaustive matches the compiler checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "requirement", content = "value", rename_all = "kebab-case")]
pub enum VersionSpecifier {
    /// Any non-pre-release version.
    Any,
    /// The given version or anything above it.
    AtLeast(Version),
    /// Versions compatible with the given one: below the next major, or the
    /// next minor while the major component is zero.
    CompatibleWith(Version),
    /// Exactly the given version.
    Exactly(Version),
    /// A symbolic Git reference: branch, tag pattern, or commit.
    GitReference(String),
}

impl VersionSpecifier {
    /// Parse the manifest requirement syntax.
    ///
    /// Accepted forms, in the order they are tried:
    ///
    /// - empty input parses as [`Any`](Self::Any)
    /// - `~> V`, `>= V`, `== V` parse as the corresponding range kind, with
    ///   `V` going through the lenient version parser (so `~> 1.0` works)
    /// - a bare token that starts with a digit (or `v` followed by a digit)
    ///   and reads as a version parses as [`Exactly`](Self::Exactly)
    /// - anything else, optionally double-quoted, is a
    ///   [`GitReference`](Self::GitReference)
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::InvalidVersion`] when an operator form names
    /// an unparseable version.
    ///
    /// # Examples
    ///
    /// ```
    /// use gantry::version::specifier::VersionSpecifier;
    ///
    /// let compatible = VersionSpecifier::parse("~> 1.2")?;
    /// let exact = VersionSpecifier::parse("1.2.3")?;
    /// let branch = VersionSpecifier::parse("main")?;
    /// assert_eq!(branch, VersionSpecifier::GitReference("main".into()));
    /// # Ok::<(), gantry::core::ResolverError>(())
    /// ```
    pub fn parse(input: &str) -> Result<Self, ResolverError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::Any);
        }
        if let Some(rest) = trimmed.strip_prefix("~>") {
            return Ok(Self::CompatibleWith(parse_version(rest)?));
        }
        if let Some(rest) = trimmed.strip_prefix(">=") {
            return Ok(Self::AtLeast(parse_version(rest)?));
        }
        if let Some(rest) = trimmed.strip_prefix("==") {
            return Ok(Self::Exactly(parse_version(rest)?));
        }

        if looks_like_version(trimmed)
            && let Ok(version) = parse_version(trimmed)
        {
            return Ok(Self::Exactly(version));
        }

        let reference =
            trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(trimmed);
        Ok(Self::GitReference(reference.to_string()))
    }

    /// Whether the candidate satisfies this specifier.
    ///
    /// Opaque candidates satisfy everything. Semantic candidates follow the
    /// range rules with the pre-release gating described in the module docs;
    /// `Any` and git references admit every non-pre-release.
    #[must_use]
    pub fn is_satisfied_by(&self, version: &ConcreteVersion) -> bool {
        let Some(semantic) = version.semantic() else {
            return true;
        };
        self.is_satisfied_by_version(semantic)
    }

    /// Satisfaction against a semantic version directly.
    #[must_use]
    pub fn is_satisfied_by_version(&self, version: &Version) -> bool {
        match self {
            Self::Any | Self::GitReference(_) => !is_pre_release(version),
            Self::Exactly(required) => version.cmp_precedence(required) == Ordering::Equal,
            Self::AtLeast(required) => range_satisfied(version, required, None),
            Self::CompatibleWith(required) => {
                range_satisfied(version, required, Some(&compatibility_upper_bound(required)))
            }
        }
    }

    /// Precedence used to break ties when several specifiers describe the
    /// same package: more constraining kinds win.
    ///
    /// `GitReference` > `Exactly` > `CompatibleWith` > `AtLeast` > `Any`.
    #[must_use]
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Any => 0,
            Self::AtLeast(_) => 1,
            Self::CompatibleWith(_) => 2,
            Self::Exactly(_) => 3,
            Self::GitReference(_) => 4,
        }
    }

    /// A copy with build metadata stripped from the carried version.
    #[must_use]
    fn without_build_metadata(&self) -> Self {
        match self {
            Self::Any => Self::Any,
            Self::AtLeast(v) => Self::AtLeast(discard_build_metadata(v)),
            Self::CompatibleWith(v) => Self::CompatibleWith(discard_build_metadata(v)),
            Self::Exactly(v) => Self::Exactly(discard_build_metadata(v)),
            Self::GitReference(r) => Self::GitReference(r.clone()),
        }
    }
}

/// The exclusive upper bound of a compatible-with range.
pub(crate) fn compatibility_upper_bound(version: &Version) -> Version {
    if version.major > 0 {
        next_major(version)
    } else {
        next_minor(version)
    }
}

fn range_satisfied(candidate: &Version, lower: &Version, upper: Option<&Version>) -> bool {
    if candidate.cmp_precedence(lower) == Ordering::Less {
        return false;
    }
    if let Some(upper) = upper {
        if candidate.cmp_precedence(upper) != Ordering::Less {
            return false;
        }
    }
    // A pre-release qualifies only when the range targets a pre-release of
    // the same numeric triple.
    !is_pre_release(candidate)
        || (is_pre_release(lower) && has_same_numeric_components(candidate, lower))
}

fn looks_like_version(input: &str) -> bool {
    let mut chars = input.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('v') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

/// The tightest specifier satisfied exactly by the versions satisfying both
/// inputs, or `None` when the requirements are disjoint.
///
/// `Any` is the identity (the other side survives with build metadata
/// stripped). A git reference absorbs any version requirement, and two
/// references agree only when identical. The remaining combinations follow
/// the range tables; note the `0.x` regime, where a compatible-with window
/// is a single minor line - another window on a different line, or a floor
/// above the line, is disjoint.
#[must_use]
pub fn intersection(a: &VersionSpecifier, b: &VersionSpecifier) -> Option<VersionSpecifier> {
    use VersionSpecifier::{Any, AtLeast, CompatibleWith, Exactly, GitReference};

    match (a, b) {
        (Any, other) | (other, Any) => Some(other.without_build_metadata()),

        (GitReference(left), GitReference(right)) => {
            (left == right).then(|| GitReference(left.clone()))
        }
        // A reference names one snapshot; it subsumes any version range.
        (reference @ GitReference(_), _) | (_, reference @ GitReference(_)) => {
            Some(reference.clone())
        }

        (AtLeast(left), AtLeast(right)) => {
            Some(AtLeast(discard_build_metadata(max_precedence(left, right))))
        }

        (AtLeast(floor), CompatibleWith(base)) | (CompatibleWith(base), AtLeast(floor)) => {
            if floor.major > base.major {
                return None;
            }
            // In the 0.x regime the window is a single minor line; a floor
            // above it admits nothing.
            if base.major == 0 && floor.minor > base.minor {
                return None;
            }
            Some(CompatibleWith(discard_build_metadata(max_precedence(floor, base))))
        }

        (CompatibleWith(left), CompatibleWith(right)) => {
            if left.major != right.major {
                return None;
            }
            if left.major == 0 && left.minor != right.minor {
                return None;
            }
            Some(CompatibleWith(discard_build_metadata(max_precedence(left, right))))
        }

        (Exactly(pin), range @ (AtLeast(_) | CompatibleWith(_)))
        | (range @ (AtLeast(_) | CompatibleWith(_)), Exactly(pin)) => {
            range.is_satisfied_by_version(pin).then(|| Exactly(discard_build_metadata(pin)))
        }

        (Exactly(left), Exactly(right)) => (left.cmp_precedence(right) == Ordering::Equal)
            .then(|| Exactly(discard_build_metadata(left))),
    }
}

/// Left-fold of [`intersection`] over a sequence of specifiers.
///
/// The empty sequence intersects to `Any`; any disjoint pair collapses the
/// whole fold to `None`.
pub fn intersect_all<'a, I>(specifiers: I) -> Option<VersionSpecifier>
where
    I: IntoIterator<Item = &'a VersionSpecifier>,
{
    specifiers
        .into_iter()
        .try_fold(VersionSpecifier::Any, |combined, next| intersection(&combined, next))
}

fn max_precedence<'a>(a: &'a Version, b: &'a Version) -> &'a Version {
    if a.cmp_precedence(b) == Ordering::Less { b } else { a }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "(any version)"),
            Self::AtLeast(version) => write!(f, ">= {version}"),
            Self::CompatibleWith(version) => write!(f, "~> {version}"),
            Self::Exactly(version) => write!(f, "== {version}"),
            Self::GitReference(reference) => write!(f, "\"{reference}\""),
        }
    }
}
