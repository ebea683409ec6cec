//! Pinned versions and the resolver's candidate ordering.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::version::{is_pre_release, try_parse_version};

/// An opaque commit-ish uniquely locating a snapshot of a package.
///
/// A pin may be a tag name, a branch name, or a commit SHA; the resolver
/// treats it as a string and compares it by string equality. Whether the pin
/// *also* reads as a semantic version is the concern of [`ConcreteVersion`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinnedVersion(String);

impl PinnedVersion {
    /// Wrap a commit-ish string.
    pub fn new(commitish: impl Into<String>) -> Self {
        Self(commitish.into())
    }

    /// The raw commit-ish.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The semantic reading of this pin, if it has one.
    #[must_use]
    pub fn semantic(&self) -> Option<Version> {
        try_parse_version(&self.0)
    }
}

impl From<&str> for PinnedVersion {
    fn from(commitish: &str) -> Self {
        Self::new(commitish)
    }
}

impl From<String> for PinnedVersion {
    fn from(commitish: String) -> Self {
        Self::new(commitish)
    }
}

impl fmt::Display for PinnedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A candidate version as the resolver orders it: the pin paired with its
/// semantic reading, when it has one.
///
/// The `Ord` implementation is the resolver's *preference* order - smaller
/// sorts earlier, and earlier means "tried first":
///
/// - two semantic candidates order by descending precedence (higher versions
///   are preferred),
/// - a semantic candidate is preferred over an opaque one,
/// - opaque candidates order by ascending commit-ish.
///
/// Equality follows the same comparison, so two tags that read as the same
/// version (`1.0.0` and `v1.0.0`) are the same candidate.
#[derive(Debug, Clone)]
pub struct ConcreteVersion {
    pinned: PinnedVersion,
    semantic: Option<Version>,
}

impl ConcreteVersion {
    /// Classify a pin, parsing its semantic reading once up front.
    pub fn new(pinned: impl Into<PinnedVersion>) -> Self {
        let pinned = pinned.into();
        let semantic = try_parse_version(pinned.as_str());
        Self {
            pinned,
            semantic,
        }
    }

    /// The underlying pin.
    #[must_use]
    pub fn pinned(&self) -> &PinnedVersion {
        &self.pinned
    }

    /// The semantic reading, if the pin has one.
    #[must_use]
    pub fn semantic(&self) -> Option<&Version> {
        self.semantic.as_ref()
    }

    /// Whether this candidate is a semantic pre-release.
    #[must_use]
    pub fn is_pre_release(&self) -> bool {
        self.semantic.as_ref().is_some_and(is_pre_release)
    }
}

impl PartialEq for ConcreteVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ConcreteVersion {}

impl PartialOrd for ConcreteVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConcreteVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.semantic, &other.semantic) {
            // Higher precedence first; build metadata is ignored
            (Some(a), Some(b)) => b.cmp_precedence(a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.pinned.cmp(&other.pinned),
        }
    }
}

impl fmt::Display for ConcreteVersion {
    // Pins display as the user wrote them; the semantic reading is an
    // internal classification.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pinned)
    }
}
