//! Package identities.
//!
//! A [`Dependency`] names a package by where it lives: a hosted repository
//! (`owner/name` on a forge), a plain Git URL, or a binary artifact URL.
//! Two identities may share a *name* without being the same package - the
//! canonical case is an upstream project and a fork, both called `networking`
//! under different owners. The resolver lets both participate in a search and
//! reconciles the collision after acceptance, so:
//!
//! - **Equality** distinguishes full identities (kind plus coordinates).
//! - **Ordering** is by case-insensitive name first (identity as tie-break),
//!   which keeps every map iteration in a stable, human-meaningful order.
//! - **Hashing** uses the case-insensitive name, consistent with equality.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a package known to the resolver.
///
/// The variants form a closed set; resolution logic matches exhaustively on
/// them rather than dispatching through a trait object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Dependency {
    /// A repository on a known forge, addressed as `owner/name`.
    Hosted {
        /// Account or organization that owns the repository.
        owner: String,
        /// Repository name; this is the name other packages collide on.
        name: String,
    },

    /// A repository addressed by a raw Git URL.
    Git {
        /// Clone URL of the repository.
        url: String,
        /// Short name derived from the last path segment of the URL.
        name: String,
    },

    /// A binary-only package addressed by an artifact URL.
    Binary {
        /// URL of the artifact description.
        url: String,
        /// Short name derived from the last path segment of the URL.
        name: String,
    },
}

impl Dependency {
    /// Create a hosted-repository identity.
    pub fn hosted(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Hosted {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Create a Git-URL identity. The short name is the last path segment of
    /// the URL with any `.git` suffix removed.
    pub fn git(url: impl Into<String>) -> Self {
        let url = url.into();
        let name = short_name_from_url(&url);
        Self::Git {
            url,
            name,
        }
    }

    /// Create a binary-artifact identity. The short name is the last path
    /// segment of the URL with any `.json` suffix removed.
    pub fn binary(url: impl Into<String>) -> Self {
        let url = url.into();
        let name = short_name_from_url(&url);
        Self::Binary {
            url,
            name,
        }
    }

    /// The short package name.
    ///
    /// Hosted repositories drop the owner, URLs keep only the last path
    /// segment. Names are compared case-insensitively everywhere, so
    /// `Networking` and `networking` are the same name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Hosted {
                name, ..
            }
            | Self::Git {
                name, ..
            }
            | Self::Binary {
                name, ..
            } => name,
        }
    }

    /// The lowercased short name, the key used for updatable-name lookups and
    /// same-name grouping.
    #[must_use]
    pub fn lowercased_name(&self) -> String {
        self.name().to_ascii_lowercase()
    }

    /// Total identity key used as the ordering tie-break between identities
    /// that share a name.
    fn identity(&self) -> (u8, &str, &str) {
        match self {
            Self::Hosted {
                owner,
                name,
            } => (0, owner, name),
            Self::Git {
                url, ..
            } => (1, url, ""),
            Self::Binary {
                url, ..
            } => (2, url, ""),
        }
    }
}

fn short_name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let segment = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let segment = segment.strip_suffix(".git").unwrap_or(segment);
    let segment = segment.strip_suffix(".json").unwrap_or(segment);
    segment.to_string()
}

impl Ord for Dependency {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lowercased_name()
            .cmp(&other.lowercased_name())
            .then_with(|| self.identity().cmp(&other.identity()))
    }
}

impl PartialOrd for Dependency {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Dependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lowercased_name().hash(state);
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hosted {
                owner,
                name,
            } => write!(f, "{owner}/{name}"),
            Self::Git {
                url, ..
            } => write!(f, "{url}"),
            Self::Binary {
                url, ..
            } => write!(f, "{url}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_short_names() {
        assert_eq!(Dependency::hosted("alice", "http").name(), "http");
        assert_eq!(Dependency::git("https://example.com/libs/http.git").name(), "http");
        assert_eq!(Dependency::git("https://example.com/libs/http/").name(), "http");
        assert_eq!(Dependency::binary("https://example.com/tools/cli.json").name(), "cli");
    }

    #[test]
    fn test_forks_are_distinct_identities() {
        let upstream = Dependency::hosted("alice", "http");
        let fork = Dependency::hosted("bob", "http");
        assert_ne!(upstream, fork);
        assert_eq!(upstream.lowercased_name(), fork.lowercased_name());

        // Both can live in the same map
        let mut map = BTreeMap::new();
        map.insert(upstream.clone(), 1);
        map.insert(fork.clone(), 2);
        assert_eq!(map.len(), 2);
        assert_eq!(map[&upstream], 1);
        assert_eq!(map[&fork], 2);
    }

    #[test]
    fn test_ordering_is_name_first() {
        let a = Dependency::hosted("zed", "alpha");
        let b = Dependency::hosted("ann", "Beta");
        assert!(a < b); // "alpha" < "beta" regardless of owner

        let fork_a = Dependency::hosted("ann", "beta");
        let fork_b = Dependency::hosted("zed", "beta");
        assert!(fork_a < fork_b); // same name, owner breaks the tie
    }

    #[test]
    fn test_case_insensitive_name() {
        let lower = Dependency::hosted("alice", "http");
        let upper = Dependency::hosted("alice", "HTTP");
        // Different identities, same collision name
        assert_ne!(lower, upper);
        assert_eq!(lower.lowercased_name(), upper.lowercased_name());
    }

    #[test]
    fn test_display() {
        assert_eq!(Dependency::hosted("alice", "http").to_string(), "alice/http");
        assert_eq!(
            Dependency::git("https://example.com/libs/http.git").to_string(),
            "https://example.com/libs/http.git"
        );
        assert_eq!(
            Dependency::binary("https://example.com/tools/cli.json").to_string(),
            "https://example.com/tools/cli.json"
        );
    }

    #[test]
    fn test_same_name_across_kinds_orders_by_kind() {
        let hosted = Dependency::hosted("alice", "http");
        let git = Dependency::git("https://example.com/libs/http.git");
        let binary = Dependency::binary("https://example.com/artifacts/http.json");
        assert_ne!(hosted, git);
        assert_ne!(git, binary);
        // Same collision name; the identity kind breaks the tie
        assert!(hosted < git);
        assert!(git < binary);

        let mut map = BTreeMap::new();
        map.insert(hosted, 1);
        map.insert(git, 2);
        map.insert(binary, 3);
        assert_eq!(map.len(), 3);
    }
}
