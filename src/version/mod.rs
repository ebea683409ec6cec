//! Semantic version handling for the resolver.
//!
//! This module layers the resolver's versioning rules on top of the `semver`
//! crate:
//!
//! - [`parse_version`] accepts the tag spellings found in real repositories:
//!   a leading non-digit prefix (`v1.0.0`, `version-2.0`) is skipped, and a
//!   missing patch component defaults to zero (`1.2` parses as `1.2.0`). The
//!   remainder must be strict SemVer 2.0.0 - identifier charset, no leading
//!   zeros in numeric pre-release identifiers, non-empty identifiers.
//! - Ordering everywhere in the resolver is *precedence* ordering
//!   ([`semver::Version::cmp_precedence`]): build metadata never influences
//!   comparison or the equality the resolver relies on.
//!
//! # Module Organization
//!
//! - [`specifier`] - version requirements and their intersection algebra
//! - [`concrete`] - pinned versions and the resolver's candidate ordering
//! - [`version_set`] - ordered candidate sets with range retention
//!
//! # Examples
//!
//! ```
//! use gantry::version::parse_version;
//!
//! let plain = parse_version("1.2.3").unwrap();
//! let tagged = parse_version("v1.2.3").unwrap();
//! assert_eq!(plain, tagged);
//!
//! // A missing patch component defaults to zero
//! assert_eq!(parse_version("2.1").unwrap(), parse_version("2.1.0").unwrap());
//!
//! // Opaque refs are not versions
//! assert!(parse_version("main").is_err());
//! ```

use regex::Regex;
use semver::{BuildMetadata, Version};
use std::sync::LazyLock;

use crate::core::ResolverError;

pub mod concrete;
pub mod specifier;
pub mod version_set;

#[cfg(test)]
mod tests;

/// Parse a version string, tolerating common tag spellings.
///
/// A leading run of non-digit characters is skipped (so `v1.0.0` and
/// `version-2.0` parse), and a missing patch component defaults to zero.
/// Everything after normalization must be valid SemVer 2.0.0.
///
/// # Errors
///
/// Returns [`ResolverError::InvalidVersion`] when the normalized remainder is
/// not a semantic version (opaque branch names, commit SHAs, malformed
/// pre-release identifiers).
pub fn parse_version(input: &str) -> Result<Version, ResolverError> {
    // Skip a leading prefix like "v" or "version-"; never consumes digits, so
    // commit SHAs fall through to the parse error below.
    static LEADING_PREFIX: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[^0-9]*").unwrap());
    // "MAJOR.MINOR" with no patch, followed only by pre-release/build parts.
    static MISSING_PATCH: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(\d+\.\d+)($|[-+].*$)").unwrap());

    let stripped = LEADING_PREFIX.replace(input.trim(), "");
    let normalized = MISSING_PATCH.replace(&stripped, "${1}.0${2}");

    Version::parse(&normalized).map_err(|error| ResolverError::InvalidVersion {
        input: input.to_string(),
        reason: error.to_string(),
    })
}

/// Parse a version string, returning `None` when the input is not semantic.
///
/// This is the entry point used when classifying pinned versions: an opaque
/// commit-ish simply has no semantic interpretation.
#[must_use]
pub fn try_parse_version(input: &str) -> Option<Version> {
    parse_version(input).ok()
}

/// Whether the version carries pre-release identifiers.
#[must_use]
pub fn is_pre_release(version: &Version) -> bool {
    !version.pre.is_empty()
}

/// A copy of the version with build metadata discarded.
///
/// Build metadata does not participate in precedence; stripping it keeps
/// specifiers produced by intersection canonical.
#[must_use]
pub fn discard_build_metadata(version: &Version) -> Version {
    Version {
        major: version.major,
        minor: version.minor,
        patch: version.patch,
        pre: version.pre.clone(),
        build: BuildMetadata::EMPTY,
    }
}

/// Whether two versions share the `(major, minor, patch)` triple.
///
/// Pre-releases satisfy a range requirement only when the range target is a
/// pre-release with the same numeric triple; this is that test.
#[must_use]
pub fn has_same_numeric_components(a: &Version, b: &Version) -> bool {
    a.major == b.major && a.minor == b.minor && a.patch == b.patch
}

/// The smallest release above `version`'s major line, the exclusive upper
/// bound of a compatible-with range when the major component is non-zero.
#[must_use]
pub fn next_major(version: &Version) -> Version {
    Version::new(version.major + 1, 0, 0)
}

/// The smallest release above `version`'s minor line, the exclusive upper
/// bound of a compatible-with range in the `0.x` regime.
#[must_use]
pub fn next_minor(version: &Version) -> Version {
    Version::new(version.major, version.minor + 1, 0)
}

/// The smallest release above `version`'s patch line, the exclusive upper
/// bound for pre-release retention when a range targets a pre-release.
#[must_use]
pub fn next_patch(version: &Version) -> Version {
    Version::new(version.major, version.minor, version.patch + 1)
}
