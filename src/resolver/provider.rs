//! The provider contract: the resolver's only window onto the outside world.
//!
//! The resolver itself performs no I/O. Everything it learns about packages
//! arrives through the three callbacks of [`Provider`], typically backed by
//! Git operations (listing tags, reading a manifest at a revision, resolving
//! a branch to commits). Callbacks may block or await freely; the resolver
//! suspends only at these two points, so dropping the resolve future between
//! them aborts the search without issuing further provider work.
//!
//! Callbacks return `anyhow::Result` - whatever error the underlying
//! transport produces. The retriever renders failures into the resolver's
//! typed error model.

use std::future::Future;

use crate::core::Dependency;
use crate::version::concrete::PinnedVersion;
use crate::version::specifier::VersionSpecifier;

/// Source of candidate versions and transitive requirements.
///
/// Implementations must be deterministic for the duration of one resolve
/// call: the resolver caches responses and assumes a repeated question would
/// get the same answer. Response order is not significant; the resolver
/// imposes its own candidate ordering.
pub trait Provider {
    /// Enumerate candidate pinned versions for a package, typically its tags.
    fn list_versions(
        &self,
        dependency: &Dependency,
    ) -> impl Future<Output = anyhow::Result<Vec<PinnedVersion>>>;

    /// The direct dependencies declared by one specific version of a package.
    fn list_transitive_dependencies(
        &self,
        dependency: &Dependency,
        version: &PinnedVersion,
    ) -> impl Future<Output = anyhow::Result<Vec<(Dependency, VersionSpecifier)>>>;

    /// Resolve a symbolic reference (branch, tag pattern, commit prefix) to
    /// one or more concrete pins.
    fn resolve_git_reference(
        &self,
        dependency: &Dependency,
        reference: &str,
    ) -> impl Future<Output = anyhow::Result<Vec<PinnedVersion>>>;
}

impl<T: Provider> Provider for &T {
    fn list_versions(
        &self,
        dependency: &Dependency,
    ) -> impl Future<Output = anyhow::Result<Vec<PinnedVersion>>> {
        (**self).list_versions(dependency)
    }

    fn list_transitive_dependencies(
        &self,
        dependency: &Dependency,
        version: &PinnedVersion,
    ) -> impl Future<Output = anyhow::Result<Vec<(Dependency, VersionSpecifier)>>> {
        (**self).list_transitive_dependencies(dependency, version)
    }

    fn resolve_git_reference(
        &self,
        dependency: &Dependency,
        reference: &str,
    ) -> impl Future<Output = anyhow::Result<Vec<PinnedVersion>>> {
        (**self).resolve_git_reference(dependency, reference)
    }
}
