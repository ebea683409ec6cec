//! Error handling for the resolver.
//!
//! Every failure the resolver can report is a variant of [`ResolverError`]
//! with a structured payload, so callers can match on the failure instead of
//! parsing messages. Two properties shape the design:
//!
//! 1. **Errors are values**: the conflict cache memoizes rejections per
//!    `(package, pinned version)` and replays them on later branches, so the
//!    whole enum is `Clone` (and `PartialEq`, which the tests lean on).
//! 2. **Diagnostics name both sides**: a version conflict carries the two
//!    [`SpecifierDefinition`]s involved - which specifier, imposed by which
//!    parent package (or the root dependency list) - so the final message can
//!    say *who* disagrees, not just that someone does.
//!
//! Provider callbacks fail with `anyhow::Error`; the retriever folds those
//! into [`ResolverError::Provider`] with the rendered cause chain, keeping
//! the rest of the taxonomy clonable.

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::core::Dependency;
use crate::version::specifier::VersionSpecifier;
use crate::version::version_set::SpecifierDefinition;

/// The resolver's failure taxonomy.
///
/// Variants map one-to-one onto the ways a resolution can fail:
///
/// - [`RequiredVersionNotFound`] - a provider produced no version satisfying
///   a specifier
/// - [`IncompatibleRequirements`] - two specifiers on the same package are
///   disjoint
/// - [`IncompatibleDependencies`] - distinct packages in the accepted
///   solution share a name and the root dependency list does not pick one
/// - [`DependencyCycle`] - the accepted solution's dependency graph is cyclic
/// - [`UnresolvedDependencies`] - the search space was exhausted without a
///   better recorded cause
/// - [`UnsatisfiableDependencyList`] - a package was narrowed to no
///   candidates by more than two parties
/// - [`InvalidVersion`] - a version or requirement string failed to parse
/// - [`Provider`] - an external callback failed
///
/// [`RequiredVersionNotFound`]: ResolverError::RequiredVersionNotFound
/// [`IncompatibleRequirements`]: ResolverError::IncompatibleRequirements
/// [`IncompatibleDependencies`]: ResolverError::IncompatibleDependencies
/// [`DependencyCycle`]: ResolverError::DependencyCycle
/// [`UnresolvedDependencies`]: ResolverError::UnresolvedDependencies
/// [`UnsatisfiableDependencyList`]: ResolverError::UnsatisfiableDependencyList
/// [`InvalidVersion`]: ResolverError::InvalidVersion
/// [`Provider`]: ResolverError::Provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolverError {
    /// No version of the package satisfies the specifier.
    ///
    /// Raised when the provider's version list (or resolved git reference),
    /// filtered by the specifier, comes out empty for an updatable package.
    #[error("no available version of {dependency} satisfies {specifier}")]
    RequiredVersionNotFound {
        /// The package with no satisfying version.
        dependency: Dependency,
        /// The specifier nothing satisfied.
        specifier: VersionSpecifier,
    },

    /// Two specifiers imposed on the same package admit no common version.
    #[error("incompatible requirements for {dependency}: {existing} and {conflicting}")]
    IncompatibleRequirements {
        /// The package both sides constrain.
        dependency: Dependency,
        /// The requirement that was already in place.
        existing: SpecifierDefinition,
        /// The requirement whose arrival emptied the candidate set.
        conflicting: SpecifierDefinition,
    },

    /// Distinct packages in the accepted solution share a case-insensitive
    /// name and the root dependency list does not express a precedence.
    #[error("multiple dependencies with the same name: {}", format_dependency_list(.dependencies))]
    IncompatibleDependencies {
        /// The colliding identities, in name order.
        dependencies: Vec<Dependency>,
    },

    /// The accepted solution's dependency graph contains a cycle.
    ///
    /// The payload is the traversal stack at detection: every package on the
    /// stack mapped to the packages it depends on.
    #[error("dependency cycle detected: {}", format_cycle(.cycle))]
    DependencyCycle {
        /// Visited packages and their direct dependencies at detection.
        cycle: BTreeMap<Dependency, BTreeSet<Dependency>>,
    },

    /// The search ended with packages still unresolved and no more specific
    /// cause recorded along the failing branch.
    #[error("unable to resolve dependencies: {}", .names.join(", "))]
    UnresolvedDependencies {
        /// Names of the packages left unresolved.
        names: Vec<String>,
    },

    /// A package was narrowed to an empty candidate set, but no single prior
    /// requirement is disjoint with the new one - three or more parties
    /// conflict jointly.
    #[error("unable to satisfy the dependency list for update set [{}]", .names.join(", "))]
    UnsatisfiableDependencyList {
        /// The updatable names in effect (empty when everything is updatable).
        names: Vec<String>,
    },

    /// A version or version-requirement string failed to parse.
    #[error("invalid semantic version '{input}': {reason}")]
    InvalidVersion {
        /// The offending input.
        input: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// A provider callback failed.
    #[error("provider failed to {operation} for {dependency}: {message}")]
    Provider {
        /// The package the callback was invoked for.
        dependency: Dependency,
        /// Which callback failed (e.g. "list versions").
        operation: String,
        /// Rendered cause chain of the underlying failure.
        message: String,
    },
}

impl ResolverError {
    /// Wrap a provider failure, rendering the full `anyhow` cause chain into
    /// the message so the error stays clonable.
    pub fn provider(dependency: &Dependency, operation: &str, source: &anyhow::Error) -> Self {
        Self::Provider {
            dependency: dependency.clone(),
            operation: operation.to_string(),
            message: format!("{source:#}"),
        }
    }
}

fn format_dependency_list(dependencies: &[Dependency]) -> String {
    dependencies.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn format_cycle(cycle: &BTreeMap<Dependency, BTreeSet<Dependency>>) -> String {
    cycle
        .iter()
        .map(|(parent, children)| {
            let children =
                children.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
            format!("{parent} -> [{children}]")
        })
        .collect::<Vec<_>>()
        .join("; ")
}
