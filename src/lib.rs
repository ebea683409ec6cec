//! Gantry - dependency resolution for Git-based native packages
//!
//! Gantry pins one concrete version for every package reachable from a root
//! dependency list, or explains precisely why no such pinning exists. It is
//! the resolver core of a manifest/lockfile dependency manager:
//! - the manifest names direct dependencies and version requirements
//! - the lockfile records the exact pins of the last resolution
//! - packages are fetched directly from Git repositories (no central registry)
//!
//! # Architecture
//!
//! The resolver is a backtracking search over partial assignments. Candidate
//! versions and transitive requirements are supplied by a caller-provided
//! [`resolver::Provider`]; everything else is pure in-memory computation:
//!
//! - [`version`] - semantic version parsing, version specifiers and their
//!   intersection algebra, ordered candidate version sets
//! - [`resolver`] - the provider contract, the caching retriever, the
//!   partial-assignment dependency set, and the backtracking driver
//! - [`core`] - package identities and the typed error model
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//!
//! use gantry::core::Dependency;
//! use gantry::resolver::BacktrackingResolver;
//! use gantry::version::specifier::VersionSpecifier;
//!
//! # async fn example(provider: impl gantry::resolver::Provider) -> anyhow::Result<()> {
//! let mut roots = BTreeMap::new();
//! roots.insert(
//!     Dependency::hosted("alamos", "networking"),
//!     VersionSpecifier::parse("~> 2.1")?,
//! );
//!
//! let resolver = BacktrackingResolver::new(provider);
//! let resolved = resolver.resolve(&roots, None, None).await?;
//! for (dependency, pin) in &resolved {
//!     println!("{dependency} -> {pin}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Determinism
//!
//! Given identical provider responses, `resolve` returns identical maps:
//! candidate iteration, next-package selection, and every tie-break are
//! fully ordered. The resolver performs no I/O and mutates no on-disk state.

pub mod core;
pub mod resolver;
pub mod version;

// test_utils module is available for both unit tests and downstream test suites
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
