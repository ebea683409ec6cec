//! Dependency resolution: provider contract, caching retriever, partial
//! assignments, and the backtracking driver.
//!
//! The resolver turns a root dependency list into a consistent pinning:
//!
//! ```text
//! root requirements ──> DependencySet ──pop/expand──> accepted solution
//!                            │                              │
//!                            └── DependencyRetriever <──────┘
//!                                 (caches, conflict memos)
//!                                        │
//!                                    Provider
//!                          (version lists, manifests, refs)
//! ```
//!
//! See [`BacktrackingResolver::resolve`] for the entry point and
//! [`backtracking`] for the search algorithm.

pub mod backtracking;
pub mod dependency_set;
pub mod provider;
pub mod retriever;


pub use backtracking::{BacktrackingResolver, ResolvedDependencyMap};
pub use dependency_set::DependencySet;
pub use provider::Provider;
pub use retriever::{CachedConflict, ConcreteVersionedDependency, DependencyRetriever};
