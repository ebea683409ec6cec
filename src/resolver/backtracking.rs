//! The backtracking search driver.
//!
//! # Algorithm
//!
//! Resolution is a depth-first search over [`DependencySet`] states:
//!
//! 1. **Seed**: build the root set from the root dependency list through the
//!    retriever, pinning non-updatable packages to their locked versions.
//! 2. **Commit**: pop a sub-set - commit the next unresolved package to its
//!    preferred candidate and expand that candidate's requirements. A package
//!    with several candidates forks; the receiver keeps the alternatives.
//! 3. **Backtrack**: a rejected state falls back to the nearest fork frame,
//!    which tries its next candidate. Rejections are memoized in the
//!    retriever as no-goods so doomed candidates are skipped across branches.
//! 4. **Accept**: a state with nothing unresolved and no rejection is the
//!    answer, pending two whole-solution checks: the preferred-candidate
//!    projection must be acyclic, and same-named packages must be reconciled
//!    by the root dependency list.
//!
//! The search is written with an explicit stack of fork frames rather than
//! recursion, so pathological graphs cannot overflow the call stack. Given
//! identical provider answers the walk is fully deterministic.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::core::{Dependency, ResolverError};
use crate::resolver::dependency_set::{DependencySet, PopOutcome};
use crate::resolver::provider::Provider;
use crate::resolver::retriever::{ConcreteVersionedDependency, DependencyRetriever};
use crate::version::concrete::PinnedVersion;
use crate::version::specifier::VersionSpecifier;

/// The result of a successful resolution: one pin per reachable package.
pub type ResolvedDependencyMap = BTreeMap<Dependency, PinnedVersion>;

/// Backtracking version resolver over a [`Provider`].
///
/// The resolver owns the provider; everything per-call (caches, conflict
/// memos, the search state) lives and dies inside [`resolve`].
///
/// [`resolve`]: BacktrackingResolver::resolve
pub struct BacktrackingResolver<P> {
    provider: P,
}

impl<P: Provider> BacktrackingResolver<P> {
    /// Create a resolver over the given provider.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
        }
    }

    /// Resolve a root dependency list to one pinned version per reachable
    /// package.
    ///
    /// `last_resolved` carries the pins of a previous resolution;
    /// `dependencies_to_update` names the packages allowed to move off those
    /// pins (empty or absent means everything may move). When updating a
    /// subset, root entries that are neither named nor previously pinned are
    /// ignored, so untouched packages keep their pins through the
    /// retriever's non-updatable path.
    ///
    /// # Errors
    ///
    /// The most informative recorded rejection when no consistent pinning
    /// exists; see [`ResolverError`] for the taxonomy.
    pub async fn resolve(
        &self,
        root_dependencies: &BTreeMap<Dependency, VersionSpecifier>,
        last_resolved: Option<&BTreeMap<Dependency, PinnedVersion>>,
        dependencies_to_update: Option<&[String]>,
    ) -> Result<ResolvedDependencyMap, ResolverError> {
        let updatable_names: Option<BTreeSet<String>> = match dependencies_to_update {
            None => None,
            Some(names) if names.is_empty() => None,
            Some(names) => Some(names.iter().map(|name| name.to_ascii_lowercase()).collect()),
        };

        let required: Vec<(Dependency, VersionSpecifier)> = match &updatable_names {
            Some(names) => root_dependencies
                .iter()
                .filter(|(dependency, _)| {
                    names.contains(&dependency.lowercased_name())
                        || last_resolved.is_some_and(|pins| pins.contains_key(dependency))
                })
                .map(|(dependency, specifier)| (dependency.clone(), specifier.clone()))
                .collect(),
            None => root_dependencies
                .iter()
                .map(|(dependency, specifier)| (dependency.clone(), specifier.clone()))
                .collect(),
        };

        tracing::debug!(
            roots = required.len(),
            updatable = ?updatable_names,
            pinned = last_resolved.map_or(0, BTreeMap::len),
            "starting resolution"
        );

        let retriever =
            DependencyRetriever::new(&self.provider, last_resolved.cloned().unwrap_or_default());
        let mut root_set = DependencySet::new(&retriever, updatable_names);
        root_set.seed_unresolved(required.iter().map(|(dependency, _)| dependency.clone()));
        root_set.expand(None, &required, false).await?;

        let accepted = Self::backtrack(root_set).await?;
        tracing::debug!(packages = accepted.contents().len(), "resolution accepted");

        validate_for_cycles(&accepted, &required, &retriever).await?;
        eliminate_same_named_dependencies(accepted.resolved_map(), root_dependencies)
    }

    // The search loop. `current` is the state being advanced; `forks` holds
    // the states with untried candidates. A rejected or exhausted state
    // falls back to the top fork; running out of forks surfaces the best
    // recorded cause.
    async fn backtrack<'a>(
        set: DependencySet<'a, P>,
    ) -> Result<DependencySet<'a, P>, ResolverError> {
        let mut current = set;
        let mut forks: Vec<DependencySet<'a, P>> = Vec::new();

        loop {
            if current.is_rejected() {
                match forks.pop() {
                    Some(parent) => {
                        tracing::trace!(depth = forks.len(), "backtracking to previous fork");
                        current = parent;
                        continue;
                    }
                    None => {
                        return Err(current.take_rejection().unwrap_or_else(|| {
                            ResolverError::UnresolvedDependencies {
                                names: current.unresolved_names(),
                            }
                        }));
                    }
                }
            }
            if current.is_accepted() {
                return Ok(current);
            }
            match current.pop_sub_set().await? {
                PopOutcome::Advanced => {}
                PopOutcome::Forked(child) => {
                    forks.push(std::mem::replace(&mut current, child));
                }
                PopOutcome::Exhausted => match forks.pop() {
                    Some(parent) => {
                        tracing::trace!(depth = forks.len(), "candidates exhausted, backtracking");
                        current = parent;
                    }
                    None => {
                        return Err(current.take_rejection().unwrap_or_else(|| {
                            ResolverError::UnresolvedDependencies {
                                names: current.unresolved_names(),
                            }
                        }));
                    }
                },
            }
        }
    }
}

/// Check that the accepted solution's preferred-candidate projection is
/// acyclic.
///
/// The projection graph has an edge from each pinned package to each of its
/// declared dependencies (all transitive lists are already memoized by the
/// search). The walk starts from the root packages; re-entering a package
/// already on the walk stack reports the stack as the cycle payload.
async fn validate_for_cycles<P: Provider>(
    accepted: &DependencySet<'_, P>,
    roots: &[(Dependency, VersionSpecifier)],
    retriever: &DependencyRetriever<'_, P>,
) -> Result<(), ResolverError> {
    let mut graph: DiGraph<Dependency, ()> = DiGraph::new();
    let mut nodes: HashMap<Dependency, NodeIndex> = HashMap::new();

    for dependency in accepted.contents().keys() {
        let index = graph.add_node(dependency.clone());
        nodes.insert(dependency.clone(), index);
    }
    for (dependency, set) in accepted.contents() {
        let Some(version) = set.first() else {
            continue;
        };
        let versioned =
            ConcreteVersionedDependency::new(dependency.clone(), version.pinned().clone());
        let requirements = retriever.find_dependencies(&versioned).await?;
        for (child, _) in requirements {
            if let (Some(&from), Some(&to)) = (nodes.get(dependency), nodes.get(&child)) {
                graph.add_edge(from, to, ());
            }
        }
    }

    let mut colors: HashMap<NodeIndex, Color> = HashMap::new();
    let mut stack: BTreeMap<Dependency, BTreeSet<Dependency>> = BTreeMap::new();
    for (root, _) in roots {
        if let Some(&index) = nodes.get(root)
            && colors.get(&index).is_none()
        {
            visit(&graph, index, &mut colors, &mut stack)?;
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    /// On the current walk stack.
    Gray,
    /// Fully explored.
    Black,
}

fn visit(
    graph: &DiGraph<Dependency, ()>,
    node: NodeIndex,
    colors: &mut HashMap<NodeIndex, Color>,
    stack: &mut BTreeMap<Dependency, BTreeSet<Dependency>>,
) -> Result<(), ResolverError> {
    colors.insert(node, Color::Gray);
    let children: BTreeSet<Dependency> =
        graph.neighbors(node).map(|index| graph[index].clone()).collect();
    stack.insert(graph[node].clone(), children);

    for neighbor in graph.neighbors(node) {
        match colors.get(&neighbor) {
            Some(Color::Gray) => {
                return Err(ResolverError::DependencyCycle {
                    cycle: stack.clone(),
                });
            }
            Some(Color::Black) => {}
            None => visit(graph, neighbor, colors, stack)?,
        }
    }

    stack.remove(&graph[node]);
    colors.insert(node, Color::Black);
    Ok(())
}

/// Reconcile packages that share a case-insensitive name.
///
/// A fork may override an upstream package of the same name, but only when
/// the root dependency list expresses that choice: exactly one member of the
/// group must carry a root requirement (the most constraining kind wins the
/// sort). A group whose most precise member has no root requirement, or with
/// a second root requirement, is ambiguous.
fn eliminate_same_named_dependencies(
    mut resolved: ResolvedDependencyMap,
    root_dependencies: &BTreeMap<Dependency, VersionSpecifier>,
) -> Result<ResolvedDependencyMap, ResolverError> {
    let mut groups: BTreeMap<String, Vec<Dependency>> = BTreeMap::new();
    for dependency in resolved.keys() {
        groups.entry(dependency.lowercased_name()).or_default().push(dependency.clone());
    }

    for (name, group) in groups {
        if group.len() < 2 {
            continue;
        }
        let mut ranked: Vec<(Option<&VersionSpecifier>, &Dependency)> = group
            .iter()
            .map(|dependency| (root_dependencies.get(dependency), dependency))
            .collect();
        ranked.sort_by(|(left_spec, left), (right_spec, right)| {
            root_precedence(*right_spec)
                .cmp(&root_precedence(*left_spec))
                .then_with(|| left.cmp(right))
        });

        let ambiguous = ranked[0].0.is_none()
            || ranked.get(1).is_some_and(|(specifier, _)| specifier.is_some());
        if ambiguous {
            tracing::debug!(%name, members = group.len(), "ambiguous same-named dependencies");
            return Err(ResolverError::IncompatibleDependencies {
                dependencies: group.clone(),
            });
        }

        for (_, dependency) in &ranked[1..] {
            tracing::debug!(kept = %ranked[0].1, dropped = %dependency, "reconciled same-named dependency");
            resolved.remove(*dependency);
        }
    }
    Ok(resolved)
}

// No root requirement ranks below every specifier kind.
fn root_precedence(specifier: Option<&VersionSpecifier>) -> i16 {
    specifier.map_or(-1, |s| i16::from(s.precedence()))
}
