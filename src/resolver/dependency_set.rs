//! The partial assignment explored by the backtracking search.
//!
//! A [`DependencySet`] maps every package discovered so far to the candidate
//! versions still admissible for it, and remembers which packages are still
//! *unresolved* - holding more than one candidate, or not yet expanded into
//! their transitive requirements. The search advances by popping sub-sets:
//! committing the next unresolved package to its preferred candidate, either
//! in place (a single candidate leaves nothing to come back to) or in a
//! forked copy, leaving the receiver to hold the remaining candidates for a
//! later attempt.
//!
//! Sets are never shared: a fork is a value copy, and the only state crossing
//! fork boundaries is the retriever's monotonic caches. A rejection is
//! annotated on the set that discovered it and carried back to the nearest
//! fork; the first cause recorded along a branch is the one reported.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::{Dependency, ResolverError};
use crate::resolver::provider::Provider;
use crate::resolver::retriever::{ConcreteVersionedDependency, DependencyRetriever};
use crate::version::concrete::{ConcreteVersion, PinnedVersion};
use crate::version::specifier::VersionSpecifier;
use crate::version::version_set::{ConcreteVersionSet, SpecifierDefinition};

/// Outcome of [`DependencySet::pop_sub_set`].
pub(crate) enum PopOutcome<'a, P> {
    /// The set advanced in place: the next unresolved package had a single
    /// candidate, which is now pinned and expanded.
    Advanced,
    /// A forked child committed to the preferred candidate; the receiver
    /// keeps the remaining candidates for backtracking.
    Forked(DependencySet<'a, P>),
    /// No unresolved package with candidates remains.
    Exhausted,
}

/// A partial assignment of pinned versions to packages; see the module docs.
pub struct DependencySet<'a, P> {
    contents: BTreeMap<Dependency, ConcreteVersionSet>,
    unresolved: BTreeSet<Dependency>,
    /// `None` means every package is updatable.
    updatable_names: Option<BTreeSet<String>>,
    retriever: &'a DependencyRetriever<'a, P>,
    rejection: Option<ResolverError>,
}

impl<'a, P> Clone for DependencySet<'a, P> {
    fn clone(&self) -> Self {
        Self {
            contents: self.contents.clone(),
            unresolved: self.unresolved.clone(),
            updatable_names: self.updatable_names.clone(),
            retriever: self.retriever,
            rejection: self.rejection.clone(),
        }
    }
}

impl<'a, P: Provider> DependencySet<'a, P> {
    pub(crate) fn new(
        retriever: &'a DependencyRetriever<'a, P>,
        updatable_names: Option<BTreeSet<String>>,
    ) -> Self {
        Self {
            contents: BTreeMap::new(),
            unresolved: BTreeSet::new(),
            updatable_names,
            retriever,
            rejection: None,
        }
    }

    /// Mark the root packages as awaiting expansion.
    pub(crate) fn seed_unresolved(&mut self, dependencies: impl IntoIterator<Item = Dependency>) {
        self.unresolved.extend(dependencies);
    }

    /// Whether this set has recorded a rejection.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }

    /// The recorded rejection, if any.
    #[must_use]
    pub fn rejection(&self) -> Option<&ResolverError> {
        self.rejection.as_ref()
    }

    pub(crate) fn take_rejection(&mut self) -> Option<ResolverError> {
        self.rejection.take()
    }

    /// Whether every discovered package is pinned and expanded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// A complete, unrejected set is an accepted solution.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        !self.is_rejected() && self.is_complete()
    }

    /// The candidate sets of every discovered package.
    #[must_use]
    pub fn contents(&self) -> &BTreeMap<Dependency, ConcreteVersionSet> {
        &self.contents
    }

    /// The pinned projection: every package mapped to its preferred
    /// candidate's pin.
    #[must_use]
    pub fn resolved_map(&self) -> BTreeMap<Dependency, PinnedVersion> {
        self.contents
            .iter()
            .filter_map(|(dependency, set)| {
                set.first().map(|version| (dependency.clone(), version.pinned().clone()))
            })
            .collect()
    }

    pub(crate) fn unresolved_names(&self) -> Vec<String> {
        self.unresolved.iter().map(|d| d.name().to_string()).collect()
    }

    fn is_updatable(&self, dependency: &Dependency) -> bool {
        match &self.updatable_names {
            None => true,
            Some(names) => names.contains(&dependency.lowercased_name()),
        }
    }

    fn updatable_names_sorted(&self) -> Vec<String> {
        match &self.updatable_names {
            None => Vec::new(),
            Some(names) => names.iter().cloned().collect(),
        }
    }

    /// Annotate a rejection; an earlier cause is never overwritten.
    fn reject(&mut self, error: ResolverError) {
        if self.rejection.is_none() {
            tracing::debug!(%error, "rejecting dependency set");
            self.rejection = Some(error);
        }
    }

    fn rejected_copy(&self, error: ResolverError) -> Self {
        Self {
            contents: BTreeMap::new(),
            unresolved: BTreeSet::new(),
            updatable_names: self.updatable_names.clone(),
            retriever: self.retriever,
            rejection: Some(error),
        }
    }

    /// Impose a batch of requirements, short-circuiting on the first
    /// rejection. `parent` is the pinned package that declared them, or
    /// `None` for the root list.
    ///
    /// When `force_updatable` is set (the parent itself was updatable), every
    /// named child becomes updatable too.
    ///
    /// Returns `Ok(false)` when the set rejected; hard provider failures
    /// propagate as errors.
    pub(crate) async fn expand(
        &mut self,
        parent: Option<&ConcreteVersionedDependency>,
        requirements: &[(Dependency, VersionSpecifier)],
        force_updatable: bool,
    ) -> Result<bool, ResolverError> {
        for (child, specifier) in requirements {
            let updatable = force_updatable || self.is_updatable(child);
            if force_updatable && let Some(names) = &mut self.updatable_names {
                names.insert(child.lowercased_name());
            }
            let definition = match parent {
                Some(parent) => {
                    SpecifierDefinition::imposed_by(parent.dependency().clone(), specifier.clone())
                }
                None => SpecifierDefinition::root(specifier.clone()),
            };
            if !self.process(child, definition, parent, updatable).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Impose one requirement on one package.
    ///
    /// A package seen for the first time gets its candidate set from the
    /// retriever. A package that was carried over as a locked pin is
    /// re-queried once it is updatable *and* the pin fails the incoming
    /// requirement - a satisfied pin stays put. Otherwise the existing set is
    /// narrowed, and an emptied set is a conflict: the first recorded
    /// requirement disjoint with the new one names the other party, and the
    /// conflict is memoized in the retriever.
    async fn process(
        &mut self,
        child: &Dependency,
        definition: SpecifierDefinition,
        parent: Option<&ConcreteVersionedDependency>,
        updatable: bool,
    ) -> Result<bool, ResolverError> {
        let requery = match self.contents.get(child) {
            None => true,
            Some(set) => {
                updatable
                    && set.pinned_version_specifier().is_some()
                    && !set.first().is_some_and(|pin| definition.specifier.is_satisfied_by(pin))
            }
        };

        if !requery && let Some(set) = self.contents.get_mut(child) {
            set.add_definition(definition.clone());
            if set.retain_versions_compatible_with(&definition.specifier) {
                return Ok(true);
            }
            let existing = set.conflicting_definition(&definition.specifier).cloned();
            return Ok(self.reject_narrowed_to_empty(child, definition, parent, existing));
        }

        let mut set = match self
            .retriever
            .find_all_versions(child, &definition.specifier, updatable)
            .await
        {
            Ok(set) => set,
            Err(error @ ResolverError::RequiredVersionNotFound { .. }) => {
                self.retriever.add_problematic(child);
                self.reject(error);
                return Ok(false);
            }
            Err(other) => return Err(other),
        };

        // Requirements imposed before a re-query still bind.
        if let Some(previous) = self.contents.get(child) {
            for earlier in previous.definitions() {
                set.add_definition(earlier.clone());
                set.retain_versions_compatible_with(&earlier.specifier);
            }
        }
        set.add_definition(definition.clone());
        if set.is_empty() {
            let existing = set.conflicting_definition(&definition.specifier).cloned();
            return Ok(self.reject_narrowed_to_empty(child, definition, parent, existing));
        }

        self.contents.insert(child.clone(), set);
        self.unresolved.insert(child.clone());
        Ok(true)
    }

    fn reject_narrowed_to_empty(
        &mut self,
        child: &Dependency,
        latest: SpecifierDefinition,
        parent: Option<&ConcreteVersionedDependency>,
        existing: Option<SpecifierDefinition>,
    ) -> bool {
        self.retriever.add_problematic(child);
        let error = match existing {
            Some(existing) => {
                let error = ResolverError::IncompatibleRequirements {
                    dependency: child.clone(),
                    existing: existing.clone(),
                    conflicting: latest,
                };
                self.record_conflict(parent, existing.defining_dependency.as_ref(), &error);
                error
            }
            // No single prior requirement explains the empty set: three or
            // more parties conflict jointly.
            None => ResolverError::UnsatisfiableDependencyList {
                names: self.updatable_names_sorted(),
            },
        };
        self.reject(error);
        false
    }

    // Memoize a discovered conflict. Pairwise entries need both pins; the
    // older party's pin is only recorded when its set is already a
    // singleton.
    fn record_conflict(
        &self,
        new_side: Option<&ConcreteVersionedDependency>,
        old_side: Option<&Dependency>,
        error: &ResolverError,
    ) {
        match (new_side, old_side) {
            (Some(new_side), Some(old_side)) => {
                if let Some(old_pin) = self.single_pin(old_side) {
                    self.retriever.add_pairwise_conflict(
                        new_side.clone(),
                        ConcreteVersionedDependency::new(old_side.clone(), old_pin),
                        error,
                    );
                }
            }
            (Some(new_side), None) => {
                self.retriever.add_root_conflict(new_side.clone(), error.clone());
            }
            (None, Some(old_side)) => {
                if let Some(old_pin) = self.single_pin(old_side) {
                    self.retriever.add_root_conflict(
                        ConcreteVersionedDependency::new(old_side.clone(), old_pin),
                        error.clone(),
                    );
                }
            }
            (None, None) => {}
        }
    }

    fn single_pin(&self, dependency: &Dependency) -> Option<PinnedVersion> {
        let set = self.contents.get(dependency)?;
        if set.len() == 1 {
            set.first().map(|version| version.pinned().clone())
        } else {
            None
        }
    }

    /// The next unresolved package: a known troublemaker when one is
    /// unresolved, otherwise the first in name order.
    fn next_unresolved(&self) -> Option<Dependency> {
        self.retriever
            .problematic_dependencies()
            .into_iter()
            .find(|dependency| self.unresolved.contains(dependency))
            .or_else(|| self.unresolved.first().cloned())
    }

    fn remove_version(&mut self, dependency: &Dependency, pinned: &PinnedVersion) {
        if let Some(set) = self.contents.get_mut(dependency) {
            set.remove(pinned);
        }
    }

    fn pin_version(&mut self, dependency: &Dependency, version: &ConcreteVersion) {
        if let Some(set) = self.contents.get_mut(dependency) {
            set.remove_all_except(version);
        }
    }

    // Apply a memoized pairwise conflict: the candidates the chosen pin is
    // known to clash with cannot stay in this branch.
    fn remove_conflicting_versions(
        &mut self,
        conflicting: &BTreeSet<ConcreteVersionedDependency>,
        error: &ResolverError,
    ) {
        for other in conflicting {
            if let Some(set) = self.contents.get_mut(other.dependency()) {
                set.remove(other.pinned());
                if set.is_empty() {
                    self.reject(error.clone());
                    return;
                }
            }
        }
    }

    /// Commit the next unresolved package to its preferred candidate.
    ///
    /// - A candidate with a memoized root-level conflict is removed from the
    ///   receiver up front; the returned child is a rejected stub replaying
    ///   the cached error.
    /// - With several candidates, the child is a fork collapsed to the
    ///   choice and the receiver drops it; with exactly one, the receiver
    ///   itself advances.
    /// - Memoized pairwise conflicts prune the child before its transitive
    ///   requirements are expanded.
    pub(crate) async fn pop_sub_set(&mut self) -> Result<PopOutcome<'a, P>, ResolverError> {
        if self.is_rejected() {
            return Ok(PopOutcome::Exhausted);
        }
        let Some(dependency) = self.next_unresolved() else {
            return Ok(PopOutcome::Exhausted);
        };
        let Some(version) =
            self.contents.get(&dependency).and_then(ConcreteVersionSet::first).cloned()
        else {
            return Ok(PopOutcome::Exhausted);
        };
        let versioned =
            ConcreteVersionedDependency::new(dependency.clone(), version.pinned().clone());
        let cached = self.retriever.cached_conflict(&versioned);

        if let Some(conflict) = &cached
            && conflict.conflicting.is_none()
        {
            tracing::debug!(candidate = %versioned, "skipping candidate doomed by root conflict");
            self.remove_version(&dependency, version.pinned());
            return Ok(PopOutcome::Forked(self.rejected_copy(conflict.error.clone())));
        }

        let candidate_count = self.contents.get(&dependency).map_or(0, ConcreteVersionSet::len);
        let mut fork = if candidate_count > 1 {
            tracing::trace!(candidate = %versioned, remaining = candidate_count - 1, "forking");
            let mut child = self.clone();
            child.pin_version(&dependency, &version);
            self.remove_version(&dependency, version.pinned());
            Some(child)
        } else {
            None
        };

        let target = match fork.as_mut() {
            Some(child) => child,
            None => &mut *self,
        };

        if let Some(conflict) = &cached
            && let Some(conflicting) = &conflict.conflicting
        {
            target.remove_conflicting_versions(conflicting, &conflict.error);
        }

        if !target.is_rejected() {
            let requirements = target.retriever.find_dependencies(&versioned).await?;
            let force_updatable = target.is_updatable(&dependency);
            if target.expand(Some(&versioned), &requirements, force_updatable).await? {
                target.unresolved.remove(&dependency);
            }
        }

        Ok(match fork {
            Some(child) => PopOutcome::Forked(child),
            None => PopOutcome::Advanced,
        })
    }
}
