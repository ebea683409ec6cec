//! Deterministic provider fakes for resolver tests.
//!
//! [`InMemoryProvider`] records version lists, transitive requirement lists,
//! and git-reference resolutions up front, then serves them without I/O.
//! Every callback is logged, so tests can assert not just what was resolved
//! but which questions the resolver actually asked (for example, that a
//! pinned package's version list was never fetched during a partial update).

use anyhow::anyhow;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::core::Dependency;
use crate::resolver::Provider;
use crate::version::concrete::PinnedVersion;
use crate::version::specifier::VersionSpecifier;

/// In-memory [`Provider`] with builder-style recording.
///
/// Version lists must be recorded explicitly - asking for an unrecorded
/// package is a provider error, which makes tests fail loudly when the
/// resolver fetches something it should not. Transitive requirement lists
/// default to empty, so leaf packages need no recording.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    versions: HashMap<Dependency, Vec<PinnedVersion>>,
    transitive: HashMap<(Dependency, PinnedVersion), Vec<(Dependency, VersionSpecifier)>>,
    git_references: HashMap<(Dependency, String), Vec<PinnedVersion>>,
    version_calls: Mutex<Vec<Dependency>>,
    transitive_calls: Mutex<Vec<(Dependency, PinnedVersion)>>,
}

impl InMemoryProvider {
    /// An empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the version list of a package.
    #[must_use]
    pub fn with_versions(mut self, dependency: Dependency, versions: &[&str]) -> Self {
        self.versions
            .insert(dependency, versions.iter().map(|v| PinnedVersion::new(*v)).collect());
        self
    }

    /// Record the requirements declared by one version of a package.
    #[must_use]
    pub fn with_dependencies(
        mut self,
        dependency: Dependency,
        version: &str,
        requirements: Vec<(Dependency, VersionSpecifier)>,
    ) -> Self {
        self.transitive.insert((dependency, PinnedVersion::new(version)), requirements);
        self
    }

    /// Record the pins a symbolic reference resolves to.
    #[must_use]
    pub fn with_git_reference(
        mut self,
        dependency: Dependency,
        reference: &str,
        pins: &[&str],
    ) -> Self {
        self.git_references.insert(
            (dependency, reference.to_string()),
            pins.iter().map(|p| PinnedVersion::new(*p)).collect(),
        );
        self
    }

    /// Every package whose version list was fetched, in call order.
    pub fn version_list_calls(&self) -> Vec<Dependency> {
        self.version_calls.lock().unwrap().clone()
    }

    /// Every `(package, pin)` whose requirements were fetched, in call order.
    pub fn transitive_calls(&self) -> Vec<(Dependency, PinnedVersion)> {
        self.transitive_calls.lock().unwrap().clone()
    }
}

impl Provider for InMemoryProvider {
    async fn list_versions(&self, dependency: &Dependency) -> anyhow::Result<Vec<PinnedVersion>> {
        self.version_calls.lock().unwrap().push(dependency.clone());
        self.versions
            .get(dependency)
            .cloned()
            .ok_or_else(|| anyhow!("no versions recorded for {dependency}"))
    }

    async fn list_transitive_dependencies(
        &self,
        dependency: &Dependency,
        version: &PinnedVersion,
    ) -> anyhow::Result<Vec<(Dependency, VersionSpecifier)>> {
        self.transitive_calls.lock().unwrap().push((dependency.clone(), version.clone()));
        Ok(self
            .transitive
            .get(&(dependency.clone(), version.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn resolve_git_reference(
        &self,
        dependency: &Dependency,
        reference: &str,
    ) -> anyhow::Result<Vec<PinnedVersion>> {
        self.git_references
            .get(&(dependency.clone(), reference.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("no pins recorded for {dependency} at reference '{reference}'"))
    }
}
