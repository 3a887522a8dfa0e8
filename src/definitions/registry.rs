//! Name-keyed registry of validated definitions.
//!
//! Persisted instances reference their definition by name only; the registry
//! is the resolution point when a repository rehydrates an instance.

use std::sync::{Arc, PoisonError, RwLock};

use rustc_hash::FxHashMap;

use super::validation::DefinitionError;
use super::WorkflowDefinition;

/// Shared, thread-safe map from definition name to validated definition.
///
/// Registration validates eagerly; a definition that fails validation never
/// enters the registry. Re-registering a name replaces the previous entry
/// (last registered wins), which is how definition upgrades roll out.
///
/// # Examples
///
/// ```rust
/// use agendaflow::definitions::{DefinitionBuilder, DefinitionRegistry};
///
/// let registry = DefinitionRegistry::new();
/// let def = DefinitionBuilder::new("triage_flow")
///     .initial_step("open")
///     .transition("open", "closed", "close")
///     .build()
///     .unwrap();
///
/// registry.register(def).unwrap();
/// assert!(registry.resolve("triage_flow").is_some());
/// assert!(registry.resolve("unknown").is_none());
/// ```
#[derive(Default)]
pub struct DefinitionRegistry {
    inner: RwLock<FxHashMap<String, Arc<WorkflowDefinition>>>,
}

impl DefinitionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a definition under its name.
    ///
    /// Returns the shared handle now stored in the registry.
    ///
    /// # Errors
    ///
    /// [`DefinitionError::Invalid`] when validation fails; the registry is
    /// unchanged in that case.
    pub fn register(
        &self,
        definition: WorkflowDefinition,
    ) -> Result<Arc<WorkflowDefinition>, DefinitionError> {
        definition.validate()?;
        let definition = Arc::new(definition);
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(definition.name.clone(), Arc::clone(&definition));
        Ok(definition)
    }

    /// Register an already-shared definition (validates it first).
    pub fn register_shared(
        &self,
        definition: Arc<WorkflowDefinition>,
    ) -> Result<(), DefinitionError> {
        definition.validate()?;
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Look up a definition by name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Arc<WorkflowDefinition>> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(name).cloned()
    }

    /// Names of all registered definitions, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = map.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for DefinitionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionRegistry")
            .field("names", &self.names())
            .finish()
    }
}
