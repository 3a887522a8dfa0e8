//! Fluent construction of workflow definitions.

use rustc_hash::FxHashSet;

use super::transition::{Guard, Transition};
use super::validation::DefinitionError;
use super::WorkflowDefinition;

/// Builder for [`WorkflowDefinition`] with a fluent API.
///
/// Steps referenced by `initial_step` and by transitions are registered
/// automatically; [`step`](Self::step) exists for steps that appear in no
/// transition yet (legal during iterative design; validation will
/// still require at least one transition overall).
///
/// `build` validates eagerly and returns the frozen definition.
///
/// # Examples
///
/// ```rust
/// use agendaflow::definitions::DefinitionBuilder;
/// use std::sync::Arc;
///
/// let def = DefinitionBuilder::new("external_request")
///     .initial_step("pending")
///     .transition("pending", "rejected", "reject")
///     .guarded_transition(
///         "pending",
///         "approved",
///         "approve",
///         Arc::new(|_snap, payload, _actor| payload.contains_key("review_notes")),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(def.steps.len(), 3);
/// assert!(def.find_transition("pending", "approve").unwrap().is_guarded());
/// ```
#[derive(Debug, Default)]
pub struct DefinitionBuilder {
    name: String,
    initial_step: Option<String>,
    steps: FxHashSet<String>,
    transitions: Vec<Transition>,
}

impl DefinitionBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the step new instances start on. Registered as a step.
    #[must_use]
    pub fn initial_step(mut self, step: impl Into<String>) -> Self {
        let step = step.into();
        self.steps.insert(step.clone());
        self.initial_step = Some(step);
        self
    }

    /// Register a step that no transition mentions yet.
    #[must_use]
    pub fn step(mut self, step: impl Into<String>) -> Self {
        self.steps.insert(step.into());
        self
    }

    /// Add an unguarded transition. Both endpoints are registered as steps.
    #[must_use]
    pub fn transition(
        mut self,
        from_step: impl Into<String>,
        to_step: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        let t = Transition::new(from_step, to_step, command);
        self.steps.insert(t.from_step.clone());
        self.steps.insert(t.to_step.clone());
        self.transitions.push(t);
        self
    }

    /// Add a guarded transition. Both endpoints are registered as steps.
    #[must_use]
    pub fn guarded_transition(
        mut self,
        from_step: impl Into<String>,
        to_step: impl Into<String>,
        command: impl Into<String>,
        guard: Guard,
    ) -> Self {
        let t = Transition::guarded(from_step, to_step, command, guard);
        self.steps.insert(t.from_step.clone());
        self.steps.insert(t.to_step.clone());
        self.transitions.push(t);
        self
    }

    /// Freeze and validate the definition.
    ///
    /// # Errors
    ///
    /// [`DefinitionError::Invalid`] when the structural invariants do not
    /// hold (no transitions, no steps, initial step missing, dangling
    /// endpoints, duplicate `(from_step, command)` pairs).
    pub fn build(self) -> Result<WorkflowDefinition, DefinitionError> {
        let definition = WorkflowDefinition {
            name: self.name,
            initial_step: self.initial_step.unwrap_or_default(),
            steps: self.steps,
            transitions: self.transitions,
        };
        definition.validate()?;
        Ok(definition)
    }
}
