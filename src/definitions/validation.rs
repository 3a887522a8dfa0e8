//! Static validation of workflow definitions.

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use thiserror::Error;

use super::WorkflowDefinition;

/// Static validation failure. The message details the offense.
#[derive(Debug, Error, Diagnostic)]
pub enum DefinitionError {
    #[error("invalid workflow definition: {message}")]
    #[diagnostic(
        code(agendaflow::definitions::invalid),
        help("Fix the definition structure before handing it to the engine.")
    )]
    Invalid { message: String },
}

impl DefinitionError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

impl WorkflowDefinition {
    /// Check the structural invariants of this definition.
    ///
    /// - at least one transition and at least one step;
    /// - `initial_step` is a member of `steps`;
    /// - every transition endpoint is a member of `steps`;
    /// - at most one transition per `(from_step, command)` pair.
    ///
    /// Validation is eager by convention: [`DefinitionBuilder`] and
    /// [`DefinitionRegistry`] both call this, and no engine operation may be
    /// invoked against a definition that was never validated.
    ///
    /// [`DefinitionBuilder`]: super::DefinitionBuilder
    /// [`DefinitionRegistry`]: super::DefinitionRegistry
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.transitions.is_empty() {
            return Err(DefinitionError::invalid(
                "a definition requires at least one transition",
            ));
        }
        if self.steps.is_empty() {
            return Err(DefinitionError::invalid(
                "a definition requires at least one step",
            ));
        }
        if !self.steps.contains(&self.initial_step) {
            return Err(DefinitionError::invalid(format!(
                "the initial step '{}' must exist in the set of steps",
                self.initial_step
            )));
        }
        for t in &self.transitions {
            if !self.steps.contains(&t.from_step) {
                return Err(DefinitionError::invalid(format!(
                    "transition '{}' starts from unknown step '{}'",
                    t.command, t.from_step
                )));
            }
            if !self.steps.contains(&t.to_step) {
                return Err(DefinitionError::invalid(format!(
                    "transition '{}' targets unknown step '{}'",
                    t.command, t.to_step
                )));
            }
        }
        let mut seen: FxHashSet<(&str, &str)> = FxHashSet::default();
        for t in &self.transitions {
            if !seen.insert((t.from_step.as_str(), t.command.as_str())) {
                return Err(DefinitionError::invalid(format!(
                    "duplicate transition for command '{}' from step '{}'",
                    t.command, t.from_step
                )));
            }
        }
        Ok(())
    }
}
