//! Workflow definitions: the immutable blueprints instances execute.
//!
//! A [`WorkflowDefinition`] is pure structure: a set of steps, an initial
//! step, and an ordered list of command-labelled [`Transition`]s, optionally
//! gated by [`Guard`] predicates. It contains no per-subject data and is
//! freely shareable across instances and threads behind an `Arc`.
//!
//! Definitions are built with the fluent [`DefinitionBuilder`] (which
//! validates on `build`) or constructed literally and validated explicitly
//! with [`WorkflowDefinition::validate`]. Engine operations assume a
//! validated definition; running one that was never validated is a
//! programmer error.
//!
//! # Quick Start
//!
//! ```rust
//! use agendaflow::definitions::DefinitionBuilder;
//!
//! let triage = DefinitionBuilder::new("triage_flow")
//!     .initial_step("initial_request")
//!     .transition("initial_request", "triage", "start_triage")
//!     .transition("triage", "completed", "complete")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(triage.commands(), vec!["start_triage", "complete"]);
//! assert!(triage.find_transition("triage", "complete").is_some());
//! assert!(triage.find_transition("triage", "start_triage").is_none());
//! ```

pub mod builder;
pub mod catalog;
pub mod registry;
pub mod transition;
mod validation;

pub use builder::DefinitionBuilder;
pub use registry::DefinitionRegistry;
pub use transition::{Guard, Transition};
pub use validation::DefinitionError;

use rustc_hash::FxHashSet;

/// A static blueprint for a process: which commands move it forward, how the
/// steps connect, and what guards must be satisfied prior to each move.
///
/// Contains no data, just structure.
#[derive(Clone, Debug)]
pub struct WorkflowDefinition {
    /// Identifier; instances reference definitions by this name when
    /// persisted.
    pub name: String,
    /// Step new instances start on. Must be a member of `steps`.
    pub initial_step: String,
    /// The full step vocabulary.
    pub steps: FxHashSet<String>,
    /// Declaration-ordered transitions.
    pub transitions: Vec<Transition>,
}

impl WorkflowDefinition {
    /// All declared command labels, in declaration order.
    ///
    /// Duplicates may occur across distinct from-steps; this is the multiset,
    /// not the set.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.transitions.iter().map(|t| t.command.clone()).collect()
    }

    /// Multi-line `command: from_step -> to_step` rendering for diagnostics.
    ///
    /// ```rust
    /// # use agendaflow::definitions::DefinitionBuilder;
    /// let def = DefinitionBuilder::new("demo")
    ///     .initial_step("a")
    ///     .transition("a", "b", "go")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(def.commands_pretty(), "go: a -> b");
    /// ```
    #[must_use]
    pub fn commands_pretty(&self) -> String {
        self.transitions
            .iter()
            .map(|t| format!("{}: {} -> {}", t.command, t.from_step, t.to_step))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Find the transition for `command` out of `step`.
    ///
    /// Returns the first match in declaration order. On a validated
    /// definition at most one match exists; the declared-order rule is only
    /// observable on definitions that skipped validation.
    #[must_use]
    pub fn find_transition(&self, step: &str, command: &str) -> Option<&Transition> {
        self.transitions
            .iter()
            .find(|t| t.from_step == step && t.command == command)
    }
}
