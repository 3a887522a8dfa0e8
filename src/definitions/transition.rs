//! Transition values and guard predicates.
//!
//! A transition is a directed edge between two steps, labelled by a command
//! and optionally gated by a [`Guard`]. Guards are pure predicates over an
//! immutable snapshot of the instance; a missing guard is equivalent to
//! always-true.

use std::fmt;
use std::sync::Arc;

use crate::actor::Actor;
use crate::state::{DataMap, InstanceSnapshot};

/// Predicate gating a transition.
///
/// Receives a non-aliasing snapshot of the instance, the command payload, and
/// the acting identity; returns whether the command may proceed.
///
/// Guards must be pure and non-blocking. If a guard needs external inputs,
/// the caller should pre-compute them and inject them into the payload.
/// A guard that panics is treated as having returned `false`.
///
/// # Examples
///
/// ```rust
/// use agendaflow::definitions::Guard;
/// use std::sync::Arc;
///
/// // Only allow the command when a review note was supplied.
/// let has_review_note: Guard = Arc::new(|_snapshot, payload, _actor| {
///     payload
///         .get("review_notes")
///         .and_then(|v| v.as_str())
///         .is_some_and(|s| !s.trim().is_empty())
/// });
/// ```
pub type Guard = Arc<dyn Fn(&InstanceSnapshot, &DataMap, &Actor) -> bool + Send + Sync>;

/// A directed, command-labelled edge between two steps.
#[derive(Clone)]
pub struct Transition {
    /// Step the command is valid from.
    pub from_step: String,
    /// Step the instance moves to on success.
    pub to_step: String,
    /// Command label matched against `apply_command` calls.
    pub command: String,
    /// Optional gate; `None` is always-true.
    pub guard: Option<Guard>,
}

impl Transition {
    /// An unguarded transition.
    pub fn new(
        from_step: impl Into<String>,
        to_step: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            from_step: from_step.into(),
            to_step: to_step.into(),
            command: command.into(),
            guard: None,
        }
    }

    /// A guarded transition.
    pub fn guarded(
        from_step: impl Into<String>,
        to_step: impl Into<String>,
        command: impl Into<String>,
        guard: Guard,
    ) -> Self {
        Self {
            from_step: from_step.into(),
            to_step: to_step.into(),
            command: command.into(),
            guard: Some(guard),
        }
    }

    /// `true` when this transition carries a guard.
    #[must_use]
    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("from_step", &self.from_step)
            .field("to_step", &self.to_step)
            .field("command", &self.command)
            .field("guard", &self.guard.as_ref().map(|_| "<guard>"))
            .finish()
    }
}
