//! History event taxonomy.
//!
//! Every successful engine operation appends exactly one [`HistoryEvent`] to
//! the owning instance. The set of variants is closed but additive-only
//! across versions; consumers deserializing persisted history must tolerate
//! new variants appearing in future releases. No event is ever removed from
//! or mutated in a history.
//!
//! Events carry a UTC timestamp stamped at construction from the instance
//! clock, which is monotonically non-decreasing per process (see
//! [`crate::utils::clock`]). Within one instance, history order and timestamp
//! order agree.
//!
//! # Persisted form
//!
//! Events serialize with a `kind` discriminator:
//!
//! ```json
//! {
//!   "kind": "command_applied",
//!   "at": "2026-03-01T10:30:00Z",
//!   "from_step": "initial_request",
//!   "to_step": "triage",
//!   "command": "start_triage",
//!   "actor": {"name": "alice"},
//!   "payload": {"notes": "n1"}
//! }
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::Actor;
use crate::checkpoint::Checkpoint;
use crate::state::DataMap;

/// Which way a checkpoint restore moved through the checkpoint sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreDirection {
    /// Restored to the checkpoint preceding the current position.
    Rollback,
    /// Restored to the checkpoint following the current position.
    Rollforward,
}

impl fmt::Display for RestoreDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rollback => write!(f, "rollback"),
            Self::Rollforward => write!(f, "rollforward"),
        }
    }
}

/// An immutable audit record appended on every successful engine operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryEvent {
    /// A command was successfully applied, causing a step transition.
    CommandApplied {
        at: DateTime<Utc>,
        from_step: String,
        to_step: String,
        command: String,
        actor: Actor,
        /// The payload exactly as supplied by the caller.
        payload: DataMap,
    },
    /// A snapshot of the instance state was saved.
    CheckpointSaved {
        at: DateTime<Utc>,
        checkpoint: Checkpoint,
        actor: Actor,
    },
    /// The instance was restored to a previously saved checkpoint.
    StateRestored {
        at: DateTime<Utc>,
        checkpoint_id: Uuid,
        actor: Actor,
        direction: RestoreDirection,
    },
}

impl HistoryEvent {
    /// Timestamp stamped when the event was constructed.
    #[must_use]
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::CommandApplied { at, .. }
            | Self::CheckpointSaved { at, .. }
            | Self::StateRestored { at, .. } => *at,
        }
    }

    /// The actor the operation was attributed to.
    #[must_use]
    pub fn actor(&self) -> &Actor {
        match self {
            Self::CommandApplied { actor, .. }
            | Self::CheckpointSaved { actor, .. }
            | Self::StateRestored { actor, .. } => actor,
        }
    }

    /// The persisted discriminator label for this variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CommandApplied { .. } => "command_applied",
            Self::CheckpointSaved { .. } => "checkpoint_saved",
            Self::StateRestored { .. } => "state_restored",
        }
    }
}

impl fmt::Display for HistoryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandApplied {
                from_step,
                to_step,
                command,
                actor,
                ..
            } => write!(f, "{actor} applied '{command}': {from_step} -> {to_step}"),
            Self::CheckpointSaved {
                checkpoint, actor, ..
            } => write!(f, "{actor} saved checkpoint '{}'", checkpoint.label),
            Self::StateRestored {
                checkpoint_id,
                actor,
                direction,
                ..
            } => write!(f, "{actor} {direction} to checkpoint {checkpoint_id}"),
        }
    }
}
