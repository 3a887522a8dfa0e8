//! Checkpoint values: labelled, immutable snapshots of instance state.
//!
//! A [`Checkpoint`] captures `(step, data)` at a point in time, under a
//! caller-supplied label. The data is deep-cloned at creation, so later
//! mutations to the live instance never show through a stored checkpoint.
//! Checkpoints are created exclusively by
//! [`WorkflowInstance::save_checkpoint`](crate::instance::WorkflowInstance::save_checkpoint)
//! and restored by `rollback`/`rollforward`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::DataMap;

/// A durable snapshot of instance state at the moment it was saved.
///
/// The `id` is collision-resistant (UUID by default) and unique within an
/// instance. `created_at` orders checkpoints for rollback/rollforward
/// navigation; insertion order is preserved in storage but retrieval sorts by
/// creation time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: Uuid,
    /// User-friendly name for this checkpoint ("before chair review").
    pub label: String,
    /// Step the instance was on when the checkpoint was saved.
    pub step: String,
    /// Deep clone of the instance data at save time.
    pub data: DataMap,
    pub created_at: DateTime<Utc>,
}
