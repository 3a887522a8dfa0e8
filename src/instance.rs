//! Workflow instances: live executions of a definition against one subject.
//!
//! A [`WorkflowInstance`] holds the mutable state of one workflow run: the
//! step it is currently on, the data collected so far, an append-only history
//! of everything that happened, the checkpoints saved along the way, and the
//! *active checkpoint* pointer that records whether the instance currently
//! sits on a saved snapshot or on live, diverged state.
//!
//! Instances are the unit of serial mutation. They are not shareable across
//! threads; callers (typically a repository) serialize `load -> mutate ->
//! save`. The definition they execute is immutable and freely shared.
//!
//! # Operations
//!
//! - [`apply_command`](WorkflowInstance::apply_command): move along a
//!   transition, merging the payload into the data bag atomically.
//! - [`save_checkpoint`](WorkflowInstance::save_checkpoint): snapshot
//!   `(step, data)` under a label.
//! - [`rollback`](WorkflowInstance::rollback) /
//!   [`rollforward`](WorkflowInstance::rollforward): navigate the
//!   checkpoint sequence in creation-time order.
//!
//! Every operation either completes fully or leaves the instance untouched;
//! next state is computed off to the side and committed at the end.
//!
//! # Quick Start
//!
//! ```rust
//! use agendaflow::actor::Actor;
//! use agendaflow::definitions::DefinitionBuilder;
//! use agendaflow::instance::WorkflowInstance;
//! use agendaflow::state::DataMap;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let definition = Arc::new(
//!     DefinitionBuilder::new("triage_flow")
//!         .initial_step("initial_request")
//!         .transition("initial_request", "triage", "start_triage")
//!         .transition("triage", "completed", "complete")
//!         .build()
//!         .unwrap(),
//! );
//!
//! let mut instance = WorkflowInstance::new("req-7", Arc::clone(&definition));
//! let alice = Actor::new("alice");
//!
//! let mut payload = DataMap::default();
//! payload.insert("notes".into(), json!("looks fine"));
//! instance.apply_command("start_triage", payload, &alice).unwrap();
//!
//! assert_eq!(instance.current_step(), "triage");
//! assert_eq!(instance.history().len(), 1);
//! assert!(instance.is_live());
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;
use uuid::Uuid;

use crate::actor::Actor;
use crate::checkpoint::Checkpoint;
use crate::definitions::WorkflowDefinition;
use crate::events::{HistoryEvent, RestoreDirection};
use crate::state::{merge_payload, DataMap, InstanceSnapshot};
use crate::subjects::SubjectRef;
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::ids::{IdSource, UuidIdSource};

/// Failures of instance operations.
///
/// All failures surface before any state mutation; a failed operation leaves
/// the instance bitwise identical to its pre-call state.
#[derive(Debug, Error, Diagnostic)]
pub enum InstanceError {
    /// No transition exists for the current step and command.
    #[error("invalid command '{command}' for step '{current_step}'")]
    #[diagnostic(
        code(agendaflow::instance::invalid_transition),
        help("`WorkflowDefinition::commands_pretty` lists the commands available from each step.")
    )]
    InvalidTransition {
        command: String,
        current_step: String,
    },

    /// The transition's guard returned false or panicked.
    #[error("guard rejected command '{command}' at step '{current_step}'")]
    #[diagnostic(
        code(agendaflow::instance::guard_failed),
        help("The guard predicate vetoed the command; the instance is unchanged.")
    )]
    GuardFailed {
        command: String,
        current_step: String,
    },

    /// Rollback or rollforward cannot proceed from the current position.
    #[error("no available checkpoint: {reason}")]
    #[diagnostic(code(agendaflow::instance::no_available_checkpoint))]
    NoAvailableCheckpoint { reason: String },

    /// Internal consistency violation: a bug or persistence corruption.
    /// Non-recoverable; quarantine the instance.
    #[error("corrupted instance state: {message}")]
    #[diagnostic(
        code(agendaflow::instance::corrupted_state),
        help("The instance references state that does not exist; restore from a trusted copy.")
    )]
    CorruptedState { message: String },
}

fn no_available(reason: &str) -> InstanceError {
    InstanceError::NoAvailableCheckpoint {
        reason: reason.to_string(),
    }
}

/// A single execution of a workflow definition for a specific subject, e.g.
/// one agenda item moving through review.
///
/// Constructed with [`WorkflowInstance::new`] or the
/// [`builder`](WorkflowInstance::builder); starts on the definition's initial
/// step with empty history and checkpoints, live (no active checkpoint).
#[derive(Clone)]
pub struct WorkflowInstance {
    id: Uuid,
    name: String,
    definition: Arc<WorkflowDefinition>,
    subject: Option<SubjectRef>,
    current_step: String,
    data: DataMap,
    history: Vec<HistoryEvent>,
    checkpoints: Vec<Checkpoint>,
    active_checkpoint_id: Option<Uuid>,
    revision: u64,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
}

impl WorkflowInstance {
    /// A fresh instance on the definition's initial step, with the default
    /// clock and id source and an empty data bag.
    #[must_use]
    pub fn new(name: impl Into<String>, definition: Arc<WorkflowDefinition>) -> Self {
        Self::builder(name, definition).build()
    }

    /// Builder for instances needing initial data, a subject binding, or
    /// injected clock/id ports.
    #[must_use]
    pub fn builder(name: impl Into<String>, definition: Arc<WorkflowDefinition>) -> InstanceBuilder {
        InstanceBuilder {
            name: name.into(),
            definition,
            subject: None,
            data: DataMap::default(),
            clock: None,
            ids: None,
        }
    }

    pub(crate) fn from_parts(parts: InstanceParts) -> Self {
        Self {
            id: parts.id,
            name: parts.name,
            definition: parts.definition,
            subject: parts.subject,
            current_step: parts.current_step,
            data: parts.data,
            history: parts.history,
            checkpoints: parts.checkpoints,
            active_checkpoint_id: parts.active_checkpoint_id,
            revision: parts.revision,
            clock: parts.clock,
            ids: parts.ids,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn definition(&self) -> &Arc<WorkflowDefinition> {
        &self.definition
    }

    #[must_use]
    pub fn subject(&self) -> Option<&SubjectRef> {
        self.subject.as_ref()
    }

    #[must_use]
    pub fn current_step(&self) -> &str {
        &self.current_step
    }

    #[must_use]
    pub fn data(&self) -> &DataMap {
        &self.data
    }

    /// Append-only event history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[HistoryEvent] {
        &self.history
    }

    /// Saved checkpoints in insertion order.
    #[must_use]
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// The checkpoint the instance currently sits on, or `None` when live.
    #[must_use]
    pub fn active_checkpoint_id(&self) -> Option<Uuid> {
        self.active_checkpoint_id
    }

    /// `true` when the instance state does not coincide with any saved
    /// checkpoint.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.active_checkpoint_id.is_none()
    }

    /// Optimistic-concurrency tag managed by repositories. Zero for an
    /// instance that was never persisted.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Overwrite the concurrency tag. For repository implementations only;
    /// called after a successful save with the newly stored revision.
    pub fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    /// A non-aliasing point-in-time view of this instance, as handed to
    /// guard predicates.
    #[must_use]
    pub fn snapshot(&self) -> InstanceSnapshot {
        InstanceSnapshot {
            instance_id: self.id,
            name: self.name.clone(),
            current_step: self.current_step.clone(),
            data: self.data.clone(),
            checkpoint_count: self.checkpoints.len(),
            active_checkpoint_id: self.active_checkpoint_id,
        }
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Apply `command` with `payload`, attributed to `actor`.
    ///
    /// Looks up the transition for `(current_step, command)`, evaluates its
    /// guard against an immutable snapshot, then atomically merges the
    /// payload into the data bag (shallow, payload wins), moves to the
    /// target step, appends a `CommandApplied` event, and clears the active
    /// checkpoint pointer: a successful command always leaves the instance
    /// live.
    ///
    /// # Errors
    ///
    /// - [`InstanceError::InvalidTransition`] when no transition matches.
    /// - [`InstanceError::GuardFailed`] when the guard returns false or
    ///   panics. The panic is contained; it never propagates.
    pub fn apply_command(
        &mut self,
        command: &str,
        payload: DataMap,
        actor: &Actor,
    ) -> Result<(), InstanceError> {
        let definition = Arc::clone(&self.definition);
        let transition = definition
            .find_transition(&self.current_step, command)
            .ok_or_else(|| InstanceError::InvalidTransition {
                command: command.to_string(),
                current_step: self.current_step.clone(),
            })?;

        if let Some(guard) = &transition.guard {
            let snapshot = self.snapshot();
            let verdict = catch_unwind(AssertUnwindSafe(|| guard(&snapshot, &payload, actor)))
                .unwrap_or_else(|_| {
                    tracing::warn!(
                        instance_id = %self.id,
                        command,
                        step = %self.current_step,
                        "guard panicked; treating as rejection"
                    );
                    false
                });
            if !verdict {
                return Err(InstanceError::GuardFailed {
                    command: command.to_string(),
                    current_step: self.current_step.clone(),
                });
            }
        }

        let from_step = std::mem::replace(&mut self.current_step, transition.to_step.clone());
        merge_payload(&mut self.data, &payload);
        self.history.push(HistoryEvent::CommandApplied {
            at: self.clock.now(),
            from_step,
            to_step: transition.to_step.clone(),
            command: command.to_string(),
            actor: actor.clone(),
            payload,
        });
        self.active_checkpoint_id = None;

        tracing::debug!(
            instance_id = %self.id,
            command,
            to_step = %self.current_step,
            "command applied"
        );
        Ok(())
    }

    /// Snapshot the current `(step, data)` under `label`.
    ///
    /// The data is deep-cloned: later mutations of the live bag never show
    /// through the stored checkpoint. The new checkpoint becomes the active
    /// one, even when saving repeatedly without intervening commands.
    pub fn save_checkpoint(&mut self, label: &str, actor: &Actor) -> Checkpoint {
        let now = self.clock.now();
        let checkpoint = Checkpoint {
            id: self.ids.next_id(),
            label: label.to_string(),
            step: self.current_step.clone(),
            data: self.data.clone(),
            created_at: now,
        };
        self.checkpoints.push(checkpoint.clone());
        self.active_checkpoint_id = Some(checkpoint.id);
        self.history.push(HistoryEvent::CheckpointSaved {
            at: now,
            checkpoint: checkpoint.clone(),
            actor: actor.clone(),
        });
        checkpoint
    }

    /// Restore the checkpoint preceding the current position.
    ///
    /// Positions are ordered by checkpoint creation time. A live instance
    /// rolls back to its latest checkpoint; an instance on a checkpoint
    /// rolls back to the one before it.
    ///
    /// # Errors
    ///
    /// - [`InstanceError::NoAvailableCheckpoint`] with reason
    ///   `"no checkpoints exist"` or `"already at earliest"`.
    /// - [`InstanceError::CorruptedState`] when the active pointer
    ///   references a checkpoint that is not stored.
    pub fn rollback(&mut self, actor: &Actor) -> Result<(), InstanceError> {
        let sorted = self.sorted_checkpoints();
        if sorted.is_empty() {
            return Err(no_available("no checkpoints exist"));
        }
        let position = match self.active_checkpoint_id {
            None => sorted.len(),
            Some(active) => self.position_of(&sorted, active)?,
        };
        if position == 0 {
            return Err(no_available("already at earliest"));
        }
        let target = sorted[position - 1].clone();
        self.restore(target, actor, RestoreDirection::Rollback);
        Ok(())
    }

    /// Restore the checkpoint following the active one.
    ///
    /// Only meaningful while sitting on a checkpoint: once a command has
    /// been applied the state is live and there is nothing "ahead" to move
    /// to, even if later checkpoints still exist from before a rollback.
    ///
    /// # Errors
    ///
    /// - [`InstanceError::NoAvailableCheckpoint`] with reason
    ///   `"current state is live"`, `"no checkpoints exist"`, or
    ///   `"already at latest"`.
    /// - [`InstanceError::CorruptedState`] when the active pointer
    ///   references a checkpoint that is not stored.
    pub fn rollforward(&mut self, actor: &Actor) -> Result<(), InstanceError> {
        let Some(active) = self.active_checkpoint_id else {
            return Err(no_available("current state is live"));
        };
        let sorted = self.sorted_checkpoints();
        if sorted.is_empty() {
            return Err(no_available("no checkpoints exist"));
        }
        let position = self.position_of(&sorted, active)?;
        if position + 1 >= sorted.len() {
            return Err(no_available("already at latest"));
        }
        let target = sorted[position + 1].clone();
        self.restore(target, actor, RestoreDirection::Rollforward);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Checkpoints ordered by creation time, ascending. The sort is stable,
    /// so same-instant checkpoints keep insertion order.
    fn sorted_checkpoints(&self) -> Vec<Checkpoint> {
        let mut sorted = self.checkpoints.clone();
        sorted.sort_by_key(|cp| cp.created_at);
        sorted
    }

    fn position_of(&self, sorted: &[Checkpoint], active: Uuid) -> Result<usize, InstanceError> {
        sorted.iter().position(|cp| cp.id == active).ok_or_else(|| {
            tracing::warn!(
                instance_id = %self.id,
                step = %self.current_step,
                dangling_checkpoint_id = %active,
                checkpoint_count = self.checkpoints.len(),
                "active checkpoint missing from checkpoint list"
            );
            InstanceError::CorruptedState {
                message: format!("active checkpoint {active} is not among saved checkpoints"),
            }
        })
    }

    fn restore(&mut self, target: Checkpoint, actor: &Actor, direction: RestoreDirection) {
        self.current_step = target.step;
        self.data = target.data;
        self.active_checkpoint_id = Some(target.id);
        self.history.push(HistoryEvent::StateRestored {
            at: self.clock.now(),
            checkpoint_id: target.id,
            actor: actor.clone(),
            direction,
        });
    }
}

impl std::fmt::Debug for WorkflowInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowInstance")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("definition", &self.definition.name)
            .field("subject", &self.subject)
            .field("current_step", &self.current_step)
            .field("data", &self.data)
            .field("history_len", &self.history.len())
            .field("checkpoints", &self.checkpoints.len())
            .field("active_checkpoint_id", &self.active_checkpoint_id)
            .field("revision", &self.revision)
            .finish()
    }
}

/// Raw constructor input used when rehydrating a persisted instance.
pub(crate) struct InstanceParts {
    pub id: Uuid,
    pub name: String,
    pub definition: Arc<WorkflowDefinition>,
    pub subject: Option<SubjectRef>,
    pub current_step: String,
    pub data: DataMap,
    pub history: Vec<HistoryEvent>,
    pub checkpoints: Vec<Checkpoint>,
    pub active_checkpoint_id: Option<Uuid>,
    pub revision: u64,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdSource>,
}

/// Fluent construction of [`WorkflowInstance`] values.
///
/// # Examples
///
/// ```rust
/// use agendaflow::definitions::catalog;
/// use agendaflow::instance::WorkflowInstance;
/// use agendaflow::subjects::{SubjectKind, SubjectRef};
/// use serde_json::json;
///
/// let instance = WorkflowInstance::builder("request from Colin", catalog::external_request_flow())
///     .with_subject(SubjectRef::new(SubjectKind::ExternalRequest, "42"))
///     .with_data("requester", json!("Colin"))
///     .build();
///
/// assert_eq!(instance.current_step(), "pending");
/// assert_eq!(instance.data().get("requester"), Some(&json!("Colin")));
/// assert!(instance.history().is_empty());
/// ```
pub struct InstanceBuilder {
    name: String,
    definition: Arc<WorkflowDefinition>,
    subject: Option<SubjectRef>,
    data: DataMap,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdSource>>,
}

impl InstanceBuilder {
    /// Bind the instance to a concrete subject.
    #[must_use]
    pub fn with_subject(mut self, subject: SubjectRef) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Seed one key of the initial data bag.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Seed the whole initial data bag.
    #[must_use]
    pub fn with_data_map(mut self, data: DataMap) -> Self {
        self.data = data;
        self
    }

    /// Inject a clock (tests use [`ManualClock`](crate::utils::clock::ManualClock)).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Inject an id source (tests use
    /// [`SequentialIdSource`](crate::utils::ids::SequentialIdSource)).
    #[must_use]
    pub fn with_ids(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Build the instance on the definition's initial step.
    #[must_use]
    pub fn build(self) -> WorkflowInstance {
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>);
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UuidIdSource::new()) as Arc<dyn IdSource>);
        WorkflowInstance {
            id: ids.next_id(),
            name: self.name,
            current_step: self.definition.initial_step.clone(),
            definition: self.definition,
            subject: self.subject,
            data: self.data,
            history: Vec::new(),
            checkpoints: Vec::new(),
            active_checkpoint_id: None,
            revision: 0,
            clock,
            ids,
        }
    }
}
