/*!
Persistence primitives for serializing/deserializing workflow instances.

Design goals:
- Explicit serde-friendly shapes decoupled from the live aggregate, so
  repository code stays lean and declarative.
- Definitions are referenced by name and resolved through a
  [`DefinitionRegistry`] at load time; they are never serialized with
  instances (guards are code, not data).
- Forward compatibility: unknown history-event kinds and subject kinds
  should round-trip (subject kinds decode to `Custom`).

This module intentionally does NOT perform I/O. It is pure data
transformation and (de)serialization glue; backends live in
[`crate::repository`] and the feature-gated SQLite module.
*/

use std::sync::Arc;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::checkpoint::Checkpoint;
use crate::definitions::DefinitionRegistry;
use crate::events::HistoryEvent;
use crate::instance::{InstanceParts, WorkflowInstance};
use crate::state::DataMap;
use crate::subjects::{SubjectKind, SubjectRef};
use crate::utils::clock::Clock;
use crate::utils::ids::IdSource;

/// Conversion and serialization errors for persistence models.
#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    /// The persisted document names a definition the registry cannot
    /// resolve.
    #[error("unknown workflow definition: {name}")]
    #[diagnostic(
        code(agendaflow::persistence::unknown_definition),
        help("Register the definition '{name}' before loading instances that reference it.")
    )]
    UnknownDefinition { name: String },

    /// The persisted document violates an instance invariant.
    #[error("corrupt persisted instance {instance_id}: {message}")]
    #[diagnostic(
        code(agendaflow::persistence::corrupt),
        help("The stored document is internally inconsistent; quarantine it and inspect the backend.")
    )]
    Corrupt { instance_id: Uuid, message: String },

    /// JSON serialization/deserialization failed.
    #[error("JSON serialization/deserialization failed: {source}")]
    #[diagnostic(
        code(agendaflow::persistence::serde),
        help("Ensure the JSON structure matches the persisted instance shape.")
    )]
    Serde {
        #[from]
        source: serde_json::Error,
    },
}

/// Persisted form of a subject binding; kinds use their encoded string form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSubject {
    pub kind: String,
    pub key: String,
}

impl From<&SubjectRef> for PersistedSubject {
    fn from(subject: &SubjectRef) -> Self {
        Self {
            kind: subject.kind.encode(),
            key: subject.key.clone(),
        }
    }
}

impl From<&PersistedSubject> for SubjectRef {
    fn from(persisted: &PersistedSubject) -> Self {
        Self {
            kind: SubjectKind::decode(&persisted.kind),
            key: persisted.key.clone(),
        }
    }
}

/// Complete persisted shape of a workflow instance.
///
/// Timestamps serialize as RFC 3339 UTC strings (chrono's serde form);
/// history events carry a `kind` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedInstance {
    pub id: Uuid,
    pub name: String,
    /// Name of the definition; resolved through a registry at load time.
    pub definition: String,
    #[serde(default)]
    pub subject: Option<PersistedSubject>,
    pub current_step: String,
    #[serde(default)]
    pub data: DataMap,
    #[serde(default)]
    pub history: Vec<HistoryEvent>,
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
    #[serde(default)]
    pub active_checkpoint_id: Option<Uuid>,
    /// Optimistic-concurrency tag; mirrors the backend's stored revision.
    #[serde(default)]
    pub revision: u64,
}

impl From<&WorkflowInstance> for PersistedInstance {
    fn from(instance: &WorkflowInstance) -> Self {
        Self {
            id: instance.id(),
            name: instance.name().to_string(),
            definition: instance.definition().name.clone(),
            subject: instance.subject().map(PersistedSubject::from),
            current_step: instance.current_step().to_string(),
            data: instance.data().clone(),
            history: instance.history().to_vec(),
            checkpoints: instance.checkpoints().to_vec(),
            active_checkpoint_id: instance.active_checkpoint_id(),
            revision: instance.revision(),
        }
    }
}

impl PersistedInstance {
    /// Rehydrate the live aggregate, resolving the definition by name.
    ///
    /// Checks the load-time invariants a trustworthy document must satisfy:
    /// the current step belongs to the definition, and the active checkpoint
    /// pointer (when set) references a stored checkpoint.
    ///
    /// # Errors
    ///
    /// [`PersistenceError::UnknownDefinition`] when the registry cannot
    /// resolve the definition name; [`PersistenceError::Corrupt`] when an
    /// invariant does not hold.
    pub fn into_instance(
        self,
        registry: &DefinitionRegistry,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
    ) -> Result<WorkflowInstance, PersistenceError> {
        let definition =
            registry
                .resolve(&self.definition)
                .ok_or_else(|| PersistenceError::UnknownDefinition {
                    name: self.definition.clone(),
                })?;

        if !definition.steps.contains(&self.current_step) {
            return Err(PersistenceError::Corrupt {
                instance_id: self.id,
                message: format!(
                    "current step '{}' is not a step of definition '{}'",
                    self.current_step, definition.name
                ),
            });
        }
        if let Some(active) = self.active_checkpoint_id {
            if !self.checkpoints.iter().any(|cp| cp.id == active) {
                return Err(PersistenceError::Corrupt {
                    instance_id: self.id,
                    message: format!("active checkpoint {active} is not among saved checkpoints"),
                });
            }
        }

        Ok(WorkflowInstance::from_parts(InstanceParts {
            id: self.id,
            name: self.name,
            definition,
            subject: self.subject.as_ref().map(SubjectRef::from),
            current_step: self.current_step,
            data: self.data,
            history: self.history,
            checkpoints: self.checkpoints,
            active_checkpoint_id: self.active_checkpoint_id,
            revision: self.revision,
            clock,
            ids,
        }))
    }

    /// Serialize to the canonical JSON document form.
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from the canonical JSON document form.
    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(json)?)
    }
}
