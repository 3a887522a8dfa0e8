//! Repository port: persistence contract for workflow instances.
//!
//! The engine itself does no locking and no I/O; a repository is responsible
//! for serializing `load -> mutate -> save` per instance. Saves carry an
//! optimistic-concurrency revision tag: when the stored revision no longer
//! matches the one the instance was loaded with, the save fails with
//! [`RepositoryError::ConcurrencyConflict`] and the caller must reload.
//!
//! [`InMemoryRepository`] is the reference implementation, storing documents
//! process-locally; the `sqlite` feature adds a durable
//! [`SqliteRepository`](crate::repository_sqlite::SqliteRepository).

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::definitions::DefinitionRegistry;
use crate::instance::WorkflowInstance;
use crate::persistence::{PersistedInstance, PersistenceError};
use crate::subjects::SubjectRef;
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::ids::{IdSource, UuidIdSource};

/// Errors from repository operations.
#[derive(Debug, Error, Diagnostic)]
pub enum RepositoryError {
    /// No instance stored under the given id.
    #[error("workflow instance not found: {instance_id}")]
    #[diagnostic(
        code(agendaflow::repository::not_found),
        help("Ensure the instance id is correct and the instance was saved.")
    )]
    NotFound { instance_id: Uuid },

    /// The stored revision differs from the one the instance was loaded
    /// with; another writer got there first.
    #[error("concurrent modification of instance {instance_id}: expected revision {expected}, found {found}")]
    #[diagnostic(
        code(agendaflow::repository::concurrency_conflict),
        help("Reload the instance, reapply the change, and save again.")
    )]
    ConcurrencyConflict {
        instance_id: Uuid,
        expected: u64,
        found: u64,
    },

    /// Document (de)serialization or registry resolution failed.
    #[error("persistence error: {source}")]
    #[diagnostic(code(agendaflow::repository::persistence))]
    Persistence {
        #[from]
        source: PersistenceError,
    },

    /// Backend storage error (database, filesystem, locking).
    #[error("backend error: {message}")]
    #[diagnostic(
        code(agendaflow::repository::backend),
        help("Check backend connectivity and permissions; backend message: {message}.")
    )]
    Backend { message: String },
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Abstract persistence contract for workflow instances.
///
/// Implementations serialize the instance document (id, name,
/// definition-name, subject, current step, data, history, checkpoints,
/// active checkpoint, revision) and resolve definitions by name through a
/// [`DefinitionRegistry`] on load.
///
/// # Concurrency
///
/// `save` takes the instance mutably so the implementation can stamp the
/// newly stored revision on success. Implementations must detect stale
/// revisions and return [`RepositoryError::ConcurrencyConflict`] rather than
/// overwrite; they perform no locking beyond that check.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Load the instance stored under `instance_id`.
    async fn load(&self, instance_id: Uuid) -> Result<WorkflowInstance>;

    /// Persist the instance, bumping its revision on success.
    async fn save(&self, instance: &mut WorkflowInstance) -> Result<()>;

    /// Remove the instance stored under `instance_id`.
    async fn delete(&self, instance_id: Uuid) -> Result<()>;

    /// Ids of instances bound to `subject`. Expected to contain at most one
    /// element when callers maintain the 1:1 binding discipline.
    async fn list_by_subject(&self, subject: &SubjectRef) -> Result<Vec<Uuid>>;
}

/// Process-local repository over a `RwLock`ed map of persisted documents.
///
/// Fast and non-durable; suitable for tests and ephemeral runs. Documents
/// are stored in their persisted shape so the serialization path is
/// exercised exactly like a durable backend would.
///
/// # Examples
///
/// ```rust
/// use agendaflow::definitions::{catalog, DefinitionRegistry};
/// use agendaflow::instance::WorkflowInstance;
/// use agendaflow::repository::{InMemoryRepository, WorkflowRepository};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = Arc::new(DefinitionRegistry::new());
/// registry.register_shared(catalog::meeting_flow())?;
///
/// let repo = InMemoryRepository::new(Arc::clone(&registry));
/// let mut instance = WorkflowInstance::new("march plenary", catalog::meeting_flow());
///
/// repo.save(&mut instance).await?;
/// assert_eq!(instance.revision(), 1);
///
/// let loaded = repo.load(instance.id()).await?;
/// assert_eq!(loaded.current_step(), "draft");
/// # Ok(())
/// # }
/// ```
pub struct InMemoryRepository {
    registry: Arc<DefinitionRegistry>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
    inner: RwLock<FxHashMap<Uuid, PersistedInstance>>,
}

impl InMemoryRepository {
    /// A new, empty repository resolving definitions through `registry`.
    #[must_use]
    pub fn new(registry: Arc<DefinitionRegistry>) -> Self {
        Self {
            registry,
            clock: Arc::new(SystemClock::new()),
            ids: Arc::new(UuidIdSource::new()),
            inner: RwLock::new(FxHashMap::default()),
        }
    }

    /// Inject the clock handed to rehydrated instances.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Inject the id source handed to rehydrated instances.
    #[must_use]
    pub fn with_ids(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    /// Number of stored instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryRepository {
    async fn load(&self, instance_id: Uuid) -> Result<WorkflowInstance> {
        let doc = {
            let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            map.get(&instance_id)
                .cloned()
                .ok_or(RepositoryError::NotFound { instance_id })?
        };
        let instance =
            doc.into_instance(&self.registry, Arc::clone(&self.clock), Arc::clone(&self.ids))?;
        Ok(instance)
    }

    async fn save(&self, instance: &mut WorkflowInstance) -> Result<()> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let stored_revision = map.get(&instance.id()).map(|doc| doc.revision).unwrap_or(0);
        if stored_revision != instance.revision() {
            return Err(RepositoryError::ConcurrencyConflict {
                instance_id: instance.id(),
                expected: instance.revision(),
                found: stored_revision,
            });
        }
        let mut doc = PersistedInstance::from(&*instance);
        doc.revision = stored_revision + 1;
        map.insert(doc.id, doc);
        instance.set_revision(stored_revision + 1);
        Ok(())
    }

    async fn delete(&self, instance_id: Uuid) -> Result<()> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.remove(&instance_id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound { instance_id })
    }

    async fn list_by_subject(&self, subject: &SubjectRef) -> Result<Vec<Uuid>> {
        let wanted = crate::persistence::PersistedSubject::from(subject);
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<Uuid> = map
            .values()
            .filter(|doc| doc.subject.as_ref() == Some(&wanted))
            .map(|doc| doc.id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}
