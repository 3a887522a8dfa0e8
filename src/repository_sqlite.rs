/*!
SQLite repository

Durable [`WorkflowRepository`] implementation over a `sqlx` SQLite pool.

## Behavior

- Instances are stored as their canonical JSON document (see
  [`crate::persistence`]) alongside denormalized columns for the definition
  name, subject binding, and current step, so operational queries do not
  need to parse documents.
- Saves run in a transaction with an optimistic revision check: a stale
  revision maps to [`RepositoryError::ConcurrencyConflict`] and writes
  nothing.
- When the `sqlite-migrations` feature is enabled (default), embedded
  migrations (`sqlx::migrate!("./migrations")`) run on connect; disabling
  the feature assumes external migration orchestration.

## Database Schema

- `instances.id`            ← instance id (TEXT, UUID)
- `instances.name`          ← display name
- `instances.definition`    ← definition name (resolved via registry on load)
- `instances.subject_kind`  ← encoded subject kind, nullable
- `instances.subject_key`   ← subject key, nullable
- `instances.current_step`  ← denormalized current step
- `instances.doc_json`      ← full persisted document
- `instances.revision`      ← optimistic concurrency tag
- `instances.updated_at`    ← RFC 3339 save time
*/

use std::sync::Arc;

use sqlx::{Row, SqlitePool};
use tracing::instrument;
use uuid::Uuid;

use crate::definitions::DefinitionRegistry;
use crate::instance::WorkflowInstance;
use crate::persistence::{PersistedInstance, PersistedSubject};
use crate::repository::{RepositoryError, Result, WorkflowRepository};
use crate::subjects::SubjectRef;
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::ids::{IdSource, UuidIdSource};

/// SQLite-backed workflow repository.
///
/// # Examples
///
/// ```rust,no_run
/// use agendaflow::definitions::{catalog, DefinitionRegistry};
/// use agendaflow::repository::WorkflowRepository;
/// use agendaflow::repository_sqlite::SqliteRepository;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = Arc::new(DefinitionRegistry::new());
/// registry.register_shared(catalog::agenda_item_flow())?;
///
/// let repo = SqliteRepository::connect("sqlite://agendaflow.db", registry).await?;
/// let ids = repo
///     .list_by_subject(&agendaflow::subjects::SubjectRef::new(
///         agendaflow::subjects::SubjectKind::AgendaItem,
///         "42",
///     ))
///     .await?;
/// println!("{} instance(s) bound", ids.len());
/// # Ok(())
/// # }
/// ```
pub struct SqliteRepository {
    pool: Arc<SqlitePool>,
    registry: Arc<DefinitionRegistry>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
}

impl std::fmt::Debug for SqliteRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRepository").finish()
    }
}

impl SqliteRepository {
    /// Connect (or create) a SQLite database at `database_url`.
    /// Example URL: `"sqlite://agendaflow.db?mode=rwc"`.
    #[instrument(skip(database_url, registry))]
    pub async fn connect(
        database_url: &str,
        registry: Arc<DefinitionRegistry>,
    ) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| RepositoryError::Backend {
                message: format!("connect error: {e}"),
            })?;
        // Run embedded migrations only if the feature is enabled (idempotent).
        #[cfg(feature = "sqlite-migrations")]
        {
            if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
                return Err(RepositoryError::Backend {
                    message: format!("migration failure: {e}"),
                });
            }
        }
        #[cfg(not(feature = "sqlite-migrations"))]
        {
            // Feature disabled: assume external migration orchestration already applied schema.
        }
        Ok(Self {
            pool: Arc::new(pool),
            registry,
            clock: Arc::new(SystemClock::new()),
            ids: Arc::new(UuidIdSource::new()),
        })
    }

    /// Inject the clock used for `updated_at` stamps and rehydrated
    /// instances.
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
}

#[async_trait::async_trait]
impl WorkflowRepository for SqliteRepository {
    #[instrument(skip(self), err)]
    async fn load(&self, instance_id: Uuid) -> Result<WorkflowInstance> {
        let row = sqlx::query("SELECT doc_json FROM instances WHERE id = ?1")
            .bind(instance_id.to_string())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| RepositoryError::Backend {
                message: format!("select instance: {e}"),
            })?
            .ok_or(RepositoryError::NotFound { instance_id })?;

        let doc_json: String = row.get("doc_json");
        let doc = PersistedInstance::from_json(&doc_json)?;
        let instance =
            doc.into_instance(&self.registry, Arc::clone(&self.clock), Arc::clone(&self.ids))?;
        Ok(instance)
    }

    #[instrument(skip(self, instance), err)]
    async fn save(&self, instance: &mut WorkflowInstance) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Backend {
                message: format!("tx begin: {e}"),
            })?;

        let stored_revision: Option<i64> =
            sqlx::query_scalar("SELECT revision FROM instances WHERE id = ?1")
                .bind(instance.id().to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Backend {
                    message: format!("revision check: {e}"),
                })?;

        let stored_revision = stored_revision.unwrap_or(0) as u64;
        if stored_revision != instance.revision() {
            return Err(RepositoryError::ConcurrencyConflict {
                instance_id: instance.id(),
                expected: instance.revision(),
                found: stored_revision,
            });
        }

        let new_revision = stored_revision + 1;
        let mut doc = PersistedInstance::from(&*instance);
        doc.revision = new_revision;
        let doc_json = doc.to_json()?;
        let subject = instance.subject().map(PersistedSubject::from);
        let updated_at = self.clock.now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO instances (
                id, name, definition, subject_kind, subject_key,
                current_step, doc_json, revision, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                definition = excluded.definition,
                subject_kind = excluded.subject_kind,
                subject_key = excluded.subject_key,
                current_step = excluded.current_step,
                doc_json = excluded.doc_json,
                revision = excluded.revision,
                updated_at = excluded.updated_at
        "#,
        )
        .bind(instance.id().to_string())
        .bind(instance.name())
        .bind(&instance.definition().name)
        .bind(subject.as_ref().map(|s| s.kind.clone()))
        .bind(subject.as_ref().map(|s| s.key.clone()))
        .bind(instance.current_step())
        .bind(&doc_json)
        .bind(new_revision as i64)
        .bind(&updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Backend {
            message: format!("upsert instance: {e}"),
        })?;

        tx.commit().await.map_err(|e| RepositoryError::Backend {
            message: format!("tx commit: {e}"),
        })?;

        instance.set_revision(new_revision);
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, instance_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM instances WHERE id = ?1")
            .bind(instance_id.to_string())
            .execute(&*self.pool)
            .await
            .map_err(|e| RepositoryError::Backend {
                message: format!("delete instance: {e}"),
            })?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { instance_id });
        }
        Ok(())
    }

    #[instrument(skip(self, subject), err)]
    async fn list_by_subject(&self, subject: &SubjectRef) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM instances
            WHERE subject_kind = ?1 AND subject_key = ?2
            ORDER BY updated_at DESC, id
            "#,
        )
        .bind(subject.kind.encode())
        .bind(&subject.key)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| RepositoryError::Backend {
            message: format!("list by subject: {e}"),
        })?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.get("id");
                Uuid::parse_str(&id).map_err(|e| RepositoryError::Backend {
                    message: format!("stored id '{id}' is not a UUID: {e}"),
                })
            })
            .collect()
    }
}
