mod common;
use common::*;

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use agendaflow::actor::Actor;
use agendaflow::definitions::DefinitionRegistry;
use agendaflow::instance::WorkflowInstance;
use agendaflow::repository::{RepositoryError, WorkflowRepository};
use agendaflow::repository_sqlite::SqliteRepository;
use agendaflow::subjects::{SubjectKind, SubjectRef};

async fn fixture() -> (TempDir, Arc<DefinitionRegistry>, SqliteRepository) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}/agendaflow.db?mode=rwc", dir.path().display());

    let registry = Arc::new(DefinitionRegistry::new());
    registry.register_shared(triage_flow()).unwrap();

    let repo = SqliteRepository::connect(&url, Arc::clone(&registry))
        .await
        .unwrap();
    (dir, registry, repo)
}

#[tokio::test]
async fn save_and_load_round_trip() {
    let (_dir, _registry, repo) = fixture().await;

    let mut instance = WorkflowInstance::builder("req-1", triage_flow())
        .with_subject(SubjectRef::new(SubjectKind::ExternalRequest, "req-1"))
        .with_data("requester", json!("Colin"))
        .build();
    let alice = Actor::new("alice");
    instance.save_checkpoint("CP1", &alice);
    instance
        .apply_command("start_triage", payload(&[("notes", json!("n"))]), &alice)
        .unwrap();

    repo.save(&mut instance).await.unwrap();
    assert_eq!(instance.revision(), 1);

    let loaded = repo.load(instance.id()).await.unwrap();
    assert_eq!(loaded.name(), "req-1");
    assert_eq!(loaded.current_step(), "triage");
    assert_eq!(loaded.data(), instance.data());
    assert_eq!(loaded.history(), instance.history());
    assert_eq!(loaded.checkpoints(), instance.checkpoints());
    assert_eq!(loaded.subject(), instance.subject());
    assert_eq!(loaded.revision(), 1);
}

#[tokio::test]
async fn revision_bumps_on_every_save() {
    let (_dir, _registry, repo) = fixture().await;

    let mut instance = WorkflowInstance::new("req-2", triage_flow());
    repo.save(&mut instance).await.unwrap();
    assert_eq!(instance.revision(), 1);

    instance
        .apply_command("start_triage", Default::default(), &Actor::new("alice"))
        .unwrap();
    repo.save(&mut instance).await.unwrap();
    assert_eq!(instance.revision(), 2);

    let loaded = repo.load(instance.id()).await.unwrap();
    assert_eq!(loaded.revision(), 2);
}

#[tokio::test]
async fn stale_revision_is_a_concurrency_conflict() {
    let (_dir, _registry, repo) = fixture().await;

    let mut instance = WorkflowInstance::new("req-3", triage_flow());
    repo.save(&mut instance).await.unwrap();

    let mut first = repo.load(instance.id()).await.unwrap();
    let mut second = repo.load(instance.id()).await.unwrap();

    first
        .apply_command("start_triage", Default::default(), &Actor::new("alice"))
        .unwrap();
    repo.save(&mut first).await.unwrap();

    second
        .apply_command("start_triage", Default::default(), &Actor::new("bella"))
        .unwrap();
    let err = repo.save(&mut second).await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::ConcurrencyConflict {
            expected: 1,
            found: 2,
            ..
        }
    ));
}

#[tokio::test]
async fn delete_removes_the_row() {
    let (_dir, _registry, repo) = fixture().await;

    let mut instance = WorkflowInstance::new("req-4", triage_flow());
    repo.save(&mut instance).await.unwrap();

    repo.delete(instance.id()).await.unwrap();
    assert!(matches!(
        repo.load(instance.id()).await.unwrap_err(),
        RepositoryError::NotFound { .. }
    ));
    assert!(matches!(
        repo.delete(instance.id()).await.unwrap_err(),
        RepositoryError::NotFound { .. }
    ));
}

#[tokio::test]
async fn list_by_subject_uses_the_binding_columns() {
    let (_dir, _registry, repo) = fixture().await;

    let subject = SubjectRef::new(SubjectKind::ActionItem, "act-9");
    let mut bound = WorkflowInstance::builder("bound", triage_flow())
        .with_subject(subject.clone())
        .build();
    let mut unbound = WorkflowInstance::new("unbound", triage_flow());

    repo.save(&mut bound).await.unwrap();
    repo.save(&mut unbound).await.unwrap();

    assert_eq!(repo.list_by_subject(&subject).await.unwrap(), vec![bound.id()]);
    assert!(repo
        .list_by_subject(&SubjectRef::new(SubjectKind::ActionItem, "other"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn state_survives_reconnection() {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}/agendaflow.db?mode=rwc", dir.path().display());
    let registry = Arc::new(DefinitionRegistry::new());
    registry.register_shared(triage_flow()).unwrap();

    let instance_id = {
        let repo = SqliteRepository::connect(&url, Arc::clone(&registry))
            .await
            .unwrap();
        let mut instance = WorkflowInstance::new("durable", triage_flow());
        instance
            .apply_command("start_triage", Default::default(), &Actor::new("alice"))
            .unwrap();
        repo.save(&mut instance).await.unwrap();
        instance.id()
    };

    let repo = SqliteRepository::connect(&url, Arc::clone(&registry))
        .await
        .unwrap();
    let loaded = repo.load(instance_id).await.unwrap();
    assert_eq!(loaded.current_step(), "triage");
    assert_eq!(loaded.revision(), 1);
}
