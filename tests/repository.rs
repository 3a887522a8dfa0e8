mod common;
use common::*;

use std::sync::Arc;

use serde_json::json;

use agendaflow::actor::Actor;
use agendaflow::definitions::DefinitionRegistry;
use agendaflow::instance::WorkflowInstance;
use agendaflow::repository::{InMemoryRepository, RepositoryError, WorkflowRepository};
use agendaflow::subjects::{SubjectKind, SubjectRef};

fn fixture() -> (Arc<DefinitionRegistry>, InMemoryRepository) {
    let registry = Arc::new(DefinitionRegistry::new());
    registry.register_shared(triage_flow()).unwrap();
    let repo = InMemoryRepository::new(Arc::clone(&registry));
    (registry, repo)
}

#[tokio::test]
async fn save_and_load_round_trip() {
    let (_registry, repo) = fixture();
    let mut instance = WorkflowInstance::builder("req-1", triage_flow())
        .with_data("requester", json!("Colin"))
        .build();
    let alice = Actor::new("alice");
    instance
        .apply_command("start_triage", payload(&[("notes", json!("n"))]), &alice)
        .unwrap();
    instance.save_checkpoint("CP1", &alice);

    repo.save(&mut instance).await.unwrap();
    assert_eq!(instance.revision(), 1);

    let loaded = repo.load(instance.id()).await.unwrap();
    assert_eq!(loaded.current_step(), "triage");
    assert_eq!(loaded.data(), instance.data());
    assert_eq!(loaded.history(), instance.history());
    assert_eq!(loaded.checkpoints(), instance.checkpoints());
    assert_eq!(loaded.active_checkpoint_id(), instance.active_checkpoint_id());
    assert_eq!(loaded.revision(), 1);
}

#[tokio::test]
async fn load_mutate_save_cycle_continues_the_workflow() {
    let (_registry, repo) = fixture();
    let mut instance = WorkflowInstance::new("req-2", triage_flow());
    repo.save(&mut instance).await.unwrap();

    let mut loaded = repo.load(instance.id()).await.unwrap();
    loaded
        .apply_command("start_triage", Default::default(), &Actor::new("alice"))
        .unwrap();
    repo.save(&mut loaded).await.unwrap();
    assert_eq!(loaded.revision(), 2);

    let reloaded = repo.load(instance.id()).await.unwrap();
    assert_eq!(reloaded.current_step(), "triage");
    assert_eq!(reloaded.history().len(), 1);
}

#[tokio::test]
async fn stale_revision_is_a_concurrency_conflict() {
    let (_registry, repo) = fixture();
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
    match err {
        RepositoryError::ConcurrencyConflict {
            instance_id,
            expected,
            found,
        } => {
            assert_eq!(instance_id, instance.id());
            assert_eq!(expected, 1);
            assert_eq!(found, 2);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }

    // The loser reloads and retries.
    let mut retried = repo.load(instance.id()).await.unwrap();
    assert_eq!(retried.revision(), 2);
    retried
        .apply_command("complete", Default::default(), &Actor::new("bella"))
        .unwrap();
    repo.save(&mut retried).await.unwrap();
}

#[tokio::test]
async fn missing_instances_report_not_found() {
    let (_registry, repo) = fixture();
    let ghost = uuid::Uuid::from_u128(0xfeed);

    assert!(matches!(
        repo.load(ghost).await.unwrap_err(),
        RepositoryError::NotFound { instance_id } if instance_id == ghost
    ));
    assert!(matches!(
        repo.delete(ghost).await.unwrap_err(),
        RepositoryError::NotFound { .. }
    ));
}

#[tokio::test]
async fn delete_removes_the_instance() {
    let (_registry, repo) = fixture();
    let mut instance = WorkflowInstance::new("req-4", triage_flow());
    repo.save(&mut instance).await.unwrap();
    assert_eq!(repo.len(), 1);

    repo.delete(instance.id()).await.unwrap();
    assert!(repo.is_empty());
    assert!(matches!(
        repo.load(instance.id()).await.unwrap_err(),
        RepositoryError::NotFound { .. }
    ));
}

#[tokio::test]
async fn list_by_subject_returns_bound_instances_only() {
    let (_registry, repo) = fixture();

    let item_12 = SubjectRef::new(SubjectKind::AgendaItem, "12");
    let item_13 = SubjectRef::new(SubjectKind::AgendaItem, "13");

    let mut bound = WorkflowInstance::builder("for item 12", triage_flow())
        .with_subject(item_12.clone())
        .build();
    let mut other = WorkflowInstance::builder("for item 13", triage_flow())
        .with_subject(item_13.clone())
        .build();
    let mut unbound = WorkflowInstance::new("no subject", triage_flow());

    repo.save(&mut bound).await.unwrap();
    repo.save(&mut other).await.unwrap();
    repo.save(&mut unbound).await.unwrap();

    assert_eq!(repo.list_by_subject(&item_12).await.unwrap(), vec![bound.id()]);
    assert_eq!(repo.list_by_subject(&item_13).await.unwrap(), vec![other.id()]);
    assert!(repo
        .list_by_subject(&SubjectRef::new(SubjectKind::Meeting, "12"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn load_fails_when_definition_is_not_registered() {
    let registry = Arc::new(DefinitionRegistry::new());
    let repo = InMemoryRepository::new(Arc::clone(&registry));

    let mut instance = WorkflowInstance::new("orphan", triage_flow());
    repo.save(&mut instance).await.unwrap();

    let err = repo.load(instance.id()).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Persistence { .. }));
}
