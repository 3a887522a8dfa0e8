mod common;
use common::*;

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;

use agendaflow::actor::Actor;
use agendaflow::definitions::{DefinitionBuilder, WorkflowDefinition};
use agendaflow::instance::WorkflowInstance;
use agendaflow::state::DataMap;

/// Two-step shuttle every command sequence stays inside.
fn shuttle_flow() -> Arc<WorkflowDefinition> {
    Arc::new(
        DefinitionBuilder::new("shuttle")
            .initial_step("a")
            .transition("a", "b", "go")
            .transition("b", "a", "back")
            .build()
            .unwrap(),
    )
}

#[derive(Clone, Debug)]
enum Op {
    Apply(&'static str, Vec<(String, i64)>),
    Save(String),
    Rollback,
    Rollforward,
}

fn key_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["k0", "k1", "k2", "k3"]).prop_map(String::from)
}

fn payload_entries() -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::vec((key_strategy(), any::<i64>()), 0..4)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (prop::sample::select(vec!["go", "back", "bogus"]), payload_entries())
            .prop_map(|(command, entries)| Op::Apply(command, entries)),
        "[a-z]{1,8}".prop_map(Op::Save),
        Just(Op::Rollback),
        Just(Op::Rollforward),
    ]
}

fn to_payload(entries: &[(String, i64)]) -> DataMap {
    entries
        .iter()
        .map(|(k, v)| (k.clone(), json!(v)))
        .collect()
}

/// Observable fields compared for the atomicity property.
#[derive(Clone, PartialEq, Debug)]
struct Observed {
    step: String,
    data: DataMap,
    history_len: usize,
    checkpoints: Vec<uuid::Uuid>,
    active: Option<uuid::Uuid>,
}

fn observe(instance: &WorkflowInstance) -> Observed {
    Observed {
        step: instance.current_step().to_string(),
        data: instance.data().clone(),
        history_len: instance.history().len(),
        checkpoints: instance.checkpoints().iter().map(|cp| cp.id).collect(),
        active: instance.active_checkpoint_id(),
    }
}

proptest! {
    /// Invariants that hold across arbitrary operation sequences:
    /// membership of the current step, append-only history with monotone
    /// timestamps, live state after commands, and full atomicity of failed
    /// operations.
    #[test]
    fn prop_engine_invariants(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let definition = shuttle_flow();
        let mut instance = deterministic_instance("prop", Arc::clone(&definition));
        let actor = Actor::new("prop-actor");

        let mut prev_history: Vec<_> = instance.history().to_vec();

        for op in ops {
            let before = observe(&instance);

            let outcome = match &op {
                Op::Apply(command, entries) => {
                    let result = instance.apply_command(command, to_payload(entries), &actor);
                    if result.is_ok() {
                        prop_assert!(instance.active_checkpoint_id().is_none());
                    }
                    result.map(|_| ())
                }
                Op::Save(label) => {
                    let cp = instance.save_checkpoint(label, &actor);
                    prop_assert_eq!(instance.active_checkpoint_id(), Some(cp.id));
                    prop_assert_eq!(&cp.step, instance.current_step());
                    prop_assert_eq!(&cp.data, instance.data());
                    Ok(())
                }
                Op::Rollback => instance.rollback(&actor),
                Op::Rollforward => instance.rollforward(&actor),
            };

            // The current step never leaves the definition's step set.
            prop_assert!(definition.steps.contains(instance.current_step()));

            // Failed operations are fully atomic.
            if outcome.is_err() {
                prop_assert_eq!(&observe(&instance), &before);
            }

            // History is append-only: previous events unchanged, in place.
            let history = instance.history();
            prop_assert!(history.len() >= prev_history.len());
            prop_assert_eq!(&history[..prev_history.len()], prev_history.as_slice());
            prev_history = history.to_vec();

            // Timestamps are non-decreasing along history.
            for pair in history.windows(2) {
                prop_assert!(pair[0].at() <= pair[1].at());
            }

            // An active pointer always references a stored checkpoint.
            if let Some(active) = instance.active_checkpoint_id() {
                prop_assert!(instance.checkpoints().iter().any(|cp| cp.id == active));
            }
        }
    }

    /// Checkpoint round-trip: saving, diverging with commands, and rolling
    /// back restores the exact saved step and data.
    #[test]
    fn prop_rollback_restores_saved_snapshot(
        seed in payload_entries(),
        diverge in prop::collection::vec(payload_entries(), 1..5),
    ) {
        let definition = shuttle_flow();
        let mut instance = deterministic_instance("roundtrip", Arc::clone(&definition));
        let actor = Actor::new("prop-actor");

        instance.apply_command("go", to_payload(&seed), &actor).unwrap();
        let saved = instance.save_checkpoint("mark", &actor);
        let step_at_save = instance.current_step().to_string();
        let data_at_save = instance.data().clone();

        // Diverge with an alternating run of always-valid commands.
        let mut command = "back";
        for entries in &diverge {
            instance.apply_command(command, to_payload(entries), &actor).unwrap();
            command = if command == "back" { "go" } else { "back" };
        }

        instance.rollback(&actor).unwrap();
        prop_assert_eq!(instance.current_step(), step_at_save.as_str());
        prop_assert_eq!(instance.data(), &data_at_save);
        prop_assert_eq!(instance.active_checkpoint_id(), Some(saved.id));
    }

    /// Rollback followed by rollforward, with no mutation in between, is the
    /// identity on (step, data, active checkpoint).
    #[test]
    fn prop_rollback_rollforward_identity(
        first in payload_entries(),
        second in payload_entries(),
    ) {
        let definition = shuttle_flow();
        let mut instance = deterministic_instance("identity", Arc::clone(&definition));
        let actor = Actor::new("prop-actor");

        instance.apply_command("go", to_payload(&first), &actor).unwrap();
        instance.save_checkpoint("one", &actor);
        instance.apply_command("back", to_payload(&second), &actor).unwrap();
        let latest = instance.save_checkpoint("two", &actor);

        let step_before = instance.current_step().to_string();
        let data_before = instance.data().clone();

        instance.rollback(&actor).unwrap();
        instance.rollforward(&actor).unwrap();

        prop_assert_eq!(instance.current_step(), step_before.as_str());
        prop_assert_eq!(instance.data(), &data_before);
        prop_assert_eq!(instance.active_checkpoint_id(), Some(latest.id));
    }
}
