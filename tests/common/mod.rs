#![allow(dead_code)]

//! Shared fixtures for integration tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use agendaflow::definitions::{DefinitionBuilder, WorkflowDefinition};
use agendaflow::instance::WorkflowInstance;
use agendaflow::state::DataMap;
use agendaflow::utils::clock::ManualClock;
use agendaflow::utils::ids::SequentialIdSource;

/// The three-step triage flow used across the engine tests.
pub fn triage_flow() -> Arc<WorkflowDefinition> {
    Arc::new(
        DefinitionBuilder::new("triage_flow")
            .initial_step("initial_request")
            .transition("initial_request", "triage", "start_triage")
            .transition("triage", "completed", "complete")
            .build()
            .expect("triage flow is valid"),
    )
}

/// A fixed instant all deterministic clocks start from.
pub fn test_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

/// An instance with a deterministic clock and sequential ids.
///
/// The instance id is `Uuid::from_u128(1)`; checkpoints get 2, 3, ...
pub fn deterministic_instance(
    name: &str,
    definition: Arc<WorkflowDefinition>,
) -> WorkflowInstance {
    WorkflowInstance::builder(name, definition)
        .with_clock(Arc::new(ManualClock::starting_at(test_epoch())))
        .with_ids(Arc::new(SequentialIdSource::new()))
        .build()
}

/// Shorthand for building a payload map.
pub fn payload(entries: &[(&str, Value)]) -> DataMap {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}
