//! # Agendaflow: Data-driven Workflow Engine
//!
//! Agendaflow executes named state machines against arbitrary subjects
//! (agenda items, action items, external requests, meetings, minutes). It
//! separates the immutable *definition* of a process from the live
//! *instances* executing it, keeps an auditable, ordered event history, and
//! supports labelled checkpoints with bidirectional navigation.
//!
//! ## Core Concepts
//!
//! - **Definitions**: Declarative blueprints of steps and command-labelled,
//!   optionally guarded transitions
//! - **Instances**: Live executions holding the current step, a keyed data
//!   bag, history, and checkpoints
//! - **Guards**: Pure predicates gating transitions over immutable snapshots
//! - **Checkpoints**: Deep-cloned `(step, data)` snapshots navigable by
//!   rollback and rollforward
//! - **Repositories**: Async persistence ports with optimistic concurrency
//!
//! ## Quick Start
//!
//! ```rust
//! use agendaflow::actor::Actor;
//! use agendaflow::definitions::DefinitionBuilder;
//! use agendaflow::instance::WorkflowInstance;
//! use agendaflow::state::DataMap;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! // Declare the process once...
//! let definition = Arc::new(
//!     DefinitionBuilder::new("triage_flow")
//!         .initial_step("initial_request")
//!         .transition("initial_request", "triage", "start_triage")
//!         .transition("triage", "completed", "complete")
//!         .build()
//!         .unwrap(),
//! );
//!
//! // ...then run any number of instances against it.
//! let mut instance = WorkflowInstance::new("request #7", Arc::clone(&definition));
//! let alice = Actor::new("alice");
//!
//! let mut payload = DataMap::default();
//! payload.insert("notes".into(), json!("ready for triage"));
//! instance.apply_command("start_triage", payload, &alice).unwrap();
//! assert_eq!(instance.current_step(), "triage");
//!
//! // Checkpoints allow going back (and forward again).
//! let cp = instance.save_checkpoint("before completion", &alice);
//! instance
//!     .apply_command("complete", DataMap::default(), &alice)
//!     .unwrap();
//! instance.rollback(&alice).unwrap();
//! assert_eq!(instance.current_step(), "triage");
//! assert_eq!(instance.active_checkpoint_id(), Some(cp.id));
//! ```
//!
//! ## Guards
//!
//! Transitions may carry a guard: a pure predicate of `(snapshot, payload,
//! actor)`. Guards see a cloned [`state::InstanceSnapshot`] and can never
//! mutate engine state; a guard that returns `false` (or panics) vetoes the
//! command and leaves the instance untouched.
//!
//! ## Persistence
//!
//! Instances persist as JSON documents referencing their definition by name;
//! a [`definitions::DefinitionRegistry`] resolves names back to definitions
//! at load time. [`repository::InMemoryRepository`] ships in the core; the
//! `sqlite` feature adds a durable sqlx-backed implementation.
//!
//! ## Module Guide
//!
//! - [`definitions`] - Blueprints, builder, validation, registry, catalog
//! - [`instance`] - The live aggregate and its operations
//! - [`events`] - History event taxonomy
//! - [`checkpoint`] - Checkpoint values
//! - [`state`] - Data bag and guard snapshots
//! - [`actor`] / [`subjects`] - Identity values
//! - [`repository`] - Persistence port and in-memory backend
//! - [`persistence`] - Serde document shapes
//! - [`utils`] - Injectable clock and id ports

pub mod actor;
pub mod checkpoint;
pub mod definitions;
pub mod events;
pub mod instance;
pub mod persistence;
pub mod repository;
#[cfg(feature = "sqlite")]
pub mod repository_sqlite;
pub mod state;
pub mod subjects;
pub mod telemetry;
pub mod utils;
