//! Ready-made definitions for the meeting-domain subject flows.
//!
//! These mirror the status vocabulary the surrounding application uses for
//! its five workflow-driven entities. Each function returns a validated,
//! shareable definition; register them with a
//! [`DefinitionRegistry`](super::DefinitionRegistry) to make persisted
//! instances resolvable.

use std::sync::Arc;

use super::builder::DefinitionBuilder;
use super::transition::Guard;
use super::WorkflowDefinition;

/// Guard: the payload (or, failing that, the instance data) carries a
/// non-empty `review_notes` entry.
fn requires_review_notes() -> Guard {
    Arc::new(|snapshot, payload, _actor| {
        payload
            .get("review_notes")
            .or_else(|| snapshot.data.get("review_notes"))
            .and_then(|v| v.as_str())
            .is_some_and(|s| !s.trim().is_empty())
    })
}

/// Guard: the acting identity differs from the author recorded in the data
/// bag. Instances that never recorded an author are unrestricted.
fn rejects_self_approval() -> Guard {
    Arc::new(|snapshot, _payload, actor| {
        snapshot
            .data
            .get("author")
            .and_then(|v| v.as_str())
            .is_none_or(|author| author != actor.name)
    })
}

/// Review flow for agenda-item requests submitted by outside parties.
///
/// `approve` demands review notes so the decision is auditable.
#[must_use]
pub fn external_request_flow() -> Arc<WorkflowDefinition> {
    Arc::new(
        DefinitionBuilder::new("external_request_flow")
            .initial_step("pending")
            .guarded_transition("pending", "approved", "approve", requires_review_notes())
            .transition("pending", "rejected", "reject")
            .transition("pending", "deferred", "defer")
            .transition("pending", "withdrawn", "withdraw")
            .transition("deferred", "pending", "reopen")
            .transition("deferred", "withdrawn", "withdraw")
            .build()
            .expect("external_request_flow definition is structurally valid"),
    )
}

/// Lifecycle of an action item from proposal to completion.
#[must_use]
pub fn action_item_flow() -> Arc<WorkflowDefinition> {
    Arc::new(
        DefinitionBuilder::new("action_item_flow")
            .initial_step("proposed")
            .transition("proposed", "assigned", "assign")
            .transition("proposed", "rejected", "reject")
            .transition("assigned", "in_progress", "start")
            .transition("assigned", "rejected", "reject")
            .transition("in_progress", "done", "complete")
            .transition("in_progress", "blocked", "block")
            .transition("blocked", "in_progress", "unblock")
            .build()
            .expect("action_item_flow definition is structurally valid"),
    )
}

/// Agenda-item authoring and approval flow.
#[must_use]
pub fn agenda_item_flow() -> Arc<WorkflowDefinition> {
    Arc::new(
        DefinitionBuilder::new("agenda_item_flow")
            .initial_step("draft")
            .transition("draft", "submitted", "submit")
            .transition("draft", "withdrawn", "withdraw")
            .transition("submitted", "approved", "approve")
            .transition("submitted", "deferred", "defer")
            .transition("submitted", "withdrawn", "withdraw")
            .transition("deferred", "submitted", "resubmit")
            .transition("approved", "completed", "complete")
            .build()
            .expect("agenda_item_flow definition is structurally valid"),
    )
}

/// Meeting scheduling and execution flow.
#[must_use]
pub fn meeting_flow() -> Arc<WorkflowDefinition> {
    Arc::new(
        DefinitionBuilder::new("meeting_flow")
            .initial_step("draft")
            .transition("draft", "scheduled", "schedule")
            .transition("draft", "cancelled", "cancel")
            .transition("scheduled", "in_progress", "open")
            .transition("scheduled", "cancelled", "cancel")
            .transition("in_progress", "completed", "close")
            .build()
            .expect("meeting_flow definition is structurally valid"),
    )
}

/// Minute drafting and approval flow.
///
/// `approve` refuses the recorded author approving their own minute.
#[must_use]
pub fn minute_flow() -> Arc<WorkflowDefinition> {
    Arc::new(
        DefinitionBuilder::new("minute_flow")
            .initial_step("drafted")
            .transition("drafted", "submitted", "submit")
            .guarded_transition("submitted", "approved", "approve", rejects_self_approval())
            .transition("submitted", "drafted", "revise")
            .build()
            .expect("minute_flow definition is structurally valid"),
    )
}

/// All catalog definitions, for bulk registration.
#[must_use]
pub fn all() -> Vec<Arc<WorkflowDefinition>> {
    vec![
        external_request_flow(),
        action_item_flow(),
        agenda_item_flow(),
        meeting_flow(),
        minute_flow(),
    ]
}
