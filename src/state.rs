//! Instance state: the opaque data bag and the snapshot view handed to guards.
//!
//! A workflow instance carries its collected data in a [`DataMap`], a keyed
//! bag of arbitrary JSON values. Successful commands merge their payload into
//! the bag shallowly; checkpoints deep-clone it.
//!
//! Guards never see the live instance. They receive an [`InstanceSnapshot`],
//! a cloned, point-in-time view that cannot alias or mutate engine state.
//!
//! # Examples
//!
//! ```rust
//! use agendaflow::state::{DataMap, merge_payload};
//! use serde_json::json;
//!
//! let mut data = DataMap::default();
//! data.insert("requester".into(), json!("Colin"));
//! data.insert("notes".into(), json!("old"));
//!
//! let mut payload = DataMap::default();
//! payload.insert("notes".into(), json!("new"));
//!
//! merge_payload(&mut data, &payload);
//! assert_eq!(data.get("notes"), Some(&json!("new")));
//! assert_eq!(data.get("requester"), Some(&json!("Colin")));
//! ```

use rustc_hash::FxHashMap;
use serde_json::Value;
use uuid::Uuid;

/// The per-instance keyed value store merged by successful commands.
///
/// Keys are strings; values are arbitrary serializable JSON. Cloning a
/// `DataMap` is a deep clone: nested objects and arrays are copied, never
/// shared.
pub type DataMap = FxHashMap<String, Value>;

/// Merge `payload` into `data` shallowly, key by key. Payload values win.
///
/// Nested structures are replaced wholesale, not merged recursively.
pub fn merge_payload(data: &mut DataMap, payload: &DataMap) {
    for (key, value) in payload {
        data.insert(key.clone(), value.clone());
    }
}

/// Immutable point-in-time view of a workflow instance.
///
/// Snapshots are cloned from the live instance before guard evaluation, so a
/// guard can read freely without any way of mutating engine state, and later
/// mutations of the instance are invisible through an already-taken snapshot.
#[derive(Clone, Debug)]
pub struct InstanceSnapshot {
    /// Id of the instance the snapshot was taken from.
    pub instance_id: Uuid,
    /// Instance display name.
    pub name: String,
    /// Step the instance was on at snapshot time.
    pub current_step: String,
    /// Deep-cloned data bag at snapshot time.
    pub data: DataMap,
    /// Number of checkpoints saved at snapshot time.
    pub checkpoint_count: usize,
    /// Active checkpoint pointer at snapshot time; `None` means live.
    pub active_checkpoint_id: Option<Uuid>,
}
