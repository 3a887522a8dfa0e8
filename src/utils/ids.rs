//! Id generation port for instances and checkpoints.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Source of collision-resistant ids.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> Uuid;
}

/// Production id source: random UUIDv4.
#[derive(Debug, Default)]
pub struct UuidIdSource;

impl UuidIdSource {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl IdSource for UuidIdSource {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Deterministic id source for tests: 1, 2, 3... embedded in a UUID.
///
/// ```rust
/// use agendaflow::utils::ids::{IdSource, SequentialIdSource};
///
/// let ids = SequentialIdSource::new();
/// let a = ids.next_id();
/// let b = ids.next_id();
/// assert_ne!(a, b);
/// assert_eq!(a, uuid::Uuid::from_u128(1));
/// ```
#[derive(Debug, Default)]
pub struct SequentialIdSource {
    counter: AtomicU64,
}

impl SequentialIdSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequentialIdSource {
    fn next_id(&self) -> Uuid {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Uuid::from_u128(u128::from(n))
    }
}
