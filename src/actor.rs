//! Actor identity for workflow operations.
//!
//! Every engine operation is attributed to an [`Actor`] and recorded verbatim
//! in the instance history. The engine treats actors as opaque: authorization
//! happened before the call, and the engine never inspects the identity beyond
//! equality checks inside guards that choose to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque identity token for whoever is driving a workflow instance.
///
/// Actors are immutable values. The engine records them in history events and
/// hands them to guard predicates; it never validates them.
///
/// # Examples
///
/// ```rust
/// use agendaflow::actor::Actor;
///
/// let alice = Actor::new("alice");
/// assert_eq!(alice.name, "alice");
/// assert_eq!(alice.to_string(), "alice");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// The identity token supplied by the caller.
    pub name: String,
}

impl Actor {
    /// Creates an actor from any string-like identity.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<&str> for Actor {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
