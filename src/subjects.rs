//! Subject binding values.
//!
//! A workflow instance drives exactly one *subject*: an agenda item, an
//! action item, an external request, a meeting, or a minute. The engine only
//! needs enough identity to find the instance again; the subject entities
//! themselves live outside the core.

use std::fmt;

/// The category of entity a workflow instance is bound to.
///
/// The well-known variants cover the meeting domain; `Custom` is the escape
/// hatch for integrators driving other entity types. Persisted as a string
/// via [`encode`](Self::encode)/[`decode`](Self::decode).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    AgendaItem,
    ActionItem,
    ExternalRequest,
    Meeting,
    Minute,
    /// Integrator-defined subject category.
    Custom(String),
}

impl SubjectKind {
    /// Encode into the persisted string form.
    ///
    /// ```rust
    /// # use agendaflow::subjects::SubjectKind;
    /// assert_eq!(SubjectKind::AgendaItem.encode(), "agenda_item");
    /// assert_eq!(SubjectKind::Custom("motion".into()).encode(), "motion");
    /// ```
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::AgendaItem => "agenda_item".to_string(),
            Self::ActionItem => "action_item".to_string(),
            Self::ExternalRequest => "external_request".to_string(),
            Self::Meeting => "meeting".to_string(),
            Self::Minute => "minute".to_string(),
            Self::Custom(s) => s.clone(),
        }
    }

    /// Decode a persisted string form, falling back to `Custom` for anything
    /// unrecognized so future kinds round-trip.
    pub fn decode(s: &str) -> Self {
        match s {
            "agenda_item" => Self::AgendaItem,
            "action_item" => Self::ActionItem,
            "external_request" => Self::ExternalRequest,
            "meeting" => Self::Meeting,
            "minute" => Self::Minute,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl From<&str> for SubjectKind {
    fn from(s: &str) -> Self {
        Self::decode(s)
    }
}

/// Identity of one concrete subject, e.g. `agenda_item:42`.
///
/// The engine expects a 1:1 binding between a subject and a live instance;
/// enforcing uniqueness is the caller's job (the repository can enumerate
/// instances per subject to check).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubjectRef {
    pub kind: SubjectKind,
    /// Entity key within the kind (primary key, UUID, slug...).
    pub key: String,
}

impl SubjectRef {
    pub fn new(kind: SubjectKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.key)
    }
}
