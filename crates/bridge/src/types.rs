//! Shared value types for the gerrit2jira domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! values that flow between the router, the handlers and the tracker port.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::IssueKey;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// The `type` discriminator of a Gerrit event (e.g. `"change-merged"`).
///
/// The original spelling is kept for logging. Routing uses
/// [`EventType::routing_key`], which treats `-` and `_` as the same character.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct EventType(String);

impl EventType {
    /// Creates an [`EventType`], returning `None` if the value is empty.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.is_empty() {
            None
        } else {
            Some(Self(v))
        }
    }

    /// Returns the type name exactly as received.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the normalized routing key for this type.
    pub fn routing_key(&self) -> String {
        routing_key(&self.0)
    }
}

impl TryFrom<String> for EventType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "event type must not be empty".to_string())
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalizes an event type name into a routing key (`-` becomes `_`).
pub fn routing_key(event_type: &str) -> String {
    event_type.replace('-', "_")
}

// ---------------------------------------------------------------------------
// Dispatch outcome
// ---------------------------------------------------------------------------

/// Result of routing one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// A handler ran and reported success.
    HandledSuccess,
    /// A handler ran but failed, returned an error, or panicked.
    HandledFailure,
    /// No handler is registered for the event type. Expected and frequent.
    Unhandled,
}

// ---------------------------------------------------------------------------
// Tracker values
// ---------------------------------------------------------------------------

/// An issue as returned by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Key the issue was found under.
    pub key: IssueKey,
    /// Tracker-internal identifier.
    pub id: String,
    /// Issue summary line, when the tracker returned one.
    pub summary: Option<String>,
}

/// One existing comment on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_key_treats_dash_and_underscore_alike() {
        let dashed = EventType::new("change-merged").expect("non-empty");
        let underscored = EventType::new("change_merged").expect("non-empty");
        assert_eq!(dashed.routing_key(), underscored.routing_key());
        assert_eq!(dashed.as_str(), "change-merged");
    }

    #[test]
    fn dispatch_outcome_serialises_snake_case() {
        let json = serde_json::to_string(&DispatchOutcome::HandledFailure).expect("serialise");
        assert_eq!(json, "\"handled_failure\"");
    }

    #[test]
    fn empty_event_type_does_not_deserialize() {
        assert!(serde_json::from_str::<EventType>("\"\"").is_err());
        let parsed: EventType = serde_json::from_str("\"ref-updated\"").expect("non-empty");
        assert_eq!(parsed.as_str(), "ref-updated");
    }
}
