//! Event envelope and the line decoder that produces it.
//!
//! Gerrit's `stream-events` writes one JSON object per line. Each object
//! carries a `type` member; everything else is event-specific. The envelope
//! keeps the whole object verbatim as its payload and handlers read what they
//! need through the accessors in [`crate::payload`].

use serde_json::Value;

use crate::{DecodeError, EventId, EventType, SourceName, Timestamp};

/// One decoded event record plus the name of the server that produced it.
///
/// Created per feed line, consumed by one dispatch, then dropped.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    /// Correlation identifier for log output.
    pub event_id: EventId,

    /// The event's `type` member as received.
    pub event_type: EventType,

    /// Upstream server the line was read from.
    pub source: SourceName,

    /// When the line was decoded.
    pub received_at: Timestamp,

    /// The full event object.
    pub payload: Value,
}

impl EventEnvelope {
    /// Wraps an already-parsed event object.
    pub fn new(event_type: EventType, source: SourceName, payload: Value) -> Self {
        Self {
            event_id: EventId::new_random(),
            event_type,
            source,
            received_at: Timestamp::now(),
            payload,
        }
    }
}

/// Parses one feed line into an [`EventEnvelope`] tagged with `source`.
///
/// # Errors
///
/// - [`DecodeError::InvalidJson`] if the line is not JSON.
/// - [`DecodeError::NotAnObject`] if it is JSON but not an object.
/// - [`DecodeError::MissingType`] if the object has no non-empty string `type`.
pub fn decode(line: &str, source: &SourceName) -> Result<EventEnvelope, DecodeError> {
    let payload: Value = serde_json::from_str(line)?;
    let object = payload.as_object().ok_or(DecodeError::NotAnObject)?;
    let event_type = object
        .get("type")
        .and_then(Value::as_str)
        .and_then(EventType::new)
        .ok_or(DecodeError::MissingType)?;

    Ok(EventEnvelope::new(event_type, source.clone(), payload))
}
