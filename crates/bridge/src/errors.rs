//! Error types for the gerrit2jira domain.
//!
//! Every error here is recoverable at some boundary: decode errors at the feed
//! loop, tracker and lookup errors per issue key, handler errors at the
//! dispatcher. Nothing in this module is process-fatal.

use thiserror::Error;

use crate::IssueKey;

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// A raw feed line could not be turned into an [`crate::EventEnvelope`].
///
/// The feed loop logs it and moves on to the next line.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The line is not valid JSON.
    #[error("event line is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The line is valid JSON but not an object.
    #[error("event line is not a JSON object")]
    NotAnObject,

    /// The object has no string `type` member.
    #[error("event has no `type` discriminator")]
    MissingType,
}

// ---------------------------------------------------------------------------
// Payload access
// ---------------------------------------------------------------------------

/// A handler could not read a field it needs from an event payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    /// The field is absent, null, or not a string.
    #[error("event payload is missing `{field}`")]
    MissingField {
        /// JSON path of the field, dot separated (e.g. `change.commitMessage`).
        field: &'static str,
    },

    /// A URL field could not be parsed.
    #[error("event payload field `{field}` is not a valid URL: {value}")]
    InvalidUrl {
        field: &'static str,
        value: String,
    },
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Failure reported by an [`crate::IssueTracker`] implementation.
///
/// Always non-fatal to the handler: the affected key is logged and skipped.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The issue does not exist or the bridge user cannot see it.
    #[error("issue {key} not found")]
    NotFound { key: IssueKey },

    /// The tracker rejected the request (authentication, permissions, validation).
    #[error("tracker rejected {operation} with status {status}: {message}")]
    Rejected {
        operation: &'static str,
        status: u16,
        message: String,
    },

    /// The request did not complete (connection, TLS, timeout, body decoding).
    #[error("tracker {operation} failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },
}

/// Failure reported by a [`crate::CommitLookup`] implementation.
#[derive(Debug, Error)]
pub enum LookupError {
    /// No REST endpoint is configured for the source the event came from.
    #[error("no commit lookup configured for source {source_name}")]
    UnknownSource { source_name: String },

    /// The revision is unknown to the server.
    #[error("revision {revision} not found in {project}")]
    NotFound { project: String, revision: String },

    /// The request did not complete or was rejected.
    #[error("commit lookup failed: {message}")]
    Transport { message: String },
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// A handler could not process an event at all.
///
/// The dispatcher converts every variant into
/// [`crate::DispatchOutcome::HandledFailure`].
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("could not fetch commit message")]
    CommitLookup(#[from] LookupError),
}

/// Renders `err` followed by its `source()` chain, separated by `": "`.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
