//! Core domain of gerrit2jira.
//!
//! Turns lines of Gerrit's `stream-events` feed into tracker comments:
//! decode a line into an [`EventEnvelope`], route it by event type through the
//! [`EventRouter`], and let the bound handler extract issue keys, compose the
//! comment and submit it through the [`IssueTracker`] port.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! Feeds, HTTP clients and configuration live in the `listener`, `jira`,
//! `gerrit` and `cli` crates.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`IssueKey`, `SourceName`, `EventId`, etc.) |
//! | [`types`] | Shared value types (`EventType`, `DispatchOutcome`, `Issue`, etc.) |
//! | [`errors`] | Decode, payload, port and handler error types |
//! | [`envelope`] | `EventEnvelope` and the line decoder |
//! | [`extractor`] | Issue-key extraction from commit messages |
//! | [`payload`] | Narrow accessors over untyped event payloads |
//! | [`composer`] | Comment rendering |
//! | [`router`] | `EventHandler` trait and `EventRouter` |
//! | [`handlers`] | `change-merged` and `ref-updated` handlers |
//! | [`ports`] | `IssueTracker` and `CommitLookup` traits |

pub mod composer;
pub mod envelope;
pub mod errors;
pub mod extractor;
pub mod handlers;
pub mod identifiers;
pub mod payload;
pub mod ports;
pub mod router;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use composer::{
    compose, compose_ref_update, gitiles_commit_link, CommentDraft, CommentLabel, CommentLine,
};
pub use envelope::{decode, EventEnvelope};
pub use errors::{error_chain, DecodeError, HandlerError, LookupError, PayloadError, TrackerError};
pub use extractor::{extract, extract_unique};
pub use handlers::{ChangeMergedHandler, RefUpdatedHandler, CHANGE_MERGED, REF_UPDATED};
pub use identifiers::{EventId, IssueKey, ProjectPath, Revision, SourceName};
pub use payload::{ChangeMergedPayload, RefUpdatedPayload};
pub use ports::{CommitLookup, IssueTracker};
pub use router::{EventHandler, EventRouter};
pub use types::{routing_key, DispatchOutcome, EventType, Issue, IssueComment, Timestamp};
