//! gerrit2jira event source infrastructure.
//!
//! Reads Gerrit event feeds and pushes every line through a
//! [`bridge::EventRouter`]:
//!
//! - [`SshConnector`] runs `ssh <host> gerrit stream-events` and reads the
//!   child's stdout. The child is killed when its feed is dropped.
//! - [`ReplayFileConnector`] replays a recorded feed from disk.
//! - [`StreamSupervisor`] runs one tokio task per configured source and waits
//!   for all of them.
//!
//! ## Deployment Scenarios
//!
//! | Scenario | Connector | Notes |
//! |----------|-----------|-------|
//! | Production | `SshConnector` per Gerrit server | Key-based SSH auth, `Stream Events` capability required |
//! | Replay / dry run | `ReplayFileConnector` | Recorded `stream-events` output |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Process management, byte handling and task supervision
//! live here. The [`bridge`] crate sees only decoded envelopes.

pub mod feed;
pub mod supervisor;

pub use feed::{EventFeed, FeedConnector, FeedError, ReplayFileConnector, SshConnector};
pub use supervisor::{consume_feed, run_source, SourceReport, StreamSupervisor, Termination};
