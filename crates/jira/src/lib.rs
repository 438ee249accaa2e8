//! gerrit2jira Jira infrastructure adapter.
//!
//! Implements the [`bridge::IssueTracker`] trait against the Jira REST API v2
//! using HTTP basic authentication.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. Request
//! building, status mapping and pagination are handled here; the [`bridge`]
//! crate only sees [`bridge::Issue`], [`bridge::IssueComment`] and
//! [`bridge::TrackerError`].
//!
//! ## Concurrency
//!
//! [`JiraClient`] wraps a single `reqwest::Client`, which pools connections
//! and is safe to share. One instance serves every source task.

mod client;

pub use client::{JiraClient, JiraClientError, JiraConfig};
