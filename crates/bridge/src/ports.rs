//! Port traits implemented by the infrastructure crates.
//!
//! The domain never constructs these; the composition root injects concrete
//! implementations (`jira::JiraClient`, `gerrit::GerritRestClient`). Both
//! traits require `Send + Sync` because one instance is shared by every source
//! task and may be called concurrently.

use async_trait::async_trait;

use crate::{
    Issue, IssueComment, IssueKey, LookupError, ProjectPath, Revision, SourceName, TrackerError,
};

/// The issue tracker the bridge writes comments to.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Looks up the issue for `key`.
    ///
    /// Returns [`TrackerError::NotFound`] when the issue does not exist or is
    /// not visible to the bridge user.
    async fn find_issue(&self, key: &IssueKey) -> Result<Issue, TrackerError>;

    /// Adds a comment with `body` to `issue`. Not idempotent.
    async fn add_comment(&self, issue: &Issue, body: &str) -> Result<(), TrackerError>;

    /// Lists the existing comments of `issue`, oldest first.
    async fn list_comments(&self, issue: &Issue) -> Result<Vec<IssueComment>, TrackerError>;
}

/// Resolves the full commit message of a revision on a given upstream server.
#[async_trait]
pub trait CommitLookup: Send + Sync {
    async fn commit_message(
        &self,
        source: &SourceName,
        project: &ProjectPath,
        revision: &Revision,
    ) -> Result<String, LookupError>;

    /// Web root of `source` used for gitiles links, if known.
    fn web_url(&self, source: &SourceName) -> Option<String>;
}
