//! In-memory [`IssueTracker`] and [`CommitLookup`] fakes for handler tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    CommitLookup, Issue, IssueComment, IssueKey, IssueTracker, LookupError, ProjectPath, Revision,
    SourceName, TrackerError,
};

#[derive(Default)]
pub(crate) struct FakeTracker {
    issues: HashMap<String, Vec<IssueComment>>,
    rejecting_comments: HashSet<String>,
    lookups: Mutex<Vec<String>>,
    posted: Mutex<Vec<(String, String)>>,
}

impl FakeTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers an existing issue with no comments.
    pub(crate) fn with_issue(self, key: &str) -> Self {
        self.with_comments(key, &[])
    }

    /// Registers an existing issue carrying `bodies` as comments.
    pub(crate) fn with_comments(mut self, key: &str, bodies: &[&str]) -> Self {
        let comments = bodies
            .iter()
            .enumerate()
            .map(|(i, body)| IssueComment {
                id: (i + 1).to_string(),
                body: body.to_string(),
            })
            .collect();
        self.issues.insert(key.to_string(), comments);
        self
    }

    /// Makes `add_comment` fail for `key`.
    pub(crate) fn rejecting_comments_on(mut self, key: &str) -> Self {
        self.rejecting_comments.insert(key.to_string());
        self
    }

    pub(crate) fn lookups(&self) -> Vec<String> {
        self.lookups.lock().expect("lock").clone()
    }

    /// `(issue key, body)` of every comment added.
    pub(crate) fn posted(&self) -> Vec<(String, String)> {
        self.posted.lock().expect("lock").clone()
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn find_issue(&self, key: &IssueKey) -> Result<Issue, TrackerError> {
        self.lookups
            .lock()
            .expect("lock")
            .push(key.as_str().to_string());
        if self.issues.contains_key(key.as_str()) {
            Ok(Issue {
                key: key.clone(),
                id: format!("id-{key}"),
                summary: None,
            })
        } else {
            Err(TrackerError::NotFound { key: key.clone() })
        }
    }

    async fn add_comment(&self, issue: &Issue, body: &str) -> Result<(), TrackerError> {
        if self.rejecting_comments.contains(issue.key.as_str()) {
            return Err(TrackerError::Rejected {
                operation: "add comment",
                status: 403,
                message: "forbidden".to_string(),
            });
        }
        self.posted
            .lock()
            .expect("lock")
            .push((issue.key.as_str().to_string(), body.to_string()));
        Ok(())
    }

    async fn list_comments(&self, issue: &Issue) -> Result<Vec<IssueComment>, TrackerError> {
        Ok(self.issues.get(issue.key.as_str()).cloned().unwrap_or_default())
    }
}

/// Answers every lookup with a fixed message, or fails when none is set.
pub(crate) struct FakeCommits {
    pub(crate) message: Option<String>,
    pub(crate) web_url: Option<String>,
}

#[async_trait]
impl CommitLookup for FakeCommits {
    async fn commit_message(
        &self,
        _source: &SourceName,
        project: &ProjectPath,
        revision: &Revision,
    ) -> Result<String, LookupError> {
        self.message.clone().ok_or_else(|| LookupError::NotFound {
            project: project.to_string(),
            revision: revision.to_string(),
        })
    }

    fn web_url(&self, _source: &SourceName) -> Option<String> {
        self.web_url.clone()
    }
}
