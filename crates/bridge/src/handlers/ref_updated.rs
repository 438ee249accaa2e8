//! Handler for `ref-updated` events.
//!
//! Direct pushes bypass review and never produce `change-merged`. For those the
//! commit message is fetched from the server and each referenced issue gets a
//! one-line comment, unless an existing comment already mentions the revision.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::error_chain;
use crate::{
    compose_ref_update, extract_unique, CommitLookup, EventHandler, HandlerError, IssueTracker,
    LookupError, RefUpdatedPayload, SourceName,
};

pub struct RefUpdatedHandler {
    tracker: Arc<dyn IssueTracker>,
    commits: Arc<dyn CommitLookup>,
}

impl RefUpdatedHandler {
    pub fn new(tracker: Arc<dyn IssueTracker>, commits: Arc<dyn CommitLookup>) -> Self {
        Self { tracker, commits }
    }
}

#[async_trait]
impl EventHandler for RefUpdatedHandler {
    async fn handle(&self, payload: &Value, source: &SourceName) -> Result<bool, HandlerError> {
        let event = RefUpdatedPayload::from_value(payload)?;
        if event.is_deletion() {
            tracing::debug!(
                subsystem = "refupdate",
                project = %event.project,
                ref_name = %event.ref_name,
                "ref deleted, nothing to comment"
            );
            return Ok(true);
        }

        let web_url = self
            .commits
            .web_url(source)
            .ok_or_else(|| LookupError::UnknownSource {
                source_name: source.to_string(),
            })?;

        tracing::debug!(
            subsystem = "refupdate",
            project = %event.project,
            revision = %event.new_revision,
            "getting the commit message"
        );
        let commit_message = self
            .commits
            .commit_message(source, &event.project, &event.new_revision)
            .await?;

        let keys = extract_unique(&commit_message);
        if keys.is_empty() {
            tracing::error!(
                subsystem = "refupdate",
                payload = %payload,
                "no tracker issue found in event"
            );
            return Ok(false);
        }

        let body = compose_ref_update(&event, source, &web_url);
        let mut applied = 0_usize;

        for key in &keys {
            let issue = match self.tracker.find_issue(key).await {
                Ok(issue) => issue,
                Err(err) => {
                    tracing::error!(
                        subsystem = "refupdate",
                        issue = %key,
                        error = %error_chain(&err),
                        "cannot find issue in tracker"
                    );
                    continue;
                }
            };

            let already_included = match self.tracker.list_comments(&issue).await {
                Ok(comments) => comments
                    .iter()
                    .any(|comment| comment.body.contains(event.new_revision.as_str())),
                Err(err) => {
                    tracing::error!(
                        subsystem = "refupdate",
                        issue = %key,
                        error = %error_chain(&err),
                        "cannot list comments of issue"
                    );
                    continue;
                }
            };

            if already_included {
                tracing::info!(
                    subsystem = "refupdate",
                    issue = %key,
                    revision = %event.new_revision,
                    "not adding comment, revision already included"
                );
                applied += 1;
                continue;
            }

            match self.tracker.add_comment(&issue, &body).await {
                Ok(()) => {
                    tracing::debug!(subsystem = "refupdate", issue = %key, body = %body, "added comment");
                    applied += 1;
                }
                Err(err) => {
                    tracing::error!(
                        subsystem = "refupdate",
                        issue = %key,
                        error = %error_chain(&err),
                        "cannot add comment to issue"
                    );
                }
            }
        }

        if applied == 0 {
            tracing::error!(
                subsystem = "refupdate",
                candidates = keys.len(),
                payload = %payload,
                "no tracker issue found in event"
            );
        }
        Ok(applied > 0)
    }
}
