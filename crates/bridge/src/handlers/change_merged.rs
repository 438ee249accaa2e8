//! Handler for `change-merged` events.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::error_chain;
use crate::{
    compose, extract_unique, ChangeMergedPayload, EventHandler, HandlerError, IssueTracker,
    SourceName,
};

/// Comments on every issue a merged change's commit message mentions.
///
/// Keys are processed one at a time. A key that cannot be found or commented
/// on is logged and skipped; the event succeeds if at least one comment was
/// posted. No check is made for an existing comment about the same change.
pub struct ChangeMergedHandler {
    tracker: Arc<dyn IssueTracker>,
}

impl ChangeMergedHandler {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl EventHandler for ChangeMergedHandler {
    async fn handle(&self, payload: &Value, source: &SourceName) -> Result<bool, HandlerError> {
        let event = ChangeMergedPayload::from_value(payload)?;
        tracing::debug!(
            subsystem = "changeset",
            title = %event.subject,
            commit_message = %event.commit_message,
            "send change merged to tracker"
        );

        let keys = extract_unique(&event.commit_message);
        if keys.is_empty() {
            tracing::error!(
                subsystem = "changeset",
                payload = %payload,
                "no tracker issue found in event"
            );
            return Ok(false);
        }

        let draft = compose(&event, source)?;
        let body = draft.body();
        let mut commented = 0_usize;

        for key in &keys {
            tracing::debug!(subsystem = "changeset", issue = %key, "found issue key");

            let issue = match self.tracker.find_issue(key).await {
                Ok(issue) => issue,
                Err(err) => {
                    tracing::error!(
                        subsystem = "changeset",
                        issue = %key,
                        error = %error_chain(&err),
                        "cannot find issue in tracker"
                    );
                    continue;
                }
            };

            tracing::debug!(subsystem = "changeset", issue = %key, body = %body, "adding comment");
            match self.tracker.add_comment(&issue, &body).await {
                Ok(()) => commented += 1,
                Err(err) => {
                    tracing::error!(
                        subsystem = "changeset",
                        issue = %key,
                        error = %error_chain(&err),
                        "cannot add comment to issue"
                    );
                }
            }
        }

        if commented == 0 {
            tracing::error!(
                subsystem = "changeset",
                candidates = keys.len(),
                payload = %payload,
                "no tracker issue found in event"
            );
            return Ok(false);
        }

        tracing::info!(
            subsystem = "changeset",
            commented,
            candidates = keys.len(),
            "commented merged change"
        );
        Ok(true)
    }
}

#[cfg(test)]
#[path = "change_merged_tests.rs"]
mod tests;
