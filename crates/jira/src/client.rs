use std::time::Duration;

use async_trait::async_trait;
use bridge::{error_chain, Issue, IssueComment, IssueKey, IssueTracker, TrackerError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const COMMENT_PAGE_SIZE: u64 = 100;

/// Connection settings for [`JiraClient`].
#[derive(Clone)]
pub struct JiraConfig {
    /// Site root, e.g. `https://example.atlassian.net`.
    pub site: String,
    pub user: String,
    /// Password or API token.
    pub password: String,
    pub request_timeout: Duration,
    /// Skip TLS certificate verification (self-hosted instances with private CAs).
    pub accept_invalid_certs: bool,
}

impl std::fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraConfig")
            .field("site", &self.site)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

/// The client could not be constructed.
#[derive(Debug, Error)]
pub enum JiraClientError {
    #[error("jira site `{site}` is not an absolute http(s) URL")]
    InvalidSite { site: String },

    #[error("failed to create jira http client")]
    Build(#[source] reqwest::Error),
}

/// [`IssueTracker`] backed by the Jira REST API v2.
#[derive(Clone)]
pub struct JiraClient {
    http: reqwest::Client,
    api_base: String,
    user: String,
    password: String,
}

impl std::fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraClient")
            .field("api_base", &self.api_base)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    id: String,
    key: String,
    #[serde(default)]
    fields: IssueFields,
}

#[derive(Debug, Default, Deserialize)]
struct IssueFields {
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentPage {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    comments: Vec<CommentResponse>,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    id: String,
    #[serde(default)]
    body: String,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Result<Self, JiraClientError> {
        let site = config.site.trim_end_matches('/').to_string();
        let parsed = url::Url::parse(&site).map_err(|_| JiraClientError::InvalidSite {
            site: config.site.clone(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(JiraClientError::InvalidSite { site: config.site });
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("gerrit2jira"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout.max(Duration::from_millis(1)))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(JiraClientError::Build)?;

        if config.accept_invalid_certs {
            tracing::warn!(subsystem = "lifecycle", site = %site, "jira TLS certificate verification disabled");
        }

        Ok(Self {
            http,
            api_base: format!("{site}/rest/api/2"),
            user: config.user,
            password: config.password,
        })
    }

    fn issue_url(&self, key: &IssueKey) -> String {
        format!("{}/issue/{}", self.api_base, key)
    }

    async fn send(
        &self,
        operation: &'static str,
        key: &IssueKey,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, TrackerError> {
        let response = request
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await
            .map_err(|err| TrackerError::Transport {
                operation,
                message: error_chain(&err),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TrackerError::NotFound { key: key.clone() });
        }

        let body = response.text().await.unwrap_or_default();
        Err(TrackerError::Rejected {
            operation,
            status: status.as_u16(),
            message: truncate_for_error(&body, 800),
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        key: &IssueKey,
        request: reqwest::RequestBuilder,
    ) -> Result<T, TrackerError> {
        self.send(operation, key, request)
            .await?
            .json::<T>()
            .await
            .map_err(|err| TrackerError::Transport {
                operation,
                message: error_chain(&err),
            })
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn find_issue(&self, key: &IssueKey) -> Result<Issue, TrackerError> {
        let request = self
            .http
            .get(self.issue_url(key))
            .query(&[("fields", "summary")]);
        let found: IssueResponse = self.send_json("find issue", key, request).await?;

        // A moved issue answers under its new key.
        let resolved = IssueKey::new(&found.key).unwrap_or_else(|| key.clone());
        if &resolved != key {
            tracing::debug!(subsystem = "changeset", requested = %key, resolved = %resolved, "issue key was redirected");
        }

        Ok(Issue {
            key: resolved,
            id: found.id,
            summary: found.fields.summary,
        })
    }

    async fn add_comment(&self, issue: &Issue, body: &str) -> Result<(), TrackerError> {
        let request = self
            .http
            .post(format!("{}/comment", self.issue_url(&issue.key)))
            .json(&json!({ "body": body }));
        self.send("add comment", &issue.key, request).await?;
        Ok(())
    }

    async fn list_comments(&self, issue: &Issue) -> Result<Vec<IssueComment>, TrackerError> {
        let mut comments = Vec::new();
        loop {
            let start_at = comments.len().to_string();
            let page_size = COMMENT_PAGE_SIZE.to_string();
            let request = self
                .http
                .get(format!("{}/comment", self.issue_url(&issue.key)))
                .query(&[
                    ("startAt", start_at.as_str()),
                    ("maxResults", page_size.as_str()),
                ]);
            let page: CommentPage = self.send_json("list comments", &issue.key, request).await?;

            let fetched = page.comments.len();
            comments.extend(page.comments.into_iter().map(|comment| IssueComment {
                id: comment.id,
                body: comment.body,
            }));
            if fetched == 0 || comments.len() as u64 >= page.total {
                break;
            }
        }
        Ok(comments)
    }
}

fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}...")
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
