//! gerrit2jira Gerrit REST adapter.
//!
//! Implements [`bridge::CommitLookup`] by calling
//! `GET /projects/{project}/commits/{revision}` on the Gerrit server an event
//! came from. Only `ref-updated` handling needs this: `change-merged` events
//! carry the commit message inline.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** URL building, the XSSI response prefix and
//! authentication are handled here.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bridge::{error_chain, CommitLookup, LookupError, ProjectPath, Revision, SourceName};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Gerrit prefixes JSON responses with this line to defeat XSSI.
const XSSI_PREFIX: &str = ")]}'";

/// REST access to one Gerrit server.
#[derive(Clone)]
pub struct GerritServer {
    /// Web root, e.g. `https://gerrit.example.com` or `https://example.com/gerrit`.
    pub web_url: String,
    /// HTTP credentials. When set, requests go to the authenticated `/a/` API.
    pub credentials: Option<(String, String)>,
}

impl std::fmt::Debug for GerritServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GerritServer")
            .field("web_url", &self.web_url)
            .field("user", &self.credentials.as_ref().map(|(user, _)| user))
            .finish()
    }
}

/// The client could not be constructed.
#[derive(Debug, Error)]
pub enum GerritClientError {
    #[error("gerrit url `{url}` for source {source_name} is not an absolute http(s) URL")]
    InvalidUrl { source_name: String, url: String },

    #[error("failed to create gerrit http client")]
    Build(#[source] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct CommitInfo {
    message: String,
}

/// [`CommitLookup`] over the REST APIs of every configured source.
#[derive(Debug, Clone)]
pub struct GerritRestClient {
    http: reqwest::Client,
    servers: HashMap<SourceName, (Url, GerritServer)>,
}

impl GerritRestClient {
    pub fn new(
        servers: impl IntoIterator<Item = (SourceName, GerritServer)>,
        request_timeout: Duration,
    ) -> Result<Self, GerritClientError> {
        let servers = servers
            .into_iter()
            .map(|(source, server)| {
                let url = parse_web_url(&source, &server.web_url)?;
                Ok((source, (url, server)))
            })
            .collect::<Result<HashMap<_, _>, GerritClientError>>()?;

        let http = reqwest::Client::builder()
            .user_agent("gerrit2jira")
            .timeout(request_timeout.max(Duration::from_millis(1)))
            .build()
            .map_err(GerritClientError::Build)?;

        Ok(Self { http, servers })
    }

    /// URL of the commit endpoint; the project is one encoded path segment.
    fn commit_url(
        base: &Url,
        authenticated: bool,
        project: &ProjectPath,
        revision: &Revision,
    ) -> Result<Url, LookupError> {
        let mut url = base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| LookupError::Transport {
                message: format!("gerrit url {base} cannot carry a path"),
            })?;
            segments.pop_if_empty();
            if authenticated {
                segments.push("a");
            }
            segments.extend(["projects", project.as_str(), "commits", revision.as_str()]);
        }
        Ok(url)
    }
}

#[async_trait]
impl CommitLookup for GerritRestClient {
    async fn commit_message(
        &self,
        source: &SourceName,
        project: &ProjectPath,
        revision: &Revision,
    ) -> Result<String, LookupError> {
        let (base, server) = self
            .servers
            .get(source)
            .ok_or_else(|| LookupError::UnknownSource {
                source_name: source.to_string(),
            })?;

        let url = Self::commit_url(base, server.credentials.is_some(), project, revision)?;
        tracing::debug!(subsystem = "refupdate", url = %url, "fetching commit");

        let mut request = self.http.get(url);
        if let Some((user, password)) = &server.credentials {
            request = request.basic_auth(user, Some(password));
        }

        let response = request.send().await.map_err(|err| LookupError::Transport {
            message: error_chain(&err),
        })?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound {
                project: project.to_string(),
                revision: revision.to_string(),
            });
        }
        let body = response.text().await.map_err(|err| LookupError::Transport {
            message: error_chain(&err),
        })?;
        if !status.is_success() {
            return Err(LookupError::Transport {
                message: format!("gerrit answered {}: {}", status.as_u16(), body.trim()),
            });
        }

        let commit: CommitInfo =
            serde_json::from_str(strip_xssi_prefix(&body)).map_err(|err| LookupError::Transport {
                message: format!("cannot decode commit info: {err}"),
            })?;
        Ok(commit.message)
    }

    fn web_url(&self, source: &SourceName) -> Option<String> {
        self.servers
            .get(source)
            .map(|(_, server)| server.web_url.trim_end_matches('/').to_string())
    }
}

fn parse_web_url(source: &SourceName, web_url: &str) -> Result<Url, GerritClientError> {
    let invalid = || GerritClientError::InvalidUrl {
        source_name: source.to_string(),
        url: web_url.to_string(),
    };
    let url = Url::parse(web_url).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(url)
}

fn strip_xssi_prefix(body: &str) -> &str {
    body.strip_prefix(XSSI_PREFIX).unwrap_or(body)
}
