//! gerrit2jira entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Load settings**: read the TOML settings file (decrypting `.gpg`
//!    files) and validate it.
//! 2. **Wire observability**: install the `tracing` subscriber and, when
//!    configured, the OTLP span exporter.
//! 3. **Construct infrastructure**: build the [`jira::JiraClient`], the
//!    [`gerrit::GerritRestClient`] when `ref-updated` handling is enabled, and
//!    one feed connector per source.
//! 4. **Run**: register the handlers on an [`bridge::EventRouter`] and hand
//!    every source to a [`listener::StreamSupervisor`].
//!
//! The process exits with status 0 once every source loop has ended (or on
//! Ctrl-C). Only startup failures produce a non-zero status.

mod config;
mod observability;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use bridge::{
    ChangeMergedHandler, CommitLookup, EventRouter, IssueTracker, RefUpdatedHandler, SourceName,
    CHANGE_MERGED, REF_UPDATED,
};
use clap::Parser;
use gerrit::{GerritRestClient, GerritServer};
use jira::{JiraClient, JiraConfig};
use listener::{FeedConnector, ReplayFileConnector, SshConnector, StreamSupervisor, Termination};

use crate::config::Settings;
use crate::observability::LogFormat;

/// Posts Jira comments for Gerrit merges.
#[derive(Debug, Parser)]
#[command(name = "gerrit2jira", version, about)]
struct Args {
    /// Settings file; a `.gpg` file is decrypted with `gpg --decrypt`.
    #[arg(long, default_value = "gerrit2jira.toml")]
    config: PathBuf,

    /// Log filter directives, e.g. `debug` or `info,bridge=debug`. Defaults to `RUST_LOG`.
    #[arg(long)]
    log_level: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Read a recorded event stream for SOURCE from FILE instead of connecting over SSH.
    #[arg(long = "replay", value_name = "SOURCE=FILE", value_parser = parse_replay)]
    replays: Vec<(String, PathBuf)>,

    #[arg(long, env = "GERRIT2JIRA_JIRA_PASSWORD", hide = true, hide_env_values = true)]
    jira_password: Option<String>,
}

fn parse_replay(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((source, file)) if !source.is_empty() && !file.is_empty() => {
            Ok((source.to_string(), PathBuf::from(file)))
        }
        _ => Err(format!("expected SOURCE=FILE, got `{value}`")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = Settings::load(&args.config, args.jira_password.clone())
        .with_context(|| format!("cannot load settings from {}", args.config.display()))?;

    let telemetry = observability::init(
        args.log_level.as_deref(),
        args.log_format,
        settings.telemetry.otlp_endpoint.as_deref(),
    )?;

    tracing::info!(
        subsystem = "lifecycle",
        version = env!("CARGO_PKG_VERSION"),
        sources = settings.sources.len(),
        "gerrit2jira starting"
    );

    let tracker: Arc<dyn IssueTracker> = Arc::new(
        JiraClient::new(JiraConfig {
            site: settings.jira.site.clone(),
            user: settings.jira.user.clone(),
            password: settings.jira.password.clone(),
            request_timeout: settings.jira.request_timeout(),
            accept_invalid_certs: settings.jira.accept_invalid_certs,
        })
        .context("cannot create jira client")?,
    );

    let router = build_router(&settings, tracker)?;
    let connectors = build_connectors(&settings, &args.replays)?;

    let mut supervisor = StreamSupervisor::new(Arc::new(router));
    for (name, connector) in connectors {
        supervisor.add_source(name, connector);
    }

    tokio::select! {
        reports = supervisor.run() => {
            for report in &reports {
                if report.termination != Termination::EndOfStream {
                    tracing::warn!(
                        subsystem = "lifecycle",
                        source = %report.source,
                        termination = ?report.termination,
                        "source loop ended abnormally"
                    );
                }
            }
        }
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => tracing::info!(subsystem = "lifecycle", "interrupted, shutting down"),
                Err(err) => tracing::error!(subsystem = "lifecycle", error = %err, "cannot listen for ctrl-c"),
            }
        }
    }

    tracing::info!(subsystem = "lifecycle", "gerrit2jira stopped");
    telemetry.shutdown();
    Ok(())
}

fn build_router(settings: &Settings, tracker: Arc<dyn IssueTracker>) -> anyhow::Result<EventRouter> {
    let mut router = EventRouter::new();

    if settings.handlers.change_merged {
        router.register(CHANGE_MERGED, Arc::new(ChangeMergedHandler::new(tracker.clone())));
    }

    if settings.handlers.ref_updated {
        let servers = settings
            .sources
            .iter()
            .map(|source| -> anyhow::Result<(SourceName, GerritServer)> {
                let name = source_name(&source.name)?;
                let web_url = source
                    .rest_url
                    .clone()
                    .with_context(|| format!("source `{}` has no rest_url", source.name))?;
                Ok((
                    name,
                    GerritServer {
                        web_url,
                        credentials: source.rest_credentials(),
                    },
                ))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        let commits: Arc<dyn CommitLookup> = Arc::new(
            GerritRestClient::new(servers, settings.jira.request_timeout())
                .context("cannot create gerrit client")?,
        );
        router.register(REF_UPDATED, Arc::new(RefUpdatedHandler::new(tracker, commits)));
    }

    if !router.handles(CHANGE_MERGED) && !router.handles(REF_UPDATED) {
        tracing::warn!(subsystem = "lifecycle", "no handlers enabled, events will only be logged");
    }

    Ok(router)
}

/// One connector per source: SSH by default, or only the replayed sources
/// when `--replay` is given.
fn build_connectors(
    settings: &Settings,
    replays: &[(String, PathBuf)],
) -> anyhow::Result<Vec<(SourceName, Arc<dyn FeedConnector>)>> {
    if replays.is_empty() {
        return settings
            .sources
            .iter()
            .map(|source| -> anyhow::Result<(SourceName, Arc<dyn FeedConnector>)> {
                let connector: Arc<dyn FeedConnector> =
                    Arc::new(SshConnector::new(source.ssh_destination(), source.ssh_port));
                Ok((source_name(&source.name)?, connector))
            })
            .collect();
    }

    let mut seen = HashSet::new();
    let mut connectors = Vec::with_capacity(replays.len());
    for (name, file) in replays {
        if settings.source(name).is_none() {
            bail!("--replay names unknown source `{name}`");
        }
        if !seen.insert(name.as_str()) {
            bail!("source `{name}` is replayed more than once");
        }
        let connector: Arc<dyn FeedConnector> = Arc::new(ReplayFileConnector::new(file.clone()));
        connectors.push((source_name(name)?, connector));
    }
    Ok(connectors)
}

fn source_name(name: &str) -> anyhow::Result<SourceName> {
    SourceName::new(name).with_context(|| format!("invalid source name `{name}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(extra: &str) -> Settings {
        Settings::from_toml_str(&format!(
            r#"
[jira]
site = "https://example.atlassian.net"
user = "bot"

[[sources]]
name = "gerrit.example.com"
rest_url = "https://gerrit.example.com"

[[sources]]
name = "review.example.org"
rest_url = "https://review.example.org"
{extra}
"#
        ))
        .expect("parses")
    }

    fn tracker() -> Arc<dyn IssueTracker> {
        Arc::new(
            JiraClient::new(JiraConfig {
                site: "https://example.atlassian.net".to_string(),
                user: "bot".to_string(),
                password: "secret".to_string(),
                request_timeout: std::time::Duration::from_secs(5),
                accept_invalid_certs: false,
            })
            .expect("client"),
        )
    }

    #[test]
    fn args_parse_replays() {
        let args = Args::try_parse_from([
            "gerrit2jira",
            "--config",
            "bridge.toml",
            "--log-format",
            "json",
            "--replay",
            "gerrit.example.com=/tmp/events.ndjson",
        ])
        .expect("valid args");

        assert_eq!(args.config, PathBuf::from("bridge.toml"));
        assert_eq!(args.log_format, LogFormat::Json);
        assert_eq!(
            args.replays,
            vec![(
                "gerrit.example.com".to_string(),
                PathBuf::from("/tmp/events.ndjson")
            )]
        );
    }

    #[test]
    fn malformed_replay_is_rejected() {
        assert!(parse_replay("events.ndjson").is_err());
        assert!(parse_replay("=events.ndjson").is_err());
        assert!(parse_replay("gerrit=").is_err());
    }

    #[test]
    fn default_router_handles_only_merges() {
        let router = build_router(&settings(""), tracker()).expect("router");
        assert!(router.handles("change-merged"));
        assert!(router.handles("change_merged"));
        assert!(!router.handles("ref-updated"));
    }

    #[test]
    fn ref_updated_handler_is_opt_in() {
        let router = build_router(&settings("[handlers]\nref_updated = true\n"), tracker())
            .expect("router");
        assert!(router.handles("ref-updated"));
        assert!(router.handles("change-merged"));
    }

    #[test]
    fn every_source_gets_an_ssh_connector() {
        let connectors = build_connectors(&settings(""), &[]).expect("connectors");
        let names: Vec<&str> = connectors.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["gerrit.example.com", "review.example.org"]);
        assert!(connectors[0].1.describe().starts_with("ssh "));
    }

    #[test]
    fn replay_runs_only_named_sources() {
        let replays = vec![(
            "review.example.org".to_string(),
            PathBuf::from("/tmp/review.ndjson"),
        )];
        let connectors = build_connectors(&settings(""), &replays).expect("connectors");

        assert_eq!(connectors.len(), 1);
        assert_eq!(connectors[0].0.as_str(), "review.example.org");
        assert_eq!(connectors[0].1.describe(), "replay /tmp/review.ndjson");
    }

    #[test]
    fn replay_of_unknown_source_fails() {
        let replays = vec![("elsewhere".to_string(), PathBuf::from("/tmp/x.ndjson"))];
        assert!(build_connectors(&settings(""), &replays).is_err());
    }
}
