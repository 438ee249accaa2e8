//! One read loop per upstream server, all feeding the same router.
//!
//! Each source runs on its own tokio task. A bad line is logged and skipped; a
//! closed or broken feed ends only its own loop. [`StreamSupervisor::run`]
//! returns once every loop has ended. There is no read timeout: a silent
//! upstream keeps its loop waiting indefinitely.

use std::borrow::Cow;
use std::sync::Arc;

use bridge::{decode, error_chain, DispatchOutcome, EventRouter, SourceName};

use crate::feed::{EventFeed, FeedConnector};

/// Why a source loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The upstream closed the feed.
    EndOfStream,
    /// Reading from the feed failed.
    ReadError(String),
    /// The feed could not be opened.
    ConnectFailed(String),
    /// The loop task panicked.
    Panicked,
}

/// What one source loop did before it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source: SourceName,
    /// Non-blank lines read.
    pub lines: u64,
    pub decode_errors: u64,
    pub handled_success: u64,
    pub handled_failure: u64,
    pub unhandled: u64,
    pub termination: Termination,
}

impl SourceReport {
    fn new(source: SourceName) -> Self {
        Self {
            source,
            lines: 0,
            decode_errors: 0,
            handled_success: 0,
            handled_failure: 0,
            unhandled: 0,
            termination: Termination::EndOfStream,
        }
    }

    fn record(&mut self, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::HandledSuccess => self.handled_success += 1,
            DispatchOutcome::HandledFailure => self.handled_failure += 1,
            DispatchOutcome::Unhandled => self.unhandled += 1,
        }
    }
}

/// Owns the configured sources and runs their loops.
pub struct StreamSupervisor {
    router: Arc<EventRouter>,
    sources: Vec<(SourceName, Arc<dyn FeedConnector>)>,
}

impl StreamSupervisor {
    pub fn new(router: Arc<EventRouter>) -> Self {
        Self {
            router,
            sources: Vec::new(),
        }
    }

    /// Adds an upstream server. Events read from it are tagged with `name`.
    pub fn add_source(&mut self, name: SourceName, connector: Arc<dyn FeedConnector>) {
        self.sources.push((name, connector));
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Starts one task per source and waits for all of them to end.
    ///
    /// Reports are returned in the order the sources were added.
    pub async fn run(self) -> Vec<SourceReport> {
        let tasks: Vec<_> = self
            .sources
            .into_iter()
            .map(|(name, connector)| {
                let router = self.router.clone();
                let task_name = name.clone();
                let handle =
                    tokio::spawn(async move { run_source(task_name, connector, router).await });
                (name, handle)
            })
            .collect();

        let mut reports = Vec::with_capacity(tasks.len());
        for (name, handle) in tasks {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(err) => {
                    tracing::error!(
                        subsystem = "lifecycle",
                        source = %name,
                        error = %err,
                        "source loop task failed"
                    );
                    let mut report = SourceReport::new(name);
                    report.termination = Termination::Panicked;
                    reports.push(report);
                }
            }
        }

        tracing::info!(subsystem = "lifecycle", sources = reports.len(), "all source loops finished");
        reports
    }
}

/// Connects one source and consumes its feed to the end.
pub async fn run_source(
    source: SourceName,
    connector: Arc<dyn FeedConnector>,
    router: Arc<EventRouter>,
) -> SourceReport {
    tracing::debug!(
        subsystem = "lifecycle",
        source = %source,
        feed = %connector.describe(),
        "connecting to event stream"
    );

    match connector.connect().await {
        Ok(feed) => consume_feed(source, feed, &router).await,
        Err(err) => {
            let detail = error_chain(&err);
            tracing::error!(
                subsystem = "lifecycle",
                source = %source,
                error = %detail,
                "cannot connect to event stream"
            );
            let mut report = SourceReport::new(source);
            report.termination = Termination::ConnectFailed(detail);
            report
        }
    }
}

/// Decodes and dispatches every line of `feed` until it ends.
pub async fn consume_feed(
    source: SourceName,
    mut feed: EventFeed,
    router: &EventRouter,
) -> SourceReport {
    let mut report = SourceReport::new(source.clone());

    loop {
        let raw = match feed.next_line().await {
            Ok(Some(raw)) => raw,
            Ok(None) => break,
            Err(err) => {
                tracing::error!(
                    subsystem = "lifecycle",
                    source = %source,
                    error = %err,
                    "reading event stream failed"
                );
                report.termination = Termination::ReadError(err.to_string());
                // Dropping the feed kills a backing process that is still alive.
                drop(feed);
                return finish(report);
            }
        };

        let line = String::from_utf8_lossy(&raw);
        if line.trim().is_empty() {
            continue;
        }
        report.lines += 1;
        if matches!(line, Cow::Owned(_)) {
            tracing::warn!(
                subsystem = "events",
                source = %source,
                "event line is not valid UTF-8, invalid bytes replaced"
            );
        }

        tracing::debug!(subsystem = "events", source = %source, line = %line, "got event line");
        match decode(&line, &source) {
            Ok(envelope) => {
                let outcome = router.dispatch(envelope).await;
                report.record(outcome);
            }
            Err(err) => {
                report.decode_errors += 1;
                tracing::warn!(
                    subsystem = "events",
                    source = %source,
                    error = %error_chain(&err),
                    line = %line,
                    "skipping undecodable event line"
                );
            }
        }
    }

    if let Some(status) = feed.close().await {
        tracing::debug!(subsystem = "lifecycle", source = %source, %status, "feed process exited");
    }
    finish(report)
}

fn finish(report: SourceReport) -> SourceReport {
    tracing::info!(
        subsystem = "lifecycle",
        source = %report.source,
        lines = report.lines,
        decode_errors = report.decode_errors,
        handled_success = report.handled_success,
        handled_failure = report.handled_failure,
        unhandled = report.unhandled,
        termination = ?report.termination,
        "processing stream finished"
    );
    report
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
