//! Replays recorded Gerrit streams through the real handlers and a recording
//! tracker, the way the binary's `--replay` mode wires them.

use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bridge::{
    ChangeMergedHandler, EventRouter, Issue, IssueComment, IssueKey, IssueTracker, SourceName,
    TrackerError, CHANGE_MERGED,
};
use listener::{ReplayFileConnector, StreamSupervisor, Termination};

const CHANGE_MERGED_LINE: &str = include_str!("../../bridge/tests/fixtures/change_merged.json");
const NO_TICKET_LINE: &str = include_str!("../../bridge/tests/fixtures/change_merged_no_ticket.json");
const REF_UPDATED_LINE: &str = include_str!("../../bridge/tests/fixtures/ref_updated.json");

#[derive(Default)]
struct RecordingTracker {
    comments: Mutex<Vec<(String, String)>>,
}

impl RecordingTracker {
    fn comments(&self) -> Vec<(String, String)> {
        self.comments.lock().expect("lock").clone()
    }
}

#[async_trait]
impl IssueTracker for RecordingTracker {
    async fn find_issue(&self, key: &IssueKey) -> Result<Issue, TrackerError> {
        Ok(Issue {
            key: key.clone(),
            id: "1".to_string(),
            summary: None,
        })
    }

    async fn add_comment(&self, issue: &Issue, body: &str) -> Result<(), TrackerError> {
        self.comments
            .lock()
            .expect("lock")
            .push((issue.key.to_string(), body.to_string()));
        Ok(())
    }

    async fn list_comments(&self, _issue: &Issue) -> Result<Vec<IssueComment>, TrackerError> {
        Ok(Vec::new())
    }
}

fn recorded_stream(lines: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    for line in lines {
        writeln!(file, "{}", line.trim()).expect("write line");
    }
    file.flush().expect("flush");
    file
}

fn source(name: &str) -> SourceName {
    SourceName::new(name).expect("non-empty")
}

#[tokio::test]
async fn replayed_merge_comments_on_referenced_issue() {
    let tracker = Arc::new(RecordingTracker::default());
    let mut router = EventRouter::new();
    router.register(
        CHANGE_MERGED,
        Arc::new(ChangeMergedHandler::new(tracker.clone())),
    );

    let stream = recorded_stream(&[
        CHANGE_MERGED_LINE,
        "",
        "{\"type\":\"comment-added\"}",
        "not json",
        NO_TICKET_LINE,
        REF_UPDATED_LINE,
    ]);

    let mut supervisor = StreamSupervisor::new(Arc::new(router));
    supervisor.add_source(
        source("gerrit.example.com"),
        Arc::new(ReplayFileConnector::new(stream.path())),
    );
    let reports = supervisor.run().await;

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.lines, 5);
    assert_eq!(report.decode_errors, 1);
    assert_eq!(report.handled_success, 1);
    assert_eq!(report.handled_failure, 1);
    assert_eq!(report.unhandled, 2);
    assert_eq!(report.termination, Termination::EndOfStream);

    let comments = tracker.comments();
    assert_eq!(comments.len(), 1);
    let (key, body) = &comments[0];
    assert_eq!(key, "AUDIGW-3897");
    assert!(body.contains("Project: gerrit.example.com/audio/gateway"));
    assert!(body.contains("[Changeset|https://gerrit.example.com/26077]"));
}

#[tokio::test]
async fn missing_replay_file_ends_only_its_source() {
    let tracker = Arc::new(RecordingTracker::default());
    let mut router = EventRouter::new();
    router.register(
        CHANGE_MERGED,
        Arc::new(ChangeMergedHandler::new(tracker.clone())),
    );

    let stream = recorded_stream(&[CHANGE_MERGED_LINE]);
    let dir = tempfile::tempdir().expect("temp dir");

    let mut supervisor = StreamSupervisor::new(Arc::new(router));
    supervisor.add_source(
        source("gone"),
        Arc::new(ReplayFileConnector::new(dir.path().join("missing.ndjson"))),
    );
    supervisor.add_source(
        source("gerrit.example.com"),
        Arc::new(ReplayFileConnector::new(stream.path())),
    );
    let reports = supervisor.run().await;

    assert!(matches!(reports[0].termination, Termination::ConnectFailed(_)));
    assert_eq!(reports[1].handled_success, 1);
    assert_eq!(tracker.comments().len(), 1);
}
