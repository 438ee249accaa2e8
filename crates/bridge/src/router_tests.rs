use std::sync::Mutex;

use serde_json::json;

use super::*;
use crate::{decode, PayloadError};

/// Records every invocation and answers with a fixed result.
struct RecordingHandler {
    calls: Mutex<Vec<(Value, String)>>,
    answer: fn() -> Result<bool, HandlerError>,
}

impl RecordingHandler {
    fn answering(answer: fn() -> Result<bool, HandlerError>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            answer,
        })
    }

    fn calls(&self) -> Vec<(Value, String)> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, payload: &Value, source: &SourceName) -> Result<bool, HandlerError> {
        self.calls
            .lock()
            .expect("lock")
            .push((payload.clone(), source.as_str().to_string()));
        (self.answer)()
    }
}

struct PanickingHandler;

#[async_trait]
impl EventHandler for PanickingHandler {
    async fn handle(&self, _payload: &Value, _source: &SourceName) -> Result<bool, HandlerError> {
        panic!("handler blew up");
    }
}

fn envelope(event_type: &str) -> EventEnvelope {
    let source = SourceName::new("gerrit").expect("non-empty");
    let line = json!({ "type": event_type, "change": { "number": "26077" } }).to_string();
    decode(&line, &source).expect("valid event")
}

#[tokio::test]
async fn routes_underscore_type_to_dash_registration() {
    let handler = RecordingHandler::answering(|| Ok(true));
    let mut router = EventRouter::new();
    router.register("change-merged", handler.clone());

    let event = envelope("change_merged");
    let expected_payload = event.payload.clone();
    let outcome = router.dispatch(event).await;

    assert_eq!(outcome, DispatchOutcome::HandledSuccess);
    let calls = handler.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, expected_payload);
    assert_eq!(calls[0].1, "gerrit");
}

#[tokio::test]
async fn unknown_type_is_unhandled_and_invokes_nothing() {
    let handler = RecordingHandler::answering(|| Ok(true));
    let mut router = EventRouter::new();
    router.register("change-merged", handler.clone());

    let outcome = router.dispatch(envelope("patchset-created")).await;

    assert_eq!(outcome, DispatchOutcome::Unhandled);
    assert!(handler.calls().is_empty());
}

#[tokio::test]
async fn false_result_is_handled_failure() {
    let mut router = EventRouter::new();
    router.register("change-merged", RecordingHandler::answering(|| Ok(false)));

    assert_eq!(
        router.dispatch(envelope("change-merged")).await,
        DispatchOutcome::HandledFailure
    );
}

#[tokio::test]
async fn handler_error_is_handled_failure() {
    let mut router = EventRouter::new();
    router.register(
        "change-merged",
        RecordingHandler::answering(|| {
            Err(PayloadError::MissingField {
                field: "change.commitMessage",
            }
            .into())
        }),
    );

    assert_eq!(
        router.dispatch(envelope("change-merged")).await,
        DispatchOutcome::HandledFailure
    );
}

#[tokio::test]
async fn handler_panic_is_contained() {
    let mut router = EventRouter::new();
    router.register("change-merged", Arc::new(PanickingHandler));

    assert_eq!(
        router.dispatch(envelope("change-merged")).await,
        DispatchOutcome::HandledFailure
    );
    // The router stays usable after a panic.
    assert_eq!(
        router.dispatch(envelope("ref-updated")).await,
        DispatchOutcome::Unhandled
    );
}

#[tokio::test]
async fn later_registration_replaces_earlier() {
    let first = RecordingHandler::answering(|| Ok(true));
    let second = RecordingHandler::answering(|| Ok(false));
    let mut router = EventRouter::new();
    router.register("change-merged", first.clone());
    router.register("change_merged", second.clone());

    assert!(router.handles("change-merged"));
    assert!(router.handles("change_merged"));
    assert!(!router.handles("ref-updated"));
    assert_eq!(router.handlers.len(), 1);

    assert_eq!(
        router.dispatch(envelope("change-merged")).await,
        DispatchOutcome::HandledFailure
    );
    assert!(first.calls().is_empty());
    assert_eq!(second.calls().len(), 1);
}
