//! Event routing by normalized event type.
//!
//! The router is the failure boundary of the bridge: whatever a handler does
//! (report failure, return an error, panic) is turned into a
//! [`DispatchOutcome`] and logged here, so one bad event never ends a feed loop.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use serde_json::Value;
use tracing::Instrument;

use crate::errors::error_chain;
use crate::{routing_key, DispatchOutcome, EventEnvelope, HandlerError, SourceName};

/// Logic bound to one event type.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Processes one event.
    ///
    /// `Ok(true)` means the event was fully or partially applied, `Ok(false)`
    /// that it ran to completion without achieving anything (e.g. no issue
    /// resolved). `Err` means the payload could not be processed at all.
    async fn handle(&self, payload: &Value, source: &SourceName) -> Result<bool, HandlerError>;
}

/// Lookup table from routing key to handler.
#[derive(Default)]
pub struct EventRouter {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to `event_type`.
    ///
    /// `"change-merged"` and `"change_merged"` name the same slot; registering
    /// a second handler for a slot replaces the first.
    pub fn register(&mut self, event_type: &str, handler: Arc<dyn EventHandler>) {
        let key = routing_key(event_type);
        if self.handlers.insert(key.clone(), handler).is_some() {
            tracing::warn!(
                subsystem = "lifecycle",
                routing_key = %key,
                "replacing previously registered event handler"
            );
        }
    }

    /// Returns `true` if a handler is registered for `event_type`.
    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(&routing_key(event_type))
    }

    /// Routes `envelope` to its handler and reports what happened.
    ///
    /// Never panics and never returns an error.
    pub async fn dispatch(&self, envelope: EventEnvelope) -> DispatchOutcome {
        let span = tracing::info_span!(
            "dispatch",
            event_id = %envelope.event_id,
            event_type = %envelope.event_type,
            source = %envelope.source,
            received_at = %envelope.received_at,
        );
        self.dispatch_inner(envelope).instrument(span).await
    }

    async fn dispatch_inner(&self, envelope: EventEnvelope) -> DispatchOutcome {
        let Some(handler) = self.handlers.get(&envelope.event_type.routing_key()) else {
            tracing::debug!(
                subsystem = "events",
                event_type = %envelope.event_type,
                "cannot handle event of this type"
            );
            return DispatchOutcome::Unhandled;
        };

        let result = AssertUnwindSafe(handler.handle(&envelope.payload, &envelope.source))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(true)) => {
                tracing::info!(subsystem = "events", "finished processing");
                DispatchOutcome::HandledSuccess
            }
            Ok(Ok(false)) => {
                tracing::error!(
                    subsystem = "events",
                    payload = %envelope.payload,
                    "event processing failed"
                );
                DispatchOutcome::HandledFailure
            }
            Ok(Err(err)) => {
                tracing::error!(
                    subsystem = "events",
                    error = %error_chain(&err),
                    payload = %envelope.payload,
                    "cannot process event"
                );
                DispatchOutcome::HandledFailure
            }
            Err(panic) => {
                tracing::error!(
                    subsystem = "events",
                    panic = %panic_message(panic.as_ref()),
                    payload = %envelope.payload,
                    "event handler panicked"
                );
                DispatchOutcome::HandledFailure
            }
        }
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.handlers.keys().collect();
        keys.sort();
        f.debug_struct("EventRouter").field("handlers", &keys).finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
