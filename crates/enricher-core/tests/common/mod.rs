// crates/enricher-core/tests/common/mod.rs
// ============================================================================
// Module: Enricher Test Fixtures
// Description: Shared request channels, audit sinks, and messages for tests.
// Purpose: Provide scripted sub-flows for engine integration tests.
// ============================================================================

//! ## Overview
//! Scripted request channels stand in for an enrichment sub-flow: one that
//! answers from a fixed customer table, one that never answers, one that
//! declines, and one that refuses dispatch.

#![allow(dead_code, reason = "Common module may have unused helpers.")]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only fixtures use panic-based assertions."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use enricher_core::DispatchError;
use enricher_core::EnrichmentAuditEvent;
use enricher_core::EnrichmentAuditSink;
use enricher_core::LateReplyAuditEvent;
use enricher_core::Message;
use enricher_core::RequestChannel;
use enricher_core::RequestEnvelope;
use serde_json::Value;
use serde_json::json;

/// Timeout used by engine fixtures.
pub const TIMEOUT: Duration = Duration::from_millis(200);

/// Channel that runs a closure for every envelope.
pub struct FnChannel<F> {
    handler: F,
}

impl<F> RequestChannel for FnChannel<F>
where
    F: Fn(RequestEnvelope) -> Result<(), DispatchError> + Send + Sync,
{
    fn send(&self, envelope: RequestEnvelope) -> Result<(), DispatchError> {
        (self.handler)(envelope)
    }
}

/// Wraps a closure as a shared request channel.
pub fn channel<F>(handler: F) -> Arc<dyn RequestChannel>
where
    F: Fn(RequestEnvelope) -> Result<(), DispatchError> + Send + Sync + 'static,
{
    Arc::new(FnChannel {
        handler,
    })
}

/// Customer record served by the scripted lookup sub-flow.
pub fn customer(id: i64) -> Value {
    json!({
        "id": id,
        "name": format!("customer-{id}"),
        "age": 30 + id,
        "tier": if id % 2 == 0 { "gold" } else { "silver" },
    })
}

/// Sub-flow that looks up `payload.id` (or the whole payload when it is a
/// number) and replies after `delay` on a spawned task.
pub fn lookup_channel(delay: Duration) -> Arc<dyn RequestChannel> {
    channel(move |envelope: RequestEnvelope| {
        let payload = envelope.request().payload();
        let id = payload.get("id").and_then(Value::as_i64).or_else(|| payload.as_i64()).unwrap_or(0);
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let _ = envelope.reply(Message::new(customer(id)).with_header("source", "crm"));
        });
        Ok(())
    })
}

/// Sub-flow that holds every envelope and never replies.
pub fn silent_channel() -> (Arc<dyn RequestChannel>, Arc<Mutex<Vec<RequestEnvelope>>>) {
    let held = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&held);
    let channel = channel(move |envelope| {
        sink.lock().expect("held lock").push(envelope);
        Ok(())
    });
    (channel, held)
}

/// Sub-flow that declines every request.
pub fn declining_channel() -> Arc<dyn RequestChannel> {
    channel(|envelope: RequestEnvelope| {
        envelope.decline();
        Ok(())
    })
}

/// Channel that refuses every request.
pub fn refusing_channel() -> Arc<dyn RequestChannel> {
    channel(|_envelope: RequestEnvelope| Err(DispatchError::Unreachable("offline".to_string())))
}

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    pub events: Mutex<Vec<EnrichmentAuditEvent>>,
    pub late: Mutex<Vec<LateReplyAuditEvent>>,
}

impl RecordingAuditSink {
    /// Returns a snapshot of recorded invocation events.
    pub fn events(&self) -> Vec<EnrichmentAuditEvent> {
        self.events.lock().expect("events lock").clone()
    }
}

impl EnrichmentAuditSink for RecordingAuditSink {
    fn record(&self, event: &EnrichmentAuditEvent) {
        self.events.lock().expect("events lock").push(event.clone());
    }

    fn record_late_reply(&self, event: &LateReplyAuditEvent) {
        self.late.lock().expect("late lock").push(event.clone());
    }
}

/// Inbound order message with a sparse customer target.
pub fn sparse_inbound(id: i64) -> Message {
    Message::new(json!({"id": id, "name": null, "age": 0})).with_header("tenant", "acme")
}
