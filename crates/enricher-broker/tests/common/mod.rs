// crates/enricher-broker/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared helpers for enricher-broker tests.
// Purpose: Provide envelopes, engines, and messages for channel tests.
// Dependencies: enricher-core, serde_json, tokio
// ============================================================================

//! ## Overview
//! Provides shared helper functions for exercising broker channels directly
//! and through an [`EnrichmentEngine`].

#![allow(dead_code, reason = "Common module may have unused helpers.")]
#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::time::Duration;

use enricher_core::EnrichmentEngine;
use enricher_core::EnrichmentRequest;
use enricher_core::Expression;
use enricher_core::Headers;
use enricher_core::Message;
use enricher_core::PropertyMapping;
use enricher_core::PropertyPath;
use enricher_core::ReplyAddress;
use enricher_core::RequestChannel;
use enricher_core::RequestEnvelope;
use serde_json::Value;
use serde_json::json;
use tokio::sync::oneshot;

// ============================================================================
// SECTION: Envelope Helpers
// ============================================================================

/// Creates a conduit-addressed envelope and the receiver its reply lands on.
pub fn conduit_envelope(payload: Value) -> (RequestEnvelope, oneshot::Receiver<Message>) {
    let (sender, receiver) = oneshot::channel();
    let request = EnrichmentRequest::new(payload, Headers::new(), None);
    (RequestEnvelope::new(request, ReplyAddress::Conduit(sender)), receiver)
}

// ============================================================================
// SECTION: Engine Helpers
// ============================================================================

/// Builds an engine that copies `payload.name` from the reply.
pub fn name_engine(channel: Arc<dyn RequestChannel>) -> EnrichmentEngine {
    EnrichmentEngine::builder()
        .request_channel(channel)
        .request_timeout(Duration::from_secs(2))
        .property(PropertyMapping::new(
            PropertyPath::parse("name").unwrap(),
            Expression::parse("payload.name").unwrap(),
        ))
        .build()
        .unwrap()
}

/// Inbound message identifying a customer.
pub fn inbound(id: i64) -> Message {
    Message::new(json!({"id": id, "name": null}))
}

/// Reply a customer lookup sub-flow produces for `request`.
pub fn lookup_reply(request: &EnrichmentRequest) -> Message {
    let id = request.payload()["id"].as_i64().unwrap_or(0);
    Message::new(json!({"name": format!("customer-{id}")}))
}
