// crates/enricher-broker/tests/channels/callback_tests.rs
// ============================================================================
// Module: CallbackRequestChannel Tests
// Description: Tests for the inline callback request channel.
// Purpose: Validate reply, decline, and refusal handling.
// Dependencies: enricher-broker, enricher-core
// ============================================================================

//! ## Overview
//! Exercises [`enricher_broker::CallbackRequestChannel`] through direct sends
//! and full engine invocations.

use std::sync::Arc;

use enricher_broker::CallbackRequestChannel;
use enricher_core::DispatchError;
use enricher_core::EnrichError;
use enricher_core::Message;
use enricher_core::RequestChannel;
use serde_json::json;

use super::common::conduit_envelope;
use super::common::inbound;
use super::common::lookup_reply;
use super::common::name_engine;

/// Tests that a returned message is routed to the reply conduit.
#[test]
fn reply_is_routed_to_conduit() {
    let channel = CallbackRequestChannel::new(|request| Ok(Some(lookup_reply(request))));
    let (envelope, mut reply) = conduit_envelope(json!({"id": 3}));

    channel.send(envelope).unwrap();

    let reply = reply.try_recv().unwrap();
    assert_eq!(reply.payload, json!({"name": "customer-3"}));
}

/// Tests that `None` declines and closes the conduit.
#[test]
fn none_declines_request() {
    let channel = CallbackRequestChannel::new(|_| Ok(None));
    let (envelope, mut reply) = conduit_envelope(json!({"id": 3}));

    channel.send(envelope).unwrap();

    assert!(matches!(reply.try_recv(), Err(tokio::sync::oneshot::error::TryRecvError::Closed)));
}

/// Tests that a reply nobody waits for still counts as a successful dispatch.
#[test]
fn abandoned_reply_still_dispatches() {
    let channel = CallbackRequestChannel::new(|request| Ok(Some(lookup_reply(request))));
    let (envelope, reply) = conduit_envelope(json!({"id": 3}));
    drop(reply);

    assert_eq!(channel.send(envelope), Ok(()));
}

/// Tests that handler errors fail dispatch.
#[test]
fn handler_error_fails_dispatch() {
    let channel = CallbackRequestChannel::new(|_| Err(DispatchError::Failed("down".to_string())));
    let (envelope, _reply) = conduit_envelope(json!({}));

    assert_eq!(channel.send(envelope).unwrap_err(), DispatchError::Failed("down".to_string()));
}

/// Tests an engine answered inline by a callback.
#[tokio::test]
async fn engine_enriches_through_callback() {
    let engine = name_engine(Arc::new(CallbackRequestChannel::new(|request| {
        Ok(Some(lookup_reply(request)))
    })));

    let enriched = engine.enrich(&inbound(5)).await.unwrap();
    assert_eq!(enriched.message.payload["name"], json!("customer-5"));
}

/// Tests that a declining callback fails a reply-required invocation.
#[tokio::test]
async fn engine_reports_declined_reply() {
    let engine = name_engine(Arc::new(CallbackRequestChannel::new(|_| Ok(None::<Message>))));

    assert_eq!(engine.enrich(&inbound(5)).await.unwrap_err(), EnrichError::ReplyRequired);
}
