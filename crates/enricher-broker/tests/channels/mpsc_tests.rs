// crates/enricher-broker/tests/channels/mpsc_tests.rs
// ============================================================================
// Module: MpscRequestChannel Tests
// Description: Tests for the queue-backed request channel.
// Purpose: Validate non-blocking dispatch and its failure classifications.
// Dependencies: enricher-broker, enricher-core, tokio
// ============================================================================

//! ## Overview
//! Exercises [`enricher_broker::MpscRequestChannel`] directly and through an
//! engine served by [`enricher_broker::spawn_subflow`].

use std::sync::Arc;

use enricher_broker::MpscRequestChannel;
use enricher_broker::mpsc_channel;
use enricher_broker::spawn_subflow;
use enricher_core::DispatchError;
use enricher_core::EnrichError;
use enricher_core::ExchangeError;
use enricher_core::RequestChannel;
use serde_json::json;

use super::common::conduit_envelope;
use super::common::inbound;
use super::common::lookup_reply;
use super::common::name_engine;

// ============================================================================
// SECTION: Dispatch Tests
// ============================================================================

/// Tests that a send enqueues exactly one envelope.
#[test]
fn send_enqueues_envelope() {
    let (channel, mut receiver) = mpsc_channel("customers", 4);
    let (envelope, _reply) = conduit_envelope(json!({"id": 1}));

    channel.send(envelope).unwrap();

    let queued = receiver.try_recv().unwrap();
    assert_eq!(queued.request().payload(), &json!({"id": 1}));
    assert!(receiver.try_recv().is_err());
}

/// Tests that a full queue fails with `Full` instead of waiting.
#[test]
fn full_queue_fails_immediately() {
    let (channel, _receiver) = mpsc_channel("customers", 1);
    let (first, _first_reply) = conduit_envelope(json!({"id": 1}));
    let (second, mut second_reply) = conduit_envelope(json!({"id": 2}));

    channel.send(first).unwrap();
    let err = channel.send(second).unwrap_err();

    assert_eq!(err, DispatchError::Full("customers".to_string()));
    assert!(second_reply.try_recv().is_err());
}

/// Tests that a dropped receiver makes the channel unreachable.
#[test]
fn closed_queue_is_unreachable() {
    let (sender, receiver) = tokio::sync::mpsc::channel(1);
    drop(receiver);
    let channel = MpscRequestChannel::new(sender);
    let (envelope, _reply) = conduit_envelope(json!({}));

    assert_eq!(channel.name(), "mpsc");
    assert_eq!(channel.send(envelope).unwrap_err(), DispatchError::Unreachable("mpsc".to_string()));
}

/// Tests that a zero capacity still yields a usable queue.
#[test]
fn zero_capacity_is_raised_to_one() {
    let (channel, _receiver) = mpsc_channel("tiny", 0);
    let (envelope, _reply) = conduit_envelope(json!({}));
    assert!(channel.send(envelope).is_ok());
}

// ============================================================================
// SECTION: Engine Tests
// ============================================================================

/// Tests an engine served end to end by a sub-flow worker.
#[tokio::test]
async fn engine_enriches_through_subflow_worker() {
    let (channel, receiver) = mpsc_channel("customers", 16);
    let _worker = spawn_subflow(receiver, |request| async move { Some(lookup_reply(&request)) });
    let engine = name_engine(Arc::new(channel));

    let enriched = engine.enrich(&inbound(7)).await.unwrap();
    assert_eq!(enriched.message.payload, json!({"id": 7, "name": "customer-7"}));
}

/// Tests that a closed queue surfaces as a dispatch failure.
#[tokio::test]
async fn engine_reports_unreachable_queue() {
    let (channel, receiver) = mpsc_channel("customers", 16);
    drop(receiver);
    let engine = name_engine(Arc::new(channel));

    let err = engine.enrich(&inbound(7)).await.unwrap_err();
    assert_eq!(
        err,
        EnrichError::Dispatch(ExchangeError::Dispatch(DispatchError::Unreachable(
            "customers".to_string()
        )))
    );
}
