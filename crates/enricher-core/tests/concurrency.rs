// crates/enricher-core/tests/concurrency.rs
// ============================================================================
// Module: Concurrent Enrichment Tests
// Description: Many in-flight invocations sharing one engine and template.
// Purpose: Validate reply isolation and template non-mutation under load.
// ============================================================================

//! ## Overview
//! Launches concurrent invocations whose replies complete in shuffled order
//! and checks every invocation received its own reply, in both reply modes.

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

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::channel;
use common::customer;
use common::sparse_inbound;
use enricher_core::EnrichmentEngine;
use enricher_core::Expression;
use enricher_core::Message;
use enricher_core::PropertyMapping;
use enricher_core::PropertyPath;
use enricher_core::ReplyTopic;
use enricher_core::RequestEnvelope;
use serde_json::Value;
use serde_json::json;

const INVOCATIONS: i64 = 64;

/// Sub-flow whose reply delay shrinks as the id grows, so replies complete
/// in reverse dispatch order.
fn reversing_lookup() -> Arc<dyn enricher_core::RequestChannel> {
    channel(|envelope: RequestEnvelope| {
        let id = envelope.request().payload()["id"].as_i64().unwrap_or(0);
        let delay = Duration::from_millis(u64::try_from(INVOCATIONS - id).unwrap_or(0));
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = envelope.reply(Message::new(customer(id)));
        });
        Ok(())
    })
}

fn customer_engine(topic: Option<Arc<ReplyTopic>>) -> EnrichmentEngine {
    let mut builder = EnrichmentEngine::builder()
        .request_channel(reversing_lookup())
        .request_timeout(Duration::from_secs(5))
        .property(PropertyMapping::new(
            PropertyPath::parse("name").unwrap(),
            Expression::parse("payload.name").unwrap(),
        ))
        .property(PropertyMapping::new(
            PropertyPath::parse("profile.tier").unwrap(),
            Expression::parse("payload.tier").unwrap(),
        ));
    if let Some(topic) = topic {
        builder = builder.reply_topic(topic);
    }
    builder.build().unwrap()
}

async fn run_shared_template(engine: EnrichmentEngine) {
    let engine = Arc::new(engine);
    let template = Arc::new(json!({"name": null, "profile": {"tier": null}, "flags": [1, 2]}));
    let snapshot = template.as_ref().clone();

    let mut handles = Vec::new();
    for id in 0 .. INVOCATIONS {
        let engine = Arc::clone(&engine);
        let template = Arc::clone(&template);
        handles.push(tokio::spawn(async move {
            let enriched = engine.enrich_with(&sparse_inbound(id), &template).await.unwrap();
            (id, enriched.message.payload)
        }));
    }

    for handle in handles {
        let (id, payload) = handle.await.unwrap();
        let expected = customer(id);
        assert_eq!(payload["name"], expected["name"], "invocation {id}");
        assert_eq!(payload["profile"]["tier"], expected["tier"], "invocation {id}");
        assert_eq!(payload["flags"], json!([1, 2]));
    }
    assert_eq!(*template, snapshot);
    assert_eq!(template["name"], Value::Null);
}

/// Tests reply isolation and template non-mutation with per-call conduits.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_conduit_invocations_are_isolated() {
    run_shared_template(customer_engine(None)).await;
}

/// Tests reply isolation and template non-mutation on a shared reply topic.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_topic_invocations_are_isolated() {
    let topic = Arc::new(ReplyTopic::new("customer-replies"));
    run_shared_template(customer_engine(Some(Arc::clone(&topic)))).await;
    assert_eq!(topic.pending_len(), 0);
}
