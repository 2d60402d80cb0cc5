// crates/enricher-broker/src/subflow.rs
// ============================================================================
// Module: Enricher Sub-Flow Worker
// Description: Tokio task serving requests from a channel receiver.
// Purpose: Run an asynchronous handler per request and route its reply.
// Dependencies: enricher-core, tokio
// ============================================================================

//! ## Overview
//! [`spawn_subflow`] drains an mpsc receiver fed by
//! [`crate::MpscRequestChannel`] and serves every request on its own task, so
//! a slow request never delays the ones queued behind it. The handler's
//! result is routed through the envelope's reply address; `None` declines.
//! A reply the requester no longer accepts is dropped; the requesting side
//! has already recorded why.
//! The worker exits once every sender is dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;

use enricher_core::EnrichmentRequest;
use enricher_core::Message;
use enricher_core::RequestEnvelope;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;

use crate::reply::route_reply;

// ============================================================================
// SECTION: Worker
// ============================================================================

/// Spawns a worker answering every request received on `receiver`.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_subflow<F, Fut>(mut receiver: Receiver<RequestEnvelope>, handler: F) -> JoinHandle<()>
where
    F: Fn(EnrichmentRequest) -> Fut + Send + 'static,
    Fut: Future<Output = Option<Message>> + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(envelope) = receiver.recv().await {
            let pending = handler(envelope.request().clone());
            tokio::spawn(async move {
                route_reply(envelope, pending.await);
            });
        }
    })
}
