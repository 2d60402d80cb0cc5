// crates/enricher-broker/src/channel/callback.rs
// ============================================================================
// Module: Enricher Callback Request Channel
// Description: Callback-based channel for synchronous sub-flows.
// Purpose: Answer requests inline through a user-provided function.
// Dependencies: enricher-core, std
// ============================================================================

//! ## Overview
//! [`CallbackRequestChannel`] answers each request on the dispatching task by
//! invoking a user-supplied function. A returned message is routed as the
//! reply; `None` declines the request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use enricher_core::DispatchError;
use enricher_core::EnrichmentRequest;
use enricher_core::Message;
use enricher_core::RequestChannel;
use enricher_core::RequestEnvelope;

use crate::reply::route_reply;

// ============================================================================
// SECTION: Callback Channel
// ============================================================================

/// Callback handler signature used by the channel.
type CallbackHandler =
    dyn Fn(&EnrichmentRequest) -> Result<Option<Message>, DispatchError> + Send + Sync;

/// Callback-based request channel.
///
/// The handler runs synchronously inside [`RequestChannel::send`], before the
/// engine starts its reply timeout, so the request timeout does not bound the
/// handler's own running time. Use [`crate::spawn_subflow`] for handlers that
/// may be slow.
#[derive(Clone)]
pub struct CallbackRequestChannel {
    /// Handler invoked with each request.
    handler: Arc<CallbackHandler>,
}

impl CallbackRequestChannel {
    /// Creates a callback channel from a handler function.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&EnrichmentRequest) -> Result<Option<Message>, DispatchError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            handler: Arc::new(handler),
        }
    }
}

impl RequestChannel for CallbackRequestChannel {
    fn send(&self, envelope: RequestEnvelope) -> Result<(), DispatchError> {
        let reply = (self.handler)(envelope.request())?;
        // Dispatch succeeded even when the reply is rejected.
        route_reply(envelope, reply);
        Ok(())
    }
}

impl fmt::Debug for CallbackRequestChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRequestChannel").finish_non_exhaustive()
    }
}
