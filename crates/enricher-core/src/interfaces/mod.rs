// crates/enricher-core/src/interfaces/mod.rs
// ============================================================================
// Module: Enricher Interfaces
// Description: Transport-agnostic request channel and reply addressing.
// Purpose: Define the seam between the engine and the enrichment sub-flow.
// Dependencies: crate::core, tokio, thiserror
// ============================================================================

//! ## Overview
//! The engine hands each [`RequestEnvelope`] to a [`RequestChannel`]. The
//! envelope carries the request plus the address the sub-flow must answer on:
//! either a private single-use conduit or a shared [`ReplyTopic`] keyed by
//! correlation identifier. Channels never block; a channel that cannot accept
//! the envelope immediately fails with [`DispatchError`].
//!
//! The sub-flow answers with [`RequestEnvelope::reply`] or gives up with
//! [`RequestEnvelope::decline`]. Dropping the envelope is equivalent to
//! declining in conduit mode.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::core::CORRELATION_ID_HEADER;
use crate::core::EnrichmentRequest;
use crate::core::Message;
use crate::runtime::ReplyTopic;

// ============================================================================
// SECTION: Request Channel
// ============================================================================

/// Dispatch errors raised when sending a request to the sub-flow.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The sub-flow endpoint is closed or unreachable.
    #[error("request channel unreachable: {0}")]
    Unreachable(String),
    /// The sub-flow endpoint is at capacity.
    #[error("request channel full: {0}")]
    Full(String),
    /// Channel-specific dispatch failure.
    #[error("dispatch failed: {0}")]
    Failed(String),
}

/// Transport that delivers enrichment requests to a sub-flow.
pub trait RequestChannel: Send + Sync {
    /// Sends an envelope without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the envelope cannot be accepted.
    fn send(&self, envelope: RequestEnvelope) -> Result<(), DispatchError>;
}

impl<T: RequestChannel + ?Sized> RequestChannel for Arc<T> {
    fn send(&self, envelope: RequestEnvelope) -> Result<(), DispatchError> {
        self.as_ref().send(envelope)
    }
}

// ============================================================================
// SECTION: Reply Addressing
// ============================================================================

/// Errors returned to a sub-flow whose reply could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyRejected {
    /// The waiting invocation is gone (timed out or cancelled).
    #[error("reply abandoned: requester no longer waiting")]
    Abandoned,
    /// No pending invocation matches the reply's correlation identifier.
    #[error("no pending request for correlation id `{0}`")]
    UnknownCorrelation(String),
    /// Reply on a shared topic carried no correlation identifier.
    #[error("reply is missing the `correlation_id` header")]
    MissingCorrelation,
}

/// Where a reply for a request must be delivered.
#[derive(Debug)]
pub enum ReplyAddress {
    /// Private single-use conduit for this request.
    Conduit(oneshot::Sender<Message>),
    /// Shared reply topic matched by correlation identifier.
    Topic(Arc<ReplyTopic>),
}

/// Request plus its reply address, handed to the sub-flow.
#[derive(Debug)]
pub struct RequestEnvelope {
    /// Request built for this invocation.
    request: EnrichmentRequest,
    /// Reply destination.
    reply_to: ReplyAddress,
}

impl RequestEnvelope {
    /// Creates an envelope.
    #[must_use]
    pub const fn new(request: EnrichmentRequest, reply_to: ReplyAddress) -> Self {
        Self {
            request,
            reply_to,
        }
    }

    /// Returns the request.
    #[must_use]
    pub const fn request(&self) -> &EnrichmentRequest {
        &self.request
    }

    /// Returns the request rendered as a message, with correlation header.
    #[must_use]
    pub fn to_message(&self) -> Message {
        self.request.to_message()
    }

    /// Delivers a reply for this request.
    ///
    /// A correlated request stamps its identifier on the reply, replacing
    /// any correlation header the reply already carries.
    ///
    /// # Errors
    ///
    /// Returns [`ReplyRejected`] when nobody is waiting for the reply.
    pub fn reply(self, mut reply: Message) -> Result<(), ReplyRejected> {
        if let Some(id) = self.request.correlation_id() {
            reply.headers.insert(CORRELATION_ID_HEADER, id.as_str());
        }
        match self.reply_to {
            ReplyAddress::Conduit(sender) => {
                sender.send(reply).map_err(|_| ReplyRejected::Abandoned)
            }
            ReplyAddress::Topic(topic) => topic.publish(reply),
        }
    }

    /// Declines to reply; the waiting invocation observes a closed reply.
    pub fn decline(self) {
        if let ReplyAddress::Topic(topic) = &self.reply_to
            && let Some(id) = self.request.correlation_id()
        {
            topic.decline(id);
        }
    }
}
