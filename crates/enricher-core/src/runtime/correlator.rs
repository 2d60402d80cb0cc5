// crates/enricher-core/src/runtime/correlator.rs
// ============================================================================
// Module: Reply Correlator
// Description: Dispatches a request and waits for its matching reply.
// Purpose: Pair each request with exactly its own reply under a timeout.
// Dependencies: crate::core, crate::interfaces, tokio, thiserror
// ============================================================================

//! ## Overview
//! Two reply modes are supported:
//!
//! - [`ReplyMode::Conduit`]: each exchange creates a private single-use reply
//!   conduit and hands its sending half to the sub-flow with the request.
//!   Correlation is structural; the reply cannot reach another invocation.
//! - [`ReplyMode::Topic`]: replies for many invocations share one
//!   [`ReplyTopic`] and are matched by correlation identifier.
//!
//! In both modes the waiter is removed on every exit path: the conduit
//! receiver is dropped, and a topic registration is removed by the
//! [`PendingReply`] guard. A reply that arrives afterwards is rejected and
//! never delivered to a different invocation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::audit::EnrichmentAuditSink;
use crate::audit::LateReplyAuditEvent;
use crate::core::CorrelationId;
use crate::core::EnrichmentRequest;
use crate::core::Message;
use crate::interfaces::DispatchError;
use crate::interfaces::ReplyAddress;
use crate::interfaces::ReplyRejected;
use crate::interfaces::RequestChannel;
use crate::interfaces::RequestEnvelope;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by a request/reply exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// The request could not be sent.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// No reply arrived within the timeout.
    #[error("no reply within {timeout:?}")]
    TimedOut {
        /// Timeout that elapsed.
        timeout: Duration,
    },
    /// Topic mode requires a correlation identifier on the request.
    #[error("reply topic requires a correlated request")]
    MissingCorrelation,
    /// Another invocation is already waiting on this correlation identifier.
    #[error("correlation id `{0}` is already pending")]
    DuplicateCorrelation(String),
}

/// Result of a completed reply wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The sub-flow replied.
    Received(Message),
    /// The sub-flow declined; the reply path closed without a message.
    Closed,
}

// ============================================================================
// SECTION: Reply Topic
// ============================================================================

/// Shared reply destination that routes replies by correlation identifier.
///
/// # Invariants
/// - At most one waiter per correlation identifier.
/// - A waiter is removed when its reply is delivered or its guard drops.
pub struct ReplyTopic {
    /// Topic name used in audit records.
    name: String,
    /// Waiters keyed by correlation identifier.
    pending: Mutex<HashMap<String, oneshot::Sender<Message>>>,
    /// Sink for replies nobody is waiting for.
    audit: Option<Arc<dyn EnrichmentAuditSink>>,
}

impl ReplyTopic {
    /// Creates an empty reply topic.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pending: Mutex::new(HashMap::new()),
            audit: None,
        }
    }

    /// Records late and unmatched replies to `sink`.
    #[must_use]
    pub fn with_audit(mut self, sink: Arc<dyn EnrichmentAuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Returns the topic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of invocations currently waiting.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.entries().len()
    }

    /// Registers a waiter for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::DuplicateCorrelation`] when `id` is already pending.
    pub fn register(self: &Arc<Self>, id: CorrelationId) -> Result<PendingReply, ExchangeError> {
        let (sender, receiver) = oneshot::channel();
        {
            let mut entries = self.entries();
            if entries.contains_key(id.as_str()) {
                return Err(ExchangeError::DuplicateCorrelation(id.to_string()));
            }
            entries.insert(id.to_string(), sender);
        }
        Ok(PendingReply {
            topic: Arc::clone(self),
            id,
            receiver,
        })
    }

    /// Delivers `reply` to the invocation matching its correlation header.
    ///
    /// # Errors
    ///
    /// Returns [`ReplyRejected`] when the reply has no correlation identifier
    /// or no invocation is waiting for it.
    pub fn publish(&self, reply: Message) -> Result<(), ReplyRejected> {
        let Some(id) = reply.correlation_id().map(str::to_string) else {
            self.record_late(None, "missing_correlation");
            return Err(ReplyRejected::MissingCorrelation);
        };
        let Some(sender) = self.entries().remove(&id) else {
            self.record_late(Some(&id), "unknown_correlation");
            return Err(ReplyRejected::UnknownCorrelation(id));
        };
        sender.send(reply).map_err(|_| {
            self.record_late(Some(&id), "abandoned");
            ReplyRejected::Abandoned
        })
    }

    /// Removes the waiter for `id` without a reply; returns true if one existed.
    pub fn decline(&self, id: &CorrelationId) -> bool {
        self.entries().remove(id.as_str()).is_some()
    }

    /// Locks the waiter table; entries stay consistent across a poisoned lock.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<Message>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a rejected reply when an audit sink is attached.
    fn record_late(&self, id: Option<&str>, reason: &'static str) {
        if let Some(sink) = &self.audit {
            sink.record_late_reply(&LateReplyAuditEvent::new(&self.name, id, reason));
        }
    }
}

impl fmt::Debug for ReplyTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyTopic")
            .field("name", &self.name)
            .field("pending", &self.pending_len())
            .finish_non_exhaustive()
    }
}

/// Registration guard for one topic waiter.
///
/// Dropping the guard removes the registration.
#[derive(Debug)]
pub struct PendingReply {
    /// Topic holding the registration.
    topic: Arc<ReplyTopic>,
    /// Registered correlation identifier.
    id: CorrelationId,
    /// Receiving half of the waiter.
    receiver: oneshot::Receiver<Message>,
}

impl PendingReply {
    /// Returns the registered correlation identifier.
    #[must_use]
    pub const fn id(&self) -> &CorrelationId {
        &self.id
    }

    /// Waits for the reply; `None` when the registration was declined.
    pub async fn wait(&mut self) -> Option<Message> {
        (&mut self.receiver).await.ok()
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.topic.entries().remove(self.id.as_str());
    }
}

// ============================================================================
// SECTION: Correlator
// ============================================================================

/// Reply addressing mode for a correlator.
#[derive(Debug, Clone, Default)]
pub enum ReplyMode {
    /// Private single-use reply conduit per exchange.
    #[default]
    Conduit,
    /// Shared reply topic matched by correlation identifier.
    Topic(Arc<ReplyTopic>),
}

/// Sends requests and correlates their replies.
#[derive(Clone)]
pub struct ReplyCorrelator {
    /// Transport to the sub-flow.
    channel: Arc<dyn RequestChannel>,
    /// Reply addressing mode.
    mode: ReplyMode,
}

impl ReplyCorrelator {
    /// Creates a correlator over `channel`.
    #[must_use]
    pub fn new(channel: Arc<dyn RequestChannel>, mode: ReplyMode) -> Self {
        Self {
            channel,
            mode,
        }
    }

    /// Returns the reply mode.
    #[must_use]
    pub const fn mode(&self) -> &ReplyMode {
        &self.mode
    }

    /// Sends `request` and waits up to `timeout` for its reply.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError`] when dispatch fails, the timeout elapses, or
    /// the request cannot be correlated on a shared topic.
    pub async fn exchange(
        &self,
        request: EnrichmentRequest,
        timeout: Duration,
    ) -> Result<ReplyOutcome, ExchangeError> {
        match &self.mode {
            ReplyMode::Conduit => {
                let (sender, receiver) = oneshot::channel();
                self.channel.send(RequestEnvelope::new(request, ReplyAddress::Conduit(sender)))?;
                match tokio::time::timeout(timeout, receiver).await {
                    Ok(Ok(reply)) => Ok(ReplyOutcome::Received(reply)),
                    Ok(Err(_)) => Ok(ReplyOutcome::Closed),
                    Err(_) => Err(ExchangeError::TimedOut {
                        timeout,
                    }),
                }
            }
            ReplyMode::Topic(topic) => {
                let id = request.correlation_id().cloned().ok_or(ExchangeError::MissingCorrelation)?;
                let mut pending = topic.register(id)?;
                self.channel
                    .send(RequestEnvelope::new(request, ReplyAddress::Topic(Arc::clone(topic))))?;
                match tokio::time::timeout(timeout, pending.wait()).await {
                    Ok(Some(reply)) => Ok(ReplyOutcome::Received(reply)),
                    Ok(None) => Ok(ReplyOutcome::Closed),
                    Err(_) => Err(ExchangeError::TimedOut {
                        timeout,
                    }),
                }
            }
        }
    }
}

impl fmt::Debug for ReplyCorrelator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyCorrelator").field("mode", &self.mode).finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
