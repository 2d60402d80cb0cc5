// crates/enricher-broker/src/channel/mpsc.rs
// ============================================================================
// Module: Enricher Mpsc Request Channel
// Description: Bounded queue channel for asynchronous sub-flows.
// Purpose: Send request envelopes through a Tokio mpsc channel.
// Dependencies: enricher-core, tokio
// ============================================================================

//! ## Overview
//! [`MpscRequestChannel`] enqueues envelopes into a bounded
//! `tokio::sync::mpsc` channel with `try_send`, so dispatch never waits on a
//! slow sub-flow.
//! Invariants:
//! - A successful send enqueues exactly one envelope.
//! - A full queue fails with [`DispatchError::Full`]; a dropped receiver fails
//!   with [`DispatchError::Unreachable`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use enricher_core::DispatchError;
use enricher_core::RequestChannel;
use enricher_core::RequestEnvelope;
use tokio::sync::mpsc;
use tokio::sync::mpsc::Receiver;
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Channel name used when none is provided.
const DEFAULT_CHANNEL_NAME: &str = "mpsc";

// ============================================================================
// SECTION: Mpsc Request Channel
// ============================================================================

/// Queue-backed request channel.
#[derive(Debug, Clone)]
pub struct MpscRequestChannel {
    /// Sender feeding the sub-flow queue.
    sender: Sender<RequestEnvelope>,
    /// Name reported in dispatch errors.
    name: String,
}

impl MpscRequestChannel {
    /// Creates a channel with the default name.
    #[must_use]
    pub fn new(sender: Sender<RequestEnvelope>) -> Self {
        Self::with_name(sender, DEFAULT_CHANNEL_NAME)
    }

    /// Creates a channel reporting `name` in dispatch errors.
    #[must_use]
    pub fn with_name(sender: Sender<RequestEnvelope>, name: impl Into<String>) -> Self {
        Self {
            sender,
            name: name.into(),
        }
    }

    /// Returns the channel name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl RequestChannel for MpscRequestChannel {
    fn send(&self, envelope: RequestEnvelope) -> Result<(), DispatchError> {
        self.sender.try_send(envelope).map_err(|err| match err {
            TrySendError::Full(_) => DispatchError::Full(self.name.clone()),
            TrySendError::Closed(_) => DispatchError::Unreachable(self.name.clone()),
        })
    }
}

/// Creates a named channel and the receiver its sub-flow reads from.
///
/// A `capacity` of zero is raised to one.
#[must_use]
pub fn mpsc_channel(
    name: impl Into<String>,
    capacity: usize,
) -> (MpscRequestChannel, Receiver<RequestEnvelope>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (MpscRequestChannel::with_name(sender, name), receiver)
}
