// crates/enricher-broker/src/reply.rs
// ============================================================================
// Module: Enricher Reply Routing
// Description: Routes a sub-flow handler's result through its envelope.
// Purpose: Share reply/decline handling between broker channels.
// Dependencies: enricher-core
// ============================================================================

//! ## Overview
//! [`route_reply`] delivers a handler's reply or declines the request. A
//! rejected reply is returned to the caller rather than raised: every
//! rejection already has a record on the requesting side.

// ============================================================================
// SECTION: Imports
// ============================================================================

use enricher_core::Message;
use enricher_core::ReplyRejected;
use enricher_core::RequestEnvelope;

// ============================================================================
// SECTION: Routing
// ============================================================================

/// Delivers `reply` for `envelope`, or declines when there is none.
///
/// Returns the rejection when the reply could not be delivered.
pub(crate) fn route_reply(
    envelope: RequestEnvelope,
    reply: Option<Message>,
) -> Option<ReplyRejected> {
    let Some(reply) = reply else {
        envelope.decline();
        return None;
    };
    // Abandoned conduit replies belong to invocations whose audit event
    // already records the timeout; the reply topic audits its own rejections.
    envelope.reply(reply).err()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
