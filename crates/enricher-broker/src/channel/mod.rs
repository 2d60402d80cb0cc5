// crates/enricher-broker/src/channel/mod.rs
// ============================================================================
// Module: Enricher Request Channels
// Description: Reference implementations of the core request channel.
// Purpose: Deliver request envelopes to in-process sub-flows.
// Dependencies: enricher-core, tokio
// ============================================================================

//! ## Overview
//! Request channels accept [`enricher_core::RequestEnvelope`] values on behalf
//! of an enrichment sub-flow. [`MpscRequestChannel`] queues envelopes for an
//! asynchronous worker; [`CallbackRequestChannel`] answers inline.
//! Invariants:
//! - A successful send transfers ownership of the envelope to the sub-flow.
//! - A failed send drops the envelope, which releases its reply address.

// ============================================================================
// SECTION: Implementations
// ============================================================================

pub mod callback;
pub mod mpsc;

pub use callback::CallbackRequestChannel;
pub use mpsc::MpscRequestChannel;
pub use mpsc::mpsc_channel;
