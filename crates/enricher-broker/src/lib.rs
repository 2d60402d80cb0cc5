// crates/enricher-broker/src/lib.rs
// ============================================================================
// Module: Content Enricher Broker Library
// Description: Request channels, sub-flow workers, and a named channel registry.
// Purpose: Connect enrichment engines to the sub-flows that answer them.
// Dependencies: enricher-core, thiserror, tokio
// ============================================================================

//! ## Overview
//! Content Enricher Broker provides ready-made [`RequestChannel`]
//! implementations, a [`spawn_subflow`] worker that serves requests from a
//! channel receiver, and the [`ChannelRegistry`] used to wire engines from
//! configuration.
//! Invariants:
//! - Channels never block the invoking task; a full or closed channel fails
//!   dispatch immediately.
//! - Every accepted envelope is answered or declined exactly once.
//!
//! [`RequestChannel`]: enricher_core::RequestChannel

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod channel;
pub mod registry;
mod reply;
pub mod subflow;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use channel::CallbackRequestChannel;
pub use channel::MpscRequestChannel;
pub use channel::mpsc_channel;
pub use registry::ChannelRegistry;
pub use registry::ChannelRegistryBuilder;
pub use registry::RegistryError;
pub use subflow::spawn_subflow;
