// crates/enricher-core/src/runtime/mod.rs
// ============================================================================
// Module: Enricher Runtime
// Description: Request builder, reply correlator, merge engine, and engine.
// Purpose: Execute enrichment invocations against a request channel.
// Dependencies: crate::{core, interfaces, expression, audit}, tokio
// ============================================================================

//! ## Overview
//! Runtime modules implement the three enrichment stages and the engine that
//! sequences them. Only the reply wait suspends; building the request and
//! merging the reply are synchronous.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod correlator;
pub mod engine;
pub mod merge;
pub mod request;
pub mod state;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use correlator::ExchangeError;
pub use correlator::PendingReply;
pub use correlator::ReplyCorrelator;
pub use correlator::ReplyMode;
pub use correlator::ReplyOutcome;
pub use correlator::ReplyTopic;
pub use engine::DEFAULT_ENGINE_NAME;
pub use engine::DEFAULT_REQUEST_TIMEOUT;
pub use engine::EngineBuildError;
pub use engine::EnrichError;
pub use engine::EnrichmentEngine;
pub use engine::EnrichmentEngineBuilder;
pub use engine::TypedEnrichment;
pub use merge::EnrichedMessage;
pub use merge::MergeEngine;
pub use merge::MergeEntry;
pub use merge::MergeReport;
pub use request::HeaderPropagation;
pub use request::RequestBuilder;
pub use request::RequestPayload;
pub use state::InvocationState;
pub use state::ReplyStatus;
