// crates/enricher-core/src/lib.rs
// ============================================================================
// Module: Enricher Core Library
// Description: Public API surface for the content enricher.
// Purpose: Expose messages, mappings, expressions, interfaces, and runtime.
// Dependencies: crate::{core, expression, interfaces, runtime, audit}
// ============================================================================

//! ## Overview
//! The content enricher resolves missing data for an inbound message by
//! sending a derived request to a sub-flow, waiting (bounded) for the
//! correlated reply, and merging the reply into a private copy of the target
//! object plus a set of outbound headers. Transports plug in through the
//! [`RequestChannel`] interface; expressions plug in through [`Evaluate`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod core;
pub mod expression;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use audit::EnrichmentAuditEvent;
pub use audit::EnrichmentAuditSink;
pub use audit::FileAuditSink;
pub use audit::LateReplyAuditEvent;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use expression::Evaluate;
pub use expression::EvaluationError;
pub use expression::Expression;
pub use expression::ExpressionError;
pub use expression::FnEvaluator;
pub use expression::Literal;
pub use expression::from_fn;
pub use interfaces::DispatchError;
pub use interfaces::ReplyAddress;
pub use interfaces::ReplyRejected;
pub use interfaces::RequestChannel;
pub use interfaces::RequestEnvelope;
pub use runtime::DEFAULT_ENGINE_NAME;
pub use runtime::DEFAULT_REQUEST_TIMEOUT;
pub use runtime::EngineBuildError;
pub use runtime::EnrichError;
pub use runtime::EnrichedMessage;
pub use runtime::EnrichmentEngine;
pub use runtime::EnrichmentEngineBuilder;
pub use runtime::ExchangeError;
pub use runtime::HeaderPropagation;
pub use runtime::InvocationState;
pub use runtime::MergeEngine;
pub use runtime::MergeEntry;
pub use runtime::MergeReport;
pub use runtime::PendingReply;
pub use runtime::ReplyCorrelator;
pub use runtime::ReplyMode;
pub use runtime::ReplyOutcome;
pub use runtime::ReplyStatus;
pub use runtime::ReplyTopic;
pub use runtime::RequestBuilder;
pub use runtime::RequestPayload;
pub use runtime::TypedEnrichment;
