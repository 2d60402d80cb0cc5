// crates/enricher-core/src/core/mod.rs
// ============================================================================
// Module: Enricher Core Types
// Description: Messages, identifiers, target paths, targets, and mappings.
// Purpose: Provide the value types shared by the request, reply, and merge stages.
// Dependencies: rand, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Core types describe what flows through an enrichment invocation: inbound
//! and reply [`Message`] values, the [`EnrichmentRequest`] sent to the
//! sub-flow, the target object being enriched, and the immutable mapping
//! configuration applied by the merge stage.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod mapping;
pub mod message;
pub mod path;
pub mod target;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::CORRELATION_ID_HEADER;
pub use identifiers::CorrelationId;
pub use identifiers::CorrelationIdGenerator;
pub use identifiers::DEFAULT_CORRELATION_PREFIX;
pub use mapping::HeaderMapping;
pub use mapping::MappingError;
pub use mapping::MappingFailure;
pub use mapping::MappingOutcome;
pub use mapping::MappingSource;
pub use mapping::MappingTarget;
pub use mapping::OverwritePolicy;
pub use mapping::PropertyMapping;
pub use mapping::SkipReason;
pub use message::EnrichmentRequest;
pub use message::Headers;
pub use message::Message;
pub use path::AssignError;
pub use path::MAX_PATH_SEGMENTS;
pub use path::PathError;
pub use path::PropertyPath;
pub use target::CloneError;
pub use target::DefaultTarget;
pub use target::instantiate_target;
pub use target::json_kind;
pub use target::template_from_typed;
