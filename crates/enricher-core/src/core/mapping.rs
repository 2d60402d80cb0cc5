// crates/enricher-core/src/core/mapping.rs
// ============================================================================
// Module: Enricher Mappings
// Description: Property and header mapping configuration and per-mapping outcomes.
// Purpose: Describe how reply or inbound data populates the target and headers.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Mappings are built once at configuration time and shared read-only across
//! concurrent invocations. Each mapping pairs an [`Evaluate`] capability with
//! a destination (a [`PropertyPath`] on the target, or a header name), the
//! message it is evaluated against ([`MappingSource`]), and whether a failure
//! aborts the invocation or only skips that mapping.
//!
//! Evaluating a mapping yields a tagged [`MappingOutcome`] rather than an
//! early return; the merge stage aggregates outcomes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::path::AssignError;
use crate::core::path::PropertyPath;
use crate::expression::EvaluationError;
use crate::expression::Evaluate;
use crate::expression::Literal;

// ============================================================================
// SECTION: Policies
// ============================================================================

/// Message a mapping expression is evaluated against.
///
/// # Invariants
/// - Variants are stable for configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingSource {
    /// Evaluate against the sub-flow reply; skipped when there is no reply.
    #[default]
    Reply,
    /// Evaluate against the inbound message, whether or not a reply arrived.
    Inbound,
    /// Evaluate against the inbound message only when no reply was obtained.
    NullResult,
}

/// Rule for header mappings whose header already exists on the inbound message.
///
/// # Invariants
/// - Variants are stable for configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Always replace the header with the evaluated value.
    Always,
    /// Only set the header when the inbound message lacks it.
    #[default]
    IfAbsent,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Destination a mapping writes to, used in error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingTarget {
    /// Property on the cloned target.
    Property(PropertyPath),
    /// Outbound message header.
    Header(String),
    /// Sub-flow request payload.
    RequestPayload,
    /// Whole merged payload (typed target conversion).
    Payload,
}

impl fmt::Display for MappingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(path) => write!(f, "property `{path}`"),
            Self::Header(name) => write!(f, "header `{name}`"),
            Self::RequestPayload => f.write_str("request payload"),
            Self::Payload => f.write_str("payload"),
        }
    }
}

/// Cause of a mapping failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingFailure {
    /// Expression evaluation failed.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    /// Assigning the value on the target failed.
    #[error(transparent)]
    Assignment(#[from] AssignError),
}

/// Failure of a required mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mapping for {target} failed: {failure}")]
pub struct MappingError {
    /// Destination of the failing mapping.
    pub target: MappingTarget,
    /// Failure cause.
    pub failure: MappingFailure,
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Reason a mapping did not apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Reply-sourced mapping with no reply available.
    NoReply,
    /// Null-result mapping while a reply is available.
    ReplyPresent,
    /// `IfAbsent` header mapping whose header exists on the inbound message.
    HeaderPresent,
    /// Optional mapping whose evaluation or assignment failed.
    OptionalFailure(MappingFailure),
}

impl SkipReason {
    /// Returns a stable label for the skip reason.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NoReply => "no_reply",
            Self::ReplyPresent => "reply_present",
            Self::HeaderPresent => "header_present",
            Self::OptionalFailure(_) => "optional_failure",
        }
    }
}

/// Tagged result of evaluating one mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingOutcome {
    /// Mapping applied the contained value.
    Applied(Value),
    /// Mapping was skipped.
    Skipped(SkipReason),
    /// Required mapping failed.
    Failed(MappingError),
}

impl MappingOutcome {
    /// Classifies a mapping result according to its `required` flag.
    #[must_use]
    pub fn from_result(
        result: Result<Value, MappingFailure>,
        required: bool,
        target: MappingTarget,
    ) -> Self {
        match result {
            Ok(value) => Self::Applied(value),
            Err(failure) if required => Self::Failed(MappingError {
                target,
                failure,
            }),
            Err(failure) => Self::Skipped(SkipReason::OptionalFailure(failure)),
        }
    }
}

// ============================================================================
// SECTION: Property Mapping
// ============================================================================

/// Mapping from an expression to a property on the cloned target.
///
/// # Invariants
/// - Immutable after construction; safe to share across invocations.
#[derive(Clone)]
pub struct PropertyMapping {
    /// Target property path.
    target: PropertyPath,
    /// Source expression.
    expression: Arc<dyn Evaluate>,
    /// Message the expression is evaluated against.
    source: MappingSource,
    /// Whether failure aborts the invocation.
    required: bool,
}

impl PropertyMapping {
    /// Creates a required, reply-sourced property mapping.
    pub fn new(target: PropertyPath, expression: impl Evaluate + 'static) -> Self {
        Self {
            target,
            expression: Arc::new(expression),
            source: MappingSource::Reply,
            required: true,
        }
    }

    /// Sets the message the expression is evaluated against.
    #[must_use]
    pub fn with_source(mut self, source: MappingSource) -> Self {
        self.source = source;
        self
    }

    /// Sets whether a failure aborts the invocation.
    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Marks the mapping optional.
    #[must_use]
    pub fn optional(self) -> Self {
        self.with_required(false)
    }

    /// Returns the target property path.
    #[must_use]
    pub const fn target(&self) -> &PropertyPath {
        &self.target
    }

    /// Returns the mapping source.
    #[must_use]
    pub const fn source(&self) -> MappingSource {
        self.source
    }

    /// Returns true when failure aborts the invocation.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the source expression.
    #[must_use]
    pub fn expression(&self) -> &dyn Evaluate {
        self.expression.as_ref()
    }
}

impl fmt::Debug for PropertyMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMapping")
            .field("target", &self.target)
            .field("expression", &self.expression.describe())
            .field("source", &self.source)
            .field("required", &self.required)
            .finish()
    }
}

// ============================================================================
// SECTION: Header Mapping
// ============================================================================

/// Mapping from an expression to an outbound header.
///
/// # Invariants
/// - Immutable after construction; safe to share across invocations.
#[derive(Clone)]
pub struct HeaderMapping {
    /// Header name.
    name: String,
    /// Source expression.
    expression: Arc<dyn Evaluate>,
    /// Message the expression is evaluated against.
    source: MappingSource,
    /// Overwrite policy for headers already present on the inbound message.
    overwrite: OverwritePolicy,
    /// Whether failure aborts the invocation.
    required: bool,
}

impl HeaderMapping {
    /// Creates a required, reply-sourced `IfAbsent` header mapping.
    pub fn new(name: impl Into<String>, expression: impl Evaluate + 'static) -> Self {
        Self {
            name: name.into(),
            expression: Arc::new(expression),
            source: MappingSource::Reply,
            overwrite: OverwritePolicy::IfAbsent,
            required: true,
        }
    }

    /// Creates an `IfAbsent` header mapping carrying a static value.
    ///
    /// Static values do not depend on the reply and apply on every invocation.
    pub fn value(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, Literal::new(value)).with_source(MappingSource::Inbound)
    }

    /// Sets the message the expression is evaluated against.
    #[must_use]
    pub fn with_source(mut self, source: MappingSource) -> Self {
        self.source = source;
        self
    }

    /// Sets the overwrite policy.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: OverwritePolicy) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Sets the overwrite policy to [`OverwritePolicy::Always`].
    #[must_use]
    pub fn always(self) -> Self {
        self.with_overwrite(OverwritePolicy::Always)
    }

    /// Sets whether a failure aborts the invocation.
    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Marks the mapping optional.
    #[must_use]
    pub fn optional(self) -> Self {
        self.with_required(false)
    }

    /// Returns the header name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the mapping source.
    #[must_use]
    pub const fn source(&self) -> MappingSource {
        self.source
    }

    /// Returns the overwrite policy.
    #[must_use]
    pub const fn overwrite(&self) -> OverwritePolicy {
        self.overwrite
    }

    /// Returns true when failure aborts the invocation.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the source expression.
    #[must_use]
    pub fn expression(&self) -> &dyn Evaluate {
        self.expression.as_ref()
    }
}

impl fmt::Debug for HeaderMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderMapping")
            .field("name", &self.name)
            .field("expression", &self.expression.describe())
            .field("source", &self.source)
            .field("overwrite", &self.overwrite)
            .field("required", &self.required)
            .finish()
    }
}
