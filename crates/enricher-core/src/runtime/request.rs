// crates/enricher-core/src/runtime/request.rs
// ============================================================================
// Module: Request Builder
// Description: Derives the sub-flow request from an inbound message.
// Purpose: Select the request payload, propagate headers, assign correlation.
// Dependencies: crate::core, crate::expression
// ============================================================================

//! ## Overview
//! [`RequestBuilder`] is configured once and produces an immutable
//! [`EnrichmentRequest`] per invocation. The payload is either the inbound
//! payload as-is or the result of a request expression evaluated against the
//! inbound message. Inbound headers are propagated according to
//! [`HeaderPropagation`]. When correlation is enabled every request receives
//! a fresh identifier from the builder's generator.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::core::CORRELATION_ID_HEADER;
use crate::core::CorrelationIdGenerator;
use crate::core::EnrichmentRequest;
use crate::core::Headers;
use crate::core::MappingError;
use crate::core::MappingFailure;
use crate::core::MappingTarget;
use crate::core::Message;
use crate::expression::Evaluate;

// ============================================================================
// SECTION: Policies
// ============================================================================

/// Source of the request payload.
#[derive(Clone, Default)]
pub enum RequestPayload {
    /// Forward the inbound payload unchanged.
    #[default]
    Inbound,
    /// Evaluate an expression against the inbound message.
    Expression(Arc<dyn Evaluate>),
}

impl fmt::Debug for RequestPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inbound => f.write_str("Inbound"),
            Self::Expression(expression) => {
                f.debug_tuple("Expression").field(&expression.describe()).finish()
            }
        }
    }
}

/// Which inbound headers are copied onto the request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HeaderPropagation {
    /// Copy every inbound header.
    #[default]
    All,
    /// Copy no headers.
    None,
    /// Copy only the named headers.
    Include(BTreeSet<String>),
    /// Copy every header except the named ones.
    Exclude(BTreeSet<String>),
}

impl HeaderPropagation {
    /// Returns true when the header named `name` is propagated.
    #[must_use]
    pub fn allows(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::None => false,
            Self::Include(names) => names.contains(name),
            Self::Exclude(names) => !names.contains(name),
        }
    }
}

// ============================================================================
// SECTION: Request Builder
// ============================================================================

/// Builds sub-flow requests from inbound messages.
///
/// # Invariants
/// - Immutable after configuration except for the correlation counter.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    /// Payload source.
    payload: RequestPayload,
    /// Header propagation rule.
    propagation: HeaderPropagation,
    /// Correlation identifier generator, when correlation is enabled.
    correlation: Option<Arc<CorrelationIdGenerator>>,
}

impl RequestBuilder {
    /// Creates a builder forwarding the inbound payload and all headers,
    /// without correlation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `expression` evaluated against the inbound message as payload.
    #[must_use]
    pub fn with_payload_expression(mut self, expression: impl Evaluate + 'static) -> Self {
        self.payload = RequestPayload::Expression(Arc::new(expression));
        self
    }

    /// Sets the header propagation rule.
    #[must_use]
    pub fn with_header_propagation(mut self, propagation: HeaderPropagation) -> Self {
        self.propagation = propagation;
        self
    }

    /// Enables explicit correlation using `generator`.
    #[must_use]
    pub fn with_correlation(mut self, generator: CorrelationIdGenerator) -> Self {
        self.correlation = Some(Arc::new(generator));
        self
    }

    /// Returns true when requests carry correlation identifiers.
    #[must_use]
    pub const fn correlates(&self) -> bool {
        self.correlation.is_some()
    }

    /// Returns the payload source.
    #[must_use]
    pub const fn payload(&self) -> &RequestPayload {
        &self.payload
    }

    /// Returns the header propagation rule.
    #[must_use]
    pub const fn header_propagation(&self) -> &HeaderPropagation {
        &self.propagation
    }

    /// Builds the request for `inbound`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError`] targeting the request payload when the
    /// request expression fails.
    pub fn build(&self, inbound: &Message) -> Result<EnrichmentRequest, MappingError> {
        let payload = match &self.payload {
            RequestPayload::Inbound => inbound.payload.clone(),
            RequestPayload::Expression(expression) => {
                expression.evaluate(inbound).map_err(|err| MappingError {
                    target: MappingTarget::RequestPayload,
                    failure: MappingFailure::Evaluation(err),
                })?
            }
        };
        let mut headers: Headers = inbound
            .headers
            .iter()
            .filter(|(name, _)| self.propagation.allows(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let correlation_id = self.correlation.as_ref().map(|generator| generator.issue());
        if correlation_id.is_some() {
            // An upstream correlation header must not shadow the issued id.
            headers.remove(CORRELATION_ID_HEADER);
        }
        Ok(EnrichmentRequest::new(payload, headers, correlation_id))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
