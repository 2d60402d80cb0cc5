// crates/enricher-core/src/core/message.rs
// ============================================================================
// Module: Enricher Messages
// Description: Message, header, and enrichment request value types.
// Purpose: Carry payloads and headers between the engine and its sub-flow.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Message`] is a JSON payload plus an ordered header map. Messages are
//! plain values: the engine never mutates an inbound message, it derives new
//! ones. [`EnrichmentRequest`] is the immutable request sent to the sub-flow
//! for a single invocation.
//! Invariants:
//! - Header names are unique; iteration order is lexicographic.
//! - A request carries a correlation identifier only when correlation is enabled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::CORRELATION_ID_HEADER;
use crate::core::identifiers::CorrelationId;

// ============================================================================
// SECTION: Headers
// ============================================================================

/// Ordered message header map.
///
/// # Invariants
/// - Header names are unique keys; inserting an existing name replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, Value>);

impl Headers {
    /// Creates an empty header map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the header value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns true when a header named `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Inserts a header, returning the replaced value if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Removes a header, returning its value if present.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Returns the number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates headers in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Renders the headers as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.0.iter().map(|(name, value)| (name.clone(), value.clone())).collect())
    }
}

impl FromIterator<(String, Value)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Headers {
    type IntoIter = btree_map::Iter<'a, String, Value>;
    type Item = (&'a String, &'a Value);

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Headers {
    type IntoIter = btree_map::IntoIter<String, Value>;
    type Item = (String, Value);

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// ============================================================================
// SECTION: Message
// ============================================================================

/// Message exchanged with the engine and its sub-flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message payload.
    pub payload: Value,
    /// Message headers.
    #[serde(default)]
    pub headers: Headers,
}

impl Message {
    /// Creates a message with the given payload and no headers.
    #[must_use]
    pub fn new(payload: impl Into<Value>) -> Self {
        Self {
            payload: payload.into(),
            headers: Headers::new(),
        }
    }

    /// Returns the message with an additional header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns the correlation identifier header when it is a string.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.headers.get(CORRELATION_ID_HEADER).and_then(Value::as_str)
    }
}

// ============================================================================
// SECTION: Enrichment Request
// ============================================================================

/// Request dispatched to the enrichment sub-flow.
///
/// # Invariants
/// - Immutable once built; consumed by the transport send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentRequest {
    /// Correlation identifier when explicit correlation is enabled.
    correlation_id: Option<CorrelationId>,
    /// Request payload derived from the inbound message.
    payload: Value,
    /// Headers propagated from the inbound message.
    headers: Headers,
}

impl EnrichmentRequest {
    /// Creates an enrichment request.
    #[must_use]
    pub const fn new(
        payload: Value,
        headers: Headers,
        correlation_id: Option<CorrelationId>,
    ) -> Self {
        Self {
            correlation_id,
            payload,
            headers,
        }
    }

    /// Returns the correlation identifier, if any.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    /// Returns the request payload.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// Returns the propagated request headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Renders the request as a message, stamping the correlation header.
    #[must_use]
    pub fn to_message(&self) -> Message {
        let mut headers = self.headers.clone();
        if let Some(id) = &self.correlation_id {
            headers.insert(CORRELATION_ID_HEADER, id.as_str());
        }
        Message {
            payload: self.payload.clone(),
            headers,
        }
    }
}
