// crates/enricher-core/src/core/target.rs
// ============================================================================
// Module: Enricher Targets
// Description: Target template instantiation and the default target factory.
// Purpose: Guarantee enrichment always operates on a private copy of the target.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Targets are JSON objects. A caller-supplied template is never mutated; the
//! engine instantiates a copy per invocation and merges into that copy. When
//! no template is supplied (or the inbound payload is `null`), the configured
//! [`DefaultTarget`] factory produces a fresh target.
//! Invariants:
//! - Instantiation is total for objects and fails with [`CloneError`] for any
//!   other JSON kind.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned when a target template cannot be instantiated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloneError {
    /// Template is a JSON kind without settable fields.
    #[error("target template of kind {kind} cannot be enriched")]
    UnsupportedType {
        /// JSON kind label of the template.
        kind: &'static str,
    },
    /// Default target factory produced a non-object value.
    #[error("default target factory produced a {kind}, expected an object")]
    DefaultTarget {
        /// JSON kind label of the produced value.
        kind: &'static str,
    },
    /// Typed template could not be serialized into a target object.
    #[error("target template serialization failed: {0}")]
    Serialize(String),
}

// ============================================================================
// SECTION: Default Target
// ============================================================================

/// Factory signature producing a fresh target.
type TargetFactory = dyn Fn() -> Value + Send + Sync;

/// Factory producing an empty target when no template is supplied.
#[derive(Clone)]
pub struct DefaultTarget {
    /// Factory invoked per invocation.
    factory: Arc<TargetFactory>,
}

impl DefaultTarget {
    /// Creates a default target from a factory function.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// Creates a default target that copies a fixed prototype value.
    #[must_use]
    pub fn prototype(prototype: Value) -> Self {
        Self::new(move || prototype.clone())
    }

    /// Produces a fresh target object.
    ///
    /// # Errors
    ///
    /// Returns [`CloneError::DefaultTarget`] when the factory returns a non-object.
    pub fn produce(&self) -> Result<Value, CloneError> {
        match (self.factory)() {
            value @ Value::Object(_) => Ok(value),
            other => Err(CloneError::DefaultTarget {
                kind: json_kind(&other),
            }),
        }
    }
}

impl Default for DefaultTarget {
    fn default() -> Self {
        Self::new(|| Value::Object(Map::new()))
    }
}

impl fmt::Debug for DefaultTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultTarget").finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Instantiation
// ============================================================================

/// Instantiates a private copy of `template`, or a default target when absent.
///
/// A `null` template is treated as absent.
///
/// # Errors
///
/// Returns [`CloneError`] when the template is not an object or the default
/// factory misbehaves.
pub fn instantiate_target(
    template: Option<&Value>,
    default_target: &DefaultTarget,
) -> Result<Value, CloneError> {
    match template {
        None | Some(Value::Null) => default_target.produce(),
        Some(value @ Value::Object(_)) => Ok(value.clone()),
        Some(other) => Err(CloneError::UnsupportedType {
            kind: json_kind(other),
        }),
    }
}

/// Serializes a typed template into a target object.
///
/// # Errors
///
/// Returns [`CloneError`] when serialization fails or yields a non-object.
pub fn template_from_typed<T: Serialize>(template: &T) -> Result<Value, CloneError> {
    let value =
        serde_json::to_value(template).map_err(|err| CloneError::Serialize(err.to_string()))?;
    match value {
        Value::Object(_) => Ok(value),
        other => Err(CloneError::UnsupportedType {
            kind: json_kind(&other),
        }),
    }
}

/// Returns a stable label for the JSON kind of `value`.
#[must_use]
pub const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
