// crates/enricher-core/src/core/path.rs
// ============================================================================
// Module: Enricher Property Paths
// Description: Dotted target paths addressing settable fields on a target object.
// Purpose: Assign resolved mapping values into a cloned target.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`PropertyPath`] such as `address.city` identifies a field on a JSON
//! object target. Assignment creates missing intermediate objects and replaces
//! `null` intermediates, but refuses to descend through any other value.
//! Invariants:
//! - Paths contain at least one segment; segments are non-empty and use
//!   `[A-Za-z0-9_-]` only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum number of segments accepted in a property path.
pub const MAX_PATH_SEGMENTS: usize = 32;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned while parsing a property path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Path text was empty.
    #[error("property path is empty")]
    Empty,
    /// Path contained an empty segment (for example `a..b`).
    #[error("property path `{path}` has an empty segment")]
    EmptySegment {
        /// Offending path text.
        path: String,
    },
    /// Path segment contained a disallowed character.
    #[error("property path segment `{segment}` contains invalid characters")]
    InvalidSegment {
        /// Offending segment.
        segment: String,
    },
    /// Path exceeded the maximum segment count.
    #[error("property path exceeds {max} segments")]
    TooDeep {
        /// Maximum allowed segments.
        max: usize,
    },
}

/// Errors returned while assigning a value at a property path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignError {
    /// Target root is not a JSON object.
    #[error("target is not an object")]
    TargetNotObject,
    /// An intermediate value is not an object.
    #[error("cannot assign through `{at}`: value is not an object")]
    NotAnObject {
        /// Path prefix naming the blocking value.
        at: String,
    },
    /// Merged payload could not be converted into the typed target.
    #[error("merged payload does not fit the target type: {0}")]
    Deserialize(String),
}

// ============================================================================
// SECTION: Property Path
// ============================================================================

/// Dotted path addressing a field on a target object.
///
/// # Invariants
/// - `segments` is non-empty and every segment passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    /// Validated path segments.
    segments: Vec<String>,
}

impl PropertyPath {
    /// Parses a dotted property path.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] when the path is empty or malformed.
    pub fn parse(text: &str) -> Result<Self, PathError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }
        let mut segments = Vec::new();
        for segment in trimmed.split('.') {
            if segment.is_empty() {
                return Err(PathError::EmptySegment {
                    path: trimmed.to_string(),
                });
            }
            if !segment.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-') {
                return Err(PathError::InvalidSegment {
                    segment: segment.to_string(),
                });
            }
            segments.push(segment.to_string());
        }
        if segments.len() > MAX_PATH_SEGMENTS {
            return Err(PathError::TooDeep {
                max: MAX_PATH_SEGMENTS,
            });
        }
        Ok(Self {
            segments,
        })
    }

    /// Returns the path segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Reads the value at this path, if present.
    #[must_use]
    pub fn get<'a>(&self, target: &'a Value) -> Option<&'a Value> {
        self.segments.iter().try_fold(target, |current, segment| current.get(segment))
    }

    /// Assigns `value` at this path inside `target`.
    ///
    /// # Errors
    ///
    /// Returns [`AssignError`] when the target or an intermediate value is not an object.
    pub fn assign(&self, target: &mut Value, value: Value) -> Result<(), AssignError> {
        let Value::Object(root) = target else {
            return Err(AssignError::TargetNotObject);
        };
        let Some((last, parents)) = self.segments.split_last() else {
            return Err(AssignError::TargetNotObject);
        };
        let mut current: &mut Map<String, Value> = root;
        for (depth, segment) in parents.iter().enumerate() {
            let slot = current.entry(segment.clone()).or_insert(Value::Null);
            if slot.is_null() {
                *slot = Value::Object(Map::new());
            }
            let Value::Object(next) = slot else {
                return Err(AssignError::NotAnObject {
                    at: self.segments[..= depth].join("."),
                });
            };
            current = next;
        }
        current.insert(last.clone(), value);
        Ok(())
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for PropertyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
