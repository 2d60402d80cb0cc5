// crates/enricher-core/src/expression.rs
// ============================================================================
// Module: Enrichment Expressions
// Description: Evaluation capability and the parsed expression language.
// Purpose: Resolve mapping values from a reply or inbound message.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every mapping carries an [`Evaluate`] capability: something that turns a
//! [`Message`] into a JSON value or fails. Three implementations ship here:
//!
//! - [`Expression`]: parsed text such as `payload.customer.name ?: 'n/a'`.
//! - [`Literal`]: a constant value.
//! - [`FnEvaluator`]: any closure, built with [`from_fn`].
//!
//! Expressions are parsed once and are immutable afterwards, so a single
//! instance is safely shared across concurrent invocations.
//!
//! Evaluation rules:
//! - Descending through `null` or a missing key yields
//!   [`EvaluationError::MissingPath`].
//! - A path ending on an explicit `null` evaluates to `null`.
//! - `a ?: b` yields `b` when `a` is `null` or missing; other failures propagate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use crate::core::Message;
use crate::core::json_kind;

mod parser;

pub use parser::MAX_EXPRESSION_BYTES;
pub use parser::MAX_EXPRESSION_NESTING;
use parser::Node;
use parser::PathExpr;
use parser::Root;
use parser::Segment;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned while parsing expression text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    /// Expression text was empty or whitespace.
    #[error("expression is empty")]
    EmptyInput,
    /// Expression text exceeded the size limit.
    #[error("expression exceeds size limit ({actual_bytes} > {max_bytes} bytes)")]
    InputTooLarge {
        /// Maximum allowed size in bytes.
        max_bytes: usize,
        /// Actual size in bytes.
        actual_bytes: usize,
    },
    /// Expression nesting exceeded the depth limit.
    #[error("expression nesting exceeds {max_depth} at position {position}")]
    NestingTooDeep {
        /// Maximum allowed nesting depth.
        max_depth: usize,
        /// Byte offset where the limit was hit.
        position: usize,
    },
    /// Parser met a token it did not expect.
    #[error("expected {expected}, found `{found}` at position {position}")]
    UnexpectedToken {
        /// Description of what was expected.
        expected: &'static str,
        /// Rendering of the token found.
        found: String,
        /// Byte offset of the token.
        position: usize,
    },
    /// Path began with an identifier other than `payload` or `headers`.
    #[error("unknown path root `{name}` at position {position}")]
    UnknownRoot {
        /// Identifier found.
        name: String,
        /// Byte offset of the identifier.
        position: usize,
    },
    /// Numeric literal or index could not be parsed.
    #[error("invalid number `{raw}` at position {position}")]
    InvalidNumber {
        /// Raw literal text.
        raw: String,
        /// Byte offset of the literal.
        position: usize,
    },
    /// String literal was not closed.
    #[error("unterminated string starting at position {position}")]
    UnterminatedString {
        /// Byte offset of the opening quote.
        position: usize,
    },
    /// Input continued after a complete expression.
    #[error("unexpected trailing input at position {position}")]
    TrailingInput {
        /// Byte offset of the first extra token.
        position: usize,
    },
}

/// Errors returned while evaluating a mapping against a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// A path step addressed a missing field or descended through `null`.
    #[error("path `{path}` is missing")]
    MissingPath {
        /// Rendered path up to and including the missing step.
        path: String,
    },
    /// A path step was applied to a value of the wrong JSON kind.
    #[error("path `{path}` is a {found}, expected {expected}")]
    TypeMismatch {
        /// Rendered path of the offending value.
        path: String,
        /// Expected JSON kind.
        expected: &'static str,
        /// Actual JSON kind.
        found: &'static str,
    },
    /// Array index was past the end of the array.
    #[error("index {index} is out of bounds for `{path}` (length {len})")]
    IndexOutOfBounds {
        /// Rendered path of the array.
        path: String,
        /// Requested index.
        index: usize,
        /// Array length.
        len: usize,
    },
    /// Custom evaluator failure.
    #[error("evaluation failed: {0}")]
    Failed(String),
}

// ============================================================================
// SECTION: Evaluate
// ============================================================================

/// Capability that resolves a value from a message.
///
/// Implementations must be free of shared mutable state; the engine calls
/// them concurrently from independent invocations.
pub trait Evaluate: Send + Sync {
    /// Evaluates against `context`.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError`] when the value cannot be resolved.
    fn evaluate(&self, context: &Message) -> Result<Value, EvaluationError>;

    /// Returns a short description for diagnostics.
    fn describe(&self) -> String {
        "<fn>".to_string()
    }
}

/// Closure-backed evaluator.
#[derive(Clone)]
pub struct FnEvaluator<F> {
    /// Wrapped closure.
    function: F,
}

/// Wraps a closure as an [`Evaluate`] implementation.
pub const fn from_fn<F>(function: F) -> FnEvaluator<F>
where
    F: Fn(&Message) -> Result<Value, EvaluationError> + Send + Sync,
{
    FnEvaluator {
        function,
    }
}

impl<F> Evaluate for FnEvaluator<F>
where
    F: Fn(&Message) -> Result<Value, EvaluationError> + Send + Sync,
{
    fn evaluate(&self, context: &Message) -> Result<Value, EvaluationError> {
        (self.function)(context)
    }
}

impl<F> fmt::Debug for FnEvaluator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEvaluator").finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Literal
// ============================================================================

/// Evaluator that always yields the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal(Value);

impl Literal {
    /// Creates a literal evaluator.
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// Returns the literal value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.0
    }
}

impl Evaluate for Literal {
    fn evaluate(&self, _context: &Message) -> Result<Value, EvaluationError> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        self.0.to_string()
    }
}

// ============================================================================
// SECTION: Expression
// ============================================================================

/// Parsed expression over a message's payload and headers.
///
/// # Invariants
/// - `node` is the parse of `source`.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    /// Original expression text.
    source: String,
    /// Parsed syntax tree.
    node: Node,
}

impl Expression {
    /// Parses expression text.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError`] when the text is not a valid expression.
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let node = parser::parse(source)?;
        Ok(Self {
            source: source.trim().to_string(),
            node,
        })
    }

    /// Returns the expression text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Expression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Evaluate for Expression {
    fn evaluate(&self, context: &Message) -> Result<Value, EvaluationError> {
        evaluate_node(&self.node, context)
    }

    fn describe(&self) -> String {
        self.source.clone()
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates a syntax tree node.
fn evaluate_node(node: &Node, context: &Message) -> Result<Value, EvaluationError> {
    match node {
        Node::Literal(value) => Ok(value.clone()),
        Node::Path(path) => resolve_path(path, context).cloned(),
        Node::Fallback(left, right) => match evaluate_node(left, context) {
            Ok(Value::Null) | Err(EvaluationError::MissingPath { .. }) => {
                evaluate_node(right, context)
            }
            other => other,
        },
    }
}

/// Resolves a path to a borrowed value inside the context.
fn resolve_path<'a>(path: &PathExpr, context: &'a Message) -> Result<&'a Value, EvaluationError> {
    let mut rendered = path.root.keyword().to_string();
    let mut segments = path.segments.iter();

    let mut current = match path.root {
        Root::Payload => &context.payload,
        Root::Headers => {
            let Some(first) = segments.next() else {
                return Err(EvaluationError::TypeMismatch {
                    path: rendered,
                    expected: "header name",
                    found: "object",
                });
            };
            let Segment::Key(name) = first else {
                return Err(EvaluationError::TypeMismatch {
                    path: rendered,
                    expected: "array",
                    found: "object",
                });
            };
            first.render_into(&mut rendered);
            context.headers.get(name).ok_or_else(|| EvaluationError::MissingPath {
                path: rendered.clone(),
            })?
        }
    };

    for segment in segments {
        current = step(current, segment, &mut rendered)?;
    }
    Ok(current)
}

/// Applies one accessor, extending `rendered` with it on success.
fn step<'a>(
    current: &'a Value,
    segment: &Segment,
    rendered: &mut String,
) -> Result<&'a Value, EvaluationError> {
    match (segment, current) {
        (_, Value::Null) => {
            segment.render_into(rendered);
            Err(EvaluationError::MissingPath {
                path: rendered.clone(),
            })
        }
        (Segment::Key(key), Value::Object(map)) => {
            segment.render_into(rendered);
            map.get(key).ok_or_else(|| EvaluationError::MissingPath {
                path: rendered.clone(),
            })
        }
        (Segment::Index(index), Value::Array(items)) => {
            let value = items.get(*index).ok_or_else(|| EvaluationError::IndexOutOfBounds {
                path: rendered.clone(),
                index: *index,
                len: items.len(),
            })?;
            segment.render_into(rendered);
            Ok(value)
        }
        (Segment::Key(_), other) => Err(EvaluationError::TypeMismatch {
            path: rendered.clone(),
            expected: "object",
            found: json_kind(other),
        }),
        (Segment::Index(_), other) => Err(EvaluationError::TypeMismatch {
            path: rendered.clone(),
            expected: "array",
            found: json_kind(other),
        }),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
