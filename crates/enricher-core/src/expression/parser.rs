// crates/enricher-core/src/expression/parser.rs
// ============================================================================
// Module: Expression Parser
// Description: Lexer and recursive-descent parser for enrichment expressions.
// Purpose: Turn expression text into an evaluable syntax tree once, at
//          configuration time.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Parses the enrichment expression grammar:
//!
//! - **Paths**: `payload`, `payload.customer.name`, `payload.items[0]`,
//!   `headers.tenant`, `headers['x-trace id']`
//! - **Literals**: `'text'`, `"text"`, `42`, `-1.5`, `true`, `false`, `null`
//! - **Fallback**: `payload.nickname ?: payload.name ?: 'anonymous'`
//!   (right associative)
//! - **Grouping**: `( ... )`
//!
//! Input size and nesting are bounded.

use serde_json::Number;
use serde_json::Value;

use crate::expression::ExpressionError;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum allowed expression input size in bytes.
pub const MAX_EXPRESSION_BYTES: usize = 4096;
/// Maximum supported nesting depth for grouped or fallback expressions.
pub const MAX_EXPRESSION_NESTING: usize = 32;

// ============================================================================
// SECTION: Syntax Tree
// ============================================================================

/// Parsed expression node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    /// Literal JSON value.
    Literal(Value),
    /// Path into the evaluation context.
    Path(PathExpr),
    /// Left value unless it is null or missing, otherwise the right value.
    Fallback(Box<Node>, Box<Node>),
}

/// Path rooted at the message payload or headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PathExpr {
    /// Path root.
    pub(crate) root: Root,
    /// Accessor chain applied to the root.
    pub(crate) segments: Vec<Segment>,
}

/// Root of a path expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Root {
    /// Message payload.
    Payload,
    /// Message headers.
    Headers,
}

impl Root {
    /// Returns the keyword for this root.
    pub(crate) const fn keyword(self) -> &'static str {
        match self {
            Self::Payload => "payload",
            Self::Headers => "headers",
        }
    }
}

/// Single accessor in a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    /// Object field access.
    Key(String),
    /// Array element access.
    Index(usize),
}

impl Segment {
    /// Appends the canonical rendering of this accessor to `out`.
    pub(crate) fn render_into(&self, out: &mut String) {
        match self {
            Self::Key(key) if is_plain_key(key) => {
                out.push('.');
                out.push_str(key);
            }
            Self::Key(key) => {
                out.push_str("['");
                for ch in key.chars() {
                    if ch == '\'' || ch == '\\' {
                        out.push('\\');
                    }
                    out.push(ch);
                }
                out.push_str("']");
            }
            Self::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
        }
    }
}

/// Returns true when `key` can be rendered with dot syntax.
fn is_plain_key(key: &str) -> bool {
    let mut bytes = key.bytes();
    bytes.next().is_some_and(|b| b.is_ascii_alphabetic() || b == b'_')
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Parses expression text into a syntax tree.
pub(crate) fn parse(input: &str) -> Result<Node, ExpressionError> {
    if input.len() > MAX_EXPRESSION_BYTES {
        return Err(ExpressionError::InputTooLarge {
            max_bytes: MAX_EXPRESSION_BYTES,
            actual_bytes: input.len(),
        });
    }
    let tokens = Lexer::new(input).lex()?;
    let mut parser = Parser {
        tokens,
        index: 0,
    };
    let node = parser.parse_expression(0)?;
    parser.expect_eof()?;
    Ok(node)
}

// ============================================================================
// SECTION: Lexer
// ============================================================================

/// Lexer token produced from expression input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    /// Identifier or keyword.
    Ident(&'a str),
    /// Numeric literal text.
    Number(&'a str),
    /// Decoded string literal.
    Str(String),
    /// `.` accessor.
    Dot,
    /// `[` accessor open.
    LBracket,
    /// `]` accessor close.
    RBracket,
    /// `(` group open.
    LParen,
    /// `)` group close.
    RParen,
    /// `?:` fallback operator.
    Fallback,
    /// End-of-input marker.
    Eof,
}

impl Token<'_> {
    /// Returns a short rendering for diagnostics.
    fn describe(&self) -> String {
        match self {
            Self::Ident(text) | Self::Number(text) => (*text).to_string(),
            Self::Str(text) => format!("'{text}'"),
            Self::Dot => ".".to_string(),
            Self::LBracket => "[".to_string(),
            Self::RBracket => "]".to_string(),
            Self::LParen => "(".to_string(),
            Self::RParen => ")".to_string(),
            Self::Fallback => "?:".to_string(),
            Self::Eof => "end of input".to_string(),
        }
    }
}

/// Token paired with its byte offset.
#[derive(Debug, Clone)]
struct SpannedToken<'a> {
    /// Token value.
    token: Token<'a>,
    /// Byte offset into the input.
    position: usize,
}

/// Lexer for expression input.
struct Lexer<'a> {
    /// Source input being tokenized.
    input: &'a str,
    /// Current byte offset into the input.
    offset: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    const fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
        }
    }

    /// Lexes the input into a sequence of tokens.
    fn lex(&mut self) -> Result<Vec<SpannedToken<'a>>, ExpressionError> {
        let mut tokens = Vec::new();
        let bytes = self.input.as_bytes();

        while let Some(&ch) = bytes.get(self.offset) {
            let start = self.offset;
            let token = match ch {
                b' ' | b'\t' | b'\n' | b'\r' => {
                    self.offset += 1;
                    continue;
                }
                b'.' => self.single(Token::Dot),
                b'[' => self.single(Token::LBracket),
                b']' => self.single(Token::RBracket),
                b'(' => self.single(Token::LParen),
                b')' => self.single(Token::RParen),
                b'?' => {
                    if bytes.get(self.offset + 1) != Some(&b':') {
                        return Err(ExpressionError::UnexpectedToken {
                            expected: "?:",
                            found: "?".to_string(),
                            position: start,
                        });
                    }
                    self.offset += 2;
                    Token::Fallback
                }
                b'\'' | b'"' => Token::Str(self.string(ch)?),
                b'-' | b'0' ..= b'9' => Token::Number(self.number()?),
                b'a' ..= b'z' | b'A' ..= b'Z' | b'_' => {
                    self.consume_while(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
                    Token::Ident(&self.input[start .. self.offset])
                }
                _ => {
                    let found = self.input[start ..].chars().next().map(String::from);
                    return Err(ExpressionError::UnexpectedToken {
                        expected: "path, literal, or operator",
                        found: found.unwrap_or_default(),
                        position: start,
                    });
                }
            };
            tokens.push(SpannedToken {
                token,
                position: start,
            });
        }

        if tokens.is_empty() {
            return Err(ExpressionError::EmptyInput);
        }
        tokens.push(SpannedToken {
            token: Token::Eof,
            position: self.offset,
        });
        Ok(tokens)
    }

    /// Consumes a single-byte token.
    const fn single(&mut self, token: Token<'a>) -> Token<'a> {
        self.offset += 1;
        token
    }

    /// Lexes a quoted string literal, decoding escapes.
    fn string(&mut self, quote: u8) -> Result<String, ExpressionError> {
        let start = self.offset;
        let mut out = String::new();
        let mut chars = self.input[start + 1 ..].char_indices();
        while let Some((relative, ch)) = chars.next() {
            match ch {
                '\\' => {
                    let escaped = match chars.next() {
                        Some((_, '\\')) => '\\',
                        Some((_, '\'')) => '\'',
                        Some((_, '"')) => '"',
                        Some((_, 'n')) => '\n',
                        Some((_, 't')) => '\t',
                        Some((offset, other)) => {
                            return Err(ExpressionError::UnexpectedToken {
                                expected: "escape sequence",
                                found: format!("\\{other}"),
                                position: start + 1 + offset,
                            });
                        }
                        None => {
                            return Err(ExpressionError::UnterminatedString {
                                position: start,
                            });
                        }
                    };
                    out.push(escaped);
                }
                _ if ch == char::from(quote) => {
                    self.offset = start + 1 + relative + 1;
                    return Ok(out);
                }
                _ => out.push(ch),
            }
        }
        Err(ExpressionError::UnterminatedString {
            position: start,
        })
    }

    /// Lexes a numeric literal: optional sign, digits, optional fraction.
    fn number(&mut self) -> Result<&'a str, ExpressionError> {
        let start = self.offset;
        let bytes = self.input.as_bytes();
        if bytes.get(self.offset) == Some(&b'-') {
            self.offset += 1;
        }
        let digits_start = self.offset;
        self.consume_while(|b| b.is_ascii_digit());
        if self.offset == digits_start {
            return Err(ExpressionError::InvalidNumber {
                raw: self.input[start .. self.offset].to_string(),
                position: start,
            });
        }
        if bytes.get(self.offset) == Some(&b'.')
            && bytes.get(self.offset + 1).is_some_and(u8::is_ascii_digit)
        {
            self.offset += 1;
            self.consume_while(|b| b.is_ascii_digit());
        }
        Ok(&self.input[start .. self.offset])
    }

    /// Advances while the condition matches the current byte.
    fn consume_while<F>(&mut self, condition: F)
    where
        F: Fn(u8) -> bool,
    {
        while let Some(&b) = self.input.as_bytes().get(self.offset) {
            if condition(b) {
                self.offset += 1;
            } else {
                break;
            }
        }
    }
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Recursive-descent parser over the token stream.
struct Parser<'a> {
    /// Token stream with source positions.
    tokens: Vec<SpannedToken<'a>>,
    /// Current token index.
    index: usize,
}

impl<'a> Parser<'a> {
    /// Parses a fallback chain.
    fn parse_expression(&mut self, depth: usize) -> Result<Node, ExpressionError> {
        if depth > MAX_EXPRESSION_NESTING {
            return Err(ExpressionError::NestingTooDeep {
                max_depth: MAX_EXPRESSION_NESTING,
                position: self.current().position,
            });
        }
        let left = self.parse_primary(depth)?;
        if self.current().token == Token::Fallback {
            self.advance();
            let right = self.parse_expression(depth + 1)?;
            return Ok(Node::Fallback(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    /// Parses a literal, path, or parenthesized expression.
    fn parse_primary(&mut self, depth: usize) -> Result<Node, ExpressionError> {
        let SpannedToken {
            token,
            position,
        } = self.current().clone();
        match token {
            Token::Str(text) => {
                self.advance();
                Ok(Node::Literal(Value::String(text)))
            }
            Token::Number(raw) => {
                self.advance();
                parse_number(raw, position).map(Node::Literal)
            }
            Token::Ident("true") => {
                self.advance();
                Ok(Node::Literal(Value::Bool(true)))
            }
            Token::Ident("false") => {
                self.advance();
                Ok(Node::Literal(Value::Bool(false)))
            }
            Token::Ident("null") => {
                self.advance();
                Ok(Node::Literal(Value::Null))
            }
            Token::Ident("payload") => {
                self.advance();
                self.parse_path(Root::Payload)
            }
            Token::Ident("headers") => {
                self.advance();
                self.parse_path(Root::Headers)
            }
            Token::Ident(name) => Err(ExpressionError::UnknownRoot {
                name: name.to_string(),
                position,
            }),
            Token::LParen => {
                self.advance();
                let inner = self.parse_expression(depth + 1)?;
                self.expect(&Token::RParen, "`)`")?;
                Ok(inner)
            }
            other => Err(ExpressionError::UnexpectedToken {
                expected: "literal, path, or `(`",
                found: other.describe(),
                position,
            }),
        }
    }

    /// Parses the accessor chain following a path root.
    fn parse_path(&mut self, root: Root) -> Result<Node, ExpressionError> {
        let mut segments = Vec::new();
        loop {
            match self.current().token {
                Token::Dot => {
                    self.advance();
                    let SpannedToken {
                        token,
                        position,
                    } = self.current().clone();
                    let Token::Ident(name) = token else {
                        return Err(ExpressionError::UnexpectedToken {
                            expected: "field name",
                            found: token.describe(),
                            position,
                        });
                    };
                    self.advance();
                    segments.push(Segment::Key(name.to_string()));
                }
                Token::LBracket => {
                    self.advance();
                    let SpannedToken {
                        token,
                        position,
                    } = self.current().clone();
                    let segment = match token {
                        Token::Str(key) => Segment::Key(key),
                        Token::Number(raw) => {
                            Segment::Index(raw.parse::<usize>().map_err(|_| {
                                ExpressionError::InvalidNumber {
                                    raw: raw.to_string(),
                                    position,
                                }
                            })?)
                        }
                        other => {
                            return Err(ExpressionError::UnexpectedToken {
                                expected: "quoted key or index",
                                found: other.describe(),
                                position,
                            });
                        }
                    };
                    self.advance();
                    self.expect(&Token::RBracket, "`]`")?;
                    segments.push(segment);
                }
                _ => {
                    return Ok(Node::Path(PathExpr {
                        root,
                        segments,
                    }));
                }
            }
        }
    }

    /// Consumes the expected token or fails.
    fn expect(&mut self, expected: &Token<'a>, label: &'static str) -> Result<(), ExpressionError> {
        let current = self.current();
        if &current.token == expected {
            self.advance();
            return Ok(());
        }
        Err(ExpressionError::UnexpectedToken {
            expected: label,
            found: current.token.describe(),
            position: current.position,
        })
    }

    /// Fails unless the whole input was consumed.
    fn expect_eof(&self) -> Result<(), ExpressionError> {
        let current = self.current();
        if current.token == Token::Eof {
            Ok(())
        } else {
            Err(ExpressionError::TrailingInput {
                position: current.position,
            })
        }
    }

    /// Returns the current token.
    fn current(&self) -> &SpannedToken<'a> {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.index.min(last)]
    }

    /// Advances to the next token.
    const fn advance(&mut self) {
        self.index += 1;
    }
}

/// Parses a numeric literal into a JSON number.
fn parse_number(raw: &str, position: usize) -> Result<Value, ExpressionError> {
    let invalid = || ExpressionError::InvalidNumber {
        raw: raw.to_string(),
        position,
    };
    if raw.contains('.') {
        let value = raw.parse::<f64>().map_err(|_| invalid())?;
        return Number::from_f64(value).map(Value::Number).ok_or_else(invalid);
    }
    raw.parse::<i64>().map(|value| Value::Number(value.into())).map_err(|_| invalid())
}
