// crates/enricher-core/src/core/identifiers.rs
// ============================================================================
// Module: Enricher Identifiers
// Description: Correlation identifiers and their boot-scoped generator.
// Purpose: Match asynchronous replies to the enrichment request that caused them.
// Dependencies: rand, serde
// ============================================================================

//! ## Overview
//! Correlation identifiers are opaque strings carried on enrichment requests
//! and echoed back on replies. Identifiers are generated per invocation using
//! a boot-scoped random seed plus a monotonic counter, so they are unique
//! within the process lifetime without coordination between invocations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header name carrying the correlation identifier on requests and replies.
pub const CORRELATION_ID_HEADER: &str = "correlation_id";

/// Default prefix for generated correlation identifiers.
pub const DEFAULT_CORRELATION_PREFIX: &str = "enr";

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Correlation identifier for one enrichment invocation.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Creates a new correlation identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Boot-scoped correlation ID generator.
///
/// # Invariants
/// - Issued identifiers are unique within the process lifetime.
#[derive(Debug)]
pub struct CorrelationIdGenerator {
    /// Prefix included in every generated correlation ID.
    prefix: String,
    /// Boot-scoped random identifier for entropy.
    boot_id: u64,
    /// Monotonic counter for IDs issued in this process.
    counter: AtomicU64,
}

impl CorrelationIdGenerator {
    /// Creates a new generator with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        Self {
            prefix: prefix.into(),
            boot_id: u64::from_be_bytes(bytes),
            counter: AtomicU64::new(1),
        }
    }

    /// Issues a new correlation ID.
    #[must_use]
    pub fn issue(&self) -> CorrelationId {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        CorrelationId(format!("{}-{:016x}-{:016x}", self.prefix, self.boot_id, seq))
    }
}

impl Default for CorrelationIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CORRELATION_PREFIX)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
