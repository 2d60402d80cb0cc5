// crates/enricher-core/src/audit.rs
// ============================================================================
// Module: Enrichment Audit Logging
// Description: Structured audit events for enrichment invocations.
// Purpose: Emit payload-free audit records without hard logging dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every invocation ends with one [`EnrichmentAuditEvent`] describing how it
//! terminated. Replies published to a shared reply topic after their
//! invocation stopped waiting produce a [`LateReplyAuditEvent`]. Events carry
//! identifiers, counts, and labels only; payload and header values are never
//! recorded.
//!
//! Sinks serialize events as JSON lines so deployments can route them to
//! their preferred logging pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::runtime::InvocationState;
use crate::runtime::ReplyStatus;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Terminal audit record for one enrichment invocation.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Engine name.
    pub engine: String,
    /// Correlation identifier when correlation is enabled.
    pub correlation_id: Option<String>,
    /// Terminal invocation state.
    pub state: InvocationState,
    /// How the reply wait ended.
    pub reply: ReplyStatus,
    /// Number of mappings applied.
    pub applied: usize,
    /// Number of mappings skipped.
    pub skipped: usize,
    /// Wall-clock duration of the invocation in milliseconds.
    pub elapsed_ms: u64,
    /// Error kind label when the invocation failed.
    pub error_kind: Option<&'static str>,
}

/// Parameters for constructing an [`EnrichmentAuditEvent`].
#[derive(Debug, Clone)]
pub struct EnrichmentAuditEventParams {
    /// Engine name.
    pub engine: String,
    /// Correlation identifier when correlation is enabled.
    pub correlation_id: Option<String>,
    /// Terminal invocation state.
    pub state: InvocationState,
    /// How the reply wait ended.
    pub reply: ReplyStatus,
    /// Number of mappings applied.
    pub applied: usize,
    /// Number of mappings skipped.
    pub skipped: usize,
    /// Wall-clock duration of the invocation in milliseconds.
    pub elapsed_ms: u64,
    /// Error kind label when the invocation failed.
    pub error_kind: Option<&'static str>,
}

impl EnrichmentAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: EnrichmentAuditEventParams) -> Self {
        Self {
            event: "enrichment",
            timestamp_ms: now_ms(),
            engine: params.engine,
            correlation_id: params.correlation_id,
            state: params.state,
            reply: params.reply,
            applied: params.applied,
            skipped: params.skipped,
            elapsed_ms: params.elapsed_ms,
            error_kind: params.error_kind,
        }
    }
}

/// Audit record for a reply that arrived with nobody waiting for it.
#[derive(Debug, Clone, Serialize)]
pub struct LateReplyAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Reply topic name.
    pub topic: String,
    /// Correlation identifier carried by the reply, if any.
    pub correlation_id: Option<String>,
    /// Rejection reason label.
    pub reason: &'static str,
}

impl LateReplyAuditEvent {
    /// Creates a new late-reply event with a consistent timestamp.
    #[must_use]
    pub fn new(topic: &str, correlation_id: Option<&str>, reason: &'static str) -> Self {
        Self {
            event: "late_reply",
            timestamp_ms: now_ms(),
            topic: topic.to_string(),
            correlation_id: correlation_id.map(str::to_string),
            reason,
        }
    }
}

/// Returns milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for enrichment events.
pub trait EnrichmentAuditSink: Send + Sync {
    /// Record an invocation audit event.
    fn record(&self, event: &EnrichmentAuditEvent);

    /// Record a late or unmatched reply.
    fn record_late_reply(&self, _event: &LateReplyAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrAuditSink;

impl EnrichmentAuditSink for StderrAuditSink {
    fn record(&self, event: &EnrichmentAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_late_reply(&self, event: &LateReplyAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
#[derive(Debug)]
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized line.
    fn write_line(&self, payload: &str) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl EnrichmentAuditSink for FileAuditSink {
    fn record(&self, event: &EnrichmentAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            self.write_line(&payload);
        }
    }

    fn record_late_reply(&self, event: &LateReplyAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            self.write_line(&payload);
        }
    }
}

/// No-op audit sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl EnrichmentAuditSink for NoopAuditSink {
    fn record(&self, _event: &EnrichmentAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
