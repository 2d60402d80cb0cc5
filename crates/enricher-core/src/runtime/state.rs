// crates/enricher-core/src/runtime/state.rs
// ============================================================================
// Module: Invocation State
// Description: Lifecycle states of a single enrichment invocation.
// Purpose: Make invocation progress explicit and auditable.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An invocation moves `Building -> Dispatched -> Replied | TimedOut ->
//! Merging -> Completed | MergeFailed`, or stops early at `DispatchFailed`.
//! A timed-out invocation still merges (null-result mappings may apply), and
//! a build failure goes straight to `MergeFailed`. Terminal states have no
//! successors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Lifecycle state of one enrichment invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationState {
    /// Request is being built.
    Building,
    /// Request was handed to the sub-flow.
    Dispatched,
    /// Reply wait ended with a reply or a closed conduit.
    Replied,
    /// No reply within the timeout.
    TimedOut,
    /// The request could not be sent.
    DispatchFailed,
    /// Mappings are being applied.
    Merging,
    /// Enriched message was produced.
    Completed,
    /// A required mapping, target clone, or reply requirement failed.
    MergeFailed,
}

impl InvocationState {
    /// Returns true when no further transitions are allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::DispatchFailed | Self::MergeFailed)
    }

    /// Returns true when `next` is a legal successor of this state.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Building, Self::Dispatched | Self::MergeFailed)
                | (Self::Dispatched, Self::Replied | Self::TimedOut | Self::DispatchFailed)
                | (Self::Replied | Self::TimedOut, Self::Merging | Self::MergeFailed)
                | (Self::Merging, Self::Completed | Self::MergeFailed)
        )
    }

    /// Returns a stable label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Dispatched => "dispatched",
            Self::Replied => "replied",
            Self::TimedOut => "timed_out",
            Self::DispatchFailed => "dispatch_failed",
            Self::Merging => "merging",
            Self::Completed => "completed",
            Self::MergeFailed => "merge_failed",
        }
    }
}

/// How the reply wait of an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    /// A reply message arrived.
    Received,
    /// The sub-flow declined; the reply conduit closed without a message.
    Closed,
    /// No reply within the timeout.
    TimedOut,
    /// The invocation ended before waiting for a reply.
    NotAwaited,
}

impl ReplyStatus {
    /// Returns true when a reply message is available for merging.
    #[must_use]
    pub const fn has_reply(self) -> bool {
        matches!(self, Self::Received)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
