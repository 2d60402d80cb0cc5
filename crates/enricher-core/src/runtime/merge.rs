// crates/enricher-core/src/runtime/merge.rs
// ============================================================================
// Module: Merge Engine
// Description: Applies property and header mappings to a cloned target.
// Purpose: Produce the enriched message from a reply, the inbound message,
//          and the target template.
// Dependencies: crate::core, crate::expression, serde_json
// ============================================================================

//! ## Overview
//! The merge engine holds the ordered property and header mappings. For each
//! invocation it instantiates a private copy of the target template, then
//! applies property mappings in order followed by header mappings in order.
//! Every mapping produces a [`MappingOutcome`]:
//!
//! - a required mapping that fails aborts the merge with its [`MappingError`];
//!   nothing partial is returned;
//! - an optional mapping that fails is skipped and recorded;
//! - a mapping whose source message is unavailable is skipped.
//!
//! `IfAbsent` header mappings consult the inbound header set before their
//! expression is evaluated, so a present header is never re-evaluated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::CloneError;
use crate::core::DefaultTarget;
use crate::core::HeaderMapping;
use crate::core::MappingError;
use crate::core::MappingFailure;
use crate::core::MappingOutcome;
use crate::core::MappingSource;
use crate::core::MappingTarget;
use crate::core::Message;
use crate::core::OverwritePolicy;
use crate::core::PropertyMapping;
use crate::core::SkipReason;
use crate::core::instantiate_target;
use crate::runtime::EnrichError;

// ============================================================================
// SECTION: Report
// ============================================================================

/// Outcome of one mapping within a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeEntry {
    /// Mapping destination.
    pub target: MappingTarget,
    /// Applied value or skip reason.
    pub outcome: MappingOutcome,
}

/// Per-mapping outcomes of a successful merge, in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Recorded outcomes.
    entries: Vec<MergeEntry>,
}

impl MergeReport {
    /// Returns all recorded outcomes.
    #[must_use]
    pub fn entries(&self) -> &[MergeEntry] {
        &self.entries
    }

    /// Returns the number of applied mappings.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.entries.iter().filter(|entry| matches!(entry.outcome, MappingOutcome::Applied(_))).count()
    }

    /// Returns the number of skipped mappings.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.entries.iter().filter(|entry| matches!(entry.outcome, MappingOutcome::Skipped(_))).count()
    }

    /// Returns the outcome recorded for `target`, if any.
    #[must_use]
    pub fn outcome(&self, target: &MappingTarget) -> Option<&MappingOutcome> {
        self.entries.iter().find(|entry| &entry.target == target).map(|entry| &entry.outcome)
    }
}

/// Enriched message plus the merge report that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedMessage {
    /// Outbound message: the enriched target as payload, with mapped headers.
    pub message: Message,
    /// Per-mapping outcomes.
    pub report: MergeReport,
}

impl EnrichedMessage {
    /// Returns the outbound message, discarding the report.
    #[must_use]
    pub fn into_message(self) -> Message {
        self.message
    }
}

// ============================================================================
// SECTION: Merge Engine
// ============================================================================

/// Applies configured mappings to produce an enriched message.
///
/// # Invariants
/// - Mapping lists are immutable after construction.
/// - Templates are never mutated; merging works on an instantiated copy.
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    /// Ordered property mappings.
    properties: Vec<PropertyMapping>,
    /// Ordered header mappings.
    headers: Vec<HeaderMapping>,
    /// Factory for targets when no template is supplied.
    default_target: DefaultTarget,
}

impl MergeEngine {
    /// Creates a merge engine.
    #[must_use]
    pub const fn new(
        properties: Vec<PropertyMapping>,
        headers: Vec<HeaderMapping>,
        default_target: DefaultTarget,
    ) -> Self {
        Self {
            properties,
            headers,
            default_target,
        }
    }

    /// Returns the property mappings.
    #[must_use]
    pub fn properties(&self) -> &[PropertyMapping] {
        &self.properties
    }

    /// Returns the header mappings.
    #[must_use]
    pub fn headers(&self) -> &[HeaderMapping] {
        &self.headers
    }

    /// Instantiates a private target from `template`, or the default target.
    ///
    /// # Errors
    ///
    /// Returns [`CloneError`] when the template cannot be instantiated.
    pub fn instantiate(&self, template: Option<&Value>) -> Result<Value, CloneError> {
        instantiate_target(template, &self.default_target)
    }

    /// Instantiates the target and merges into it.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::Clone`] or [`EnrichError::Mapping`].
    pub fn merge(
        &self,
        template: Option<&Value>,
        reply: Option<&Message>,
        inbound: &Message,
    ) -> Result<EnrichedMessage, EnrichError> {
        let target = self.instantiate(template)?;
        Ok(self.merge_into(target, reply, inbound)?)
    }

    /// Applies all mappings to an already instantiated `target`.
    ///
    /// Output headers start from the inbound headers.
    ///
    /// # Errors
    ///
    /// Returns the [`MappingError`] of the first failing required mapping.
    pub fn merge_into(
        &self,
        mut target: Value,
        reply: Option<&Message>,
        inbound: &Message,
    ) -> Result<EnrichedMessage, MappingError> {
        let mut headers = inbound.headers.clone();
        let mut report = MergeReport::default();

        for mapping in &self.properties {
            let outcome = apply_property(mapping, &mut target, reply, inbound);
            record(&mut report, MappingTarget::Property(mapping.target().clone()), outcome)?;
        }

        for mapping in &self.headers {
            let outcome = evaluate_header(mapping, reply, inbound);
            if let MappingOutcome::Applied(value) = &outcome {
                headers.insert(mapping.name(), value.clone());
            }
            record(&mut report, MappingTarget::Header(mapping.name().to_string()), outcome)?;
        }

        Ok(EnrichedMessage {
            message: Message {
                payload: target,
                headers,
            },
            report,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Records a non-failing outcome or surfaces the failure.
fn record(
    report: &mut MergeReport,
    target: MappingTarget,
    outcome: MappingOutcome,
) -> Result<(), MappingError> {
    if let MappingOutcome::Failed(err) = outcome {
        return Err(err);
    }
    report.entries.push(MergeEntry {
        target,
        outcome,
    });
    Ok(())
}

/// Picks the message a mapping evaluates against, or the reason to skip it.
const fn select_source<'a>(
    source: MappingSource,
    reply: Option<&'a Message>,
    inbound: &'a Message,
) -> Result<&'a Message, SkipReason> {
    match (source, reply) {
        (MappingSource::Reply, Some(reply)) => Ok(reply),
        (MappingSource::Reply, None) => Err(SkipReason::NoReply),
        (MappingSource::Inbound, _) | (MappingSource::NullResult, None) => Ok(inbound),
        (MappingSource::NullResult, Some(_)) => Err(SkipReason::ReplyPresent),
    }
}

/// Evaluates a property mapping and assigns its value on `target`.
fn apply_property(
    mapping: &PropertyMapping,
    target: &mut Value,
    reply: Option<&Message>,
    inbound: &Message,
) -> MappingOutcome {
    let context = match select_source(mapping.source(), reply, inbound) {
        Ok(context) => context,
        Err(reason) => return MappingOutcome::Skipped(reason),
    };
    let result = mapping
        .expression()
        .evaluate(context)
        .map_err(MappingFailure::from)
        .and_then(|value| {
            mapping.target().assign(target, value.clone())?;
            Ok(value)
        });
    MappingOutcome::from_result(
        result,
        mapping.is_required(),
        MappingTarget::Property(mapping.target().clone()),
    )
}

/// Evaluates a header mapping under its overwrite policy.
fn evaluate_header(
    mapping: &HeaderMapping,
    reply: Option<&Message>,
    inbound: &Message,
) -> MappingOutcome {
    if mapping.overwrite() == OverwritePolicy::IfAbsent && inbound.headers.contains(mapping.name())
    {
        return MappingOutcome::Skipped(SkipReason::HeaderPresent);
    }
    let context = match select_source(mapping.source(), reply, inbound) {
        Ok(context) => context,
        Err(reason) => return MappingOutcome::Skipped(reason),
    };
    let result = mapping.expression().evaluate(context).map_err(MappingFailure::from);
    MappingOutcome::from_result(
        result,
        mapping.is_required(),
        MappingTarget::Header(mapping.name().to_string()),
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================
