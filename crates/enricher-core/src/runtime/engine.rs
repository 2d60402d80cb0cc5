// crates/enricher-core/src/runtime/engine.rs
// ============================================================================
// Module: Enrichment Engine
// Description: Orchestrates request building, reply correlation, and merging.
// Purpose: Provide the single entry point that enriches an inbound message.
// Dependencies: crate::core, crate::runtime, crate::audit, serde, tokio
// ============================================================================

//! ## Overview
//! [`EnrichmentEngine`] wires a [`RequestBuilder`], a [`ReplyCorrelator`],
//! and a [`MergeEngine`] into one invocation:
//!
//! 1. instantiate the target (a failure here means nothing is sent);
//! 2. build and dispatch the request;
//! 3. wait for the reply, bounded by the request timeout;
//! 4. merge the reply into the target.
//!
//! When `requires_reply` is set, a timeout or declined reply fails the
//! invocation with no merge. Otherwise the merge proceeds without reply data
//! and only inbound and null-result mappings apply.
//!
//! The engine holds no mutable per-invocation state, so one instance serves
//! any number of concurrent invocations. Each invocation records exactly one
//! audit event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::audit::EnrichmentAuditEvent;
use crate::audit::EnrichmentAuditEventParams;
use crate::audit::EnrichmentAuditSink;
use crate::audit::NoopAuditSink;
use crate::core::AssignError;
use crate::core::CloneError;
use crate::core::CorrelationIdGenerator;
use crate::core::DefaultTarget;
use crate::core::HeaderMapping;
use crate::core::Headers;
use crate::core::MappingError;
use crate::core::MappingFailure;
use crate::core::MappingTarget;
use crate::core::Message;
use crate::core::PropertyMapping;
use crate::core::template_from_typed;
use crate::interfaces::RequestChannel;
use crate::runtime::EnrichedMessage;
use crate::runtime::ExchangeError;
use crate::runtime::InvocationState;
use crate::runtime::MergeEngine;
use crate::runtime::MergeReport;
use crate::runtime::ReplyCorrelator;
use crate::runtime::ReplyMode;
use crate::runtime::ReplyOutcome;
use crate::runtime::ReplyStatus;
use crate::runtime::ReplyTopic;
use crate::runtime::RequestBuilder;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default engine name used in audit records.
pub const DEFAULT_ENGINE_NAME: &str = "enricher";
/// Default bound on the reply wait.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Invocation-level enrichment failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrichError {
    /// The request could not be dispatched or correlated.
    #[error(transparent)]
    Dispatch(ExchangeError),
    /// No reply within the request timeout while a reply is required.
    #[error("no reply within {timeout:?}")]
    Timeout {
        /// Timeout that elapsed.
        timeout: Duration,
    },
    /// A required mapping failed.
    #[error(transparent)]
    Mapping(#[from] MappingError),
    /// The target template could not be instantiated.
    #[error(transparent)]
    Clone(#[from] CloneError),
    /// The sub-flow declined to reply while a reply is required.
    #[error("sub-flow declined to reply and a reply is required")]
    ReplyRequired,
}

impl EnrichError {
    /// Returns a stable label for the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Dispatch(_) => "dispatch",
            Self::Timeout { .. } => "timeout",
            Self::Mapping(_) => "mapping",
            Self::Clone(_) => "clone",
            Self::ReplyRequired => "reply_required",
        }
    }
}

/// Errors returned when building an engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineBuildError {
    /// No request channel was configured.
    #[error("enrichment engine requires a request channel")]
    MissingRequestChannel,
    /// The request timeout is zero.
    #[error("request timeout must be greater than zero")]
    InvalidTimeout,
    /// The engine name is empty.
    #[error("engine name must not be empty")]
    EmptyName,
}

// ============================================================================
// SECTION: Typed Results
// ============================================================================

/// Result of enriching a typed target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedEnrichment<T> {
    /// Enriched target.
    pub target: T,
    /// Outbound headers.
    pub headers: Headers,
    /// Per-mapping outcomes.
    pub report: MergeReport,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Content enricher that resolves data through a request/reply sub-flow.
///
/// # Invariants
/// - Configuration is immutable after [`EnrichmentEngineBuilder::build`].
#[derive(Clone)]
pub struct EnrichmentEngine {
    /// Engine name used in audit records.
    name: String,
    /// Request construction.
    request_builder: RequestBuilder,
    /// Dispatch and reply correlation.
    correlator: ReplyCorrelator,
    /// Mapping application.
    merge: MergeEngine,
    /// Bound on the reply wait.
    request_timeout: Duration,
    /// Whether a missing reply fails the invocation.
    requires_reply: bool,
    /// Audit sink for invocation records.
    audit: Arc<dyn EnrichmentAuditSink>,
}

impl EnrichmentEngine {
    /// Returns a new engine builder.
    #[must_use]
    pub fn builder() -> EnrichmentEngineBuilder {
        EnrichmentEngineBuilder::default()
    }

    /// Returns the engine name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the reply wait bound.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns true when a missing reply fails the invocation.
    #[must_use]
    pub const fn requires_reply(&self) -> bool {
        self.requires_reply
    }

    /// Returns the request builder.
    #[must_use]
    pub const fn request_builder(&self) -> &RequestBuilder {
        &self.request_builder
    }

    /// Returns the merge engine.
    #[must_use]
    pub const fn merge_engine(&self) -> &MergeEngine {
        &self.merge
    }

    /// Enriches `inbound`, using its payload as the target template.
    ///
    /// A `null` payload selects the default target.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] when the invocation fails.
    pub async fn enrich(&self, inbound: &Message) -> Result<EnrichedMessage, EnrichError> {
        self.invoke(inbound, Some(&inbound.payload)).await
    }

    /// Enriches a copy of `template` using data resolved for `inbound`.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] when the invocation fails.
    pub async fn enrich_with(
        &self,
        inbound: &Message,
        template: &Value,
    ) -> Result<EnrichedMessage, EnrichError> {
        self.invoke(inbound, Some(template)).await
    }

    /// Enriches a copy of a typed `template`.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::Clone`] when the template does not serialize to
    /// an object, [`EnrichError::Mapping`] targeting the payload when the
    /// merged object does not deserialize back into `T`, or any invocation
    /// failure.
    pub async fn enrich_typed<T>(
        &self,
        inbound: &Message,
        template: &T,
    ) -> Result<TypedEnrichment<T>, EnrichError>
    where
        T: Serialize + DeserializeOwned,
    {
        let template = template_from_typed(template)?;
        let enriched = self.invoke(inbound, Some(&template)).await?;
        let EnrichedMessage {
            message,
            report,
        } = enriched;
        let target = serde_json::from_value(message.payload).map_err(|err| MappingError {
            target: MappingTarget::Payload,
            failure: MappingFailure::Assignment(AssignError::Deserialize(err.to_string())),
        })?;
        Ok(TypedEnrichment {
            target,
            headers: message.headers,
            report,
        })
    }

    /// Runs one audited invocation.
    async fn invoke(
        &self,
        inbound: &Message,
        template: Option<&Value>,
    ) -> Result<EnrichedMessage, EnrichError> {
        let mut invocation = Invocation::start();
        let result = self.run(&mut invocation, inbound, template).await;
        self.record(&invocation, &result);
        result
    }

    /// Executes the invocation stages, tracking state in `invocation`.
    async fn run(
        &self,
        invocation: &mut Invocation,
        inbound: &Message,
        template: Option<&Value>,
    ) -> Result<EnrichedMessage, EnrichError> {
        let prepared = self
            .merge
            .instantiate(template)
            .map_err(EnrichError::from)
            .and_then(|target| Ok((target, self.request_builder.build(inbound)?)));
        let (target, request) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                invocation.advance(InvocationState::MergeFailed);
                return Err(err);
            }
        };
        invocation.correlation_id = request.correlation_id().map(ToString::to_string);

        invocation.advance(InvocationState::Dispatched);
        let reply = match self.correlator.exchange(request, self.request_timeout).await {
            Ok(ReplyOutcome::Received(reply)) => {
                invocation.advance(InvocationState::Replied);
                invocation.reply = ReplyStatus::Received;
                Some(reply)
            }
            Ok(ReplyOutcome::Closed) => {
                invocation.advance(InvocationState::Replied);
                invocation.reply = ReplyStatus::Closed;
                if self.requires_reply {
                    invocation.advance(InvocationState::MergeFailed);
                    return Err(EnrichError::ReplyRequired);
                }
                None
            }
            Err(ExchangeError::TimedOut {
                timeout,
            }) => {
                invocation.advance(InvocationState::TimedOut);
                invocation.reply = ReplyStatus::TimedOut;
                if self.requires_reply {
                    return Err(EnrichError::Timeout {
                        timeout,
                    });
                }
                None
            }
            Err(err) => {
                invocation.advance(InvocationState::DispatchFailed);
                return Err(EnrichError::Dispatch(err));
            }
        };

        invocation.advance(InvocationState::Merging);
        match self.merge.merge_into(target, reply.as_ref(), inbound) {
            Ok(enriched) => {
                invocation.advance(InvocationState::Completed);
                Ok(enriched)
            }
            Err(err) => {
                invocation.advance(InvocationState::MergeFailed);
                Err(EnrichError::Mapping(err))
            }
        }
    }

    /// Records the audit event for a finished invocation.
    fn record(&self, invocation: &Invocation, result: &Result<EnrichedMessage, EnrichError>) {
        let (applied, skipped, error_kind) = match result {
            Ok(enriched) => (enriched.report.applied(), enriched.report.skipped(), None),
            Err(err) => (0, 0, Some(err.kind())),
        };
        let elapsed_ms =
            u64::try_from(invocation.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.audit.record(&EnrichmentAuditEvent::new(EnrichmentAuditEventParams {
            engine: self.name.clone(),
            correlation_id: invocation.correlation_id.clone(),
            state: invocation.state,
            reply: invocation.reply,
            applied,
            skipped,
            elapsed_ms,
            error_kind,
        }));
    }
}

impl fmt::Debug for EnrichmentEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrichmentEngine")
            .field("name", &self.name)
            .field("request_builder", &self.request_builder)
            .field("correlator", &self.correlator)
            .field("merge", &self.merge)
            .field("request_timeout", &self.request_timeout)
            .field("requires_reply", &self.requires_reply)
            .finish_non_exhaustive()
    }
}

/// Progress of one invocation.
struct Invocation {
    /// Last state reached.
    state: InvocationState,
    /// How the reply wait ended.
    reply: ReplyStatus,
    /// Correlation identifier of the request, if any.
    correlation_id: Option<String>,
    /// Start of the invocation.
    started: Instant,
}

impl Invocation {
    /// Starts tracking a new invocation.
    fn start() -> Self {
        Self {
            state: InvocationState::Building,
            reply: ReplyStatus::NotAwaited,
            correlation_id: None,
            started: Instant::now(),
        }
    }

    /// Moves to `next` when the transition is legal.
    fn advance(&mut self, next: InvocationState) {
        if self.state.can_advance_to(next) {
            self.state = next;
        }
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for [`EnrichmentEngine`].
pub struct EnrichmentEngineBuilder {
    /// Engine name.
    name: String,
    /// Request channel to the sub-flow.
    request_channel: Option<Arc<dyn RequestChannel>>,
    /// Shared reply topic; conduit mode when absent.
    reply_topic: Option<Arc<ReplyTopic>>,
    /// Bound on the reply wait.
    request_timeout: Duration,
    /// Whether a missing reply fails the invocation.
    requires_reply: bool,
    /// Request construction.
    request_builder: RequestBuilder,
    /// Ordered property mappings.
    properties: Vec<PropertyMapping>,
    /// Ordered header mappings.
    headers: Vec<HeaderMapping>,
    /// Default target factory.
    default_target: DefaultTarget,
    /// Audit sink.
    audit: Arc<dyn EnrichmentAuditSink>,
}

impl Default for EnrichmentEngineBuilder {
    fn default() -> Self {
        Self {
            name: DEFAULT_ENGINE_NAME.to_string(),
            request_channel: None,
            reply_topic: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            requires_reply: true,
            request_builder: RequestBuilder::new(),
            properties: Vec::new(),
            headers: Vec::new(),
            default_target: DefaultTarget::default(),
            audit: Arc::new(NoopAuditSink),
        }
    }
}

impl EnrichmentEngineBuilder {
    /// Sets the engine name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the request channel.
    #[must_use]
    pub fn request_channel(mut self, channel: Arc<dyn RequestChannel>) -> Self {
        self.request_channel = Some(channel);
        self
    }

    /// Routes replies through a shared topic instead of per-call conduits.
    #[must_use]
    pub fn reply_topic(mut self, topic: Arc<ReplyTopic>) -> Self {
        self.reply_topic = Some(topic);
        self
    }

    /// Sets the reply wait bound.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets whether a missing reply fails the invocation.
    #[must_use]
    pub fn requires_reply(mut self, requires_reply: bool) -> Self {
        self.requires_reply = requires_reply;
        self
    }

    /// Sets the request builder.
    #[must_use]
    pub fn request_builder(mut self, request_builder: RequestBuilder) -> Self {
        self.request_builder = request_builder;
        self
    }

    /// Appends a property mapping.
    #[must_use]
    pub fn property(mut self, mapping: PropertyMapping) -> Self {
        self.properties.push(mapping);
        self
    }

    /// Appends a header mapping.
    #[must_use]
    pub fn header(mut self, mapping: HeaderMapping) -> Self {
        self.headers.push(mapping);
        self
    }

    /// Sets the default target factory.
    #[must_use]
    pub fn default_target(mut self, default_target: DefaultTarget) -> Self {
        self.default_target = default_target;
        self
    }

    /// Sets the audit sink.
    #[must_use]
    pub fn audit_sink(mut self, audit: Arc<dyn EnrichmentAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Builds the engine.
    ///
    /// A reply topic forces correlation identifiers on requests.
    ///
    /// # Errors
    ///
    /// Returns [`EngineBuildError`] when required configuration is missing.
    pub fn build(self) -> Result<EnrichmentEngine, EngineBuildError> {
        if self.name.trim().is_empty() {
            return Err(EngineBuildError::EmptyName);
        }
        let channel = self.request_channel.ok_or(EngineBuildError::MissingRequestChannel)?;
        if self.request_timeout.is_zero() {
            return Err(EngineBuildError::InvalidTimeout);
        }
        let (mode, request_builder) = match self.reply_topic {
            Some(topic) => {
                let request_builder = if self.request_builder.correlates() {
                    self.request_builder
                } else {
                    self.request_builder.with_correlation(CorrelationIdGenerator::default())
                };
                (ReplyMode::Topic(topic), request_builder)
            }
            None => (ReplyMode::Conduit, self.request_builder),
        };
        Ok(EnrichmentEngine {
            name: self.name,
            request_builder,
            correlator: ReplyCorrelator::new(channel, mode),
            merge: MergeEngine::new(self.properties, self.headers, self.default_target),
            request_timeout: self.request_timeout,
            requires_reply: self.requires_reply,
            audit: self.audit,
        })
    }
}

impl fmt::Debug for EnrichmentEngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrichmentEngineBuilder")
            .field("name", &self.name)
            .field("has_request_channel", &self.request_channel.is_some())
            .field("reply_topic", &self.reply_topic)
            .field("request_timeout", &self.request_timeout)
            .field("requires_reply", &self.requires_reply)
            .field("properties", &self.properties.len())
            .field("headers", &self.headers.len())
            .finish_non_exhaustive()
    }
}
