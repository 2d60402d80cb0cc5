// crates/enricher-config/src/wiring.rs
// ============================================================================
// Module: Engine Wiring
// Description: Builds enrichment engines from validated configuration.
// Purpose: Resolve channel names and turn config entries into mappings.
// Dependencies: enricher-broker, enricher-core
// ============================================================================

//! ## Overview
//! [`EnricherConfig::build_engine`] resolves the configured request channel
//! and optional reply topic through a [`ChannelRegistry`], then assembles
//! request shaping, mappings, the default target, and the audit sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use enricher_broker::ChannelRegistry;
use enricher_core::DefaultTarget;
use enricher_core::EnrichmentEngine;
use enricher_core::FileAuditSink;
use enricher_core::HeaderMapping;
use enricher_core::HeaderPropagation;
use enricher_core::PropertyMapping;
use enricher_core::PropertyPath;
use enricher_core::RequestBuilder;
use enricher_core::StderrAuditSink;

use crate::config::AuditSinkKind;
use crate::config::ConfigError;
use crate::config::EnricherConfig;
use crate::config::HeaderMappingConfig;
use crate::config::PropagationMode;
use crate::config::PropertyMappingConfig;
use crate::config::RequestConfig;
use crate::config::parse_expression;

// ============================================================================
// SECTION: Engine Construction
// ============================================================================

impl EnricherConfig {
    /// Builds an engine, resolving channel names through `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a channel name is unknown or the
    /// configuration is inconsistent, and [`ConfigError::Io`] when the audit
    /// log cannot be opened.
    pub fn build_engine(&self, registry: &ChannelRegistry) -> Result<EnrichmentEngine, ConfigError> {
        self.validate()?;
        let channel = registry
            .channel(&self.engine.request_channel)
            .map_err(|err| ConfigError::Invalid(format!("engine.request_channel: {err}")))?;

        let mut builder = EnrichmentEngine::builder()
            .name(self.engine.name.trim())
            .request_channel(channel)
            .request_timeout(Duration::from_millis(self.engine.request_timeout_ms))
            .requires_reply(self.engine.requires_reply)
            .request_builder(build_request(&self.request)?);

        if let Some(reply_channel) = &self.engine.reply_channel {
            let topic = registry
                .topic(reply_channel)
                .map_err(|err| ConfigError::Invalid(format!("engine.reply_channel: {err}")))?;
            builder = builder.reply_topic(topic);
        }
        for (index, property) in self.properties.iter().enumerate() {
            builder = builder.property(build_property(index, property)?);
        }
        for (index, header) in self.headers.iter().enumerate() {
            builder = builder.header(build_header(index, header)?);
        }
        if let Some(default_target) = &self.default_target {
            builder = builder.default_target(DefaultTarget::prototype(default_target.clone()));
        }
        match self.audit.sink {
            AuditSinkKind::Stderr => builder = builder.audit_sink(Arc::new(StderrAuditSink)),
            AuditSinkKind::File => {
                let path = self.audit.path.as_deref().unwrap_or_default().trim();
                let sink = FileAuditSink::new(Path::new(path))
                    .map_err(|err| ConfigError::Io(err.to_string()))?;
                builder = builder.audit_sink(Arc::new(sink));
            }
            AuditSinkKind::None => {}
        }

        builder.build().map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the request builder from request settings.
fn build_request(config: &RequestConfig) -> Result<RequestBuilder, ConfigError> {
    let names = || {
        config.header_names.iter().map(|name| name.trim().to_string()).collect::<BTreeSet<_>>()
    };
    let propagation = match config.propagate_headers {
        PropagationMode::All => HeaderPropagation::All,
        PropagationMode::None => HeaderPropagation::None,
        PropagationMode::Include => HeaderPropagation::Include(names()),
        PropagationMode::Exclude => HeaderPropagation::Exclude(names()),
    };
    let mut request = RequestBuilder::new().with_header_propagation(propagation);
    if let Some(expression) = &config.payload_expression {
        request = request
            .with_payload_expression(parse_expression("request.payload_expression", expression)?);
    }
    Ok(request)
}

/// Builds the property mapping at position `index`.
fn build_property(
    index: usize,
    config: &PropertyMappingConfig,
) -> Result<PropertyMapping, ConfigError> {
    let target = PropertyPath::parse(config.target.trim()).map_err(|err| {
        ConfigError::Invalid(format!("properties[{index}].target is invalid: {err}"))
    })?;
    let expression =
        parse_expression(&format!("properties[{index}].expression"), &config.expression)?;
    Ok(PropertyMapping::new(target, expression)
        .with_source(config.source)
        .with_required(config.required))
}

/// Builds the header mapping at position `index`.
fn build_header(index: usize, config: &HeaderMappingConfig) -> Result<HeaderMapping, ConfigError> {
    let name = config.name.trim();
    let mapping = match (&config.expression, &config.value) {
        (Some(expression), None) => HeaderMapping::new(
            name,
            parse_expression(&format!("headers[{index}].expression"), expression)?,
        ),
        (None, Some(value)) => HeaderMapping::value(name, value.clone()),
        _ => {
            return Err(ConfigError::Invalid(format!(
                "headers[{index}] requires exactly one of expression or value"
            )));
        }
    };
    let mapping = match config.source {
        Some(source) => mapping.with_source(source),
        None => mapping,
    };
    Ok(mapping.with_overwrite(config.overwrite).with_required(config.required))
}
