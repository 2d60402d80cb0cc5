// crates/enricher-config/src/config.rs
// ============================================================================
// Module: Content Enricher Configuration
// Description: Configuration loading and validation for enrichment engines.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: enricher-core, serde, serde_json, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every expression and property path is parsed during validation, so a
//! configuration that validates can always be turned into an engine once its
//! channel names resolve.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use enricher_core::DEFAULT_ENGINE_NAME;
use enricher_core::Expression;
use enricher_core::MappingSource;
use enricher_core::OverwritePolicy;
use enricher_core::PropertyPath;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "enricher.toml";
/// Environment variable naming the configuration file.
pub(crate) const CONFIG_ENV_VAR: &str = "ENRICHER_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Smallest accepted request timeout.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 1;
/// Largest accepted request timeout.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 300_000;
/// Request timeout applied when none is configured.
pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Maximum number of property or header mappings.
pub(crate) const MAX_MAPPINGS: usize = 256;
/// Maximum number of propagation header names.
pub(crate) const MAX_HEADER_NAMES: usize = 256;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Content enricher configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EnricherConfig {
    /// Engine wiring and invocation settings.
    pub engine: EngineConfig,
    /// Request shaping.
    #[serde(default)]
    pub request: RequestConfig,
    /// Property mappings applied to the target, in order.
    #[serde(default)]
    pub properties: Vec<PropertyMappingConfig>,
    /// Header mappings applied to the outbound message, in order.
    #[serde(default)]
    pub headers: Vec<HeaderMappingConfig>,
    /// Prototype object used when no template is supplied.
    #[serde(default)]
    pub default_target: Option<Value>,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl EnricherConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is taken from `path`, then the `ENRICHER_CONFIG` environment
    /// variable, then `enricher.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.request.validate()?;
        validate_mapping_count("properties", self.properties.len())?;
        validate_mapping_count("headers", self.headers.len())?;

        let mut targets = BTreeSet::new();
        for (index, property) in self.properties.iter().enumerate() {
            property.validate(index)?;
            if !targets.insert(property.target.trim()) {
                return Err(ConfigError::Invalid(format!(
                    "properties[{index}].target duplicates {}",
                    property.target.trim()
                )));
            }
        }

        let mut names = BTreeSet::new();
        for (index, header) in self.headers.iter().enumerate() {
            header.validate(index)?;
            if !names.insert(header.name.trim()) {
                return Err(ConfigError::Invalid(format!(
                    "headers[{index}].name duplicates {}",
                    header.name.trim()
                )));
            }
        }

        if self.default_target.as_ref().is_some_and(|target| !target.is_object()) {
            return Err(ConfigError::Invalid("default_target must be a table".to_string()));
        }
        self.audit.validate()
    }
}

/// Engine wiring and invocation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Engine name used in audit records.
    #[serde(default = "default_engine_name")]
    pub name: String,
    /// Registry name of the request channel.
    pub request_channel: String,
    /// Registry name of a shared reply topic; per-call conduits when absent.
    #[serde(default)]
    pub reply_channel: Option<String>,
    /// Reply timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Whether a missing reply fails the invocation.
    #[serde(default = "default_true")]
    pub requires_reply: bool,
}

impl EngineConfig {
    /// Validates engine settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_name("engine.name", &self.name)?;
        validate_name("engine.request_channel", &self.request_channel)?;
        if let Some(reply_channel) = &self.reply_channel {
            validate_name("engine.reply_channel", reply_channel)?;
        }
        if !(MIN_REQUEST_TIMEOUT_MS ..= MAX_REQUEST_TIMEOUT_MS).contains(&self.request_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "engine.request_timeout_ms must be between {MIN_REQUEST_TIMEOUT_MS} and \
                 {MAX_REQUEST_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

/// Which inbound headers are copied onto the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationMode {
    /// Copy every inbound header.
    #[default]
    All,
    /// Copy no headers.
    None,
    /// Copy only `header_names`.
    Include,
    /// Copy every header except `header_names`.
    Exclude,
}

/// Request shaping settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestConfig {
    /// Expression computing the request payload; the inbound payload when absent.
    #[serde(default)]
    pub payload_expression: Option<String>,
    /// Header propagation mode.
    #[serde(default)]
    pub propagate_headers: PropagationMode,
    /// Header names used by `include` and `exclude` propagation.
    #[serde(default)]
    pub header_names: Vec<String>,
}

impl RequestConfig {
    /// Validates request settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(expression) = &self.payload_expression {
            parse_expression("request.payload_expression", expression)?;
        }
        if self.header_names.len() > MAX_HEADER_NAMES {
            return Err(ConfigError::Invalid(format!(
                "request.header_names exceeds {MAX_HEADER_NAMES} entries"
            )));
        }
        for name in &self.header_names {
            validate_name("request.header_names", name)?;
        }
        match self.propagate_headers {
            PropagationMode::Include | PropagationMode::Exclude if self.header_names.is_empty() => {
                Err(ConfigError::Invalid(
                    "request.header_names is required for include/exclude propagation".to_string(),
                ))
            }
            PropagationMode::All | PropagationMode::None if !self.header_names.is_empty() => {
                Err(ConfigError::Invalid(
                    "request.header_names is only valid with include/exclude propagation"
                        .to_string(),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Property mapping entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyMappingConfig {
    /// Dotted target path on the cloned target.
    pub target: String,
    /// Expression computing the value.
    pub expression: String,
    /// Message the expression is evaluated against.
    #[serde(default)]
    pub source: MappingSource,
    /// Whether evaluation or assignment failure aborts the invocation.
    #[serde(default = "default_true")]
    pub required: bool,
}

impl PropertyMappingConfig {
    /// Validates the mapping at position `index`.
    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        PropertyPath::parse(self.target.trim()).map_err(|err| {
            ConfigError::Invalid(format!("properties[{index}].target is invalid: {err}"))
        })?;
        parse_expression(&format!("properties[{index}].expression"), &self.expression)?;
        Ok(())
    }
}

/// Header mapping entry.
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderMappingConfig {
    /// Outbound header name.
    pub name: String,
    /// Expression computing the value; exclusive with `value`.
    #[serde(default)]
    pub expression: Option<String>,
    /// Literal value; exclusive with `expression`.
    #[serde(default)]
    pub value: Option<Value>,
    /// Message the expression is evaluated against.
    #[serde(default)]
    pub source: Option<MappingSource>,
    /// Rule applied when the inbound message already has the header.
    #[serde(default)]
    pub overwrite: OverwritePolicy,
    /// Whether evaluation failure aborts the invocation.
    #[serde(default = "default_true")]
    pub required: bool,
}

impl HeaderMappingConfig {
    /// Validates the mapping at position `index`.
    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        validate_name(&format!("headers[{index}].name"), &self.name)?;
        match (&self.expression, &self.value) {
            (Some(expression), None) => {
                parse_expression(&format!("headers[{index}].expression"), expression)?;
                Ok(())
            }
            (None, Some(_)) => Ok(()),
            _ => Err(ConfigError::Invalid(format!(
                "headers[{index}] requires exactly one of expression or value"
            ))),
        }
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to `path`.
    File,
    /// Audit disabled.
    #[default]
    None,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Sink receiving audit events.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid for the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default engine name.
fn default_engine_name() -> String {
    DEFAULT_ENGINE_NAME.to_string()
}

/// Default request timeout in milliseconds.
const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Default for flags that are on unless disabled.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading, validation, or wiring errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration or opening sinks.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Requires a non-blank name.
fn validate_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    Ok(())
}

/// Caps the number of mappings of one kind.
fn validate_mapping_count(field: &str, count: usize) -> Result<(), ConfigError> {
    if count > MAX_MAPPINGS {
        return Err(ConfigError::Invalid(format!("{field} exceeds {MAX_MAPPINGS} entries")));
    }
    Ok(())
}

/// Parses an expression, naming the field on failure.
pub(crate) fn parse_expression(field: &str, source: &str) -> Result<Expression, ConfigError> {
    Expression::parse(source)
        .map_err(|err| ConfigError::Invalid(format!("{field} is invalid: {err}")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
