// crates/enricher-config/src/config/tests.rs
// ============================================================================
// Module: Config Validation Tests
// Description: Unit tests for configuration parsing and validation rules.
// Purpose: Ensure invalid configurations fail closed with a named field.
// Dependencies: enricher-config, serde_json
// ============================================================================

//! ## Overview
//! Covers defaults, bounds, mapping exclusivity and uniqueness, propagation
//! rules, default target shape, and audit sink settings.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use enricher_core::MappingSource;
use enricher_core::OverwritePolicy;
use serde_json::json;

use super::AuditSinkKind;
use super::ConfigError;
use super::DEFAULT_REQUEST_TIMEOUT_MS;
use super::EnricherConfig;
use super::MAX_MAPPINGS;
use super::PropagationMode;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const MINIMAL: &str = r#"
[engine]
request_channel = "lookup"
"#;

fn with_minimal(extra: &str) -> String {
    format!("{MINIMAL}\n{extra}")
}

fn invalid_message(content: &str) -> String {
    match EnricherConfig::from_toml_str(content) {
        Err(ConfigError::Invalid(message)) => message,
        Err(other) => panic!("expected invalid config, got {other}"),
        Ok(_) => panic!("expected invalid config"),
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

#[test]
fn minimal_config_applies_defaults() {
    let config = EnricherConfig::from_toml_str(MINIMAL).unwrap();
    assert_eq!(config.engine.name, "enricher");
    assert_eq!(config.engine.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
    assert!(config.engine.requires_reply);
    assert!(config.engine.reply_channel.is_none());
    assert_eq!(config.request.propagate_headers, PropagationMode::All);
    assert!(config.properties.is_empty());
    assert_eq!(config.audit.sink, AuditSinkKind::None);
}

#[test]
fn mapping_defaults_are_reply_required_if_absent() {
    let config = EnricherConfig::from_toml_str(&with_minimal(
        r#"
[[properties]]
target = "name"
expression = "payload.name"

[[headers]]
name = "source"
expression = "headers.source"
"#,
    ))
    .unwrap();
    assert_eq!(config.properties[0].source, MappingSource::Reply);
    assert!(config.properties[0].required);
    assert_eq!(config.headers[0].source, None);
    assert_eq!(config.headers[0].overwrite, OverwritePolicy::IfAbsent);
    assert!(config.headers[0].required);
}

// ============================================================================
// SECTION: Engine Rules
// ============================================================================

#[test]
fn missing_engine_section_is_parse_error() {
    assert!(matches!(EnricherConfig::from_toml_str(""), Err(ConfigError::Parse(_))));
}

#[test]
fn blank_request_channel_is_rejected() {
    let message = invalid_message("[engine]\nrequest_channel = \"  \"\n");
    assert!(message.contains("engine.request_channel"));
}

#[test]
fn timeout_bounds_are_enforced() {
    for timeout in [0_u64, 300_001] {
        let message = invalid_message(&format!(
            "[engine]\nrequest_channel = \"lookup\"\nrequest_timeout_ms = {timeout}\n"
        ));
        assert!(message.contains("request_timeout_ms"), "{message}");
    }
    assert!(
        EnricherConfig::from_toml_str("[engine]\nrequest_channel = \"a\"\nrequest_timeout_ms = 1\n")
            .is_ok()
    );
}

// ============================================================================
// SECTION: Mapping Rules
// ============================================================================

#[test]
fn invalid_expression_names_the_field() {
    let message = invalid_message(&with_minimal(
        "[[properties]]\ntarget = \"name\"\nexpression = \"payload.\"\n",
    ));
    assert!(message.contains("properties[0].expression"), "{message}");
}

#[test]
fn invalid_target_path_names_the_field() {
    let message = invalid_message(&with_minimal(
        "[[properties]]\ntarget = \"a..b\"\nexpression = \"payload.name\"\n",
    ));
    assert!(message.contains("properties[0].target"), "{message}");
}

#[test]
fn duplicate_property_targets_are_rejected() {
    let message = invalid_message(&with_minimal(
        r#"
[[properties]]
target = "name"
expression = "payload.name"

[[properties]]
target = "name"
expression = "payload.alias"
"#,
    ));
    assert!(message.contains("properties[1].target duplicates name"), "{message}");
}

#[test]
fn duplicate_header_names_are_rejected() {
    let message = invalid_message(&with_minimal(
        r#"
[[headers]]
name = "source"
value = "a"

[[headers]]
name = "source"
value = "b"
"#,
    ));
    assert!(message.contains("headers[1].name duplicates source"), "{message}");
}

#[test]
fn header_names_are_compared_trimmed() {
    let message = invalid_message(&with_minimal(
        r#"
[[headers]]
name = "source"
value = "a"

[[headers]]
name = " source "
value = "b"
"#,
    ));
    assert!(message.contains("headers[1].name duplicates source"), "{message}");
}

#[test]
fn header_requires_exactly_one_of_expression_or_value() {
    let neither = invalid_message(&with_minimal("[[headers]]\nname = \"h\"\n"));
    assert!(neither.contains("exactly one"));

    let both = invalid_message(&with_minimal(
        "[[headers]]\nname = \"h\"\nexpression = \"payload\"\nvalue = 1\n",
    ));
    assert!(both.contains("exactly one"));
}

#[test]
fn mapping_count_is_capped() {
    let mut content = with_minimal("");
    for index in 0 ..= MAX_MAPPINGS {
        content.push_str(&format!(
            "[[properties]]\ntarget = \"p{index}\"\nexpression = \"payload\"\n"
        ));
    }
    assert!(invalid_message(&content).contains("properties exceeds"));
}

#[test]
fn unknown_source_is_parse_error() {
    let result = EnricherConfig::from_toml_str(&with_minimal(
        "[[properties]]\ntarget = \"n\"\nexpression = \"payload\"\nsource = \"elsewhere\"\n",
    ));
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

// ============================================================================
// SECTION: Request And Target Rules
// ============================================================================

#[test]
fn include_propagation_requires_names() {
    let message = invalid_message(&with_minimal("[request]\npropagate_headers = \"include\"\n"));
    assert!(message.contains("header_names is required"));

    let message =
        invalid_message(&with_minimal("[request]\nheader_names = [\"tenant\"]\n"));
    assert!(message.contains("only valid"));
}

#[test]
fn request_payload_expression_is_parsed() {
    let message = invalid_message(&with_minimal("[request]\npayload_expression = \"(payload\"\n"));
    assert!(message.contains("request.payload_expression"));
}

#[test]
fn default_target_is_parsed_as_object() {
    let config = EnricherConfig::from_toml_str(&with_minimal(
        "[default_target]\nname = \"\"\nprofile = { tier = \"standard\" }\n",
    ))
    .unwrap();
    assert_eq!(
        config.default_target,
        Some(json!({"name": "", "profile": {"tier": "standard"}}))
    );
}

#[test]
fn scalar_default_target_is_rejected() {
    let content = "default_target = 5\n[engine]\nrequest_channel = \"lookup\"\n";
    assert!(invalid_message(content).contains("default_target must be a table"));
}

// ============================================================================
// SECTION: Audit Rules
// ============================================================================

#[test]
fn file_audit_requires_path() {
    let message = invalid_message(&with_minimal("[audit]\nsink = \"file\"\n"));
    assert!(message.contains("audit.path is required"));

    let message = invalid_message(&with_minimal("[audit]\nsink = \"stderr\"\npath = \"a.log\"\n"));
    assert!(message.contains("only valid for the file sink"));
}
