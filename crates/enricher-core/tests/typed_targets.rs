// crates/enricher-core/tests/typed_targets.rs
// ============================================================================
// Module: Typed Target Tests
// Description: Enrichment of serde-typed templates.
// Purpose: Validate typed round trips and their failure classifications.
// ============================================================================

//! ## Overview
//! Enriches serde structs through [`EnrichmentEngine::enrich_typed`] and
//! checks how serialization and deserialization failures are reported.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::time::Duration;

use common::lookup_channel;
use common::sparse_inbound;
use enricher_core::AssignError;
use enricher_core::CloneError;
use enricher_core::EnrichError;
use enricher_core::EnrichmentEngine;
use enricher_core::Expression;
use enricher_core::HeaderMapping;
use enricher_core::MappingFailure;
use enricher_core::MappingTarget;
use enricher_core::PropertyMapping;
use enricher_core::PropertyPath;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Customer {
    id: i64,
    name: Option<String>,
    age: u32,
}

fn engine(mappings: Vec<(&str, &str)>) -> EnrichmentEngine {
    let mut builder = EnrichmentEngine::builder()
        .request_channel(lookup_channel(Duration::ZERO))
        .header(HeaderMapping::new("source", Expression::parse("headers.source").unwrap()));
    for (target, expression) in mappings {
        builder = builder.property(PropertyMapping::new(
            PropertyPath::parse(target).unwrap(),
            Expression::parse(expression).unwrap(),
        ));
    }
    builder.build().unwrap()
}

/// Tests that a typed template is enriched and converted back.
#[tokio::test]
async fn typed_template_round_trips() {
    let template = Customer {
        id: 5,
        name: None,
        age: 0,
    };
    let enriched = engine(vec![("name", "payload.name"), ("age", "payload.age")])
        .enrich_typed(&sparse_inbound(5), &template)
        .await
        .unwrap();

    assert_eq!(
        enriched.target,
        Customer {
            id: 5,
            name: Some("customer-5".to_string()),
            age: 35,
        }
    );
    assert_eq!(enriched.headers.get("source"), Some(&json!("crm")));
    assert_eq!(enriched.report.applied(), 3);
    assert_eq!(template.name, None);
}

/// Tests that a template serializing to a non-object is a clone error.
#[tokio::test]
async fn non_object_typed_template_is_clone_error() {
    let err = engine(Vec::new()).enrich_typed(&sparse_inbound(1), &vec![1, 2]).await.unwrap_err();
    assert_eq!(
        err,
        EnrichError::Clone(CloneError::UnsupportedType {
            kind: "array"
        })
    );
}

/// Tests that a result the type cannot hold is a payload mapping error.
#[tokio::test]
async fn undeserializable_result_is_payload_mapping_error() {
    let template = Customer {
        id: 5,
        name: None,
        age: 0,
    };
    let err = engine(vec![("age", "payload.name")])
        .enrich_typed(&sparse_inbound(5), &template)
        .await
        .unwrap_err();

    let EnrichError::Mapping(mapping) = err else {
        panic!("expected mapping error");
    };
    assert_eq!(mapping.target, MappingTarget::Payload);
    assert!(matches!(mapping.failure, MappingFailure::Assignment(AssignError::Deserialize(_))));
}
