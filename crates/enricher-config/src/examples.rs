// crates/enricher-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payloads.
// Purpose: Deterministic examples for docs and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for content enricher configuration. The example loads
//! and validates as-is.

/// Returns a canonical example `enricher.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[engine]
name = "customer-enricher"
request_channel = "customer-lookup"
# reply_channel = "customer-replies"
request_timeout_ms = 5000
requires_reply = true

[request]
payload_expression = "payload.customer_id"
propagate_headers = "include"
header_names = ["tenant", "trace_id"]

[[properties]]
target = "customer.name"
expression = "payload.name"

[[properties]]
target = "customer.tier"
expression = "payload.tier ?: 'standard'"
required = false

[[properties]]
target = "customer.status"
expression = "'unresolved'"
source = "null_result"

[[headers]]
name = "customer_source"
expression = "headers.source ?: 'crm'"
overwrite = "always"

[[headers]]
name = "enriched"
value = true

[default_target]
customer = { name = "", tier = "standard" }

[audit]
sink = "stderr"
"#,
    )
}
