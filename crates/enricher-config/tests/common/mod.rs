// crates/enricher-config/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared helpers for enricher-config tests.
// Purpose: Provide registries and config files for wiring tests.
// Dependencies: enricher-broker, enricher-core, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Provides a channel registry backed by an inline customer lookup and a
//! helper for writing configuration files to temporary storage.

#![allow(dead_code, reason = "Common module may have unused helpers.")]

use std::io::Write;
use std::sync::Arc;

use enricher_broker::CallbackRequestChannel;
use enricher_broker::ChannelRegistry;
use enricher_core::Message;
use enricher_core::ReplyTopic;
use serde_json::json;
use tempfile::NamedTempFile;

/// Registry with a `customer-lookup` channel and a `customer-replies` topic.
pub fn registry() -> Result<ChannelRegistry, String> {
    ChannelRegistry::builder()
        .channel(
            "customer-lookup",
            CallbackRequestChannel::new(|request| {
                let id = request.payload().as_i64().unwrap_or(0);
                Ok(Some(
                    Message::new(json!({"name": format!("customer-{id}"), "tier": "gold"}))
                        .with_header("source", "crm"),
                ))
            }),
        )
        .topic(Arc::new(ReplyTopic::new("customer-replies")))
        .build()
        .map_err(|err| err.to_string())
}

/// Writes `content` to a temporary file.
pub fn config_file(content: &str) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(content.as_bytes()).map_err(|err| err.to_string())?;
    Ok(file)
}
