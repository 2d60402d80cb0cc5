// crates/enricher-config/src/lib.rs
// ============================================================================
// Module: Content Enricher Config Library
// Description: Canonical config model, validation, and engine wiring.
// Purpose: Single source of truth for enricher.toml semantics.
// Dependencies: enricher-broker, enricher-core, serde, toml
// ============================================================================

//! ## Overview
//! `enricher-config` defines the canonical configuration model for content
//! enrichment engines. It provides strict, fail-closed validation, builds
//! engines against a named channel registry, and ships a canonical example.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;
mod wiring;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
