// crates/enricher-broker/src/registry.rs
// ============================================================================
// Module: Enricher Channel Registry
// Description: Named request channels and reply topics.
// Purpose: Resolve configured channel names into live channel handles.
// Dependencies: enricher-core, thiserror
// ============================================================================

//! ## Overview
//! [`ChannelRegistry`] maps names to request channels and shared reply
//! topics so configuration can refer to them by name. Names resolve by exact
//! match only.
//! Invariants:
//! - Names are non-empty and unique within their kind.
//! - The registry is immutable once built.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use enricher_core::ReplyTopic;
use enricher_core::RequestChannel;
use thiserror::Error;

// ============================================================================
// SECTION: Registry Errors
// ============================================================================

/// Errors returned by the channel registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No request channel is registered under the name.
    #[error("unknown request channel: {0}")]
    UnknownChannel(String),
    /// No reply topic is registered under the name.
    #[error("unknown reply topic: {0}")]
    UnknownTopic(String),
    /// A name was registered twice.
    #[error("duplicate registration: {0}")]
    DuplicateName(String),
    /// A registration used an empty name.
    #[error("registry names must be non-empty")]
    EmptyName,
}

// ============================================================================
// SECTION: Registry Builder
// ============================================================================

/// Builder for a channel registry.
#[derive(Default)]
pub struct ChannelRegistryBuilder {
    /// Registered request channels.
    channels: BTreeMap<String, Arc<dyn RequestChannel>>,
    /// Registered reply topics.
    topics: BTreeMap<String, Arc<ReplyTopic>>,
    /// First registration error, reported by `build`.
    error: Option<RegistryError>,
}

impl ChannelRegistryBuilder {
    /// Registers a request channel under `name`.
    #[must_use]
    pub fn channel(self, name: impl Into<String>, channel: impl RequestChannel + 'static) -> Self {
        self.shared_channel(name, Arc::new(channel))
    }

    /// Registers an already shared request channel under `name`.
    #[must_use]
    pub fn shared_channel(mut self, name: impl Into<String>, channel: Arc<dyn RequestChannel>) -> Self {
        let name = name.into();
        if let Some(err) = self.check_name(&name, self.channels.contains_key(&name)) {
            self.error = Some(err);
        } else {
            self.channels.insert(name, channel);
        }
        self
    }

    /// Registers a reply topic under its own name.
    #[must_use]
    pub fn topic(mut self, topic: Arc<ReplyTopic>) -> Self {
        let name = topic.name().to_string();
        if let Some(err) = self.check_name(&name, self.topics.contains_key(&name)) {
            self.error = Some(err);
        } else {
            self.topics.insert(name, topic);
        }
        self
    }

    /// Builds the registry.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistryError`] raised during registration.
    pub fn build(self) -> Result<ChannelRegistry, RegistryError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(ChannelRegistry {
            channels: self.channels,
            topics: self.topics,
        })
    }

    /// Validates a name about to be registered.
    fn check_name(&self, name: &str, taken: bool) -> Option<RegistryError> {
        if self.error.is_some() {
            return None;
        }
        if name.trim().is_empty() {
            return Some(RegistryError::EmptyName);
        }
        taken.then(|| RegistryError::DuplicateName(name.to_string()))
    }
}

// ============================================================================
// SECTION: Channel Registry
// ============================================================================

/// Named request channels and reply topics.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    /// Request channels by name.
    channels: BTreeMap<String, Arc<dyn RequestChannel>>,
    /// Reply topics by name.
    topics: BTreeMap<String, Arc<ReplyTopic>>,
}

impl ChannelRegistry {
    /// Returns a builder for the registry.
    #[must_use]
    pub fn builder() -> ChannelRegistryBuilder {
        ChannelRegistryBuilder::default()
    }

    /// Resolves a request channel by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownChannel`] when no channel matches.
    pub fn channel(&self, name: &str) -> Result<Arc<dyn RequestChannel>, RegistryError> {
        self.channels
            .get(name)
            .map(Arc::clone)
            .ok_or_else(|| RegistryError::UnknownChannel(name.to_string()))
    }

    /// Resolves a reply topic by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownTopic`] when no topic matches.
    pub fn topic(&self, name: &str) -> Result<Arc<ReplyTopic>, RegistryError> {
        self.topics
            .get(name)
            .map(Arc::clone)
            .ok_or_else(|| RegistryError::UnknownTopic(name.to_string()))
    }

    /// Returns registered channel names in sorted order.
    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Returns registered topic names in sorted order.
    pub fn topic_names(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }
}

impl fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("channels", &self.channels.keys().collect::<Vec<_>>())
            .field("topics", &self.topics.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
