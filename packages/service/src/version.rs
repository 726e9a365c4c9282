//! Protocol versions and the registry mapping version tags to handler
//! constructors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::config::validate_version_tag;
use crate::connection::Connection;
use crate::context::ServiceContext;
use crate::error::{Result, ServiceError};
use crate::handler::ConnectionHandler;

/// Constructor producing a handler bound to one connection.
pub type HandlerConstructor = fn(Arc<ServiceContext>, &Arc<dyn Connection>) -> ConnectionHandler;

/// Wire-protocol variants of the echo interface.
///
/// The string form is the tag a client declares when connecting.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
pub enum ProtocolVersion {
    V001,
    V002,
    Sendonly,
}

impl ProtocolVersion {
    /// Handler constructor implementing this version.
    #[must_use]
    pub fn constructor(self) -> HandlerConstructor {
        match self {
            Self::V001 => ConnectionHandler::v001,
            Self::V002 => ConnectionHandler::v002,
            Self::Sendonly => ConnectionHandler::sendonly,
        }
    }

    /// Whether handlers of this version accept inbound payloads.
    #[must_use]
    pub fn receives(self) -> bool {
        !matches!(self, Self::Sendonly)
    }
}

/// Registry mapping version tags to handler constructors.
///
/// Populated once during service initialization, read-only afterwards.
#[derive(Default)]
pub struct VersionRegistry {
    constructors: HashMap<String, HandlerConstructor>,
}

impl fmt::Debug for VersionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionRegistry")
            .field("versions", &self.supported_versions())
            .finish()
    }
}

impl VersionRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under a version tag.
    ///
    /// # Errors
    /// Returns `UnsupportedVersion` for a malformed tag and
    /// `DuplicateVersion` if the tag is already registered.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        constructor: HandlerConstructor,
    ) -> Result<()> {
        let tag = tag.into();
        validate_version_tag(&tag)?;
        if self.constructors.contains_key(&tag) {
            return Err(ServiceError::DuplicateVersion(tag));
        }
        tracing::debug!(version = %tag, "Registered protocol version");
        self.constructors.insert(tag, constructor);
        Ok(())
    }

    /// Resolve a version tag. Matching is exact and case-sensitive.
    ///
    /// # Errors
    /// Returns `UnsupportedVersion` if the tag is malformed or unregistered.
    pub fn resolve(&self, tag: &str) -> Result<HandlerConstructor> {
        validate_version_tag(tag)?;
        self.constructors
            .get(tag)
            .copied()
            .ok_or_else(|| ServiceError::UnsupportedVersion(tag.to_string()))
    }

    #[must_use]
    pub fn is_supported(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Registered tags, sorted.
    #[must_use]
    pub fn supported_versions(&self) -> Vec<&str> {
        let mut tags: Vec<_> = self.constructors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

/// Build the registry for the enabled protocol versions.
///
/// # Errors
/// Returns `DuplicateVersion` if a version is listed twice.
pub fn create_version_registry(enabled: &[ProtocolVersion]) -> Result<VersionRegistry> {
    let mut registry = VersionRegistry::new();
    for version in enabled {
        registry.register(version.to_string(), version.constructor())?;
    }
    Ok(registry)
}
