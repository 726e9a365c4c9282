//! Runtime configuration of the service core.
//!
//! Read from the environment once at startup:
//! - `DEFPI_SERVICE_NAME` - name reported in logs (default `echo-service`)
//! - `DEFPI_MAX_DOCUMENT_SIZE` - inbound document size limit in bytes
//! - `DEFPI_PROTOCOL_VERSIONS` - comma-separated enabled version tags
//! - `DEFPI_ROOT_TYPE` - root type accepted by `V002`, in `{ns}local` form

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use strum::IntoEnumIterator;

use defpi_binding::catalogue::books_form_name;
use defpi_binding::config::MAX_DOCUMENT_SIZE;
use defpi_binding::QName;

use crate::error::{Result, ServiceError};
use crate::version::ProtocolVersion;

/// Default service name.
pub const DEFAULT_SERVICE_NAME: &str = "echo-service";

/// Version tag format: a letter followed by up to 31 letters, digits or
/// underscores.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static VERSION_TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]{0,31}$").expect("valid regex"));

/// Validate the format of a protocol version tag.
///
/// Only the shape is checked; whether the tag is registered is up to the
/// version registry.
///
/// # Examples
/// ```
/// use defpi_service::config::validate_version_tag;
///
/// assert!(validate_version_tag("V001").is_ok());
/// assert!(validate_version_tag("Sendonly").is_ok());
/// assert!(validate_version_tag("1.0").is_err());
/// ```
///
/// # Errors
/// Returns `UnsupportedVersion` when the tag does not match.
pub fn validate_version_tag(tag: &str) -> Result<()> {
    if VERSION_TAG_PATTERN.is_match(tag) {
        Ok(())
    } else {
        Err(ServiceError::UnsupportedVersion(tag.to_string()))
    }
}

/// Parse a comma-separated list of version tags.
///
/// Whitespace around tags is ignored; empty entries are skipped. Duplicates
/// are kept so that registry population can report them.
///
/// # Errors
/// Returns `Config` for a tag that names no known protocol version.
pub fn parse_versions(list: &str) -> Result<Vec<ProtocolVersion>> {
    list.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(|tag| {
            ProtocolVersion::from_str(tag)
                .map_err(|_| ServiceError::Config(format!("unknown protocol version '{tag}'")))
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service_name: String,
    pub max_document_size: usize,
    pub protocol_versions: Vec<ProtocolVersion>,
    pub root_type: QName,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            max_document_size: MAX_DOCUMENT_SIZE,
            protocol_versions: ProtocolVersion::iter().collect(),
            root_type: books_form_name(),
        }
    }
}

impl ServiceConfig {
    /// Read the configuration from the environment.
    ///
    /// # Errors
    /// Returns `Config` when a variable is set to an unusable value.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let service_name = std::env::var("DEFPI_SERVICE_NAME")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.service_name);

        let max_document_size = match std::env::var("DEFPI_MAX_DOCUMENT_SIZE") {
            Ok(v) => v.trim().parse().map_err(|_| {
                ServiceError::Config(format!("DEFPI_MAX_DOCUMENT_SIZE is not a byte count: '{v}'"))
            })?,
            Err(_) => defaults.max_document_size,
        };

        let protocol_versions = match std::env::var("DEFPI_PROTOCOL_VERSIONS") {
            Ok(v) => parse_versions(&v)?,
            Err(_) => defaults.protocol_versions,
        };

        let root_type = std::env::var("DEFPI_ROOT_TYPE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| QName::parse(v.trim()))
            .unwrap_or(defaults.root_type);

        Ok(Self {
            service_name,
            max_document_size,
            protocol_versions,
            root_type,
        })
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    pub fn with_max_document_size(mut self, max_document_size: usize) -> Self {
        self.max_document_size = max_document_size;
        self
    }

    pub fn with_protocol_versions(mut self, protocol_versions: Vec<ProtocolVersion>) -> Self {
        self.protocol_versions = protocol_versions;
        self
    }

    pub fn with_root_type(mut self, root_type: QName) -> Self {
        self.root_type = root_type;
        self
    }
}
