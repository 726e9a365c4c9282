//! Routing inbound connections to the handler for their protocol version.

use std::sync::Arc;

use crate::connection::Connection;
use crate::context::ServiceContext;
use crate::error::Result;
use crate::handler::ConnectionHandler;
use crate::version::VersionRegistry;

/// Creates one fresh handler per accepted connection.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    versions: Arc<VersionRegistry>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(versions: Arc<VersionRegistry>) -> Self {
        Self { versions }
    }

    #[must_use]
    pub fn versions(&self) -> &VersionRegistry {
        &self.versions
    }

    /// Create the handler for a connection that declared `version`.
    ///
    /// An unsupported tag closes the connection; no handler is built and no
    /// fallback version is guessed.
    ///
    /// # Errors
    /// Returns `UnsupportedVersion` for malformed or unregistered tags.
    pub fn dispatch(
        &self,
        connection: &Arc<dyn Connection>,
        version: &str,
        context: Arc<ServiceContext>,
    ) -> Result<ConnectionHandler> {
        let constructor = match self.versions.resolve(version) {
            Ok(constructor) => constructor,
            Err(err) => {
                tracing::warn!(
                    connection = connection.id(),
                    version,
                    supported = ?self.versions.supported_versions(),
                    "Rejecting connection with unsupported protocol version"
                );
                connection.close();
                return Err(err);
            }
        };

        let handler = constructor(context, connection);
        tracing::info!(
            connection = connection.id(),
            version = %handler.version(),
            "Created connection handler"
        );
        Ok(handler)
    }
}
