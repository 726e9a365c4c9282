//! Error types for the service core.

use thiserror::Error;

use defpi_binding::BindingError;

use crate::connection::ConnectionState;

/// Main error type for dispatch and connection handling.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Version tag is malformed or not registered.
    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(String),

    /// Version tag registered twice.
    #[error("Protocol version already registered: {0}")]
    DuplicateVersion(String),

    /// Document binding or rendering failed.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// No handler is registered for this connection id.
    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    /// The transport released the connection while the handler still ran.
    #[error("Connection {0} has been dropped")]
    ConnectionDropped(String),

    /// Data or lifecycle call in a state that does not allow it.
    #[error("Connection {connection_id} is {state}")]
    NotConnected {
        connection_id: String,
        state: ConnectionState,
    },

    /// Inbound payload on a send-only interface.
    #[error("Connection {connection_id} uses {version}, which does not receive messages")]
    ReceiveNotSupported {
        connection_id: String,
        version: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServiceError {
    /// Whether the error should take down the connection it occurred on.
    ///
    /// Document rejections and messages arriving while the connection is
    /// suspended are not fatal: the connection stays open.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Binding(err) => err.is_fatal(),
            Self::ReceiveNotSupported { .. } | Self::NotConnected { .. } => false,
            _ => true,
        }
    }
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
