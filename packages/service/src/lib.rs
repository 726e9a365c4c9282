//! dEF-Pi service core - protocol version dispatch for schema-bound interfaces.
//!
//! A service exposes one interface in several protocol versions. Each inbound
//! connection declares the version it speaks; the [`dispatcher`] resolves
//! that tag in the [`version`] registry and creates a fresh
//! [`handler::ConnectionHandler`] bound to the connection. Handlers bind
//! inbound XML with `defpi-binding` and echo the canonical rendering.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use defpi_service::connection::{Connection, MemoryConnection};
//! use defpi_service::{Service, ServiceConfig};
//!
//! let service = Service::initialize(&ServiceConfig::default()).unwrap();
//! let memory = MemoryConnection::new("c1");
//! let connection: Arc<dyn Connection> = memory.clone();
//!
//! let mut handler = service
//!     .dispatcher()
//!     .dispatch(&connection, "V001", service.context())
//!     .unwrap();
//! handler.on_data(b"<books/>").unwrap();
//! assert_eq!(memory.sent_text(), vec!["<books/>".to_string()]);
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Environment configuration and version tag validation
//! - [`error`]: Error types and Result alias
//! - [`connection`]: Connection trait, states and an in-memory transport
//! - [`context`]: Shared read-only service context
//! - [`version`]: Protocol versions and the version registry
//! - [`handler`]: Per-connection handler variants
//! - [`dispatcher`]: Version tag to handler routing
//! - [`manager`]: Connection table and lifecycle driver
//! - [`service`]: Start-up wiring
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod connection;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod manager;
pub mod service;
pub mod version;

pub use config::ServiceConfig;
pub use connection::{Connection, ConnectionState, MemoryConnection};
pub use dispatcher::Dispatcher;
pub use error::{Result, ServiceError};
pub use handler::{ConnectionHandler, HandlerStats};
pub use manager::{ConnectionHandshake, ConnectionManager};
pub use service::Service;
pub use version::{create_version_registry, ProtocolVersion, VersionRegistry};
