//! Per-connection handlers, one variant per protocol version.
//!
//! Every handler is bound to exactly one connection and one service context
//! for its whole life. It holds the connection weakly: the transport owns
//! the connection, and a handler that outlives it fails with
//! `ConnectionDropped` instead of keeping it alive.
//!
//! The variants share lifecycle handling and the echo of accepted documents
//! through [`HandlerCore`], and differ only in how inbound payloads are
//! bound:
//!
//! - [`V001Handler`]: any declared root element
//! - [`V002Handler`]: pinned to the configured root type
//! - [`SendonlyHandler`]: publish only, inbound payloads are rejected

mod sendonly;
mod v001;
mod v002;

use std::sync::{Arc, Weak};

use serde::Serialize;

use defpi_binding::DocumentInstance;

use crate::connection::{Connection, ConnectionState};
use crate::context::ServiceContext;
use crate::error::{Result, ServiceError};
use crate::version::ProtocolVersion;

pub use sendonly::SendonlyHandler;
pub use v001::V001Handler;
pub use v002::V002Handler;

/// Message counters of one handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HandlerStats {
    pub received: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub sent: u64,
    /// Rendered documents the transport failed to send.
    pub send_failed: u64,
}

/// State shared by all handler variants.
#[derive(Debug)]
pub struct HandlerCore {
    context: Arc<ServiceContext>,
    connection: Weak<dyn Connection>,
    connection_id: String,
    stats: HandlerStats,
}

impl HandlerCore {
    fn new(context: Arc<ServiceContext>, connection: &Arc<dyn Connection>) -> Self {
        Self {
            context,
            connection: Arc::downgrade(connection),
            connection_id: connection.id().to_string(),
            stats: HandlerStats::default(),
        }
    }

    pub fn context(&self) -> &ServiceContext {
        &self.context
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Upgrade the back-reference, failing if the transport dropped it.
    fn connection(&self) -> Result<Arc<dyn Connection>> {
        self.connection
            .upgrade()
            .ok_or_else(|| ServiceError::ConnectionDropped(self.connection_id.clone()))
    }

    /// Connection that is currently allowed to carry data.
    fn connected(&self) -> Result<Arc<dyn Connection>> {
        let connection = self.connection()?;
        match connection.state() {
            ConnectionState::Connected => Ok(connection),
            state => Err(ServiceError::NotConnected {
                connection_id: self.connection_id.clone(),
                state,
            }),
        }
    }

    fn send_document(&mut self, document: &DocumentInstance) -> Result<()> {
        let connection = self.connected()?;
        let rendered = self.context.binder().render(document)?;
        let result = connection.send(rendered.as_bytes());
        match result {
            Ok(()) => self.stats.sent += 1,
            Err(_) => self.stats.send_failed += 1,
        }
        result
    }

    fn transition(&self, state: ConnectionState) -> Result<ConnectionState> {
        let connection = self.connection()?;
        let current = connection.state();
        if current.is_terminal() {
            return Err(ServiceError::NotConnected {
                connection_id: self.connection_id.clone(),
                state: current,
            });
        }
        connection.set_state(state);
        tracing::info!(
            service = self.context.name(),
            connection = %self.connection_id,
            from = %current,
            to = %state,
            "Connection state changed"
        );
        Ok(state)
    }
}

/// Handler bound to one connection, tagged by protocol version.
#[derive(Debug)]
pub enum ConnectionHandler {
    V001(V001Handler),
    V002(V002Handler),
    Sendonly(SendonlyHandler),
}

impl ConnectionHandler {
    pub fn v001(context: Arc<ServiceContext>, connection: &Arc<dyn Connection>) -> Self {
        Self::V001(V001Handler::new(HandlerCore::new(context, connection)))
    }

    pub fn v002(context: Arc<ServiceContext>, connection: &Arc<dyn Connection>) -> Self {
        Self::V002(V002Handler::new(HandlerCore::new(context, connection)))
    }

    pub fn sendonly(context: Arc<ServiceContext>, connection: &Arc<dyn Connection>) -> Self {
        Self::Sendonly(SendonlyHandler::new(HandlerCore::new(context, connection)))
    }

    #[must_use]
    pub fn version(&self) -> ProtocolVersion {
        match self {
            Self::V001(_) => ProtocolVersion::V001,
            Self::V002(_) => ProtocolVersion::V002,
            Self::Sendonly(_) => ProtocolVersion::Sendonly,
        }
    }

    fn core(&self) -> &HandlerCore {
        match self {
            Self::V001(h) => &h.core,
            Self::V002(h) => &h.core,
            Self::Sendonly(h) => &h.core,
        }
    }

    fn core_mut(&mut self) -> &mut HandlerCore {
        match self {
            Self::V001(h) => &mut h.core,
            Self::V002(h) => &mut h.core,
            Self::Sendonly(h) => &mut h.core,
        }
    }

    #[must_use]
    pub fn connection_id(&self) -> &str {
        self.core().connection_id()
    }

    #[must_use]
    pub fn stats(&self) -> HandlerStats {
        self.core().stats
    }

    /// Whether this handler is bound to exactly this connection object.
    #[must_use]
    pub fn is_bound_to(&self, connection: &Arc<dyn Connection>) -> bool {
        Weak::ptr_eq(&self.core().connection, &Arc::downgrade(connection))
    }

    /// Handle one inbound payload and echo the canonical rendering.
    ///
    /// Returns the bound document after it has been echoed. Rejected
    /// documents are counted and returned as errors; the connection stays
    /// usable unless [`ServiceError::is_fatal`] says otherwise. A document
    /// that binds but cannot be sent back still counts as accepted; the
    /// transport error is returned and counted in `send_failed`.
    ///
    /// # Errors
    /// Returns `NotConnected` outside the `CONNECTED` state,
    /// `ConnectionDropped` if the transport released the connection, the
    /// binding error for rejected documents and the transport error for a
    /// failed echo.
    pub fn on_data(&mut self, payload: &[u8]) -> Result<DocumentInstance> {
        let version = self.version();
        self.core().connected()?;
        self.core_mut().stats.received += 1;

        let result = match self {
            Self::V001(h) => h.receive(payload),
            Self::V002(h) => h.receive(payload),
            Self::Sendonly(h) => h.receive(payload),
        };

        let core = self.core_mut();
        let document = match result {
            Ok(document) => {
                core.stats.accepted += 1;
                tracing::debug!(
                    connection = %core.connection_id,
                    %version,
                    element = document.element(),
                    "Accepted document"
                );
                document
            }
            Err(err) => {
                core.stats.rejected += 1;
                tracing::warn!(
                    connection = %core.connection_id,
                    %version,
                    error = %err,
                    "Rejected payload"
                );
                return Err(err);
            }
        };

        if let Err(err) = core.send_document(&document) {
            tracing::warn!(
                connection = %core.connection_id,
                %version,
                error = %err,
                "Failed to echo accepted document"
            );
            return Err(err);
        }
        Ok(document)
    }

    /// Render a document and send it over the connection.
    ///
    /// # Errors
    /// Returns `NotConnected` / `ConnectionDropped` like [`Self::on_data`]
    /// and `InvalidInstance` if the document does not fit its type.
    pub fn publish(&mut self, document: &DocumentInstance) -> Result<()> {
        self.core_mut().send_document(document)
    }

    /// # Errors
    /// Fails if the connection is gone or already terminated.
    pub fn on_suspend(&mut self) -> Result<ConnectionState> {
        self.core().transition(ConnectionState::Suspended)
    }

    /// # Errors
    /// Fails if the connection is gone or already terminated.
    pub fn resume_after_suspend(&mut self) -> Result<ConnectionState> {
        self.core().transition(ConnectionState::Connected)
    }

    /// # Errors
    /// Fails if the connection is gone or already terminated.
    pub fn on_interrupt(&mut self) -> Result<ConnectionState> {
        self.core().transition(ConnectionState::Interrupted)
    }

    /// # Errors
    /// Fails if the connection is gone or already terminated.
    pub fn resume_after_interrupt(&mut self) -> Result<ConnectionState> {
        self.core().transition(ConnectionState::Connected)
    }

    /// Tear the handler down. The connection itself is closed by its owner.
    pub fn on_close(&mut self) {
        let core = self.core();
        tracing::info!(
            service = core.context.name(),
            connection = %core.connection_id,
            version = %self.version(),
            received = core.stats.received,
            accepted = core.stats.accepted,
            rejected = core.stats.rejected,
            sent = core.stats.sent,
            send_failed = core.stats.send_failed,
            "Connection handler closed"
        );
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::connection::MemoryConnection;
    use defpi_binding::catalogue::create_books_registry;
    use defpi_binding::{Binder, BindingError};

    pub(crate) const ONE_BOOK: &str = r#"<books><book id="1"><author>A</author><title>T</title><genre>G</genre><price>9.99</price><pub_date>2020-01-01</pub_date><review>R</review></book></books>"#;

    pub(crate) fn context() -> Arc<ServiceContext> {
        let binder = Binder::new(Arc::new(create_books_registry().unwrap()));
        Arc::new(ServiceContext::new(binder, &ServiceConfig::default()))
    }

    fn handler(
        constructor: fn(Arc<ServiceContext>, &Arc<dyn Connection>) -> ConnectionHandler,
    ) -> (Arc<MemoryConnection>, ConnectionHandler) {
        let memory = MemoryConnection::new("c1");
        let connection: Arc<dyn Connection> = memory.clone();
        (memory, constructor(context(), &connection))
    }

    #[test]
    fn test_v001_echoes_canonical_rendering() {
        let (memory, mut handler) = handler(ConnectionHandler::v001);
        assert_eq!(handler.version(), ProtocolVersion::V001);

        let document = handler.on_data(ONE_BOOK.as_bytes()).unwrap();
        assert_eq!(document.element(), "books");
        assert_eq!(memory.sent_text(), vec![ONE_BOOK.to_string()]);
        assert_eq!(
            handler.stats(),
            HandlerStats {
                received: 1,
                accepted: 1,
                rejected: 0,
                sent: 1,
                send_failed: 0,
            }
        );
    }

    /// Connection that accepts lifecycle calls but cannot carry data.
    #[derive(Debug)]
    struct DownLink;

    impl Connection for DownLink {
        fn id(&self) -> &str {
            "down"
        }

        fn send(&self, _payload: &[u8]) -> Result<()> {
            Err(ServiceError::Io(std::io::Error::other("link down")))
        }

        fn state(&self) -> ConnectionState {
            ConnectionState::Connected
        }

        fn set_state(&self, _state: ConnectionState) {}
    }

    #[test]
    fn test_failed_echo_still_counts_as_accepted() {
        let connection: Arc<dyn Connection> = Arc::new(DownLink);
        let mut handler = ConnectionHandler::v001(context(), &connection);

        let err = handler.on_data(ONE_BOOK.as_bytes()).unwrap_err();
        assert!(matches!(err, ServiceError::Io(_)));
        assert_eq!(
            handler.stats(),
            HandlerStats {
                received: 1,
                accepted: 1,
                rejected: 0,
                sent: 0,
                send_failed: 1,
            }
        );
    }

    #[test]
    fn test_rejected_document_keeps_connection_open() {
        let (memory, mut handler) = handler(ConnectionHandler::v001);

        let err = handler.on_data(b"<books><book/></books>").unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Binding(BindingError::IncompleteContent { .. })
        ));
        assert!(!err.is_fatal());
        assert!(memory.is_connected());
        assert!(memory.sent().is_empty());

        handler.on_data(b"<books/>").unwrap();
        assert_eq!(handler.stats().rejected, 1);
        assert_eq!(handler.stats().accepted, 1);
        assert_eq!(memory.sent_text(), vec!["<books/>".to_string()]);
    }

    #[test]
    fn test_sendonly_rejects_inbound_but_publishes() {
        let (memory, mut handler) = handler(ConnectionHandler::sendonly);

        let err = handler.on_data(ONE_BOOK.as_bytes()).unwrap_err();
        assert!(matches!(err, ServiceError::ReceiveNotSupported { .. }));

        let document = context().binder().bind_document(ONE_BOOK).unwrap();
        handler.publish(&document).unwrap();
        assert_eq!(memory.sent_text(), vec![ONE_BOOK.to_string()]);
        assert_eq!(handler.stats().sent, 1);
    }

    #[test]
    fn test_suspended_connection_refuses_data() {
        let (memory, mut handler) = handler(ConnectionHandler::v001);

        assert_eq!(handler.on_suspend().unwrap(), ConnectionState::Suspended);
        let err = handler.on_data(b"<books/>").unwrap_err();
        assert!(matches!(
            err,
            ServiceError::NotConnected { state: ConnectionState::Suspended, .. }
        ));

        assert_eq!(handler.resume_after_suspend().unwrap(), ConnectionState::Connected);
        assert!(handler.on_data(b"<books/>").is_ok());
        assert_eq!(memory.sent().len(), 1);
    }

    #[test]
    fn test_interrupt_and_resume() {
        let (memory, mut handler) = handler(ConnectionHandler::v002);
        handler.on_interrupt().unwrap();
        assert_eq!(memory.state(), ConnectionState::Interrupted);
        handler.resume_after_interrupt().unwrap();
        assert!(memory.is_connected());
    }

    #[test]
    fn test_terminated_connection_cannot_resume() {
        let (memory, mut handler) = handler(ConnectionHandler::v001);
        memory.close();
        assert!(matches!(
            handler.resume_after_suspend(),
            Err(ServiceError::NotConnected { state: ConnectionState::Terminated, .. })
        ));
    }

    #[test]
    fn test_dropped_connection() {
        let (memory, mut handler) = handler(ConnectionHandler::v001);
        drop(memory);

        let err = handler.on_data(b"<books/>").unwrap_err();
        assert!(matches!(err, ServiceError::ConnectionDropped(ref id) if id == "c1"));
        handler.on_close();
    }
}
