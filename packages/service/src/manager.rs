//! Connection table and lifecycle driver.
//!
//! The transport reports connection events by id; the manager forwards them
//! to the handler it created for that connection. Each handler is owned by
//! exactly one table entry, so no locking is needed as long as one caller
//! drives the manager.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use defpi_binding::DocumentInstance;

use crate::connection::{Connection, ConnectionState};
use crate::context::ServiceContext;
use crate::dispatcher::Dispatcher;
use crate::error::{Result, ServiceError};
use crate::handler::ConnectionHandler;

/// Confirmation of a lifecycle request, reporting the resulting state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionHandshake {
    pub connection_id: String,
    pub state: ConnectionState,
}

impl ConnectionHandshake {
    fn new(connection_id: impl Into<String>, state: ConnectionState) -> Self {
        Self {
            connection_id: connection_id.into(),
            state,
        }
    }
}

struct Entry {
    connection: Arc<dyn Connection>,
    handler: ConnectionHandler,
}

pub struct ConnectionManager {
    dispatcher: Dispatcher,
    context: Arc<ServiceContext>,
    connections: HashMap<String, Entry>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(dispatcher: Dispatcher, context: Arc<ServiceContext>) -> Self {
        Self {
            dispatcher,
            context,
            connections: HashMap::new(),
        }
    }

    /// Accept a new connection declaring `version`.
    ///
    /// A create request for a connection id that is already known is
    /// ignored and confirmed as connected.
    ///
    /// # Errors
    /// Returns `UnsupportedVersion` if the dispatcher refuses the tag; the
    /// connection has been closed by then.
    pub fn create(
        &mut self,
        connection: Arc<dyn Connection>,
        version: &str,
    ) -> Result<ConnectionHandshake> {
        let id = connection.id().to_string();
        if self.connections.contains_key(&id) {
            tracing::info!(connection = %id, "Ignoring create for existing connection");
            return Ok(ConnectionHandshake::new(id, ConnectionState::Connected));
        }

        let handler = self
            .dispatcher
            .dispatch(&connection, version, Arc::clone(&self.context))?;
        let state = connection.state();
        self.connections.insert(id.clone(), Entry { connection, handler });
        Ok(ConnectionHandshake::new(id, state))
    }

    /// # Errors
    /// Returns `UnknownConnection` for an id without handler, or the
    /// handler's lifecycle error.
    pub fn suspend(&mut self, connection_id: &str) -> Result<ConnectionHandshake> {
        let state = self.entry_mut(connection_id)?.handler.on_suspend()?;
        Ok(ConnectionHandshake::new(connection_id, state))
    }

    /// # Errors
    /// Returns `UnknownConnection` for an id without handler, or the
    /// handler's lifecycle error.
    pub fn interrupt(&mut self, connection_id: &str) -> Result<ConnectionHandshake> {
        let state = self.entry_mut(connection_id)?.handler.on_interrupt()?;
        Ok(ConnectionHandshake::new(connection_id, state))
    }

    /// Resume a suspended or interrupted connection.
    ///
    /// # Errors
    /// Returns `UnknownConnection` for an id without handler, or
    /// `NotConnected` if the connection was terminated.
    pub fn resume(&mut self, connection_id: &str) -> Result<ConnectionHandshake> {
        let entry = self.entry_mut(connection_id)?;
        let state = match entry.connection.state() {
            ConnectionState::Interrupted => entry.handler.resume_after_interrupt()?,
            _ => entry.handler.resume_after_suspend()?,
        };
        Ok(ConnectionHandshake::new(connection_id, state))
    }

    /// Remove the connection, tear down its handler and close it.
    ///
    /// # Errors
    /// Returns `UnknownConnection` for an id without handler.
    pub fn terminate(&mut self, connection_id: &str) -> Result<ConnectionHandshake> {
        let mut entry = self
            .connections
            .remove(connection_id)
            .ok_or_else(|| ServiceError::UnknownConnection(connection_id.to_string()))?;
        entry.handler.on_close();
        entry.connection.close();
        Ok(ConnectionHandshake::new(
            connection_id,
            ConnectionState::Terminated,
        ))
    }

    /// Feed an inbound payload to the connection's handler.
    ///
    /// A fatal error terminates this connection only; other connections are
    /// not affected.
    ///
    /// # Errors
    /// Returns `UnknownConnection` or whatever the handler rejected the
    /// payload with.
    pub fn deliver(&mut self, connection_id: &str, payload: &[u8]) -> Result<DocumentInstance> {
        let result = self.entry_mut(connection_id)?.handler.on_data(payload);
        if let Err(err) = &result {
            if err.is_fatal() {
                tracing::warn!(connection = connection_id, error = %err, "Terminating connection after fatal error");
                self.terminate(connection_id)?;
            }
        }
        result
    }

    /// Handler of a managed connection.
    #[must_use]
    pub fn handler(&self, connection_id: &str) -> Option<&ConnectionHandler> {
        self.connections.get(connection_id).map(|entry| &entry.handler)
    }

    #[must_use]
    pub fn handler_mut(&mut self, connection_id: &str) -> Option<&mut ConnectionHandler> {
        self.connections
            .get_mut(connection_id)
            .map(|entry| &mut entry.handler)
    }

    /// Managed connection ids, sorted.
    #[must_use]
    pub fn connection_ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.connections.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Terminate every managed connection.
    pub fn close(&mut self) {
        for (id, mut entry) in self.connections.drain() {
            entry.handler.on_close();
            entry.connection.close();
            tracing::debug!(connection = %id, "Closed connection");
        }
    }

    fn entry_mut(&mut self, connection_id: &str) -> Result<&mut Entry> {
        self.connections
            .get_mut(connection_id)
            .ok_or_else(|| ServiceError::UnknownConnection(connection_id.to_string()))
    }
}
