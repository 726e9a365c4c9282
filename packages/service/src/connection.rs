//! Connection abstraction supplied by the transport layer.
//!
//! The core never accepts sockets itself. A transport wraps whatever it
//! accepted in a [`Connection`] and hands it to the dispatcher; handlers only
//! keep a weak reference to it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};

use crate::error::{Result, ServiceError};

/// Lifecycle state of a connection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Starting,
    Connected,
    Suspended,
    Interrupted,
    Terminated,
}

impl ConnectionState {
    /// Whether the connection will never carry data again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Terminated
    }
}

/// One open connection, as seen by the service core.
pub trait Connection: Send + Sync {
    /// Identifier unique among the open connections.
    fn id(&self) -> &str;

    /// Send one complete message.
    fn send(&self, payload: &[u8]) -> Result<()>;

    fn state(&self) -> ConnectionState;

    /// Move to a new lifecycle state. Transports call this on suspend,
    /// interrupt and resume; handlers call it when they tear down.
    fn set_state(&self, state: ConnectionState);

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Release the connection. Idempotent.
    fn close(&self) {
        self.set_state(ConnectionState::Terminated);
    }
}

/// In-memory connection that records every message sent over it.
///
/// Used by tests and by the CLI to run a handler without a transport.
#[derive(Debug)]
pub struct MemoryConnection {
    id: String,
    inner: Mutex<MemoryState>,
}

#[derive(Debug)]
struct MemoryState {
    state: ConnectionState,
    sent: Vec<Vec<u8>>,
}

impl MemoryConnection {
    /// Create a connection that is already `CONNECTED`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            inner: Mutex::new(MemoryState {
                state: ConnectionState::Connected,
                sent: Vec::new(),
            }),
        })
    }

    /// Messages sent so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    /// Messages sent so far, decoded as UTF-8.
    #[must_use]
    pub fn sent_text(&self) -> Vec<String> {
        self.lock()
            .sent
            .iter()
            .map(|m| String::from_utf8_lossy(m).into_owned())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connection for MemoryConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn send(&self, payload: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        if inner.state != ConnectionState::Connected {
            return Err(ServiceError::NotConnected {
                connection_id: self.id.clone(),
                state: inner.state,
            });
        }
        inner.sent.push(payload.to_vec());
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.lock().state
    }

    fn set_state(&self, state: ConnectionState) {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return;
        }
        tracing::trace!(connection = %self.id, from = %inner.state, to = %state, "Connection state change");
        inner.state = state;
    }
}
