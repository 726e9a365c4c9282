//! `Sendonly`: the service publishes, the peer never sends.

use defpi_binding::DocumentInstance;

use super::HandlerCore;
use crate::error::{Result, ServiceError};
use crate::version::ProtocolVersion;

#[derive(Debug)]
pub struct SendonlyHandler {
    pub(super) core: HandlerCore,
}

impl SendonlyHandler {
    pub(super) fn new(core: HandlerCore) -> Self {
        Self { core }
    }

    pub(super) fn receive(&self, _payload: &[u8]) -> Result<DocumentInstance> {
        Err(ServiceError::ReceiveNotSupported {
            connection_id: self.core.connection_id().to_string(),
            version: ProtocolVersion::Sendonly.to_string(),
        })
    }
}
