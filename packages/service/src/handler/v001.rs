//! `V001`: echo interface accepting any declared root element.

use defpi_binding::DocumentInstance;

use super::HandlerCore;
use crate::error::Result;

#[derive(Debug)]
pub struct V001Handler {
    pub(super) core: HandlerCore,
}

impl V001Handler {
    pub(super) fn new(core: HandlerCore) -> Self {
        Self { core }
    }

    /// Bind the payload by its root element.
    pub(super) fn receive(&self, payload: &[u8]) -> Result<DocumentInstance> {
        Ok(self.core.context().binder().bind_bytes(payload)?)
    }
}
