//! `V002`: echo interface pinned to a single root type.
//!
//! Unlike `V001`, the payload's root element does not choose the type; it
//! must bind to the service's configured root type.

use defpi_binding::DocumentInstance;

use super::HandlerCore;
use crate::error::Result;

#[derive(Debug)]
pub struct V002Handler {
    pub(super) core: HandlerCore,
}

impl V002Handler {
    pub(super) fn new(core: HandlerCore) -> Self {
        Self { core }
    }

    pub(super) fn receive(&self, payload: &[u8]) -> Result<DocumentInstance> {
        let context = self.core.context();
        Ok(context.binder().bind_bytes_as(payload, context.root_type())?)
    }
}
