//! Shared service context handed to every connection handler.

use defpi_binding::{Binder, QName};

use crate::config::ServiceConfig;

/// Read-only state shared by all handlers of one service.
#[derive(Debug)]
pub struct ServiceContext {
    name: String,
    binder: Binder,
    root_type: QName,
}

impl ServiceContext {
    #[must_use]
    pub fn new(binder: Binder, config: &ServiceConfig) -> Self {
        Self {
            name: config.service_name.clone(),
            binder,
            root_type: config.root_type.clone(),
        }
    }

    /// Service name, for logging.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    /// Root type accepted by handlers that pin their payload type.
    #[must_use]
    pub fn root_type(&self) -> &QName {
        &self.root_type
    }
}
