//! Service start-up: builds the registries once and wires them together.

use std::sync::Arc;

use defpi_binding::catalogue::create_books_registry;
use defpi_binding::Binder;

use crate::config::ServiceConfig;
use crate::context::ServiceContext;
use crate::dispatcher::Dispatcher;
use crate::error::{Result, ServiceError};
use crate::manager::ConnectionManager;
use crate::version::{create_version_registry, VersionRegistry};

/// Fully initialized service core.
///
/// The type and version registries are complete when this is returned and
/// are only read afterwards.
#[derive(Debug, Clone)]
pub struct Service {
    context: Arc<ServiceContext>,
    dispatcher: Dispatcher,
}

impl Service {
    /// Build the registries, binder, context and dispatcher.
    ///
    /// # Errors
    /// Any duplicate, dangling or unknown registration aborts start-up, as
    /// does a configured root type that is not registered.
    pub fn initialize(config: &ServiceConfig) -> Result<Self> {
        let types = create_books_registry()?;
        types.validate_references()?;
        if !types.contains(&config.root_type) {
            return Err(ServiceError::Config(format!(
                "root type {} is not a registered schema type",
                config.root_type
            )));
        }
        tracing::debug!(types = types.len(), "Type registry ready");

        let binder =
            Binder::new(Arc::new(types)).with_max_document_size(config.max_document_size);
        let versions = create_version_registry(&config.protocol_versions)?;
        tracing::info!(
            service = %config.service_name,
            versions = ?versions.supported_versions(),
            root_type = %config.root_type,
            "Service initialized"
        );

        Ok(Self {
            context: Arc::new(ServiceContext::new(binder, config)),
            dispatcher: Dispatcher::new(Arc::new(versions)),
        })
    }

    #[must_use]
    pub fn context(&self) -> Arc<ServiceContext> {
        Arc::clone(&self.context)
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn versions(&self) -> &VersionRegistry {
        self.dispatcher.versions()
    }

    /// Fresh connection table driven by this service.
    #[must_use]
    pub fn connection_manager(&self) -> ConnectionManager {
        ConnectionManager::new(self.dispatcher.clone(), self.context())
    }
}
