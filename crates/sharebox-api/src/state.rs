//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use sharebox_core::config::AppConfig;
use sharebox_service::ServiceContext;

/// Shared application state, cloned into every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// Storage, record stores and domain services.
    pub services: Arc<ServiceContext>,
}

impl AppState {
    /// Bundle configuration and services.
    pub fn new(config: AppConfig, services: ServiceContext) -> Self {
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
