//! Whole-service health reporting shared by both transports.

use std::sync::Arc;

use addsvc_core::messages::ServingStatus;

use super::shutdown::ShutdownController;

/// Answers health lookups from the lifecycle state.
///
/// The empty service name means "the whole server"; the configured service
/// name is an alias for it. Any other name is unknown.
#[derive(Debug, Clone)]
pub struct HealthReporter {
    service_name: Arc<str>,
    shutdown: Arc<ShutdownController>,
}

impl HealthReporter {
    #[must_use]
    pub fn new(service_name: &str, shutdown: Arc<ShutdownController>) -> Self {
        Self {
            service_name: Arc::from(service_name),
            shutdown,
        }
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Status of the whole server.
    #[must_use]
    pub fn overall(&self) -> ServingStatus {
        self.shutdown.serving_status()
    }

    /// Status for a named lookup.
    #[must_use]
    pub fn check(&self, service: &str) -> ServingStatus {
        if service.is_empty() || service == &*self.service_name {
            self.overall()
        } else {
            ServingStatus::ServiceUnknown
        }
    }
}
