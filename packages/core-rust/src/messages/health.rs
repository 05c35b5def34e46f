//! Health-check messages, modelled on the `grpc.health.v1` service.

use serde::{Deserialize, Serialize};

/// RPC method for the standard health check.
pub const HEALTH_CHECK_METHOD: &str = "grpc.health.v1.Health/Check";

/// Serving status of the service as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServingStatus {
    Serving,
    NotServing,
    /// Returned for health lookups naming a service this server does not host.
    ServiceUnknown,
}

impl ServingStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Serving => "SERVING",
            Self::NotServing => "NOT_SERVING",
            Self::ServiceUnknown => "SERVICE_UNKNOWN",
        }
    }
}

/// Health lookup. An empty `service` asks about the server as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckRequest {
    #[serde(default)]
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: ServingStatus,
}
