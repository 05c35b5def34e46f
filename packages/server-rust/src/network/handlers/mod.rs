//! HTTP handler definitions for the add service.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for building the router.

pub mod health;
pub mod index;
pub mod operation;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use index::index_handler;
pub use operation::{concat_handler, sum_handler};

use std::sync::Arc;
use std::time::Instant;

use crate::service::EndpointSet;

use super::{HealthReporter, NetworkConfig, ShutdownController};

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Endpoint table shared with the RPC adapter.
    pub endpoints: EndpointSet,
    /// Lifecycle state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    pub health: HealthReporter,
    pub config: Arc<NetworkConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
