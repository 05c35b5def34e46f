//! HTTP/JSON adapter with deferred startup.
//!
//! `new()` assembles shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until the cancellation token fires, then
//! drains within the grace period.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    concat_handler, health_handler, index_handler, liveness_handler, readiness_handler,
    sum_handler, AppState,
};
use super::health::HealthReporter;
use super::middleware::{build_http_layers, draining_guard};
use super::shutdown::ShutdownController;
use crate::service::EndpointSet;

/// Manages the HTTP server lifecycle.
pub struct HttpModule {
    config: Arc<NetworkConfig>,
    listener: Option<TcpListener>,
    state: AppState,
}

impl HttpModule {
    #[must_use]
    pub fn new(
        config: Arc<NetworkConfig>,
        endpoints: EndpointSet,
        shutdown: Arc<ShutdownController>,
        health: HealthReporter,
    ) -> Self {
        let state = AppState {
            endpoints,
            shutdown,
            health,
            config: Arc::clone(&config),
            start_time: Instant::now(),
        };
        Self {
            config,
            listener: None,
            state,
        }
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `POST /sum`, `POST /concat` -- business operations (refused while draining)
    /// - `GET /health` -- detailed health JSON
    /// - `GET /health/live` -- liveness probe
    /// - `GET /health/ready` -- readiness probe
    /// - `GET /` -- banner
    pub fn build_router(&self) -> Router {
        let operations = Router::new()
            .route("/sum", post(sum_handler))
            .route("/concat", post(concat_handler))
            .route_layer(axum::middleware::from_fn_with_state(
                Arc::clone(&self.state.shutdown),
                draining_guard,
            ));

        Router::new()
            .route("/", get(index_handler))
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .merge(operations)
            .layer(build_http_layers(&self.config))
            .with_state(self.state.clone())
    }

    /// Binds the listener to `port` on the configured host and returns the
    /// bound address (the port differs when 0 is requested).
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the address cannot be bound.
    pub async fn start(&mut self, port: u16) -> io::Result<SocketAddr> {
        let listener = TcpListener::bind((self.config.host.as_str(), port)).await?;
        let addr = listener.local_addr()?;
        info!(protocol = "HTTP", %addr, "listener bound");
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Serves until `token` is cancelled, then lets in-flight requests
    /// finish for up to the grace period. Connections still open when the
    /// grace period expires are dropped together with their pending
    /// requests.
    ///
    /// Returns immediately if `start()` did not bind a listener.
    pub async fn serve(self, token: CancellationToken) {
        let router = self.build_router();
        let Some(listener) = self.listener else {
            warn!(protocol = "HTTP", "serve called without a bound listener");
            return;
        };
        let std_listener = match listener.into_std() {
            Ok(l) => l,
            Err(e) => {
                warn!(protocol = "HTTP", error = %e, "failed to hand over listener");
                return;
            }
        };
        let grace = self.config.grace_period;

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        let watcher = tokio::spawn(async move {
            token.cancelled().await;
            info!(protocol = "HTTP", grace_ms = grace.as_millis(), "draining");
            shutdown_handle.graceful_shutdown(Some(grace));
        });

        let result = axum_server::from_tcp(std_listener)
            .handle(handle)
            .serve(router.into_make_service())
            .await;
        watcher.abort();

        match result {
            Ok(()) => info!(protocol = "HTTP", "stopped"),
            Err(e) => debug!(protocol = "HTTP", error = %e, "server exited with error"),
        }
    }
}
