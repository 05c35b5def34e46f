//! Process supervisor: builds the service stack, runs both transport
//! adapters, and drives the shutdown sequence.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info};

use crate::network::{HealthReporter, HttpModule, NetworkConfig, RpcModule, ShutdownController};
use crate::service::{domain, EndpointSet, ServiceConfig};
use crate::traits::Publisher;

/// Fatal startup failures.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to bind rpc listener on {host}:{port}: {source}")]
    RpcBind {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
}

/// Owns both adapters from bind until every one of them has returned.
pub struct Supervisor {
    shutdown: Arc<ShutdownController>,
    http: Option<HttpModule>,
    http_addr: Option<SocketAddr>,
    rpc: RpcModule,
    rpc_addr: SocketAddr,
}

impl Supervisor {
    /// Builds the business core, middleware and endpoints, then binds the
    /// listeners.
    ///
    /// The RPC listener is required. The HTTP listener is optional: when no
    /// port is configured, or binding fails, the failure is logged and the
    /// server runs with RPC only.
    ///
    /// # Errors
    ///
    /// Returns `StartupError::RpcBind` if the RPC listener cannot be bound.
    pub async fn start(
        config: &ServiceConfig,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self, StartupError> {
        let network = Arc::new(config.network.clone());
        let shutdown = Arc::new(ShutdownController::new());
        let health = HealthReporter::new(&config.service_name, Arc::clone(&shutdown));
        let endpoints = EndpointSet::new(domain::new(publisher));

        let mut rpc = RpcModule::new(
            Arc::clone(&network),
            endpoints.clone(),
            Arc::clone(&shutdown),
            health.clone(),
        );
        let rpc_addr = rpc.start().await.map_err(|source| StartupError::RpcBind {
            host: network.host.clone(),
            port: network.rpc_port,
            source,
        })?;

        let (http, http_addr) = start_http(&network, endpoints, &shutdown, health).await;

        Ok(Self {
            shutdown,
            http,
            http_addr,
            rpc,
            rpc_addr,
        })
    }

    #[must_use]
    pub fn rpc_addr(&self) -> SocketAddr {
        self.rpc_addr
    }

    /// Bound HTTP address, or `None` if the HTTP adapter is not serving.
    #[must_use]
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http_addr
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Serves until `signal` completes, then drains both adapters
    /// concurrently and returns once both have stopped.
    pub async fn run(self, signal: impl Future<Output = ()>) {
        let token = self.shutdown.cancellation_token();

        let rpc_task = tokio::spawn(self.rpc.serve(token.clone()));
        let http_task = self.http.map(|http| tokio::spawn(http.serve(token.clone())));

        self.shutdown.set_running();
        info!(
            rpc = %self.rpc_addr,
            http = ?self.http_addr,
            "service running"
        );

        signal.await;
        if self.shutdown.trigger_shutdown() {
            info!("shutdown signal received, draining");
        }

        let http_join = async move {
            match http_task {
                Some(task) => task.await,
                None => Ok(()),
            }
        };
        let (rpc_res, http_res) = tokio::join!(rpc_task, http_join);
        if let Err(e) = rpc_res {
            error!(protocol = "RPC", error = %e, "adapter task failed");
        }
        if let Err(e) = http_res {
            error!(protocol = "HTTP", error = %e, "adapter task failed");
        }

        self.shutdown.mark_stopped();
        info!("service stopped");
    }
}

async fn start_http(
    network: &Arc<NetworkConfig>,
    endpoints: EndpointSet,
    shutdown: &Arc<ShutdownController>,
    health: HealthReporter,
) -> (Option<HttpModule>, Option<SocketAddr>) {
    let Some(port) = network.http_port else {
        info!(protocol = "HTTP", "no port configured, http adapter disabled");
        return (None, None);
    };
    let mut http = HttpModule::new(Arc::clone(network), endpoints, Arc::clone(shutdown), health);
    match http.start(port).await {
        Ok(addr) => (Some(http), Some(addr)),
        Err(e) => {
            error!(protocol = "HTTP", host = %network.host, port, error = %e, "bind failed, http adapter disabled");
            (None, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::bus::MemoryPublisher;
    use crate::network::LifecycleState;

    fn config() -> ServiceConfig {
        ServiceConfig {
            network: NetworkConfig::ephemeral(),
            ..ServiceConfig::default()
        }
    }

    #[tokio::test]
    async fn start_binds_both_listeners() {
        let supervisor = Supervisor::start(&config(), Arc::new(MemoryPublisher::new()))
            .await
            .unwrap();
        assert!(supervisor.rpc_addr().port() > 0);
        assert!(supervisor.http_addr().is_some());
        assert_eq!(supervisor.shutdown_controller().state(), LifecycleState::Starting);
    }

    #[tokio::test]
    async fn http_disabled_without_port() {
        let mut config = config();
        config.network.http_port = None;
        let supervisor = Supervisor::start(&config, Arc::new(MemoryPublisher::new()))
            .await
            .unwrap();
        assert!(supervisor.http_addr().is_none());
    }

    #[tokio::test]
    async fn rpc_bind_conflict_is_fatal() {
        let first = Supervisor::start(&config(), Arc::new(MemoryPublisher::new()))
            .await
            .unwrap();
        let mut config = config();
        config.network.rpc_port = first.rpc_addr().port();

        let err = Supervisor::start(&config, Arc::new(MemoryPublisher::new()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StartupError::RpcBind { .. }));
    }

    #[tokio::test]
    async fn run_reaches_stopped_after_signal() {
        let supervisor = Supervisor::start(&config(), Arc::new(MemoryPublisher::new()))
            .await
            .unwrap();
        let shutdown = supervisor.shutdown_controller();

        tokio::time::timeout(Duration::from_secs(10), supervisor.run(async {}))
            .await
            .unwrap();
        assert_eq!(shutdown.state(), LifecycleState::Stopped);
    }
}
