//! addsvc binary: configure, connect to the bus, serve until Ctrl-C.

use std::process::ExitCode;
use std::sync::Arc;

use addsvc_server::bus::{NatsOptions, NatsPublisher};
use addsvc_server::{telemetry, ServiceConfig, Supervisor, GIT_COMMIT, VERSION};
use anyhow::Context;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal: {e:#}");
            eprintln!("addsvc: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("loading configuration")?;
    if let Err(e) = telemetry::init(&config.log_level) {
        eprintln!("addsvc: logging disabled: {e}");
    }

    info!(
        service = %config.service_name,
        version = VERSION,
        commit = GIT_COMMIT,
        "starting"
    );

    let options = NatsOptions {
        name: config.service_name.clone(),
        ..NatsOptions::default()
    };
    let publisher = NatsPublisher::connect_with(&config.nats_url, options)
        .await
        .with_context(|| format!("connecting to nats at {}", config.nats_url))?;

    let supervisor = Supervisor::start(&config, Arc::new(publisher))
        .await
        .context("starting listeners")?;

    supervisor.run(shutdown_signal()).await;
    Ok(())
}

/// Completes on Ctrl-C, or on SIGTERM where available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!(signal = "SIGINT", "received"),
        () = terminate => info!(signal = "SIGTERM", "received"),
    }
}
