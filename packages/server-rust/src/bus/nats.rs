//! Publisher backed by the `async-nats` client.
//!
//! The client owns its connection task and reconnects on its own after the
//! server goes away; publishes made while disconnected are buffered and
//! flushed once the connection is re-established.

use std::time::Duration;

use async_nats::client::PublishErrorKind;
use async_nats::connection::State;
use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use crate::traits::{PublishError, Publisher};

/// URL used when none is configured.
pub const DEFAULT_NATS_URL: &str = "nats://127.0.0.1:4222";

/// Tuning knobs for [`NatsPublisher`].
#[derive(Debug, Clone)]
pub struct NatsOptions {
    /// Client name reported in `CONNECT`.
    pub name: String,
    /// Bound on TCP connect plus handshake.
    pub connect_timeout: Duration,
    /// Reconnect attempts after a lost connection; `None` retries forever.
    pub max_reconnects: Option<usize>,
    /// Maximum time a publish waits for room in the client's send buffer.
    pub send_timeout: Duration,
}

impl Default for NatsOptions {
    fn default() -> Self {
        Self {
            name: "addsvc".to_string(),
            connect_timeout: Duration::from_secs(5),
            max_reconnects: Some(60),
            send_timeout: Duration::from_secs(2),
        }
    }
}

/// Connection-backed publisher.
#[derive(Debug, Clone)]
pub struct NatsPublisher {
    client: Client,
    send_timeout: Duration,
}

impl NatsPublisher {
    /// Connects with default options.
    ///
    /// # Errors
    ///
    /// Returns `PublishError::Connect` if the URL is invalid or the server
    /// cannot be reached. The initial connection is not retried.
    pub async fn connect(url: &str) -> Result<Self, PublishError> {
        Self::connect_with(url, NatsOptions::default()).await
    }

    /// Connects with explicit options.
    ///
    /// # Errors
    ///
    /// See [`NatsPublisher::connect`].
    pub async fn connect_with(url: &str, options: NatsOptions) -> Result<Self, PublishError> {
        let client = ConnectOptions::new()
            .name(options.name)
            .connection_timeout(options.connect_timeout)
            .max_reconnects(options.max_reconnects)
            .event_callback(|event| async move {
                info!(%event, "NATS connection event");
            })
            .connect(url)
            .await
            .map_err(|e| PublishError::Connect {
                url: url.to_string(),
                source: Box::new(e),
            })?;

        info!(url, "connected to NATS");
        Ok(Self {
            client,
            send_timeout: options.send_timeout,
        })
    }

    /// Returns `true` while the client holds a live server connection.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self.client.connection_state(), State::Connected)
    }
}

#[async_trait]
impl Publisher for NatsPublisher {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), PublishError> {
        validate_subject(subject)?;
        let send = self.client.publish(subject.to_string(), payload);
        match tokio::time::timeout(self.send_timeout, send).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => match e.kind() {
                PublishErrorKind::MaxPayloadExceeded => Err(PublishError::Rejected(e.to_string())),
                _ => Err(PublishError::Disconnected),
            },
            Err(_) => Err(PublishError::Timeout),
        }
    }
}

fn validate_subject(subject: &str) -> Result<(), PublishError> {
    if subject.is_empty() || subject.chars().any(char::is_whitespace) {
        return Err(PublishError::InvalidSubject(subject.to_string()));
    }
    Ok(())
}
