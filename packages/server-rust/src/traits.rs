use async_trait::async_trait;
use bytes::Bytes;

/// Errors raised by a bus publisher.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to connect to bus at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("invalid subject `{0}`")]
    InvalidSubject(String),
    #[error("bus connection is closed")]
    Disconnected,
    #[error("timed out handing message to the bus connection")]
    Timeout,
    #[error("bus rejected message: {0}")]
    Rejected(String),
}

/// Outbound half of a publish/subscribe bus.
///
/// Implementations: NATS (production), in-memory (tests). A publish is a
/// single fire-and-forget attempt; callers do not retry.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `payload` on `subject`.
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), PublishError>;
}
