//! Network configuration types for both transport adapters.

use std::time::Duration;

/// How long in-flight requests may run after shutdown begins.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Largest RPC frame accepted or produced, in bytes.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 1024 * 1024;

/// Listener configuration shared by the HTTP and RPC adapters.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for both listeners.
    pub host: String,
    /// HTTP/JSON port. `None` disables the HTTP adapter; 0 means OS-assigned.
    pub http_port: Option<u16>,
    /// Binary RPC port. 0 means OS-assigned.
    pub rpc_port: u16,
    /// Deadline applied to every invocation.
    pub request_timeout: Duration,
    /// Drain window after the shutdown signal before listeners are forced closed.
    pub grace_period: Duration,
    /// Allowed CORS origins for the HTTP adapter.
    pub cors_origins: Vec<String>,
    /// Maximum RPC frame size in bytes.
    pub max_frame_length: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: Some(8180),
            rpc_port: 8181,
            request_timeout: Duration::from_secs(30),
            grace_period: DEFAULT_GRACE_PERIOD,
            cors_origins: vec!["*".to_string()],
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl NetworkConfig {
    /// Loopback configuration with OS-assigned ports, for tests.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            http_port: Some(0),
            rpc_port: 0,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_config_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.http_port, Some(8180));
        assert_eq!(config.rpc_port, 8181);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.grace_period, Duration::from_secs(5));
        assert_eq!(config.cors_origins, vec!["*"]);
    }

    #[test]
    fn ephemeral_uses_loopback_and_port_zero() {
        let config = NetworkConfig::ephemeral();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.http_port, Some(0));
        assert_eq!(config.rpc_port, 0);
        assert_eq!(config.grace_period, DEFAULT_GRACE_PERIOD);
    }
}
