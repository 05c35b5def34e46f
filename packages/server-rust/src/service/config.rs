//! Service configuration, resolved once from the environment at startup.

use std::time::Duration;

use crate::bus::DEFAULT_NATS_URL;
use crate::network::NetworkConfig;

pub const ENV_SERVICE_NAME: &str = "QS_ADD_SERVICE_NAME";
pub const ENV_LOG_LEVEL: &str = "QS_ADD_LOG_LEVEL";
pub const ENV_SERVICE_HOST: &str = "QS_ADD_SERVICE_HOST";
pub const ENV_HTTP_PORT: &str = "PORT";
pub const ENV_RPC_PORT: &str = "QS_ADD_GRPC_PORT";
pub const ENV_NATS_URL: &str = "QS_NATS_URL";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "QS_ADD_REQUEST_TIMEOUT_MS";

/// Value of `PORT` that turns the HTTP adapter off.
pub const HTTP_DISABLED: &str = "off";

/// Immutable service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Name reported in logs and answered by named health checks.
    pub service_name: String,
    /// Default `tracing` filter directive (overridden by `RUST_LOG`).
    pub log_level: String,
    /// Bus connection URL.
    pub nats_url: String,
    /// Listener settings.
    pub network: NetworkConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "add".to_string(),
            log_level: "error".to_string(),
            nats_url: DEFAULT_NATS_URL.to_string(),
            network: NetworkConfig::default(),
        }
    }
}

/// An environment variable held a value that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid value `{value}` for {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

impl ServiceConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a numeric variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`. Unset and empty values fall
    /// back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a numeric variable cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let http_port = match get(ENV_HTTP_PORT) {
            Some(v) if v.eq_ignore_ascii_case(HTTP_DISABLED) => None,
            Some(v) => Some(parse_port(ENV_HTTP_PORT, &v)?),
            None => defaults.network.http_port,
        };
        let rpc_port = match get(ENV_RPC_PORT) {
            Some(v) => parse_port(ENV_RPC_PORT, &v)?,
            None => defaults.network.rpc_port,
        };
        let request_timeout = match get(ENV_REQUEST_TIMEOUT_MS) {
            Some(v) => Duration::from_millis(v.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError {
                    key: ENV_REQUEST_TIMEOUT_MS,
                    value: v.clone(),
                    reason: e.to_string(),
                }
            })?),
            None => defaults.network.request_timeout,
        };

        Ok(Self {
            service_name: get(ENV_SERVICE_NAME).unwrap_or(defaults.service_name),
            log_level: get(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            nats_url: get(ENV_NATS_URL).unwrap_or(defaults.nats_url),
            network: NetworkConfig {
                host: get(ENV_SERVICE_HOST).unwrap_or(defaults.network.host),
                http_port,
                rpc_port,
                request_timeout,
                ..defaults.network
            },
        })
    }
}

fn parse_port(key: &'static str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.service_name, "add");
        assert_eq!(config.log_level, "error");
        assert_eq!(config.nats_url, "nats://127.0.0.1:4222");
        assert_eq!(config.network.http_port, Some(8180));
        assert_eq!(config.network.rpc_port, 8181);
        assert_eq!(config.network.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[
            (ENV_SERVICE_NAME, "adder"),
            (ENV_LOG_LEVEL, "debug"),
            (ENV_SERVICE_HOST, "127.0.0.1"),
            (ENV_HTTP_PORT, "9000"),
            (ENV_RPC_PORT, "9001"),
            (ENV_NATS_URL, "nats://bus:4222"),
            (ENV_REQUEST_TIMEOUT_MS, "250"),
        ]))
        .unwrap();
        assert_eq!(config.service_name, "adder");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.network.host, "127.0.0.1");
        assert_eq!(config.network.http_port, Some(9000));
        assert_eq!(config.network.rpc_port, 9001);
        assert_eq!(config.nats_url, "nats://bus:4222");
        assert_eq!(config.network.request_timeout, Duration::from_millis(250));
    }

    #[test]
    fn empty_values_fall_back() {
        let config =
            ServiceConfig::from_lookup(lookup(&[(ENV_SERVICE_NAME, ""), (ENV_HTTP_PORT, "  ")]))
                .unwrap();
        assert_eq!(config.service_name, "add");
        assert_eq!(config.network.http_port, Some(8180));
    }

    #[test]
    fn http_can_be_disabled() {
        let config = ServiceConfig::from_lookup(lookup(&[(ENV_HTTP_PORT, "off")])).unwrap();
        assert_eq!(config.network.http_port, None);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = ServiceConfig::from_lookup(lookup(&[(ENV_RPC_PORT, "eighty")])).unwrap_err();
        assert_eq!(err.key, ENV_RPC_PORT);
        assert_eq!(err.value, "eighty");
    }
}
