//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` takes precedence when set; otherwise `log_level` is used as
/// the filter directive (e.g. `info`, `addsvc_server=debug`).
///
/// # Errors
///
/// Returns an error if the directive is invalid or a global subscriber is
/// already installed.
pub fn init(log_level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_directive_is_rejected() {
        assert!(EnvFilter::try_new("addsvc=loud").is_err());
    }

    #[test]
    fn second_init_fails_without_panicking() {
        let _ = init("error");
        assert!(init("error").is_err());
    }
}
