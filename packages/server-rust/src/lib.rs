//! addsvc server: the `Sum`/`Concat` business core, its endpoint layer,
//! HTTP/JSON and binary RPC transports, a NATS result publisher, and the
//! supervisor that runs and drains them.

pub mod bus;
pub mod lifecycle;
pub mod network;
pub mod service;
pub mod telemetry;
pub mod traits;

pub use lifecycle::{StartupError, Supervisor};
pub use service::ServiceConfig;
pub use traits::{PublishError, Publisher};

/// Crate version, logged at startup.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Source revision, injected at build time through `ADDSVC_GIT_COMMIT`.
pub const GIT_COMMIT: &str = match option_env!("ADDSVC_GIT_COMMIT") {
    Some(commit) => commit,
    None => "unknown",
};
