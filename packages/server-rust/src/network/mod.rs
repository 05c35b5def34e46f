//! Transport adapters (HTTP/JSON and binary RPC), health reporting, and
//! shutdown control.

pub mod config;
pub mod handlers;
pub mod health;
pub mod http;
pub mod middleware;
pub mod rpc;
pub mod shutdown;

pub use config::*;
pub use handlers::AppState;
pub use health::HealthReporter;
pub use self::http::HttpModule;
pub use rpc::{RpcClient, RpcDispatcher, RpcError, RpcModule};
pub use shutdown::*;
