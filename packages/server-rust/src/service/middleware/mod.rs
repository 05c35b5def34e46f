//! Middleware around the business core and its endpoints.
//!
//! - [`logging`]: `AddService` decorator logging every call
//! - [`pipeline`]: tower stack applying the per-invocation deadline to endpoints

pub mod logging;
pub mod pipeline;

pub use logging::LoggingMiddleware;
pub use pipeline::{build_endpoint_pipeline, Deadline};
