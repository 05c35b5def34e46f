//! Business core and the transport-agnostic endpoint layer.
//!
//! 1. **Domain** (`domain`): the `AddService` operations and their bus notifications
//! 2. **Middleware** (`middleware`): logging decorator and tower layers (timeout)
//! 3. **Endpoints** (`endpoint`): one `tower::Service` per operation, collected in an `EndpointSet`
//! 4. **Configuration** (`config`): environment-derived `ServiceConfig`

pub mod config;
pub mod domain;
pub mod endpoint;
pub mod middleware;
pub mod operation;

pub use config::{ConfigError, ServiceConfig};
pub use domain::{AddService, AddServiceImpl, NOTIFICATION_SUBJECT};
pub use endpoint::{make_concat_endpoint, make_sum_endpoint, Endpoint, EndpointSet};
pub use operation::{CallContext, EndpointError, ErrorClass, Invocation, ServiceError, Transport};
