//! Wire message schemas for both transports.
//!
//! The JSON bodies in [`http`] are produced with `serde_json`. Everything in
//! [`rpc`], [`health`] and [`reflection`] is `MsgPack` with named fields
//! (`rmp_serde::to_vec_named()`), framed by the server's length-delimited codec.

pub mod health;
pub mod http;
pub mod reflection;
pub mod rpc;

pub use health::{HealthCheckRequest, HealthCheckResponse, ServingStatus, HEALTH_CHECK_METHOD};
pub use http::{ErrorBody, ErrorKind, ResultBody};
pub use reflection::{
    DescribeServiceRequest, ListServicesResponse, MethodDescriptor, ParamDescriptor,
    ServiceDescriptor, REFLECTION_DESCRIBE_METHOD, REFLECTION_LIST_METHOD,
    REFLECTION_SERVICE_NAME,
};
pub use rpc::{from_payload, to_payload, PayloadError, RpcRequest, RpcResponse, RpcStatus};
