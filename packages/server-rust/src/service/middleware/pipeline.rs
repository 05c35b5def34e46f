//! Endpoint pipeline: the tower stack every invocation runs through.
//!
//! Signature validation happens inside the endpoint itself, so malformed
//! requests are rejected before the business core runs. The pipeline adds
//! the per-invocation deadline on top.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use addsvc_core::Value;
use tower::layer::layer_fn;
use tower::{Service, ServiceBuilder};

use crate::service::endpoint::Endpoint;
use crate::service::operation::{EndpointError, Invocation};

/// Wraps an endpoint so each call is bounded by its own `ctx.timeout`.
#[must_use]
pub fn build_endpoint_pipeline(endpoint: Endpoint) -> Deadline<Endpoint> {
    ServiceBuilder::new()
        .layer(layer_fn(|inner| Deadline { inner }))
        .service(endpoint)
}

/// Fails an invocation with `EndpointError::Timeout` once the deadline
/// carried in its context passes. The inner future is dropped at that point.
#[derive(Debug, Clone)]
pub struct Deadline<S> {
    inner: S,
}

impl<S> Service<Invocation> for Deadline<S>
where
    S: Service<Invocation, Response = Value, Error = EndpointError>,
    S::Future: Send + 'static,
{
    type Response = Value;
    type Error = EndpointError;
    type Future = Pin<Box<dyn Future<Output = Result<Value, EndpointError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, inv: Invocation) -> Self::Future {
        let limit = inv.ctx.timeout;
        let fut = self.inner.call(inv);
        Box::pin(async move {
            tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
                Err(EndpointError::Timeout {
                    timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                })
            })
        })
    }
}
