//! Endpoint layer: one transport-agnostic `tower::Service` per operation.
//!
//! Endpoints validate operands against the operation signature, unpack them
//! into the typed arguments of the business call, and wrap the result back
//! into a [`Value`]. The set is built once at startup and shared read-only.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use addsvc_core::{
    OperationName, OperationRequest, OperationSignature, SignatureMismatch, UnknownOperation,
    Value, CONCAT_SIGNATURE, SUM_SIGNATURE,
};
use tower::{Service, ServiceExt};

use super::domain::AddService;
use super::middleware::build_endpoint_pipeline;
use super::operation::{CallContext, EndpointError, Invocation};

type BoxedFuture = Pin<Box<dyn Future<Output = Result<Value, EndpointError>> + Send>>;

type Handler = dyn Fn(CallContext, OperationRequest) -> BoxedFuture + Send + Sync;

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// A single operation bound to a uniform `(context, request) -> result` shape.
///
/// Cloning is cheap: the handler is reference counted.
#[derive(Clone)]
pub struct Endpoint {
    signature: &'static OperationSignature,
    handler: Arc<Handler>,
}

impl Endpoint {
    /// Creates an endpoint from a signature and a handler. The handler only
    /// ever sees requests that already passed signature validation.
    pub fn new<F, Fut>(signature: &'static OperationSignature, handler: F) -> Self
    where
        F: Fn(CallContext, OperationRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, EndpointError>> + Send + 'static,
    {
        let handler: Arc<Handler> = Arc::new(move |ctx: CallContext, req: OperationRequest| {
            Box::pin(handler(ctx, req)) as BoxedFuture
        });
        Self { signature, handler }
    }

    #[must_use]
    pub fn signature(&self) -> &'static OperationSignature {
        self.signature
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("operation", &self.signature.operation)
            .finish_non_exhaustive()
    }
}

impl Service<Invocation> for Endpoint {
    type Response = Value;
    type Error = EndpointError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, inv: Invocation) -> Self::Future {
        if let Err(mismatch) = self.signature.check(&inv.request) {
            return Box::pin(async move { Err(EndpointError::Malformed(mismatch)) });
        }
        (self.handler)(inv.ctx, inv.request)
    }
}

fn int_operand(req: &OperationRequest, name: &'static str) -> Result<i64, EndpointError> {
    req.param(name)
        .and_then(Value::as_int)
        .ok_or(EndpointError::Malformed(SignatureMismatch::Missing(name)))
}

fn str_operand(req: &OperationRequest, name: &'static str) -> Result<String, EndpointError> {
    req.param(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(EndpointError::Malformed(SignatureMismatch::Missing(name)))
}

/// Endpoint for `Sum(a: int, b: int) -> int`.
#[must_use]
pub fn make_sum_endpoint(svc: Arc<dyn AddService>) -> Endpoint {
    Endpoint::new(&SUM_SIGNATURE, move |ctx, req| {
        let svc = Arc::clone(&svc);
        async move {
            let a = int_operand(&req, "a")?;
            let b = int_operand(&req, "b")?;
            let res = svc.sum(&ctx, a, b).await?;
            Ok(Value::Int(res))
        }
    })
}

/// Endpoint for `Concat(a: string, b: string) -> string`.
#[must_use]
pub fn make_concat_endpoint(svc: Arc<dyn AddService>) -> Endpoint {
    Endpoint::new(&CONCAT_SIGNATURE, move |ctx, req| {
        let svc = Arc::clone(&svc);
        async move {
            let a = str_operand(&req, "a")?;
            let b = str_operand(&req, "b")?;
            let res = svc.concat(&ctx, &a, &b).await?;
            Ok(Value::Str(res))
        }
    })
}

// ---------------------------------------------------------------------------
// EndpointSet
// ---------------------------------------------------------------------------

/// Immutable table of every declared operation's endpoint.
#[derive(Debug, Clone)]
pub struct EndpointSet {
    endpoints: Arc<BTreeMap<OperationName, Endpoint>>,
}

impl EndpointSet {
    /// Builds one endpoint per declared operation.
    #[must_use]
    pub fn new(svc: Arc<dyn AddService>) -> Self {
        let mut endpoints = BTreeMap::new();
        endpoints.insert(OperationName::Sum, make_sum_endpoint(Arc::clone(&svc)));
        endpoints.insert(OperationName::Concat, make_concat_endpoint(svc));
        Self {
            endpoints: Arc::new(endpoints),
        }
    }

    #[must_use]
    pub fn get(&self, operation: OperationName) -> Option<&Endpoint> {
        self.endpoints.get(&operation)
    }

    /// Signatures of all registered endpoints, in declaration order.
    pub fn signatures(&self) -> impl Iterator<Item = &'static OperationSignature> + '_ {
        self.endpoints.values().map(Endpoint::signature)
    }

    /// Runs a request through its endpoint pipeline.
    ///
    /// # Errors
    ///
    /// Returns `EndpointError` when the request is malformed, the operation
    /// is not registered, the deadline passes, or the business call fails.
    pub async fn invoke(
        &self,
        ctx: CallContext,
        request: OperationRequest,
    ) -> Result<Value, EndpointError> {
        let operation = request.operation();
        let endpoint = self
            .get(operation)
            .cloned()
            .ok_or_else(|| UnknownOperation(operation.to_string()))?;
        build_endpoint_pipeline(endpoint)
            .oneshot(Invocation::new(ctx, request))
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
