//! RPC listener, per-connection loop, and method dispatch.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use addsvc_core::messages::{
    from_payload, to_payload, DescribeServiceRequest, ErrorKind, HealthCheckRequest, HealthCheckResponse,
    ListServicesResponse, RpcRequest, RpcResponse, RpcStatus, ServiceDescriptor,
    HEALTH_CHECK_METHOD, REFLECTION_DESCRIBE_METHOD, REFLECTION_LIST_METHOD,
    REFLECTION_SERVICE_NAME,
};
use addsvc_core::{
    params_from_msgpack, OperationName, OperationRequest, UnknownOperation, SERVICE_NAME,
};
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::codec::{Decoded, ServerCodec};
use crate::network::config::NetworkConfig;
use crate::network::health::HealthReporter;
use crate::network::shutdown::ShutdownController;
use crate::service::{CallContext, EndpointError, EndpointSet, Transport};

const HEALTH_CHECK_SERVICE: &str = "grpc.health.v1.Health";

/// RPC status for each error classification.
#[must_use]
pub fn status_for(kind: ErrorKind) -> RpcStatus {
    match kind {
        ErrorKind::MalformedRequest => RpcStatus::InvalidArgument,
        ErrorKind::UnknownOperation => RpcStatus::Unimplemented,
        ErrorKind::BusinessLogic => RpcStatus::FailedPrecondition,
        ErrorKind::Publish => RpcStatus::Internal,
        ErrorKind::Timeout => RpcStatus::DeadlineExceeded,
        ErrorKind::Unavailable => RpcStatus::Unavailable,
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Maps RPC method names onto endpoints, health, and reflection.
#[derive(Clone)]
pub struct RpcDispatcher {
    endpoints: EndpointSet,
    health: HealthReporter,
    shutdown: Arc<ShutdownController>,
    request_timeout: Duration,
}

impl RpcDispatcher {
    #[must_use]
    pub fn new(
        endpoints: EndpointSet,
        health: HealthReporter,
        shutdown: Arc<ShutdownController>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            endpoints,
            health,
            shutdown,
            request_timeout,
        }
    }

    /// Produces the response for one request. Never fails: every error is
    /// carried in the response status.
    pub async fn dispatch(&self, req: RpcRequest) -> RpcResponse {
        let RpcRequest { id, method, payload } = req;
        let payload = payload.unwrap_or(rmpv::Value::Nil);

        if let Some(operation) = OperationName::from_rpc_method(&method) {
            return self.call_operation(id, operation, &payload).await;
        }
        match method.as_str() {
            HEALTH_CHECK_METHOD => self.health_check(id, payload),
            REFLECTION_LIST_METHOD => encode_response(
                id,
                &ListServicesResponse {
                    services: vec![
                        SERVICE_NAME.to_string(),
                        HEALTH_CHECK_SERVICE.to_string(),
                        REFLECTION_SERVICE_NAME.to_string(),
                    ],
                },
            ),
            REFLECTION_DESCRIBE_METHOD => describe_service(id, payload),
            _ => error_response(id, &EndpointError::from(UnknownOperation(method.clone()))),
        }
    }

    async fn call_operation(
        &self,
        id: u64,
        operation: OperationName,
        payload: &rmpv::Value,
    ) -> RpcResponse {
        if !self.shutdown.is_accepting() {
            return error_response(id, &EndpointError::Unavailable);
        }
        let _guard = self.shutdown.in_flight_guard();

        let params = match params_from_msgpack(payload) {
            Ok(params) => params,
            Err(e) => return error_response(id, &EndpointError::from(e)),
        };
        let ctx = CallContext::next(Transport::Rpc, self.request_timeout);
        match self
            .endpoints
            .invoke(ctx, OperationRequest::new(operation, params))
            .await
        {
            Ok(res) => RpcResponse::ok(
                id,
                rmpv::Value::Map(vec![(rmpv::Value::from("res"), res.to_msgpack())]),
            ),
            Err(e) => error_response(id, &e),
        }
    }

    fn health_check(&self, id: u64, payload: rmpv::Value) -> RpcResponse {
        let request: HealthCheckRequest = match decode_payload(id, payload) {
            Ok(request) => request,
            Err(resp) => return resp,
        };
        encode_response(
            id,
            &HealthCheckResponse {
                status: self.health.check(&request.service),
            },
        )
    }
}

fn describe_service(id: u64, payload: rmpv::Value) -> RpcResponse {
    let request: DescribeServiceRequest = match decode_payload(id, payload) {
        Ok(request) => request,
        Err(resp) => return resp,
    };
    if request.service != SERVICE_NAME {
        return RpcResponse::error(
            id,
            RpcStatus::NotFound,
            format!("service {} is not described", request.service),
        );
    }
    encode_response(id, &ServiceDescriptor::business())
}

fn decode_payload<T: DeserializeOwned + Default>(id: u64, payload: rmpv::Value) -> Result<T, RpcResponse> {
    if payload.is_nil() {
        return Ok(T::default());
    }
    from_payload(payload).map_err(|e| RpcResponse::error(id, RpcStatus::InvalidArgument, e.to_string()))
}

fn encode_response<T: Serialize>(id: u64, body: &T) -> RpcResponse {
    match to_payload(body) {
        Ok(payload) => RpcResponse::ok(id, payload),
        Err(e) => RpcResponse::error(id, RpcStatus::Internal, e.to_string()),
    }
}

fn error_response(id: u64, err: &EndpointError) -> RpcResponse {
    let kind = err.kind();
    debug!(id, error = %err, ?kind, "rpc request failed");
    RpcResponse::error(id, status_for(kind), err.to_string())
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// Manages the RPC listener lifecycle: `new()`, `start()`, `serve()`.
pub struct RpcModule {
    config: Arc<NetworkConfig>,
    listener: Option<TcpListener>,
    dispatcher: RpcDispatcher,
}

impl RpcModule {
    #[must_use]
    pub fn new(
        config: Arc<NetworkConfig>,
        endpoints: EndpointSet,
        shutdown: Arc<ShutdownController>,
        health: HealthReporter,
    ) -> Self {
        let dispatcher = RpcDispatcher::new(endpoints, health, shutdown, config.request_timeout);
        Self {
            config,
            listener: None,
            dispatcher,
        }
    }

    /// Binds the listener and returns the bound address.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the address cannot be bound.
    pub async fn start(&mut self) -> io::Result<SocketAddr> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.rpc_port)).await?;
        let addr = listener.local_addr()?;
        info!(protocol = "RPC", %addr, "listener bound");
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Accepts connections until `token` is cancelled, then waits up to the
    /// grace period for open connections to finish their current request
    /// before aborting them.
    pub async fn serve(self, token: CancellationToken) {
        let Some(listener) = self.listener else {
            warn!(protocol = "RPC", "serve called without a bound listener");
            return;
        };
        let max_frame_length = self.config.max_frame_length;
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(protocol = "RPC", %peer, "connection accepted");
                        connections.spawn(handle_connection(
                            stream,
                            peer,
                            self.dispatcher.clone(),
                            token.clone(),
                            max_frame_length,
                        ));
                    }
                    Err(e) => warn!(protocol = "RPC", error = %e, "accept failed"),
                },
                Some(res) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = res {
                        debug!(protocol = "RPC", error = %e, "connection task failed");
                    }
                }
            }
        }
        drop(listener);

        let grace = self.config.grace_period;
        info!(protocol = "RPC", grace_ms = grace.as_millis(), connections = connections.len(), "draining");
        let drained = tokio::time::timeout(grace, async {
            while let Some(res) = connections.join_next().await {
                if let Err(e) = res {
                    debug!(protocol = "RPC", error = %e, "connection task failed");
                }
            }
        })
        .await
        .is_ok();

        if drained {
            info!(protocol = "RPC", "stopped");
        } else {
            warn!(
                protocol = "RPC",
                remaining = connections.len(),
                "grace period expired, aborting remaining requests"
            );
            connections.shutdown().await;
        }
    }
}

/// Serves one connection: read a frame, dispatch it, write the response.
///
/// Stops reading once `token` is cancelled; a request already being
/// dispatched runs to completion and its response is still written.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: RpcDispatcher,
    token: CancellationToken,
    max_frame_length: usize,
) {
    let mut framed = Framed::new(stream, ServerCodec::new(max_frame_length));

    loop {
        let next = tokio::select! {
            biased;
            () = token.cancelled() => break,
            next = framed.next() => next,
        };
        let response = match next {
            None => break,
            Some(Err(e)) => {
                debug!(protocol = "RPC", %peer, error = %e, "framing error, closing connection");
                break;
            }
            Some(Ok(Decoded::Malformed(reason))) => RpcResponse::error(
                0,
                RpcStatus::InvalidArgument,
                format!("malformed request: {reason}"),
            ),
            Some(Ok(Decoded::Frame(req))) => dispatcher.dispatch(req).await,
        };
        if let Err(e) = framed.send(response).await {
            debug!(protocol = "RPC", %peer, error = %e, "write failed, closing connection");
            break;
        }
    }
    debug!(protocol = "RPC", %peer, "connection closed");
}

#[cfg(test)]
mod tests {
    use addsvc_core::messages::ServingStatus;
    use addsvc_core::Value;

    use super::*;
    use crate::bus::MemoryPublisher;
    use crate::service::domain;

    fn dispatcher() -> (Arc<MemoryPublisher>, Arc<ShutdownController>, RpcDispatcher) {
        let publisher = Arc::new(MemoryPublisher::new());
        let shutdown = Arc::new(ShutdownController::new());
        shutdown.set_running();
        let dispatcher = RpcDispatcher::new(
            EndpointSet::new(domain::new(publisher.clone())),
            HealthReporter::new("add", Arc::clone(&shutdown)),
            Arc::clone(&shutdown),
            Duration::from_secs(5),
        );
        (publisher, shutdown, dispatcher)
    }

    fn operands(a: impl Into<Value>, b: impl Into<Value>) -> rmpv::Value {
        rmpv::Value::Map(vec![
            (rmpv::Value::from("a"), a.into().to_msgpack()),
            (rmpv::Value::from("b"), b.into().to_msgpack()),
        ])
    }

    fn res_of(resp: &RpcResponse) -> Option<&rmpv::Value> {
        resp.payload
            .as_ref()?
            .as_map()?
            .iter()
            .find(|(k, _)| k.as_str() == Some("res"))
            .map(|(_, v)| v)
    }

    #[tokio::test]
    async fn sum_and_concat() {
        let (publisher, _, dispatcher) = dispatcher();

        let resp = dispatcher
            .dispatch(RpcRequest::new(1, "add.Add/Sum", operands(2, 3)))
            .await;
        assert_eq!(resp.id, 1);
        assert_eq!(resp.status, RpcStatus::Ok);
        assert_eq!(res_of(&resp), Some(&rmpv::Value::from(5)));

        let resp = dispatcher
            .dispatch(RpcRequest::new(2, "add.Add/Concat", operands("foo", "bar")))
            .await;
        assert_eq!(res_of(&resp), Some(&rmpv::Value::from("foobar")));
        assert_eq!(publisher.payloads(), vec!["5", "foobar"]);
    }

    #[tokio::test]
    async fn missing_operand_is_invalid_argument() {
        let (publisher, _, dispatcher) = dispatcher();
        let resp = dispatcher
            .dispatch(RpcRequest::new(4, "add.Add/Sum", rmpv::Value::Nil))
            .await;
        assert_eq!(resp.status, RpcStatus::InvalidArgument);
        assert!(resp.payload.is_none());
        assert_eq!(publisher.attempts(), 0);
    }

    #[tokio::test]
    async fn unknown_method_is_unimplemented() {
        let (_, _, dispatcher) = dispatcher();
        let resp = dispatcher
            .dispatch(RpcRequest::new(5, "add.Add/Multiply", rmpv::Value::Nil))
            .await;
        assert_eq!(resp.status, RpcStatus::Unimplemented);
        assert_eq!(resp.message.as_deref(), Some("unknown operation: add.Add/Multiply"));
    }

    #[tokio::test]
    async fn health_check_by_name() {
        let (_, shutdown, dispatcher) = dispatcher();
        let check = |service: &str| {
            RpcRequest::new(
                9,
                HEALTH_CHECK_METHOD,
                rmpv::Value::Map(vec![(rmpv::Value::from("service"), rmpv::Value::from(service))]),
            )
        };

        let resp = dispatcher.dispatch(check("")).await;
        let body: HealthCheckResponse = from_payload(resp.payload.unwrap()).unwrap();
        assert_eq!(body.status, ServingStatus::Serving);

        let resp = dispatcher.dispatch(check("nope")).await;
        let body: HealthCheckResponse = from_payload(resp.payload.unwrap()).unwrap();
        assert_eq!(body.status, ServingStatus::ServiceUnknown);

        shutdown.trigger_shutdown();
        let resp = dispatcher.dispatch(check("add")).await;
        let body: HealthCheckResponse = from_payload(resp.payload.unwrap()).unwrap();
        assert_eq!(body.status, ServingStatus::NotServing);
    }

    #[tokio::test]
    async fn operations_refused_while_draining() {
        let (publisher, shutdown, dispatcher) = dispatcher();
        shutdown.trigger_shutdown();
        let resp = dispatcher
            .dispatch(RpcRequest::new(3, "add.Add/Sum", operands(1, 1)))
            .await;
        assert_eq!(resp.status, RpcStatus::Unavailable);
        assert_eq!(publisher.attempts(), 0);
    }

    #[tokio::test]
    async fn reflection_lists_and_describes() {
        let (_, _, dispatcher) = dispatcher();
        let resp = dispatcher
            .dispatch(RpcRequest::new(1, REFLECTION_LIST_METHOD, rmpv::Value::Nil))
            .await;
        let list: ListServicesResponse = from_payload(resp.payload.unwrap()).unwrap();
        assert!(list.services.contains(&SERVICE_NAME.to_string()));

        let describe = |service: &str| {
            RpcRequest::new(
                2,
                REFLECTION_DESCRIBE_METHOD,
                rmpv::Value::Map(vec![(rmpv::Value::from("service"), rmpv::Value::from(service))]),
            )
        };
        let resp = dispatcher.dispatch(describe(SERVICE_NAME)).await;
        let desc: ServiceDescriptor = from_payload(resp.payload.unwrap()).unwrap();
        assert_eq!(desc, ServiceDescriptor::business());

        let resp = dispatcher.dispatch(describe("other.Service")).await;
        assert_eq!(resp.status, RpcStatus::NotFound);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(status_for(ErrorKind::BusinessLogic), RpcStatus::FailedPrecondition);
        assert_eq!(status_for(ErrorKind::Publish), RpcStatus::Internal);
        assert_eq!(status_for(ErrorKind::Timeout), RpcStatus::DeadlineExceeded);
    }
}
