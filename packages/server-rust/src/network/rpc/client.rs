//! Minimal client for the binary RPC transport.

use std::io;

use addsvc_core::messages::{
    from_payload, to_payload, DescribeServiceRequest, HealthCheckRequest, HealthCheckResponse, ListServicesResponse,
    RpcRequest, RpcResponse, RpcStatus, ServiceDescriptor, ServingStatus, HEALTH_CHECK_METHOD,
    REFLECTION_DESCRIBE_METHOD, REFLECTION_LIST_METHOD,
};
use addsvc_core::{OperationName, Value};
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;

use super::codec::{ClientCodec, Decoded};
use crate::network::config::DEFAULT_MAX_FRAME_LENGTH;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("connection closed by server")]
    Closed,
    #[error("undecodable response: {0}")]
    Malformed(String),
    #[error("{status:?}: {message}")]
    Status { status: RpcStatus, message: String },
    #[error("unexpected response payload: {0}")]
    UnexpectedPayload(String),
    #[error("response id {got} does not match request id {expected}")]
    IdMismatch { expected: u64, got: u64 },
}

/// One connection to an RPC server. Calls are sequential.
pub struct RpcClient {
    framed: Framed<TcpStream, ClientCodec>,
    next_id: u64,
}

impl RpcClient {
    /// # Errors
    ///
    /// Returns `RpcError::Io` if the connection cannot be established.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, RpcError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self {
            framed: Framed::new(stream, ClientCodec::new(DEFAULT_MAX_FRAME_LENGTH)),
            next_id: 1,
        })
    }

    /// Sends one request and returns the raw response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `RpcError` on I/O failure, closed connection, an undecodable
    /// response, or a response id that does not match the request.
    pub async fn call(&mut self, method: &str, payload: rmpv::Value) -> Result<RpcResponse, RpcError> {
        let id = self.next_id;
        self.next_id += 1;
        self.framed.send(RpcRequest::new(id, method, payload)).await?;
        let resp = self.recv().await?;
        if resp.id != id {
            return Err(RpcError::IdMismatch {
                expected: id,
                got: resp.id,
            });
        }
        Ok(resp)
    }

    /// Writes `body` as one frame without encoding it, then reads the reply.
    ///
    /// # Errors
    ///
    /// Returns `RpcError` on I/O failure, closed connection, or an
    /// undecodable response.
    pub async fn call_raw(&mut self, body: &[u8]) -> Result<RpcResponse, RpcError> {
        let len = u32::try_from(body.len())
            .map_err(|_| RpcError::Io(io::Error::new(io::ErrorKind::InvalidInput, "frame too large")))?;
        let stream = self.framed.get_mut();
        stream.write_all(&len.to_be_bytes()).await?;
        stream.write_all(body).await?;
        stream.flush().await?;
        self.recv().await
    }

    async fn recv(&mut self) -> Result<RpcResponse, RpcError> {
        match self.framed.next().await {
            Some(Ok(Decoded::Frame(resp))) => Ok(resp),
            Some(Ok(Decoded::Malformed(reason))) => Err(RpcError::Malformed(reason)),
            Some(Err(e)) => Err(e.into()),
            None => Err(RpcError::Closed),
        }
    }

    async fn call_ok<Req: Serialize, Resp: DeserializeOwned>(
        &mut self,
        method: &str,
        request: &Req,
    ) -> Result<Resp, RpcError> {
        let payload = to_payload(request).map_err(|e| RpcError::UnexpectedPayload(e.to_string()))?;
        let resp = self.call(method, payload).await?;
        if !resp.status.is_ok() {
            return Err(RpcError::Status {
                status: resp.status,
                message: resp.message.unwrap_or_default(),
            });
        }
        let payload = resp.payload.unwrap_or(rmpv::Value::Nil);
        from_payload(payload).map_err(|e| RpcError::UnexpectedPayload(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns `RpcError::Status` when the server rejects the call.
    pub async fn sum(&mut self, a: i64, b: i64) -> Result<i64, RpcError> {
        match self.operation(OperationName::Sum, a.into(), b.into()).await? {
            Value::Int(res) => Ok(res),
            other => Err(RpcError::UnexpectedPayload(other.to_string())),
        }
    }

    /// # Errors
    ///
    /// Returns `RpcError::Status` when the server rejects the call.
    pub async fn concat(&mut self, a: &str, b: &str) -> Result<String, RpcError> {
        match self.operation(OperationName::Concat, a.into(), b.into()).await? {
            Value::Str(res) => Ok(res),
            other => Err(RpcError::UnexpectedPayload(other.to_string())),
        }
    }

    async fn operation(&mut self, op: OperationName, a: Value, b: Value) -> Result<Value, RpcError> {
        #[derive(Serialize)]
        struct Operands {
            a: Value,
            b: Value,
        }
        #[derive(serde::Deserialize)]
        struct Res {
            res: Value,
        }
        let res: Res = self.call_ok(op.rpc_method(), &Operands { a, b }).await?;
        Ok(res.res)
    }

    /// # Errors
    ///
    /// Returns `RpcError` if the call fails.
    pub async fn health(&mut self, service: &str) -> Result<ServingStatus, RpcError> {
        let resp: HealthCheckResponse = self
            .call_ok(
                HEALTH_CHECK_METHOD,
                &HealthCheckRequest {
                    service: service.to_string(),
                },
            )
            .await?;
        Ok(resp.status)
    }

    /// # Errors
    ///
    /// Returns `RpcError` if the call fails.
    pub async fn list_services(&mut self) -> Result<Vec<String>, RpcError> {
        let resp: ListServicesResponse = self.call_ok(REFLECTION_LIST_METHOD, &()).await?;
        Ok(resp.services)
    }

    /// # Errors
    ///
    /// Returns `RpcError::Status` with `NotFound` for services that are not described.
    pub async fn describe(&mut self, service: &str) -> Result<ServiceDescriptor, RpcError> {
        self.call_ok(
            REFLECTION_DESCRIBE_METHOD,
            &DescribeServiceRequest {
                service: service.to_string(),
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::bus::MemoryPublisher;
    use crate::network::{HealthReporter, NetworkConfig, RpcModule, ShutdownController};
    use crate::service::{domain, EndpointSet};

    async fn server() -> (Arc<MemoryPublisher>, SocketAddr, CancellationToken) {
        let publisher = Arc::new(MemoryPublisher::new());
        let shutdown = Arc::new(ShutdownController::new());
        shutdown.set_running();
        let mut module = RpcModule::new(
            Arc::new(NetworkConfig::ephemeral()),
            EndpointSet::new(domain::new(publisher.clone())),
            Arc::clone(&shutdown),
            HealthReporter::new("add", shutdown),
        );
        let addr = module.start().await.unwrap();
        let token = CancellationToken::new();
        tokio::spawn(module.serve(token.clone()));
        (publisher, addr, token)
    }

    #[tokio::test]
    async fn sum_and_concat_over_tcp() {
        let (publisher, addr, token) = server().await;
        let mut client = RpcClient::connect(addr).await.unwrap();

        assert_eq!(client.sum(2, 3).await.unwrap(), 5);
        assert_eq!(client.concat("foo", "bar").await.unwrap(), "foobar");
        assert_eq!(publisher.payloads(), vec!["5", "foobar"]);
        token.cancel();
    }

    #[tokio::test]
    async fn overflowing_sum_wraps() {
        let (publisher, addr, token) = server().await;
        let mut client = RpcClient::connect(addr).await.unwrap();

        assert_eq!(client.sum(i64::MAX, 1).await.unwrap(), i64::MIN);
        assert_eq!(publisher.attempts(), 1);
        token.cancel();
    }

    #[tokio::test]
    async fn malformed_frame_keeps_connection_open() {
        let (_, addr, token) = server().await;
        let mut client = RpcClient::connect(addr).await.unwrap();

        let resp = client.call_raw(&[0xc1, 0xc1]).await.unwrap();
        assert_eq!(resp.id, 0);
        assert_eq!(resp.status, RpcStatus::InvalidArgument);

        assert_eq!(client.sum(1, 1).await.unwrap(), 2);
        token.cancel();
    }

    #[tokio::test]
    async fn health_and_reflection() {
        let (_, addr, token) = server().await;
        let mut client = RpcClient::connect(addr).await.unwrap();

        assert_eq!(client.health("").await.unwrap(), ServingStatus::Serving);
        assert!(client
            .list_services()
            .await
            .unwrap()
            .contains(&"add.Add".to_string()));
        let desc = client.describe("add.Add").await.unwrap();
        assert_eq!(desc.methods.len(), 2);
        token.cancel();
    }

    #[tokio::test]
    async fn cancelled_server_closes_idle_connections() {
        let (_, addr, token) = server().await;
        let mut client = RpcClient::connect(addr).await.unwrap();
        assert_eq!(client.sum(1, 2).await.unwrap(), 3);

        token.cancel();
        let err = tokio::time::timeout(std::time::Duration::from_secs(5), client.sum(1, 2))
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, RpcError::Closed | RpcError::Io(_)));
    }
}
