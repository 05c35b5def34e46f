//! Invocation context and the error taxonomy shared by the endpoint layer
//! and both transports.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use addsvc_core::messages::ErrorKind;
use addsvc_core::{OperationRequest, SignatureMismatch, UnknownOperation, ValueError};

use crate::traits::PublishError;

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// Which front end an invocation arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http,
    Rpc,
    /// In-process callers (tests, tooling).
    Internal,
}

impl Transport {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Rpc => "rpc",
            Self::Internal => "internal",
        }
    }
}

/// Context carried with every invocation through the endpoint layer.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub call_id: u64,
    pub transport: Transport,
    /// Deadline for the whole invocation, measured from dispatch.
    pub timeout: Duration,
}

impl CallContext {
    #[must_use]
    pub fn new(call_id: u64, transport: Transport, timeout: Duration) -> Self {
        Self {
            call_id,
            transport,
            timeout,
        }
    }

    /// Builds a context with a process-unique call id.
    #[must_use]
    pub fn next(transport: Transport, timeout: Duration) -> Self {
        Self::new(NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed), transport, timeout)
    }
}

/// Uniform endpoint input: a context plus a transport-agnostic request.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub ctx: CallContext,
    pub request: OperationRequest,
}

impl Invocation {
    #[must_use]
    pub fn new(ctx: CallContext, request: OperationRequest) -> Self {
        Self { ctx, request }
    }
}

/// Errors returned by the business core.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("computed result could not be recorded: {0}")]
    Publish(#[from] PublishError),
}

/// Who is at fault for a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Client,
    Server,
}

/// Errors returned by endpoints and translated by each transport.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// Operands do not match the operation signature.
    #[error("malformed request: {0}")]
    Malformed(#[from] SignatureMismatch),
    /// The wire payload could not be turned into operands.
    #[error("malformed payload: {0}")]
    Payload(#[from] ValueError),
    /// The request body could not be decoded at all.
    #[error("undecodable request body: {0}")]
    Decode(String),
    #[error(transparent)]
    UnknownOperation(#[from] UnknownOperation),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("server is shutting down")]
    Unavailable,
}

impl EndpointError {
    /// Wire-level classification shared by both transports.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Malformed(_) | Self::Payload(_) | Self::Decode(_) => ErrorKind::MalformedRequest,
            Self::UnknownOperation(_) => ErrorKind::UnknownOperation,
            Self::Service(ServiceError::Publish(_)) => ErrorKind::Publish,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Unavailable => ErrorKind::Unavailable,
        }
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self.kind() {
            ErrorKind::MalformedRequest | ErrorKind::UnknownOperation | ErrorKind::BusinessLogic => {
                ErrorClass::Client
            }
            ErrorKind::Publish | ErrorKind::Timeout | ErrorKind::Unavailable => ErrorClass::Server,
        }
    }
}
