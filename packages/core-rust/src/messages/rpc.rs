//! Binary RPC envelope.
//!
//! Every frame on the RPC port carries exactly one `RpcRequest` (client to
//! server) or `RpcResponse` (server to client). Failures are reported through
//! `status` and `message`; a failed response never carries a payload.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

/// Protocol-level status of an RPC call. Numeric values follow gRPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum RpcStatus {
    Ok,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    FailedPrecondition,
    Unimplemented,
    Internal,
    Unavailable,
}

impl RpcStatus {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::InvalidArgument => 3,
            Self::DeadlineExceeded => 4,
            Self::NotFound => 5,
            Self::FailedPrecondition => 9,
            Self::Unimplemented => 12,
            Self::Internal => 13,
            Self::Unavailable => 14,
        }
    }

    #[must_use]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl From<RpcStatus> for u8 {
    fn from(status: RpcStatus) -> Self {
        status.code()
    }
}

/// A status code outside the set this protocol defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown rpc status code {0}")]
pub struct UnknownStatus(pub u8);

impl TryFrom<u8> for RpcStatus {
    type Error = UnknownStatus;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Ok),
            3 => Ok(Self::InvalidArgument),
            4 => Ok(Self::DeadlineExceeded),
            5 => Ok(Self::NotFound),
            9 => Ok(Self::FailedPrecondition),
            12 => Ok(Self::Unimplemented),
            13 => Ok(Self::Internal),
            14 => Ok(Self::Unavailable),
            other => Err(UnknownStatus(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// Client-to-server call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Caller-chosen correlation id, echoed in the response.
    pub id: u64,
    /// Fully qualified method, e.g. `add.Add/Sum`.
    pub method: String,
    /// Method-specific message, typically a map.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payload: Option<rmpv::Value>,
}

impl RpcRequest {
    #[must_use]
    pub fn new(id: u64, method: impl Into<String>, payload: rmpv::Value) -> Self {
        Self {
            id,
            method: method.into(),
            payload: Some(payload),
        }
    }
}

/// Server-to-client reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: u64,
    pub status: RpcStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payload: Option<rmpv::Value>,
}

impl RpcResponse {
    #[must_use]
    pub fn ok(id: u64, payload: rmpv::Value) -> Self {
        Self {
            id,
            status: RpcStatus::Ok,
            message: None,
            payload: Some(payload),
        }
    }

    #[must_use]
    pub fn error(id: u64, status: RpcStatus, message: impl Into<String>) -> Self {
        Self {
            id,
            status,
            message: Some(message.into()),
            payload: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Payload conversion
// ---------------------------------------------------------------------------

/// A payload could not be converted to or from a typed message.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("payload encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("payload read failed: {0}")]
    Read(#[from] rmpv::decode::Error),
    #[error("payload does not match the expected message: {0}")]
    Convert(#[from] rmpv::ext::Error),
}

/// Encodes a message as a payload with named fields (structs become maps).
///
/// # Errors
///
/// Returns `PayloadError` if the message cannot be serialized.
pub fn to_payload<T: Serialize + ?Sized>(message: &T) -> Result<rmpv::Value, PayloadError> {
    let bytes = rmp_serde::to_vec_named(message)?;
    Ok(rmpv::decode::read_value(&mut bytes.as_slice())?)
}

/// Decodes a typed message from a payload.
///
/// # Errors
///
/// Returns `PayloadError` if the payload does not have the message's shape.
pub fn from_payload<T: DeserializeOwned>(payload: rmpv::Value) -> Result<T, PayloadError> {
    Ok(rmpv::ext::from_value(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_grpc() {
        assert_eq!(RpcStatus::InvalidArgument.code(), 3);
        assert_eq!(RpcStatus::Internal.code(), 13);
        assert_eq!(RpcStatus::try_from(14), Ok(RpcStatus::Unavailable));
        assert_eq!(RpcStatus::try_from(2), Err(UnknownStatus(2)));
    }

    #[test]
    fn error_response_carries_no_payload() {
        let resp = RpcResponse::error(9, RpcStatus::Internal, "bus down");
        let bytes = rmp_serde::to_vec_named(&resp).unwrap();
        let decoded: RpcResponse = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded.status, RpcStatus::Internal);
        assert_eq!(decoded.message.as_deref(), Some("bus down"));
        assert!(decoded.payload.is_none());
    }

    #[test]
    fn unknown_status_code_fails_to_decode() {
        let bytes = rmp_serde::to_vec_named(&serde_json::json!({"id": 1, "status": 99})).unwrap();
        assert!(rmp_serde::from_slice::<RpcResponse>(&bytes).is_err());
    }

    #[test]
    fn structs_become_named_maps() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Operands {
            a: i64,
            b: String,
        }
        let payload = to_payload(&Operands { a: 1, b: "x".to_string() }).unwrap();
        let map = payload.as_map().unwrap();
        assert_eq!(map[0].0.as_str(), Some("a"));
        assert_eq!(map[1].0.as_str(), Some("b"));

        let back: Operands = from_payload(payload).unwrap();
        assert_eq!(back, Operands { a: 1, b: "x".to_string() });
    }

    #[test]
    fn unit_is_nil() {
        assert!(to_payload(&()).unwrap().is_nil());
    }
}
