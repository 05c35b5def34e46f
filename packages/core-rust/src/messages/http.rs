//! JSON response bodies for the HTTP transport.
//!
//! Request bodies are plain objects of named operands (`{"a": 2, "b": 3}`)
//! and are converted with [`crate::params_from_json`]; only the response
//! envelope needs a schema.

use serde::{Deserialize, Serialize};

use crate::types::Value;

/// Error classification carried in failed responses on both transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The wire payload or operands did not match the operation.
    MalformedRequest,
    /// No operation is registered under the requested name.
    UnknownOperation,
    /// The business logic rejected otherwise well-formed operands.
    BusinessLogic,
    /// The result was computed but the bus notification could not be sent.
    Publish,
    /// The operation did not finish before its deadline.
    Timeout,
    /// The server is shutting down and no longer accepts work.
    Unavailable,
}

/// Error half of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

/// Response body: exactly one of `res` or `error` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultBody {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub res: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<ErrorBody>,
}

impl ResultBody {
    #[must_use]
    pub fn ok(res: Value) -> Self {
        Self {
            res: Some(res),
            error: None,
        }
    }

    #[must_use]
    pub fn err(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            res: None,
            error: Some(ErrorBody {
                kind,
                message: message.into(),
            }),
        }
    }
}
