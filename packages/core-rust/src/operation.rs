//! Operation identifiers, signatures, and the transport-agnostic request shape.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Params, Value, ValueKind};

/// Fully qualified name of the business service as advertised over RPC.
pub const SERVICE_NAME: &str = "add.Add";

/// Identifier of a business operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationName {
    Sum,
    Concat,
}

impl OperationName {
    /// All declared operations, in declaration order.
    pub const ALL: [OperationName; 2] = [OperationName::Sum, OperationName::Concat];

    /// Lowercase name used for HTTP routes and logging.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Concat => "concat",
        }
    }

    /// Fully qualified RPC method name, e.g. `add.Add/Sum`.
    #[must_use]
    pub fn rpc_method(self) -> &'static str {
        match self {
            Self::Sum => "add.Add/Sum",
            Self::Concat => "add.Add/Concat",
        }
    }

    /// Resolves an RPC method name back to an operation.
    #[must_use]
    pub fn from_rpc_method(method: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.rpc_method() == method)
    }

    /// Returns the static signature of this operation.
    #[must_use]
    pub fn signature(self) -> &'static OperationSignature {
        match self {
            Self::Sum => &SUM_SIGNATURE,
            Self::Concat => &CONCAT_SIGNATURE,
        }
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A method or operation name no endpoint is registered for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation: {0}")]
pub struct UnknownOperation(pub String);

/// One declared parameter of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ValueKind,
}

/// Static description of an operation: its parameters and result kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSignature {
    pub operation: OperationName,
    pub params: &'static [ParamSpec],
    pub result: ValueKind,
}

/// `Sum(a: int, b: int) -> int`
pub static SUM_SIGNATURE: OperationSignature = OperationSignature {
    operation: OperationName::Sum,
    params: &[
        ParamSpec { name: "a", kind: ValueKind::Int },
        ParamSpec { name: "b", kind: ValueKind::Int },
    ],
    result: ValueKind::Int,
};

/// `Concat(a: string, b: string) -> string`
pub static CONCAT_SIGNATURE: OperationSignature = OperationSignature {
    operation: OperationName::Concat,
    params: &[
        ParamSpec { name: "a", kind: ValueKind::String },
        ParamSpec { name: "b", kind: ValueKind::String },
    ],
    result: ValueKind::String,
};

/// Why a request does not fit an operation signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureMismatch {
    #[error("request for {got} sent to the {expected} endpoint")]
    WrongOperation {
        expected: OperationName,
        got: OperationName,
    },
    #[error("expected {expected} operands, got {got}")]
    WrongCount { expected: usize, got: usize },
    #[error("missing operand `{0}`")]
    Missing(&'static str),
    #[error("operand `{name}` must be {expected}, got {got}")]
    WrongType {
        name: &'static str,
        expected: ValueKind,
        got: ValueKind,
    },
}

impl OperationSignature {
    /// Checks a request against this signature.
    ///
    /// Every declared parameter must be present with its declared kind and no
    /// extra parameters are allowed.
    ///
    /// # Errors
    ///
    /// Returns the first `SignatureMismatch` found.
    pub fn check(&self, request: &OperationRequest) -> Result<(), SignatureMismatch> {
        if request.operation() != self.operation {
            return Err(SignatureMismatch::WrongOperation {
                expected: self.operation,
                got: request.operation(),
            });
        }
        for spec in self.params {
            let value = request.param(spec.name).ok_or(SignatureMismatch::Missing(spec.name))?;
            if value.kind() != spec.kind {
                return Err(SignatureMismatch::WrongType {
                    name: spec.name,
                    expected: spec.kind,
                    got: value.kind(),
                });
            }
        }
        if request.params().len() != self.params.len() {
            return Err(SignatureMismatch::WrongCount {
                expected: self.params.len(),
                got: request.params().len(),
            });
        }
        Ok(())
    }
}

/// A named operation plus its operands. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    operation: OperationName,
    params: Params,
}

impl OperationRequest {
    #[must_use]
    pub fn new(operation: OperationName, params: Params) -> Self {
        Self { operation, params }
    }

    /// Convenience constructor for two-operand operations.
    #[must_use]
    pub fn binary(operation: OperationName, a: impl Into<Value>, b: impl Into<Value>) -> Self {
        let mut params = Params::new();
        params.insert("a".to_string(), a.into());
        params.insert("b".to_string(), b.into());
        Self { operation, params }
    }

    #[must_use]
    pub fn operation(&self) -> OperationName {
        self.operation
    }

    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }
}
