//! Service introspection messages, so generic clients can discover methods
//! and their operand types without a compiled schema.

use serde::{Deserialize, Serialize};

use crate::operation::{OperationName, OperationSignature};
use crate::types::ValueKind;

pub const REFLECTION_SERVICE_NAME: &str = "reflection.v1.Reflection";
pub const REFLECTION_LIST_METHOD: &str = "reflection.v1.Reflection/ListServices";
pub const REFLECTION_DESCRIBE_METHOD: &str = "reflection.v1.Reflection/DescribeService";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListServicesResponse {
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeServiceRequest {
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Fully qualified method name.
    pub name: String,
    pub input: Vec<ParamDescriptor>,
    pub output: ValueKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub methods: Vec<MethodDescriptor>,
}

impl From<&OperationSignature> for MethodDescriptor {
    fn from(sig: &OperationSignature) -> Self {
        Self {
            name: sig.operation.rpc_method().to_string(),
            input: sig
                .params
                .iter()
                .map(|p| ParamDescriptor {
                    name: p.name.to_string(),
                    kind: p.kind,
                })
                .collect(),
            output: sig.result,
        }
    }
}

impl ServiceDescriptor {
    /// Describes the business service from the declared operation signatures.
    #[must_use]
    pub fn business() -> Self {
        Self {
            name: crate::operation::SERVICE_NAME.to_string(),
            methods: OperationName::ALL
                .iter()
                .map(|op| MethodDescriptor::from(op.signature()))
                .collect(),
        }
    }
}
