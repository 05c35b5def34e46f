//! addsvc core: operand values, operation signatures, and the JSON and
//! binary RPC wire schemas shared by the server and its clients.

pub mod messages;
pub mod operation;
pub mod types;

pub use operation::{
    OperationName, OperationRequest, OperationSignature, ParamSpec, SignatureMismatch,
    UnknownOperation, CONCAT_SIGNATURE, SERVICE_NAME, SUM_SIGNATURE,
};
pub use types::{params_from_json, params_from_msgpack, Params, Value, ValueError, ValueKind};
