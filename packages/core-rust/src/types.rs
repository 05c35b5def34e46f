use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Typed operand or result value carried by every operation.
///
/// Serializes untagged, so it appears on the wire as a bare JSON number or
/// string (or the equivalent `MsgPack` int/str).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Signed 64-bit integer.
    Int(i64),
    /// UTF-8 string.
    Str(String),
}

impl Value {
    /// Returns the kind of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::Str(_) => ValueKind::String,
        }
    }

    /// Returns the integer if this is an `Int`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Str(_) => None,
        }
    }

    /// Returns the string slice if this is a `Str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Int(_) => None,
        }
    }

    /// Converts into the equivalent `MsgPack` value.
    #[must_use]
    pub fn to_msgpack(&self) -> rmpv::Value {
        match self {
            Self::Int(v) => rmpv::Value::from(*v),
            Self::Str(s) => rmpv::Value::from(s.as_str()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl TryFrom<&serde_json::Value> for Value {
    type Error = ValueError;

    fn try_from(json: &serde_json::Value) -> Result<Self, Self::Error> {
        match json {
            serde_json::Value::String(s) => Ok(Self::Str(s.clone())),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .ok_or_else(|| ValueError::Unsupported(format!("number {n} is not a 64-bit integer"))),
            other => Err(ValueError::Unsupported(json_type_name(other).to_string())),
        }
    }
}

impl TryFrom<&rmpv::Value> for Value {
    type Error = ValueError;

    fn try_from(mp: &rmpv::Value) -> Result<Self, Self::Error> {
        match mp {
            rmpv::Value::Integer(i) => i.as_i64().map(Self::Int).ok_or_else(|| {
                ValueError::Unsupported("integer does not fit in 64 signed bits".to_string())
            }),
            rmpv::Value::String(s) => s
                .as_str()
                .map(|s| Self::Str(s.to_string()))
                .ok_or_else(|| ValueError::Unsupported("string is not valid UTF-8".to_string())),
            other => Err(ValueError::Unsupported(msgpack_type_name(other).to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// Discriminant of [`Value`], used in operation signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Int,
    String,
}

impl ValueKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::String => "string",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named operands of a request. `BTreeMap` keeps iteration order stable for logging.
pub type Params = BTreeMap<String, Value>;

/// A wire value could not be represented as a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("unsupported operand type: {0}")]
    Unsupported(String),
    #[error("request body must be an object of named operands, got {0}")]
    NotAnObject(String),
    #[error("operand names must be strings")]
    NonStringKey,
}

/// Converts a JSON request body into named operands.
///
/// # Errors
///
/// Returns `ValueError` if the body is not an object or any operand is not an
/// integer or a string.
pub fn params_from_json(body: &serde_json::Value) -> Result<Params, ValueError> {
    let serde_json::Value::Object(fields) = body else {
        return Err(ValueError::NotAnObject(json_type_name(body).to_string()));
    };
    fields
        .iter()
        .map(|(name, v)| Ok((name.clone(), Value::try_from(v)?)))
        .collect()
}

/// Converts a `MsgPack` map payload into named operands.
///
/// A `Nil` payload is treated as an empty map.
///
/// # Errors
///
/// Returns `ValueError` if the payload is not a map, a key is not a string,
/// or any operand is not an integer or a string.
pub fn params_from_msgpack(payload: &rmpv::Value) -> Result<Params, ValueError> {
    let entries: &[(rmpv::Value, rmpv::Value)] = match payload {
        rmpv::Value::Map(entries) => entries.as_slice(),
        rmpv::Value::Nil => &[],
        other => return Err(ValueError::NotAnObject(msgpack_type_name(other).to_string())),
    };
    entries
        .iter()
        .map(|(k, v)| {
            let name = k.as_str().ok_or(ValueError::NonStringKey)?;
            Ok((name.to_string(), Value::try_from(v)?))
        })
        .collect()
}

fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn msgpack_type_name(v: &rmpv::Value) -> &'static str {
    match v {
        rmpv::Value::Nil => "nil",
        rmpv::Value::Boolean(_) => "bool",
        rmpv::Value::Integer(_) => "integer",
        rmpv::Value::F32(_) | rmpv::Value::F64(_) => "float",
        rmpv::Value::String(_) => "string",
        rmpv::Value::Binary(_) => "binary",
        rmpv::Value::Array(_) => "array",
        rmpv::Value::Map(_) => "map",
        rmpv::Value::Ext(..) => "ext",
    }
}
