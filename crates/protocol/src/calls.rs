//! Position-preserving batch call descriptors.
//!
//! A multi-call request is a single array argument whose elements are
//! `{methodName, params}` structs. [`CallDescriptor`] is the typed form of
//! one element; the client produces them when composing a batch and the
//! server consumes them when expanding one.

use crate::{Members, Value};

/// Struct member naming the method of a batched call.
pub const METHOD_NAME: &str = "methodName";
/// Struct member holding the parameters of a batched call.
pub const PARAMS: &str = "params";

/// The canonical multi-call method name.
pub const MULTICALL: &str = "system.multiCall";
/// The lower-case multi-call alias.
pub const MULTICALL_LOWER: &str = "system.multicall";

/// Returns `true` if `method` is one of the multi-call method names.
pub fn is_multicall(method: &str) -> bool {
    method == MULTICALL || method == MULTICALL_LOWER
}

/// One entry of a multi-call batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CallDescriptor {
    /// Fully-qualified method name.
    pub method: String,
    /// Positional parameters.
    pub params: Vec<Value>,
}

impl CallDescriptor {
    /// Creates a new descriptor.
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Reads a descriptor from its wire struct.
    ///
    /// Returns `None` unless `value` is a struct with a string `methodName`.
    /// A missing or nil `params` member means no parameters; a non-array
    /// `params` member is treated as a single parameter.
    pub fn from_value(value: &Value) -> Option<Self> {
        let method = value.get(METHOD_NAME)?.as_str()?.to_string();
        let params = match value.get(PARAMS) {
            None | Some(Value::Nil) => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
        };
        Some(Self { method, params })
    }

    /// Builds the wire struct for this descriptor.
    pub fn to_value(&self) -> Value {
        let mut members = Members::new();
        members.insert(METHOD_NAME.to_string(), Value::String(self.method.clone()));
        members.insert(PARAMS.to_string(), Value::Array(self.params.clone()));
        Value::Struct(members)
    }
}
