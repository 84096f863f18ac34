//! The fault model shared by client and server.
//!
//! A [`Fault`] is a structured `{code, message}` error reported by the remote
//! party (or synthesized locally). On the wire it travels as a struct with the
//! members `faultCode` and `faultString`; [`Fault::from_value`] and
//! [`Fault::to_value`] convert between the two representations.

use thiserror::Error;

use crate::{Members, Value};

/// Fault codes reported by Ripcord clients and servers.
pub mod codes {
    /// `Method {method} not found.`
    pub const METHOD_NOT_FOUND: i64 = -1;
    /// `Argument {slot} is not a valid Ripcord call`
    pub const NOT_RIPCORD_CALL: i64 = -2;
    /// `Cannot recurse system.multiCall`
    pub const CANNOT_RECURSE: i64 = -3;
    /// `Could not access {url}`
    pub const CANNOT_ACCESS_URL: i64 = -4;
    /// A required codec or transport was not configured.
    pub const NOT_CONFIGURED: i64 = -5;
    /// `Variable is not of type datetime`
    pub const NOT_DATE_TIME: i64 = -6;
    /// `Variable is not of type base64`
    pub const NOT_BASE64: i64 = -7;
    /// `Unknown service type {name}`
    pub const UNKNOWN_SERVICE_TYPE: i64 = -8;

    // Server protocol faults. These share numeric values with the client
    // codes above but are only ever produced as top-level responses.

    /// The request carried no body.
    pub const NO_REQUEST: i64 = -1;
    /// `system.multicall` was called without an array of calls.
    pub const ILLEGAL_MULTICALL_PARAMS: i64 = -2;
    /// The request could not be decoded or names no method.
    pub const INVALID_METHOD_CALL: i64 = -3;

    /// The payload is not well-formed.
    pub const PARSE_ERROR: i64 = -32700;
    /// A registered method failed without reporting a fault of its own.
    pub const APPLICATION_ERROR: i64 = -32500;
}

/// Wire member holding the fault code.
pub const FAULT_CODE: &str = "faultCode";
/// Wire member holding the fault message.
pub const FAULT_STRING: &str = "faultString";

/// A structured remote-call error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fault {code}: {message}")]
pub struct Fault {
    /// Numeric fault code.
    pub code: i64,
    /// Human-readable fault description.
    pub message: String,
}

impl Fault {
    /// Creates a new fault.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Returns `true` if `value` is shaped like a fault: a struct carrying an
    /// integer `faultCode` and a string `faultString`.
    pub fn is_fault(value: &Value) -> bool {
        Self::from_value(value).is_some()
    }

    /// Extracts a fault from its wire representation.
    pub fn from_value(value: &Value) -> Option<Self> {
        let Value::Struct(members) = value else {
            return None;
        };
        match (members.get(FAULT_CODE), members.get(FAULT_STRING)) {
            (Some(Value::Int(code)), Some(Value::String(message))) => {
                Some(Self::new(*code, message.clone()))
            }
            _ => None,
        }
    }

    /// Builds the wire representation of this fault.
    pub fn to_value(&self) -> Value {
        let mut members = Members::new();
        members.insert(FAULT_CODE.to_string(), Value::Int(self.code));
        members.insert(FAULT_STRING.to_string(), Value::String(self.message.clone()));
        Value::Struct(members)
    }
}

impl From<Fault> for Value {
    fn from(fault: Fault) -> Self {
        fault.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_survives_wire_representation() {
        let fault = Fault::new(codes::METHOD_NOT_FOUND, "Method unknown not found.");
        let value = fault.to_value();
        assert!(Fault::is_fault(&value));
        assert_eq!(Fault::from_value(&value), Some(fault));
    }

    #[test]
    fn struct_missing_fault_string_is_not_a_fault() {
        let mut members = Members::new();
        members.insert(FAULT_CODE.to_string(), Value::Int(4));
        assert!(!Fault::is_fault(&Value::Struct(members)));
    }

    #[test]
    fn non_struct_values_are_not_faults() {
        assert!(!Fault::is_fault(&Value::Int(-1)));
        assert!(!Fault::is_fault(&Value::Array(vec![Value::Int(-1)])));
    }
}
