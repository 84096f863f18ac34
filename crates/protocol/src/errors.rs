//! Error types for the Ripcord RPC domain.
//!
//! [`RipcordError`] is the single error surfaced by client and server
//! operations. Every variant maps to a stable integer fault code (see
//! [`RipcordError::code`]) so the server can turn any failure into a
//! [`Fault`] at its dispatch boundary.
//!
//! Port-level failures have their own types: [`CodecError`] for payload
//! encoding/decoding and [`TransportError`] for the network exchange. Both
//! convert into [`RipcordError`] with `?`.

use thiserror::Error;

use crate::faults::{codes, Fault};

// ---------------------------------------------------------------------------
// Domain errors
// ---------------------------------------------------------------------------

/// Errors produced by the dispatch and batching engine.
#[derive(Debug, Error)]
pub enum RipcordError {
    /// A required collaborator (codec, transport) was not supplied.
    ///
    /// Produced at construction time; a client or server never starts without
    /// its ports.
    #[error("{message}")]
    Configuration {
        /// Description of the missing capability.
        message: String,
    },

    /// An argument passed to a Ripcord operation is invalid.
    ///
    /// Produced by: batch composition (entry is not a call), the server's
    /// recursion guard, service registration, and the wire-type helpers.
    #[error("{message}")]
    InvalidArgument {
        /// Fault code identifying the kind of invalid argument
        /// (see [`codes`]).
        code: i64,
        /// Human-readable description.
        message: String,
    },

    /// The requested method is not registered on the server.
    #[error("Method {method} not found.")]
    BadMethodCall {
        /// The fully-qualified method name that was requested.
        method: String,
    },

    /// The remote party answered a single (non-batched) call with a fault and
    /// fault-raising is enabled on the client.
    #[error("{}", .fault.message)]
    RemoteFault {
        /// The decoded fault.
        fault: Fault,
    },

    /// The transport could not complete the exchange.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The codec could not encode or decode a payload.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl RipcordError {
    /// Creates a [`RipcordError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// A batch entry (identified by its caller-supplied key) is neither a
    /// recorded call nor a `{methodName, params}` structure.
    pub fn not_ripcord_call(slot: impl std::fmt::Display) -> Self {
        Self::InvalidArgument {
            code: codes::NOT_RIPCORD_CALL,
            message: format!("Argument {slot} is not a valid Ripcord call"),
        }
    }

    /// The multi-call method was invoked from inside a multi-call expansion.
    pub fn cannot_recurse() -> Self {
        Self::InvalidArgument {
            code: codes::CANNOT_RECURSE,
            message: "Cannot recurse system.multiCall".to_string(),
        }
    }

    /// A capability could not be registered because it yields no method name.
    pub fn unknown_service_type(name: impl std::fmt::Display) -> Self {
        Self::InvalidArgument {
            code: codes::UNKNOWN_SERVICE_TYPE,
            message: format!("Unknown service type {name}"),
        }
    }

    /// The value handed to [`crate::timestamp`] is not a datetime.
    pub fn not_date_time() -> Self {
        Self::InvalidArgument {
            code: codes::NOT_DATE_TIME,
            message: "Variable is not of type datetime".to_string(),
        }
    }

    /// The value handed to [`crate::binary`] is not base64.
    pub fn not_base64() -> Self {
        Self::InvalidArgument {
            code: codes::NOT_BASE64,
            message: "Variable is not of type base64".to_string(),
        }
    }

    /// Creates a [`RipcordError::BadMethodCall`].
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::BadMethodCall {
            method: method.into(),
        }
    }

    /// Returns the fault code this error is reported with.
    pub fn code(&self) -> i64 {
        match self {
            Self::Configuration { .. } => codes::NOT_CONFIGURED,
            Self::InvalidArgument { code, .. } => *code,
            Self::BadMethodCall { .. } => codes::METHOD_NOT_FOUND,
            Self::RemoteFault { fault } => fault.code,
            Self::Transport(_) => codes::CANNOT_ACCESS_URL,
            Self::Codec(_) => codes::PARSE_ERROR,
        }
    }

    /// Converts this error into the fault reported to remote callers.
    pub fn to_fault(&self) -> Fault {
        match self {
            Self::RemoteFault { fault } => fault.clone(),
            other => Fault::new(other.code(), other.to_string()),
        }
    }
}

impl From<RipcordError> for Fault {
    fn from(err: RipcordError) -> Self {
        err.to_fault()
    }
}

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// Errors raised by a [`crate::Codec`] implementation.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload is not well-formed for this codec.
    #[error("malformed payload: {message}")]
    Malformed {
        /// Parser diagnostic.
        message: String,
    },

    /// The requested character encoding is not supported by this codec.
    #[error("unsupported character encoding: {encoding}")]
    UnsupportedEncoding {
        /// The encoding label that was requested.
        encoding: String,
    },

    /// A value cannot be represented in this codec's wire format.
    #[error("value cannot be encoded: {message}")]
    Unrepresentable {
        /// Description of the offending value.
        message: String,
    },
}

impl CodecError {
    /// Creates a [`CodecError::Malformed`].
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// A network exchange failed.
///
/// Carries the target URL and the underlying cause reported by the transport
/// implementation.
#[derive(Debug, Error)]
#[error("Could not access {url}")]
pub struct TransportError {
    /// The endpoint the request was posted to.
    pub url: String,
    /// The underlying failure.
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl TransportError {
    /// Creates a [`TransportError`] for `url` caused by `source`.
    pub fn new(
        url: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            url: url.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_not_found_message_names_the_method() {
        let err = RipcordError::method_not_found("unknown");
        assert_eq!(err.to_string(), "Method unknown not found.");
        assert_eq!(err.code(), codes::METHOD_NOT_FOUND);
    }

    #[test]
    fn remote_fault_round_trips_its_fault() {
        let fault = Fault::new(42, "boom");
        let err = RipcordError::RemoteFault {
            fault: fault.clone(),
        };
        assert_eq!(err.code(), 42);
        assert_eq!(err.to_string(), "boom");
        assert_eq!(Fault::from(err), fault);
    }

    #[test]
    fn transport_error_reports_url_and_code() {
        let err: RipcordError = TransportError::new("http://localhost:1/rpc", "refused").into();
        assert_eq!(err.to_string(), "Could not access http://localhost:1/rpc");
        assert_eq!(err.code(), codes::CANNOT_ACCESS_URL);
    }

    #[test]
    fn not_ripcord_call_identifies_slot() {
        let fault = RipcordError::not_ripcord_call("b").to_fault();
        assert_eq!(fault.code, codes::NOT_RIPCORD_CALL);
        assert_eq!(fault.message, "Argument b is not a valid Ripcord call");
    }
}
