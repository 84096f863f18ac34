//! Port traits implemented by infrastructure crates.
//!
//! The dispatch engine never touches bytes on the wire itself. It hands
//! method calls to a [`Codec`] and posts the resulting payloads through a
//! [`Transport`]. Concrete adapters live in their own crates; tests supply
//! in-memory fakes.

use crate::{CodecError, Fault, OutputOptions, TransportError, Value, WireType};

/// A request as decoded by a server-side codec.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRequest {
    /// The requested method; `None` if the payload named no method.
    pub method: Option<String>,
    /// The positional parameters.
    pub params: Vec<Value>,
}

/// Serializes calls and results to and from wire payloads.
pub trait Codec: Send + Sync {
    /// MIME type of the payloads this codec produces.
    fn content_type(&self) -> &'static str;

    /// Encodes a method call.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if a parameter cannot be represented.
    fn encode_request(
        &self,
        method: &str,
        params: &[Value],
        options: &OutputOptions,
    ) -> Result<Vec<u8>, CodecError>;

    /// Decodes a method call received by a server.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the payload is not a well-formed request.
    fn decode_request(
        &self,
        payload: &[u8],
        options: &OutputOptions,
    ) -> Result<DecodedRequest, CodecError>;

    /// Encodes a result (or a fault, via [`Fault::to_value`]) as a response.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the value cannot be represented.
    fn encode_response(&self, value: &Value, options: &OutputOptions)
        -> Result<Vec<u8>, CodecError>;

    /// Decodes a response payload received by a client.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the payload is malformed or `encoding` is
    /// not supported.
    fn decode_response(&self, payload: &[u8], encoding: &str) -> Result<Value, CodecError>;

    /// Returns `true` if a decoded value is a fault.
    fn is_fault(&self, value: &Value) -> bool {
        Fault::is_fault(value)
    }

    /// Classifies a decoded value's wire type.
    fn type_of(&self, value: &Value) -> WireType {
        value.wire_type()
    }
}

/// Posts request payloads to an endpoint.
///
/// Implementations must be reusable across any number of posts.
pub trait Transport: Send + Sync {
    /// Posts `request` to `url` and returns the raw response payload.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on any network failure.
    fn post(&self, url: &str, request: &[u8]) -> Result<Vec<u8>, TransportError>;
}
