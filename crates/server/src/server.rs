//! Request dispatch.
//!
//! [`Server`] is stateless across requests. Each decoded `(methodName,
//! params)` pair is routed in this order:
//!
//! 1. `system.multiCall` / `system.multicall` at the top level expands the
//!    batch, running every sub-call through [`Server::call`].
//! 2. A registered name invokes its target.
//! 3. A multi-call name reached through [`Server::call`] (that is, nested
//!    inside a batch) fails with `CANNOT_RECURSE`.
//! 4. An enumerated `system.*` name is answered by the introspection surface.
//! 5. Anything else fails with `METHOD_NOT_FOUND`.
//!
//! Every failure is reported to the caller as a fault; nothing escapes to the
//! transport.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use protocol::{
    codes, is_multicall, CallDescriptor, Codec, Fault, OutputOptions, RipcordError, Value,
};
use tracing::{debug, error, info_span, warn};

use crate::registry::{Capability, MethodDescriptor, MethodRegistry};
use crate::system;

/// Message of the fault returned for a request that names no method.
pub const NO_METHOD_NAME: &str = "Invalid Method Call - No methodName given";
/// Message of the fault returned when `system.multiCall` gets no array.
pub const ILLEGAL_MULTICALL_PARAMS: &str = "Illegal or no params set for system.multiCall";

/// An RPC server.
pub struct Server {
    registry: MethodRegistry,
    codec: Arc<dyn Codec>,
    options: OutputOptions,
    pub(crate) resources: HashMap<String, String>,
}

impl Server {
    /// Creates a server with no methods and default options.
    pub fn new(codec: impl Codec + 'static) -> Self {
        Self {
            registry: MethodRegistry::new(),
            codec: Arc::new(codec),
            options: OutputOptions::server_default(),
            resources: HashMap::new(),
        }
    }

    /// Starts building a server around `codec`.
    pub fn builder(codec: impl Codec + 'static) -> ServerBuilder {
        ServerBuilder::new(codec)
    }

    /// The published methods.
    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    /// The options handed to the codec.
    pub fn output_options(&self) -> &OutputOptions {
        &self.options
    }

    pub(crate) fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    /// Registers a capability. See [`MethodRegistry::add_service`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` (`UNKNOWN_SERVICE_TYPE`) when a method ends
    /// up without a usable name.
    pub fn add_service(
        &mut self,
        capability: impl Into<Capability>,
        namespace: Option<&str>,
    ) -> Result<(), RipcordError> {
        self.registry.add_service(capability, namespace)
    }

    /// Registers one method under `name`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` (`UNKNOWN_SERVICE_TYPE`) for an unusable
    /// name.
    pub fn add_method(&mut self, name: &str, method: MethodDescriptor) -> Result<(), RipcordError> {
        self.registry.add_method(name, method)
    }

    /// Sets one codec output option. Returns `false` for unrecognised keys
    /// or invalid values.
    pub fn set_output_option(&mut self, key: &str, value: &str) -> bool {
        self.options.set_output_option(key, value)
    }

    /// Publishes a description document served for an empty request whose
    /// query string is `query`.
    pub fn add_resource(&mut self, query: impl Into<String>, document: impl Into<String>) {
        self.resources.insert(query.into(), document.into());
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Decodes one request payload, dispatches it, and encodes the response.
    ///
    /// Undecodable requests and requests without a method name are answered
    /// with an `INVALID_METHOD_CALL` fault.
    pub fn handle(&self, payload: &[u8]) -> Vec<u8> {
        let request = match self.codec.decode_request(payload, &self.options) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "undecodable request");
                return self.fault_response(&Fault::new(
                    codes::INVALID_METHOD_CALL,
                    format!("Invalid Method Call - {err}"),
                ));
            }
        };
        let Some(method) = request.method else {
            warn!("request names no method");
            return self
                .fault_response(&Fault::new(codes::INVALID_METHOD_CALL, NO_METHOD_NAME));
        };

        let span = info_span!("rpc_request", method = %method, params = request.params.len());
        let _guard = span.enter();

        let result = if is_multicall(&method) {
            self.multi_call(&request.params)
        } else {
            self.call(&method, &request.params)
                .unwrap_or_else(|fault| fault.to_value())
        };
        self.encode(&result)
    }

    /// Invokes `method` with `args`.
    ///
    /// This is the path every sub-call of a batch takes, so a multi-call name
    /// here is a nested batch and is refused.
    ///
    /// # Errors
    ///
    /// Returns the target's fault, `CANNOT_RECURSE` for a nested multi-call,
    /// `METHOD_NOT_FOUND` for unknown names, or `APPLICATION_ERROR` when the
    /// target panics.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value, Fault> {
        if let Some(registered) = self.registry.get(method) {
            debug!(method, "invoking registered method");
            let target = &registered.target;
            return match panic::catch_unwind(AssertUnwindSafe(|| target(args))) {
                Ok(result) => result,
                Err(payload) => {
                    let reason = panic_reason(payload.as_ref());
                    error!(method, reason = %reason, "method panicked");
                    Err(Fault::new(
                        codes::APPLICATION_ERROR,
                        format!("Method {method} failed: {reason}"),
                    ))
                }
            };
        }
        if is_multicall(method) {
            return Err(RipcordError::cannot_recurse().into());
        }
        if let Some(answer) = system::answer(&self.registry, method, args) {
            return answer.map_err(Fault::from);
        }
        Err(RipcordError::method_not_found(method).into())
    }

    /// Expands a batch. The first parameter must be an array of
    /// `{methodName, params}` structs.
    ///
    /// Returns one entry per sub-call, in order: `[result]` on success or the
    /// fault struct on failure. A malformed entry fails only its own slot.
    pub fn multi_call(&self, params: &[Value]) -> Value {
        let Some(Value::Array(entries)) = params.first() else {
            warn!("multi-call without an array of calls");
            return Fault::new(codes::ILLEGAL_MULTICALL_PARAMS, ILLEGAL_MULTICALL_PARAMS).to_value();
        };
        debug!(calls = entries.len(), "expanding multi-call");
        let results = entries
            .iter()
            .enumerate()
            .map(|(slot, entry)| {
                let outcome = match CallDescriptor::from_value(entry) {
                    Some(call) => self.call(&call.method, &call.params),
                    None => Err(RipcordError::not_ripcord_call(slot).into()),
                };
                match outcome {
                    Ok(value) => Value::Array(vec![value]),
                    Err(fault) => {
                        debug!(slot, code = fault.code, "sub-call failed");
                        fault.to_value()
                    }
                }
            })
            .collect();
        Value::Array(results)
    }

    // -----------------------------------------------------------------------
    // Encoding
    // -----------------------------------------------------------------------

    pub(crate) fn fault_response(&self, fault: &Fault) -> Vec<u8> {
        self.encode(&fault.to_value())
    }

    fn encode(&self, value: &Value) -> Vec<u8> {
        match self.codec.encode_response(value, &self.options) {
            Ok(payload) => payload,
            Err(err) => {
                error!(error = %err, "response could not be encoded");
                let fault = RipcordError::from(err).to_fault().to_value();
                self.codec
                    .encode_response(&fault, &self.options)
                    .unwrap_or_default()
            }
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("registry", &self.registry)
            .field("content_type", &self.codec.content_type())
            .field("options", &self.options)
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds a [`Server`]: options merged over the server defaults, services
/// keyed by namespace, and description documents keyed by query string.
pub struct ServerBuilder {
    server: Server,
    options: Vec<(String, String)>,
    services: Vec<(Option<String>, Capability)>,
}

impl ServerBuilder {
    fn new(codec: impl Codec + 'static) -> Self {
        Self {
            server: Server::new(codec),
            options: Vec::new(),
            services: Vec::new(),
        }
    }

    /// Overrides one output option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    /// Registers a capability, under `namespace` when one is given.
    pub fn service(mut self, namespace: Option<&str>, capability: impl Into<Capability>) -> Self {
        self.services
            .push((namespace.map(str::to_string), capability.into()));
        self
    }

    /// Publishes a description document for `query`.
    pub fn resource(mut self, query: impl Into<String>, document: impl Into<String>) -> Self {
        self.server.add_resource(query, document);
        self
    }

    /// Builds the server.
    ///
    /// # Errors
    ///
    /// Returns [`RipcordError::Configuration`] for an unrecognised option
    /// and the registration error of the first unusable service.
    pub fn build(self) -> Result<Server, RipcordError> {
        let mut server = self.server;
        for (key, value) in &self.options {
            if !server.set_output_option(key, value) {
                return Err(RipcordError::configuration(format!(
                    "invalid server output option {key}={value}"
                )));
            }
        }
        for (namespace, capability) in self.services {
            server.add_service(capability, namespace.as_deref())?;
        }
        debug!(methods = server.registry.len(), "server built");
        Ok(server)
    }
}
