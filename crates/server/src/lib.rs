//! Ripcord RPC server.
//!
//! Exposes a registry of local capabilities to remote callers:
//!
//! - [`MethodRegistry`] maps public method names to targets, built from
//!   [`MethodDescriptor`]s and [`ServiceDescriptor`]s. Members that are not
//!   public or whose name starts with `_` are never published.
//! - [`Server`] decodes requests through a [`protocol::Codec`], routes them,
//!   expands `system.multiCall` batches with per-call fault isolation, and
//!   answers the reserved `system.*` introspection methods.
//! - [`Server::run`] is the HTTP-style entry point; [`LoopbackTransport`]
//!   lets an in-process client talk to a server directly.
//!
//! ## Architectural Layer
//!
//! **Application.** Depends only on the `protocol` ports; the hosting HTTP
//! stack and the wire format are supplied by the caller.

mod http;
mod loopback;
mod registry;
mod server;
mod system;

pub use http::{HttpResponse, NO_REQUEST};
pub use loopback::LoopbackTransport;
pub use registry::{
    Capability, MethodDescriptor, MethodRegistry, RegisteredMethod, ServiceDescriptor, Target,
    Visibility,
};
pub use server::{Server, ServerBuilder, ILLEGAL_MULTICALL_PARAMS, NO_METHOD_NAME};
