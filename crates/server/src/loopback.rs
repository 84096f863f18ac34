//! In-process transport.

use std::sync::Arc;

use protocol::{Transport, TransportError};
use tracing::debug;

use crate::server::Server;

/// Delivers requests straight to a [`Server`] without touching the network.
///
/// The URL is ignored. Useful for embedding a server in the same process as
/// its clients, and for end-to-end tests.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    server: Arc<Server>,
}

impl LoopbackTransport {
    /// Creates a transport that posts to `server`.
    pub fn new(server: impl Into<Arc<Server>>) -> Self {
        Self {
            server: server.into(),
        }
    }

    /// The server requests are delivered to.
    pub fn server(&self) -> &Server {
        &self.server
    }
}

impl Transport for LoopbackTransport {
    fn post(&self, url: &str, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        debug!(url, request_bytes = request.len(), "loopback post");
        Ok(self.server.run(Some(request), None).body)
    }
}
