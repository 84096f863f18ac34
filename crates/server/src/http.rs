//! HTTP-style request entry point.

use protocol::{codes, Fault};
use tracing::{debug, info};

use crate::server::Server;

/// Message of the fault returned for an empty request.
pub const NO_REQUEST: &str = "No request found.";

/// Content type of published description documents.
const DOCUMENT_CONTENT_TYPE: &str = "text/xml";

/// A response ready to be written by whatever HTTP layer hosts the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Value of the `Content-Type` header.
    pub content_type: String,
    /// Additional headers.
    pub headers: Vec<(String, String)>,
    /// Response payload.
    pub body: Vec<u8>,
}

impl HttpResponse {
    fn ok(content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: content_type.into(),
            headers: vec![("Access-Control-Allow-Origin".to_string(), "*".to_string())],
            body,
        }
    }

    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl Server {
    /// Answers one HTTP request.
    ///
    /// A non-empty `body` is handled as an RPC request. For an empty body the
    /// description document published under `query` is served when there is
    /// one; otherwise the response is a `NO_REQUEST` fault.
    pub fn run(&self, body: Option<&[u8]>, query: Option<&str>) -> HttpResponse {
        let content_type = format!(
            "{}; charset={}",
            self.codec().content_type(),
            self.output_options().encoding
        );
        match body.filter(|body| !body.is_empty()) {
            Some(body) => {
                info!(request_bytes = body.len(), "handling request");
                HttpResponse::ok(content_type, self.handle(body))
            }
            None => {
                if let Some(document) = query.and_then(|query| self.resources.get(query)) {
                    debug!(query = ?query, "serving description document");
                    return HttpResponse::ok(DOCUMENT_CONTENT_TYPE, document.clone().into_bytes());
                }
                debug!("empty request");
                let fault = Fault::new(codes::NO_REQUEST, NO_REQUEST);
                HttpResponse::ok(content_type, self.fault_response(&fault))
            }
        }
    }
}
