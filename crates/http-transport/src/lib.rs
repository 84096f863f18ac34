//! Ripcord HTTP transport adapter.
//!
//! Implements [`protocol::Transport`] as a blocking HTTP `POST` using
//! `reqwest`'s blocking client. One [`HttpTransport`] reuses its connection
//! pool across any number of posts.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** The dispatch engine sees only [`protocol::Transport`].

use std::time::Duration;

use protocol::{Transport, TransportError};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use thiserror::Error;
use tracing::{debug, warn};

/// Content type sent when none is configured.
pub const DEFAULT_CONTENT_TYPE: &str = "text/xml";

/// Request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while building an [`HttpTransport`] or reported as the
/// cause of a [`TransportError`].
#[derive(Debug, Error)]
pub enum HttpTransportError {
    /// The underlying HTTP client failed.
    #[error(transparent)]
    Client(#[from] reqwest::Error),

    /// A configured header name or value is not valid HTTP.
    #[error("invalid header {name}")]
    InvalidHeader {
        /// The offending header name.
        name: String,
    },

    /// The server answered with a non-success status.
    #[error("server answered with status {status}")]
    Status {
        /// The HTTP status code.
        status: u16,
    },
}

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTransportOptions {
    /// Whole-request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Extra headers sent with every request.
    pub headers: Vec<(String, String)>,
    /// Value of the `Content-Type` header.
    pub content_type: String,
}

impl Default for HttpTransportOptions {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            headers: Vec::new(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

impl HttpTransportOptions {
    /// Sets the timeout.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the content type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    fn header_map(&self) -> Result<HeaderMap, HttpTransportError> {
        let mut map = HeaderMap::new();
        let content_type = HeaderValue::from_str(&self.content_type).map_err(|_| {
            HttpTransportError::InvalidHeader {
                name: CONTENT_TYPE.to_string(),
            }
        })?;
        map.insert(CONTENT_TYPE, content_type);
        for (name, value) in &self.headers {
            let invalid = || HttpTransportError::InvalidHeader { name: name.clone() };
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            map.append(header, value);
        }
        Ok(map)
    }
}

/// Posts requests over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    options: HttpTransportOptions,
}

impl HttpTransport {
    /// Creates a transport with default options.
    ///
    /// # Errors
    ///
    /// Returns [`HttpTransportError::Client`] if the HTTP client cannot be
    /// initialised.
    pub fn new() -> Result<Self, HttpTransportError> {
        Self::with_options(HttpTransportOptions::default())
    }

    /// Creates a transport with `options`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpTransportError::InvalidHeader`] for a header that is not
    /// valid HTTP, or [`HttpTransportError::Client`] if the HTTP client
    /// cannot be initialised.
    pub fn with_options(options: HttpTransportOptions) -> Result<Self, HttpTransportError> {
        let mut builder = Client::builder().default_headers(options.header_map()?);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            options,
        })
    }

    /// The options this transport was built with.
    pub fn options(&self) -> &HttpTransportOptions {
        &self.options
    }
}

impl Transport for HttpTransport {
    fn post(&self, url: &str, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        debug!(url, request_bytes = request.len(), "http post");
        let response = self
            .client
            .post(url)
            .body(request.to_vec())
            .send()
            .map_err(|err| {
                warn!(url, error = %err, "http post failed");
                TransportError::new(url, HttpTransportError::from(err))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "http post rejected");
            return Err(TransportError::new(
                url,
                HttpTransportError::Status {
                    status: status.as_u16(),
                },
            ));
        }
        let body = response
            .bytes()
            .map_err(|err| TransportError::new(url, HttpTransportError::from(err)))?;
        debug!(url, response_bytes = body.len(), "http response");
        Ok(body.to_vec())
    }
}
