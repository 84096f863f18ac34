//! Namespace proxies and client construction.
//!
//! A [`Client`] is a handle on one node of a namespace tree. The root node
//! has no prefix; [`Client::namespace`] returns (and memoizes) a child node
//! whose prefix is the parent's prefix plus one segment. Every node shares
//! the same root [`Session`], so `client.namespace("system")` and `client`
//! record into, and flush from, the same pending-call list.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use protocol::{
    Codec, OutputOptions, RipcordError, SessionId, Transport, Version, NAMESPACE_SEPARATOR,
};
use tracing::debug;

use crate::session::Session;

struct ProxyNode {
    prefix: Option<String>,
    session: Rc<Session>,
    children: RefCell<HashMap<String, Client>>,
}

/// An RPC client, or one namespace of it.
///
/// Cloning a `Client` yields another handle on the same node. Two handles
/// compare equal when they refer to the same node.
#[derive(Clone)]
pub struct Client {
    node: Rc<ProxyNode>,
}

impl Client {
    /// Starts building a client for the server at `url`.
    pub fn builder(url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(url)
    }

    fn with_prefix(session: Rc<Session>, prefix: Option<String>) -> Self {
        Self {
            node: Rc::new(ProxyNode {
                prefix,
                session,
                children: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub(crate) fn session(&self) -> &Rc<Session> {
        &self.node.session
    }

    // -----------------------------------------------------------------------
    // Namespace resolution
    // -----------------------------------------------------------------------

    /// Returns the child proxy for `segment`, creating it on first access.
    ///
    /// No I/O is performed. Repeated access returns the same proxy.
    pub fn namespace(&self, segment: &str) -> Client {
        if let Some(child) = self.node.children.borrow().get(segment) {
            return child.clone();
        }
        let prefix = self.resolve(segment);
        debug!(session = %self.node.session.id, namespace = %prefix, "namespace proxy created");
        let child = Self::with_prefix(Rc::clone(&self.node.session), Some(prefix));
        self.node
            .children
            .borrow_mut()
            .insert(segment.to_string(), child.clone());
        child
    }

    /// The dotted prefix of this proxy; `None` at the root.
    pub fn prefix(&self) -> Option<&str> {
        self.node.prefix.as_deref()
    }

    /// Resolves `name` against this proxy's prefix.
    pub fn resolve(&self, name: &str) -> String {
        match &self.node.prefix {
            Some(prefix) => format!("{prefix}{NAMESPACE_SEPARATOR}{name}"),
            None => name.to_string(),
        }
    }

    // -----------------------------------------------------------------------
    // Session surface
    // -----------------------------------------------------------------------

    /// Identifier of the root session, as recorded on tracing spans.
    pub fn session_id(&self) -> SessionId {
        self.node.session.id
    }

    /// The server endpoint.
    pub fn url(&self) -> &str {
        self.node.session.url()
    }

    /// The raw payload of the most recent request, for diagnostics.
    pub fn last_request(&self) -> Option<Vec<u8>> {
        self.node.session.last_request()
    }

    /// The raw payload of the most recent response, for diagnostics.
    pub fn last_response(&self) -> Option<Vec<u8>> {
        self.node.session.last_response()
    }

    /// Whether single-call faults are raised as [`RipcordError::RemoteFault`].
    pub fn raises_faults(&self) -> bool {
        self.node.session.raise_faults()
    }

    /// Enables or disables raising single-call faults.
    pub fn set_raise_faults(&self, enabled: bool) {
        self.node.session.set_raise_faults(enabled);
    }

    /// Whether base64 and datetime results are decoded automatically.
    pub fn auto_decodes(&self) -> bool {
        self.node.session.auto_decode_enabled()
    }

    /// Enables or disables automatic decoding of base64 and datetime results.
    pub fn set_auto_decode(&self, enabled: bool) {
        self.node.session.set_auto_decode(enabled);
    }

    /// A copy of the options handed to the codec.
    pub fn output_options(&self) -> OutputOptions {
        self.node.session.options()
    }

    /// Sets one codec output option. Returns `false` for unrecognised keys
    /// or invalid values.
    pub fn set_output_option(&self, key: &str, value: &str) -> bool {
        self.node.session.set_output_option(key, value)
    }
}

impl PartialEq for Client {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }
}

impl Eq for Client {}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("session", &self.node.session.id)
            .field("url", &self.node.session.url())
            .field("prefix", &self.node.prefix)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds a [`Client`].
///
/// A codec and a transport are required; everything else has a default.
pub struct ClientBuilder {
    url: String,
    codec: Option<Box<dyn Codec>>,
    transport: Option<Box<dyn Transport>>,
    options: OutputOptions,
    namespace: Option<String>,
    raise_faults: bool,
    auto_decode: bool,
}

impl ClientBuilder {
    fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            codec: None,
            transport: None,
            options: OutputOptions::default(),
            namespace: None,
            raise_faults: false,
            auto_decode: true,
        }
    }

    /// Sets the codec used to encode requests and decode responses.
    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Some(Box::new(codec));
        self
    }

    /// Sets the transport used to post requests.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Replaces the codec output options.
    pub fn options(mut self, options: OutputOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the wire vocabulary version.
    pub fn version(mut self, version: Version) -> Self {
        self.options.version = version;
        self
    }

    /// Prefixes every method called through the returned client.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Raise single-call faults as errors (default: off).
    pub fn raise_faults(mut self, enabled: bool) -> Self {
        self.raise_faults = enabled;
        self
    }

    /// Decode base64 and datetime results automatically (default: on).
    pub fn auto_decode(mut self, enabled: bool) -> Self {
        self.auto_decode = enabled;
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`RipcordError::Configuration`] if no codec or no transport
    /// was supplied.
    pub fn build(self) -> Result<Client, RipcordError> {
        let codec = self
            .codec
            .ok_or_else(|| RipcordError::configuration("no codec configured for the RPC client"))?;
        let transport = self.transport.ok_or_else(|| {
            RipcordError::configuration("no transport configured for the RPC client")
        })?;
        let session = Session::new(
            self.url,
            codec,
            transport,
            self.options,
            self.raise_faults,
            self.auto_decode,
        );
        debug!(session = %session.id, url = session.url(), "client created");
        let prefix = self.namespace.filter(|ns| !ns.is_empty());
        Ok(Client::with_prefix(Rc::new(session), prefix))
    }
}
