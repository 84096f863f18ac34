//! The root session shared by a client and all of its namespace proxies.
//!
//! Every piece of mutable client state lives here: the multi-call recording
//! flag, the pending-call list, and the last raw request/response kept for
//! diagnostics. Namespace proxies hold an `Rc<Session>`; they never copy any
//! of this state, so recording and flushing stay consistent across the whole
//! namespace tree.

use std::cell::{Cell, RefCell};

use protocol::{
    binary, timestamp, Codec, Fault, OutputOptions, RipcordError, SessionId, Transport, Value,
    WireType,
};
use tracing::{debug, info, warn};

use crate::call::Call;

#[derive(Debug, Default)]
struct SessionState {
    recording: bool,
    pending: Vec<Call>,
    last_request: Option<Vec<u8>>,
    last_response: Option<Vec<u8>>,
}

/// Root state of one client.
pub(crate) struct Session {
    pub(crate) id: SessionId,
    url: String,
    codec: Box<dyn Codec>,
    transport: Box<dyn Transport>,
    options: RefCell<OutputOptions>,
    raise_faults: Cell<bool>,
    auto_decode: Cell<bool>,
    state: RefCell<SessionState>,
}

impl Session {
    pub(crate) fn new(
        url: String,
        codec: Box<dyn Codec>,
        transport: Box<dyn Transport>,
        options: OutputOptions,
        raise_faults: bool,
        auto_decode: bool,
    ) -> Self {
        Self {
            id: SessionId::new_random(),
            url,
            codec,
            transport,
            options: RefCell::new(options),
            raise_faults: Cell::new(raise_faults),
            auto_decode: Cell::new(auto_decode),
            state: RefCell::new(SessionState::default()),
        }
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    pub(crate) fn options(&self) -> OutputOptions {
        self.options.borrow().clone()
    }

    pub(crate) fn set_output_option(&self, key: &str, value: &str) -> bool {
        self.options.borrow_mut().set_output_option(key, value)
    }

    pub(crate) fn raise_faults(&self) -> bool {
        self.raise_faults.get()
    }

    pub(crate) fn set_raise_faults(&self, enabled: bool) {
        self.raise_faults.set(enabled);
    }

    pub(crate) fn auto_decode_enabled(&self) -> bool {
        self.auto_decode.get()
    }

    pub(crate) fn set_auto_decode(&self, enabled: bool) {
        self.auto_decode.set(enabled);
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    pub(crate) fn start_recording(&self) {
        debug!(session = %self.id, "multi-call recording started");
        self.state.borrow_mut().recording = true;
    }

    pub(crate) fn is_recording(&self) -> bool {
        self.state.borrow().recording
    }

    pub(crate) fn enqueue(&self, call: Call) {
        let mut state = self.state.borrow_mut();
        debug!(
            session = %self.id,
            method = call.method(),
            position = state.pending.len(),
            "deferred call recorded"
        );
        state.pending.push(call);
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Returns a snapshot of the pending calls without clearing them.
    pub(crate) fn pending(&self) -> Vec<Call> {
        self.state.borrow().pending.clone()
    }

    /// Stops recording and drops every pending call.
    pub(crate) fn reset(&self) {
        let mut state = self.state.borrow_mut();
        state.recording = false;
        state.pending.clear();
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    pub(crate) fn last_request(&self) -> Option<Vec<u8>> {
        self.state.borrow().last_request.clone()
    }

    pub(crate) fn last_response(&self) -> Option<Vec<u8>> {
        self.state.borrow().last_response.clone()
    }

    // -----------------------------------------------------------------------
    // Round trips
    // -----------------------------------------------------------------------

    /// Encodes, posts, and decodes one call. No fault handling.
    pub(crate) fn exchange(&self, method: &str, params: &[Value]) -> Result<Value, RipcordError> {
        let options = self.options();
        let request = self.codec.encode_request(method, params, &options)?;
        info!(
            session = %self.id,
            method,
            url = %self.url,
            request_bytes = request.len(),
            "posting request"
        );
        {
            // A failed post leaves no response paired with this request.
            let mut state = self.state.borrow_mut();
            state.last_request = Some(request.clone());
            state.last_response = None;
        }

        let response = self.transport.post(&self.url, &request)?;
        debug!(session = %self.id, response_bytes = response.len(), "response received");
        self.state.borrow_mut().last_response = Some(response.clone());

        Ok(self.codec.decode_response(&response, &options.encoding)?)
    }

    /// Performs a single, non-batched call.
    ///
    /// A fault is raised as [`RipcordError::RemoteFault`] only when
    /// fault-raising is enabled; otherwise it is returned as a value.
    pub(crate) fn round_trip(&self, method: &str, params: &[Value]) -> Result<Value, RipcordError> {
        let result = self.exchange(method, params)?;
        self.check_fault(method, &result)?;
        Ok(self.auto_decode(result))
    }

    pub(crate) fn check_fault(&self, method: &str, result: &Value) -> Result<(), RipcordError> {
        if !self.codec.is_fault(result) {
            return Ok(());
        }
        let fault = Fault::from_value(result)
            .unwrap_or_else(|| Fault::new(protocol::codes::APPLICATION_ERROR, "unknown fault"));
        warn!(
            session = %self.id,
            method,
            code = fault.code,
            message = %fault.message,
            "remote fault"
        );
        if self.raise_faults() {
            Err(RipcordError::RemoteFault { fault })
        } else {
            Ok(())
        }
    }

    pub(crate) fn is_fault(&self, value: &Value) -> bool {
        self.codec.is_fault(value)
    }

    /// Converts wire-typed base64 and datetime scalars into their native
    /// forms when auto-decoding is enabled.
    ///
    /// A value whose wire text does not parse is returned unchanged.
    pub(crate) fn auto_decode(&self, value: Value) -> Value {
        if !self.auto_decode_enabled() {
            return value;
        }
        let decoded = match self.codec.type_of(&value) {
            WireType::Base64 => binary(&value).map(Value::Binary),
            WireType::DateTime => timestamp(&value).map(|at| Value::Timestamp(at.timestamp())),
            _ => return value,
        };
        decoded.unwrap_or_else(|err| {
            warn!(session = %self.id, error = %err, "automatic decoding skipped");
            value
        })
    }
}
