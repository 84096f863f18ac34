//! The client side of the multi-call batch protocol.
//!
//! A batch goes through four steps:
//!
//! 1. **Compose**: every entry (a recorded [`Call`] or a `{methodName,
//!    params}` struct) is validated, assigned its zero-based index, and
//!    encoded into a position-preserving descriptor.
//! 2. **Transmit**: the descriptor list is sent as the single argument of
//!    one `system.multiCall` invocation.
//! 3. **Unpack**: the i-th response entry belongs to the entry with index
//!    i. Successful results arrive wrapped in a one-element array and are
//!    unwrapped; faults are kept as data.
//! 4. **Bind**: each result is written to its call's [`ResultCell`] and to
//!    the [`BatchResult`] under the caller's key.
//!
//! [`ResultCell`]: crate::ResultCell

use std::fmt;
use std::rc::Rc;

use protocol::{CallDescriptor, CodecError, Fault, RipcordError, Value};
use tracing::{debug, info_span, warn};

use crate::call::Call;
use crate::session::Session;

// ---------------------------------------------------------------------------
// Entries and results
// ---------------------------------------------------------------------------

/// One entry of an explicitly composed batch.
#[derive(Debug, Clone)]
pub enum BatchEntry {
    /// A recorded or hand-built call; its result cell is filled on completion.
    Call(Call),
    /// A `{methodName, params}` struct. Validated when the batch is composed.
    Descriptor(Value),
}

impl From<Call> for BatchEntry {
    fn from(call: Call) -> Self {
        Self::Call(call)
    }
}

impl From<Value> for BatchEntry {
    fn from(value: Value) -> Self {
        Self::Descriptor(value)
    }
}

impl From<CallDescriptor> for BatchEntry {
    fn from(descriptor: CallDescriptor) -> Self {
        Self::Descriptor(descriptor.to_value())
    }
}

/// Results of one batch, keyed and ordered as the entries were submitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    entries: Vec<(String, Value)>,
}

impl BatchResult {
    /// Looks up the result for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Number of results.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the batch was empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(key, result)` pairs in submission order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates the keys in submission order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Iterates the per-call faults, if any.
    pub fn faults(&self) -> impl Iterator<Item = (&str, Fault)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| Fault::from_value(v).map(|fault| (k.as_str(), fault)))
    }

    /// Consumes the result, returning the `(key, result)` pairs.
    pub fn into_entries(self) -> Vec<(String, Value)> {
        self.entries
    }

    /// Consumes the result, returning the values in submission order.
    pub fn into_values(self) -> Vec<Value> {
        self.entries.into_iter().map(|(_, v)| v).collect()
    }

    /// Returns the results as a struct keyed by entry key.
    pub fn to_value(&self) -> Value {
        self.entries.iter().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Composer
// ---------------------------------------------------------------------------

/// The batch composer returned by invoking `system.multiCall` without
/// arguments.
///
/// [`MultiCall::start`] puts the root session into recording mode: every
/// invocation through any proxy of that client returns a deferred [`Call`].
/// [`MultiCall::execute`] flushes the recorded calls in one round trip.
pub struct MultiCall {
    session: Rc<Session>,
    method: String,
}

impl MultiCall {
    pub(crate) fn new(session: Rc<Session>, method: impl Into<String>) -> Self {
        Self {
            session,
            method: method.into(),
        }
    }

    /// The multi-call method name this composer submits to.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Starts recording deferred calls on the root session.
    pub fn start(&self) {
        self.session.start_recording();
    }

    /// Returns `true` while the root session is recording.
    pub fn is_recording(&self) -> bool {
        self.session.is_recording()
    }

    /// Number of calls recorded so far.
    pub fn pending(&self) -> usize {
        self.session.pending_len()
    }

    /// Submits every recorded call in one round trip.
    ///
    /// Results are keyed by position (`"0"`, `"1"`, ...). Recording stops
    /// and the pending list is cleared before the entries are validated; a
    /// new batch needs another [`MultiCall::start`].
    ///
    /// # Errors
    ///
    /// Returns the transport, codec, or (with fault-raising enabled) remote
    /// fault error of the batch round trip itself. Per-call faults are
    /// returned as data.
    pub fn execute(&self) -> Result<BatchResult, RipcordError> {
        let entries = self
            .session
            .pending()
            .into_iter()
            .enumerate()
            .map(|(i, call)| (i.to_string(), BatchEntry::Call(call)))
            .collect();
        execute_batch(&self.session, &self.method, entries)
    }
}

impl fmt::Debug for MultiCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiCall")
            .field("session", &self.session.id)
            .field("method", &self.method)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Protocol steps
// ---------------------------------------------------------------------------

pub(crate) struct Slot {
    pub(crate) key: String,
    pub(crate) call: Option<Call>,
}

/// A batch ready for transmission.
pub(crate) struct ComposedBatch {
    pub(crate) descriptors: Vec<Value>,
    pub(crate) slots: Vec<Slot>,
}

/// Validates and indexes the entries.
///
/// Calls are only enrolled once every entry has validated, so a rejected
/// batch leaves their indices untouched.
///
/// # Errors
///
/// Returns `InvalidArgument` (`NOT_RIPCORD_CALL`) naming the key of the first
/// entry that is neither a call nor a `{methodName, params}` struct.
pub(crate) fn compose(entries: Vec<(String, BatchEntry)>) -> Result<ComposedBatch, RipcordError> {
    let mut descriptors = Vec::with_capacity(entries.len());
    let mut slots = Vec::with_capacity(entries.len());
    for (key, entry) in entries {
        let (descriptor, call) = match entry {
            BatchEntry::Call(call) => (call.descriptor(), Some(call)),
            BatchEntry::Descriptor(value) => {
                let descriptor = CallDescriptor::from_value(&value).ok_or_else(|| {
                    warn!(slot = %key, "rejected batch entry");
                    RipcordError::not_ripcord_call(&key)
                })?;
                (descriptor, None)
            }
        };
        descriptors.push(descriptor.to_value());
        slots.push(Slot { key, call });
    }
    for (index, slot) in slots.iter().enumerate() {
        if let Some(call) = &slot.call {
            call.enroll(index);
        }
    }
    Ok(ComposedBatch { descriptors, slots })
}

/// Removes the single-element wrapper around a successful batched result.
///
/// Anything else (a fault struct, an unexpected shape) passes through.
pub(crate) fn unwrap_result(value: Value) -> Value {
    match value {
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    }
}

/// Maps the decoded batch response back onto the composed slots.
fn unpack(
    session: &Session,
    response: Value,
    slots: Vec<Slot>,
) -> Result<BatchResult, RipcordError> {
    let results = match response {
        Value::Array(items) => {
            if items.len() != slots.len() {
                return Err(CodecError::malformed(format!(
                    "batch response has {} entries, expected {}",
                    items.len(),
                    slots.len()
                ))
                .into());
            }
            items
        }
        // The whole batch was rejected; every call reports the same fault.
        fault if session.is_fault(&fault) => vec![fault; slots.len()],
        other => {
            return Err(CodecError::malformed(format!(
                "batch response is a {}, expected an array",
                other.wire_type()
            ))
            .into())
        }
    };

    let entries = slots
        .into_iter()
        .zip(results)
        .map(|(slot, raw)| {
            let value = session.auto_decode(unwrap_result(raw));
            if let Some(call) = &slot.call {
                if !call.complete(value.clone()) {
                    debug!(slot = %slot.key, "result cell already filled");
                }
            }
            (slot.key, value)
        })
        .collect();
    Ok(BatchResult { entries })
}

/// Composes, transmits, unpacks, and binds one batch.
pub(crate) fn execute_batch(
    session: &Session,
    method: &str,
    entries: Vec<(String, BatchEntry)>,
) -> Result<BatchResult, RipcordError> {
    let span = info_span!("multicall", session = %session.id, method, calls = entries.len());
    let _guard = span.enter();

    // Recording ends with the flush, whether or not the entries validate.
    session.reset();
    let composed = compose(entries)?;

    let response = session.exchange(method, &[Value::Array(composed.descriptors)])?;
    session.check_fault(method, &response)?;
    unpack(session, response, composed.slots)
}

/// Reads explicit batch entries from the arguments of a `system.multiCall`
/// invocation.
///
/// A single array argument is a list of entries keyed by position; a single
/// struct argument that is not itself a call maps keys to entries; otherwise
/// each argument is one entry keyed by position.
pub(crate) fn entries_from_args(mut args: Vec<Value>) -> Vec<(String, BatchEntry)> {
    let positional = |items: Vec<Value>| -> Vec<(String, BatchEntry)> {
        items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), BatchEntry::Descriptor(v)))
            .collect()
    };
    if args.len() == 1 {
        match args.remove(0) {
            Value::Array(items) => return positional(items),
            Value::Struct(members) if !members.contains_key(protocol::calls::METHOD_NAME) => {
                return members
                    .into_iter()
                    .map(|(k, v)| (k, BatchEntry::Descriptor(v)))
                    .collect();
            }
            single => return positional(vec![single]),
        }
    }
    positional(args)
}
