//! Deferred calls and their result cells.
//!
//! While a session is recording, every invocation returns a [`Call`] instead
//! of executing. The handle is shared between the caller and the session's
//! pending list: the batch assigns its index when the request is composed
//! and fills its [`ResultCell`] exactly once when the response is unpacked.

use std::cell::{Cell, OnceCell};
use std::fmt;
use std::rc::Rc;

use protocol::{CallDescriptor, Value};

/// A single-assignment slot receiving the result of a deferred call.
///
/// Clones share the same slot.
#[derive(Clone, Default)]
pub struct ResultCell(Rc<OnceCell<Value>>);

impl ResultCell {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cell that already holds `value`.
    pub fn filled(value: Value) -> Self {
        let cell = Self::new();
        cell.fill(value);
        cell
    }

    /// Returns a copy of the value, or `None` if the batch has not completed.
    pub fn get(&self) -> Option<Value> {
        self.0.get().cloned()
    }

    /// Returns `true` once the cell holds a value.
    pub fn is_filled(&self) -> bool {
        self.0.get().is_some()
    }

    /// Stores `value` unless the cell is already filled. Returns whether the
    /// value was stored.
    pub(crate) fn fill(&self, value: Value) -> bool {
        self.0.set(value).is_ok()
    }
}

impl fmt::Debug for ResultCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResultCell").field(&self.0.get()).finish()
    }
}

struct CallState {
    method: String,
    params: Vec<Value>,
    index: Cell<Option<usize>>,
    result: ResultCell,
}

/// A recorded, not-yet-executed method invocation.
///
/// `Call` is a cheap handle: clones refer to the same call, index, and
/// result cell.
#[derive(Clone)]
pub struct Call {
    state: Rc<CallState>,
}

impl Call {
    /// Encodes a call for later submission in a batch.
    ///
    /// Calls built this way can be passed to
    /// [`crate::Client::multi_call_with`] alongside recorded ones.
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            state: Rc::new(CallState {
                method: method.into(),
                params,
                index: Cell::new(None),
                result: ResultCell::new(),
            }),
        }
    }

    /// The fully-qualified method name.
    pub fn method(&self) -> &str {
        &self.state.method
    }

    /// The positional parameters.
    pub fn params(&self) -> &[Value] {
        &self.state.params
    }

    /// The call's position in the batch it was last composed into.
    pub fn index(&self) -> Option<usize> {
        self.state.index.get()
    }

    /// Returns the cell that receives this call's result.
    pub fn bind(&self) -> ResultCell {
        self.state.result.clone()
    }

    /// The result, once the batch has completed.
    pub fn result(&self) -> Option<Value> {
        self.state.result.get()
    }

    /// The `{methodName, params}` descriptor sent on the wire.
    pub fn descriptor(&self) -> CallDescriptor {
        CallDescriptor::new(self.state.method.clone(), self.state.params.clone())
    }

    pub(crate) fn enroll(&self, index: usize) {
        self.state.index.set(Some(index));
    }

    pub(crate) fn complete(&self, value: Value) -> bool {
        self.state.result.fill(value)
    }

    /// Returns `true` if both handles refer to the same call.
    pub fn same_call(&self, other: &Call) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("method", &self.state.method)
            .field("params", &self.state.params)
            .field("index", &self.state.index.get())
            .field("result", &self.state.result)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use protocol::params;

    use super::*;

    #[test]
    fn cell_is_single_assignment() {
        let cell = ResultCell::new();
        assert!(!cell.is_filled());
        assert!(cell.fill(Value::Int(1)));
        assert!(!cell.fill(Value::Int(2)));
        assert_eq!(cell.get(), Some(Value::Int(1)));
    }

    #[test]
    fn clones_share_index_and_result() {
        let call = Call::new("add", params![1, 2]);
        let handle = call.clone();
        let bound = call.bind();

        call.enroll(3);
        assert!(call.complete(Value::Int(3)));

        assert!(handle.same_call(&call));
        assert_eq!(handle.index(), Some(3));
        assert_eq!(handle.result(), Some(Value::Int(3)));
        assert_eq!(bound.get(), Some(Value::Int(3)));
    }

    #[test]
    fn descriptor_carries_method_and_params() {
        let call = Call::new("math.add", params![1, 2]);
        assert_eq!(call.descriptor(), CallDescriptor::new("math.add", params![1, 2]));
        assert_eq!(call.index(), None);
    }
}
