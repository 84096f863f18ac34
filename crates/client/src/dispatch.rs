//! The client invocation entry point.

use std::rc::Rc;

use protocol::{is_multicall, RipcordError, Value, MULTICALL};
use tracing::debug_span;

use crate::batch::{self, BatchEntry, BatchResult, MultiCall};
use crate::call::{Call, ResultCell};
use crate::proxy::Client;

/// The outcome of [`Client::call`].
#[derive(Debug)]
pub enum Reply {
    /// The call was executed; this is its (possibly fault) result.
    Value(Value),
    /// The session is recording; the call was deferred.
    Deferred(Call),
    /// `system.multiCall` was invoked without arguments.
    Composer(MultiCall),
    /// `system.multiCall` was invoked with explicit entries and executed.
    Batch(BatchResult),
}

impl Reply {
    /// Returns the result of an executed call.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the deferred call.
    pub fn into_call(self) -> Option<Call> {
        match self {
            Self::Deferred(call) => Some(call),
            _ => None,
        }
    }

    /// Returns the batch composer.
    pub fn into_composer(self) -> Option<MultiCall> {
        match self {
            Self::Composer(composer) => Some(composer),
            _ => None,
        }
    }

    /// Returns the results of an explicit batch.
    pub fn into_batch(self) -> Option<BatchResult> {
        match self {
            Self::Batch(result) => Some(result),
            _ => None,
        }
    }

    /// Binds this reply to a result cell.
    ///
    /// A deferred call yields its own cell, filled when the batch completes;
    /// an executed call or batch yields a cell that is already filled. A
    /// composer has no result.
    pub fn bind(&self) -> Option<ResultCell> {
        match self {
            Self::Value(value) => Some(ResultCell::filled(value.clone())),
            Self::Deferred(call) => Some(call.bind()),
            Self::Batch(result) => Some(ResultCell::filled(result.to_value())),
            Self::Composer(_) => None,
        }
    }
}

impl Client {
    /// Invokes `name` (resolved against this proxy's namespace) with `args`.
    ///
    /// - `system.multiCall` / `system.multicall` without arguments returns a
    ///   [`Reply::Composer`]; with arguments the arguments are submitted as
    ///   one batch and a [`Reply::Batch`] is returned.
    /// - While the root session is recording, the call is deferred and a
    ///   [`Reply::Deferred`] is returned immediately.
    /// - Otherwise the call performs one round trip and returns
    ///   [`Reply::Value`].
    ///
    /// # Errors
    ///
    /// Returns transport and codec errors, `InvalidArgument` for malformed
    /// batch entries, and [`RipcordError::RemoteFault`] when the server
    /// answers a single call with a fault and fault-raising is enabled.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Reply, RipcordError> {
        let method = self.resolve(name);
        let session = self.session();
        let span = debug_span!("rpc_call", session = %session.id, method = %method);
        let _guard = span.enter();

        if is_multicall(&method) {
            if args.is_empty() {
                return Ok(Reply::Composer(MultiCall::new(Rc::clone(session), method)));
            }
            let entries = batch::entries_from_args(args);
            return batch::execute_batch(session, &method, entries).map(Reply::Batch);
        }

        if session.is_recording() {
            let call = Call::new(method, args);
            session.enqueue(call.clone());
            return Ok(Reply::Deferred(call));
        }

        session.round_trip(&method, &args).map(Reply::Value)
    }

    /// Returns the `system.multiCall` batch composer for this client.
    pub fn multi_call(&self) -> MultiCall {
        MultiCall::new(Rc::clone(self.session()), MULTICALL)
    }

    /// Submits explicitly keyed entries as one `system.multiCall` batch.
    ///
    /// Results come back under the same keys, in the same order. Any
    /// recording in progress is stopped and its pending list discarded.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` naming the first entry that is not a call,
    /// and otherwise the errors of [`crate::MultiCall::execute`].
    pub fn multi_call_with<K, E, I>(&self, entries: I) -> Result<BatchResult, RipcordError>
    where
        K: Into<String>,
        E: Into<BatchEntry>,
        I: IntoIterator<Item = (K, E)>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, entry)| (key.into(), entry.into()))
            .collect();
        batch::execute_batch(self.session(), MULTICALL, entries)
    }
}
