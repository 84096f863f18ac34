//! Ripcord RPC client.
//!
//! Lets a caller invoke remote methods as if they were local calls:
//!
//! - [`Client::call`] resolves a method name against the proxy's namespace
//!   and performs one blocking round trip through the configured
//!   [`protocol::Codec`] and [`protocol::Transport`].
//! - [`Client::namespace`] returns a memoized child proxy, so
//!   `client.namespace("system").call("listMethods", ...)` calls
//!   `system.listMethods`.
//! - [`MultiCall`] records deferred [`Call`]s and flushes them as a single
//!   `system.multiCall` round trip, binding each result to its
//!   [`ResultCell`].
//!
//! ## Threading
//!
//! A client and all of its namespace proxies share one root session through
//! `Rc`. Handles are `!Send`: a session must not be shared
//! across concurrent callers.
//!
//! ## Example
//!
//! ```no_run
//! # fn demo(client: client::Client) -> Result<(), protocol::RipcordError> {
//! use protocol::params;
//!
//! let batch = client.multi_call();
//! batch.start();
//! let a = client.call("add", params![1, 2])?.into_call().unwrap().bind();
//! let b = client.call("add", params![3, 4])?.into_call().unwrap().bind();
//! batch.execute()?;
//! assert_eq!(a.get(), Some(protocol::Value::Int(3)));
//! assert_eq!(b.get(), Some(protocol::Value::Int(7)));
//! # Ok(())
//! # }
//! ```

mod batch;
mod call;
mod dispatch;
mod proxy;
mod session;

#[cfg(test)]
mod tests;

pub use batch::{BatchEntry, BatchResult, MultiCall};
pub use call::{Call, ResultCell};
pub use dispatch::Reply;
pub use proxy::{Client, ClientBuilder};
