//! Core domain for Ripcord RPC.
//!
//! This crate contains the value model, the fault model, the error taxonomy,
//! batch call descriptors, codec output options, and the port traits used
//! throughout the client and server. Infrastructure crates implement the
//! traits defined here; they never add dispatch rules.
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** This crate has no I/O dependencies.
//! It defines *what* a codec and a transport must do; adapter crates define
//! *how*.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`value`] | Dynamic [`Value`] model and wire-type helpers |
//! | [`faults`] | [`Fault`] and the fault [`codes`] |
//! | [`errors`] | [`RipcordError`], [`CodecError`], [`TransportError`] |
//! | [`calls`] | Multi-call [`CallDescriptor`] and method-name constants |
//! | [`identifiers`] | Newtype identifiers (`MethodName`, `SessionId`, etc.) |
//! | [`options`] | [`OutputOptions`] threaded into every codec call |
//! | [`ports`] | [`Codec`] and [`Transport`] traits |

pub mod calls;
pub mod errors;
pub mod faults;
pub mod identifiers;
pub mod options;
pub mod ports;
pub mod value;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use calls::{is_multicall, CallDescriptor, MULTICALL, MULTICALL_LOWER};
pub use errors::{CodecError, RipcordError, TransportError};
pub use faults::{codes, Fault};
pub use identifiers::{MethodName, Namespace, SessionId, NAMESPACE_SEPARATOR};
pub use options::{Escaping, OutputOptions, OutputType, Verbosity, Version, OPTION_KEYS};
pub use ports::{Codec, DecodedRequest, Transport};
pub use value::{base64, binary, datetime, timestamp, Members, Value, WireType};

/// Prefix of the reserved method surface handled by the server itself.
pub const SYSTEM_PREFIX: &str = "system.";
