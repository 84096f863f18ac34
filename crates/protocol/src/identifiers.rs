//! Newtype identifiers.
//!
//! Method names and namespaces are distinct newtypes wrapping a `String` so a
//! namespace prefix can never be passed where a fully-qualified method name is
//! expected. Sessions get a UUID so that every span emitted by one root
//! client can be correlated.

use uuid::Uuid;

/// Separator between namespace segments and the method name.
pub const NAMESPACE_SEPARATOR: char = '.';

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is
            /// empty or contains whitespace.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() || v.chars().any(char::is_whitespace) {
                    None
                } else {
                    Some(Self(v))
                }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// A fully-qualified RPC method name (`namespace.method` or bare `method`).
    MethodName
}

string_id! {
    /// A dotted namespace prefix (e.g. `"system"`, `"blog.posts"`).
    Namespace
}

impl Namespace {
    /// Returns the method name `self.method`.
    pub fn qualify(&self, method: &str) -> Option<MethodName> {
        MethodName::new(format!("{}{NAMESPACE_SEPARATOR}{method}", self.0))
    }
}

/// Identifies one root client session.
///
/// Generated fresh for every root client; recorded on every span emitted by
/// the client and its namespace proxies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a new random session identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
