//! The dynamic value model carried by RPC calls and results.
//!
//! [`Value`] mirrors the XML-RPC data model: scalars, arrays, and structs,
//! plus two *wire-typed* scalars ([`Value::Base64`] and [`Value::DateTime`])
//! that hold the textual form a codec read off the wire. The native
//! counterparts ([`Value::Binary`] and [`Value::Timestamp`]) are what callers
//! get back once automatic decoding is applied (see [`binary`] and
//! [`timestamp`]).

use ::base64::engine::general_purpose::STANDARD;
use ::base64::Engine;
use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;

use crate::RipcordError;

/// Compact ISO 8601 layout used by XML-RPC `dateTime.iso8601` values.
pub const ISO8601_COMPACT: &str = "%Y%m%dT%H:%M:%S";

/// Struct members, kept in insertion order.
pub type Members = IndexMap<String, Value>;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A dynamically-typed RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absence of a value.
    Nil,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A double-precision float.
    Double(f64),
    /// A text string.
    String(String),
    /// Base64 text as received from the wire.
    Base64(String),
    /// An ISO 8601 datetime as received from the wire.
    DateTime(String),
    /// Decoded binary data.
    Binary(Vec<u8>),
    /// A decoded point in time, in seconds since the unix epoch.
    Timestamp(i64),
    /// An ordered sequence of values.
    Array(Vec<Value>),
    /// Named members, in the order they were inserted or decoded.
    Struct(Members),
}

/// Wire-type classification of a [`Value`], as reported by
/// [`crate::Codec::type_of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    /// `nil`
    Nil,
    /// `boolean`
    Boolean,
    /// `int`
    Int,
    /// `double`
    Double,
    /// `string`
    String,
    /// `base64`
    Base64,
    /// `dateTime.iso8601`
    DateTime,
    /// `array`
    Array,
    /// `struct`
    Struct,
}

impl WireType {
    /// Returns the conventional XML-RPC type name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Double => "double",
            Self::String => "string",
            Self::Base64 => "base64",
            Self::DateTime => "datetime",
            Self::Array => "array",
            Self::Struct => "struct",
        }
    }
}

impl std::fmt::Display for WireType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Returns the wire type this value is encoded as.
    ///
    /// Native binary data and timestamps are sent as `base64` and
    /// `dateTime.iso8601` respectively.
    pub fn wire_type(&self) -> WireType {
        match self {
            Self::Nil => WireType::Nil,
            Self::Bool(_) => WireType::Boolean,
            Self::Int(_) => WireType::Int,
            Self::Double(_) => WireType::Double,
            Self::String(_) => WireType::String,
            Self::Base64(_) | Self::Binary(_) => WireType::Base64,
            Self::DateTime(_) | Self::Timestamp(_) => WireType::DateTime,
            Self::Array(_) => WireType::Array,
            Self::Struct(_) => WireType::Struct,
        }
    }

    /// Returns the integer if this is a [`Value::Int`].
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float if this is a [`Value::Double`] or [`Value::Int`].
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns the boolean if this is a [`Value::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text if this is a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the elements if this is a [`Value::Array`].
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the members if this is a [`Value::Struct`].
    pub fn as_struct(&self) -> Option<&Members> {
        match self {
            Self::Struct(v) => Some(v),
            _ => None,
        }
    }

    /// Looks up a struct member by name.
    pub fn get(&self, member: &str) -> Option<&Value> {
        self.as_struct().and_then(|m| m.get(member))
    }

    /// Returns `true` for [`Value::Nil`].
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<Members> for Value {
    fn from(v: Members) -> Self {
        Self::Struct(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Nil, Into::into)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Struct(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Builds a `Vec<Value>` parameter list from heterogeneous expressions.
///
/// ```
/// use protocol::{params, Value};
///
/// let args = params![1, "two", 3.0];
/// assert_eq!(args[1], Value::String("two".into()));
/// ```
#[macro_export]
macro_rules! params {
    () => { ::std::vec::Vec::<$crate::Value>::new() };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($arg)),+]
    };
}

// ---------------------------------------------------------------------------
// Wire-type helpers
// ---------------------------------------------------------------------------

/// Builds a wire-typed datetime from a UTC time.
pub fn datetime(at: DateTime<Utc>) -> Value {
    Value::DateTime(at.format(ISO8601_COMPACT).to_string())
}

/// Builds a wire-typed base64 value from raw bytes.
pub fn base64(data: &[u8]) -> Value {
    Value::Base64(STANDARD.encode(data))
}

/// Converts a datetime value into a UTC time.
///
/// Accepts wire-typed datetimes in compact ISO 8601 or RFC 3339 form and
/// already-decoded timestamps.
///
/// # Errors
///
/// Returns [`RipcordError::InvalidArgument`] with
/// [`crate::codes::NOT_DATE_TIME`] if `value` is not a datetime or its text
/// cannot be parsed.
pub fn timestamp(value: &Value) -> Result<DateTime<Utc>, RipcordError> {
    match value {
        Value::DateTime(text) => NaiveDateTime::parse_from_str(text, ISO8601_COMPACT)
            .map(|naive| naive.and_utc())
            .or_else(|_| DateTime::parse_from_rfc3339(text).map(|dt| dt.with_timezone(&Utc)))
            .map_err(|_| RipcordError::not_date_time()),
        Value::Timestamp(secs) => {
            DateTime::from_timestamp(*secs, 0).ok_or_else(RipcordError::not_date_time)
        }
        _ => Err(RipcordError::not_date_time()),
    }
}

/// Converts a base64 value into raw bytes.
///
/// # Errors
///
/// Returns [`RipcordError::InvalidArgument`] with
/// [`crate::codes::NOT_BASE64`] if `value` is not base64 or its text is not
/// valid base64.
pub fn binary(value: &Value) -> Result<Vec<u8>, RipcordError> {
    match value {
        Value::Base64(text) => STANDARD
            .decode(text.trim())
            .map_err(|_| RipcordError::not_base64()),
        Value::Binary(data) => Ok(data.clone()),
        _ => Err(RipcordError::not_base64()),
    }
}
