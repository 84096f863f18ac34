//! Ripcord JSON codec adapter.
//!
//! Implements [`protocol::Codec`] with JSON payloads:
//!
//! - A request is an object `{"methodName": <string>, "params": [...]}`.
//! - A response is the encoded result value; a fault is the struct
//!   `{"faultCode": <int>, "faultString": <string>}`.
//!
//! ## Value mapping
//!
//! | [`Value`] | JSON |
//! |-----------|------|
//! | `Nil` | `null` |
//! | `Bool`, `Int`, `Double`, `String` | native scalar |
//! | `Base64`, `Binary` | `{"$base64": "<text>"}` |
//! | `DateTime`, `Timestamp` | `{"$datetime": "<YYYYMMDDTHH:MM:SS>"}` |
//! | `Array` | array |
//! | `Struct` | object |
//!
//! ## Output options
//!
//! `verbosity` selects compact, newline-only, or indented output.
//! `escaping` honours `non-ascii` and `markup` (emitted as `\uXXXX`
//! escapes); control characters are always escaped. Only UTF-8 is
//! supported as `encoding`. `version` and `output_type` describe XML
//! vocabularies and do not affect JSON payloads.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** The dispatch engine sees only [`protocol::Codec`].

use protocol::{
    calls, Codec, CodecError, DecodedRequest, Escaping, Members, OutputOptions, Value, Verbosity,
};
use serde::Serialize;
use serde_json::ser::{CompactFormatter, PrettyFormatter, Serializer};
use serde_json::{Map, Number, Value as Json};

/// Object key tagging base64 payloads.
pub const BASE64_TAG: &str = "$base64";
/// Object key tagging datetime payloads.
pub const DATETIME_TAG: &str = "$datetime";

/// The JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Creates the codec.
    pub fn new() -> Self {
        Self
    }
}

impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode_request(
        &self,
        method: &str,
        params: &[Value],
        options: &OutputOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let mut request = Map::new();
        request.insert(calls::METHOD_NAME.to_string(), Json::String(method.to_string()));
        request.insert(
            calls::PARAMS.to_string(),
            Json::Array(params.iter().map(to_json).collect::<Result<_, _>>()?),
        );
        write(&Json::Object(request), options)
    }

    fn decode_request(
        &self,
        payload: &[u8],
        options: &OutputOptions,
    ) -> Result<DecodedRequest, CodecError> {
        check_encoding(&options.encoding)?;
        let Json::Object(mut request) = parse(payload)? else {
            return Err(CodecError::malformed("request is not a JSON object"));
        };
        let method = match request.remove(calls::METHOD_NAME) {
            None | Some(Json::Null) => None,
            Some(Json::String(name)) => Some(name),
            Some(_) => return Err(CodecError::malformed("methodName is not a string")),
        };
        let params = match request.remove(calls::PARAMS) {
            None | Some(Json::Null) => Vec::new(),
            Some(Json::Array(items)) => items.into_iter().map(from_json).collect(),
            Some(_) => return Err(CodecError::malformed("params is not an array")),
        };
        Ok(DecodedRequest { method, params })
    }

    fn encode_response(
        &self,
        value: &Value,
        options: &OutputOptions,
    ) -> Result<Vec<u8>, CodecError> {
        write(&to_json(value)?, options)
    }

    fn decode_response(&self, payload: &[u8], encoding: &str) -> Result<Value, CodecError> {
        check_encoding(encoding)?;
        Ok(from_json(parse(payload)?))
    }
}

// ---------------------------------------------------------------------------
// Value mapping
// ---------------------------------------------------------------------------

fn tagged(tag: &str, text: String) -> Json {
    let mut object = Map::new();
    object.insert(tag.to_string(), Json::String(text));
    Json::Object(object)
}

fn to_json(value: &Value) -> Result<Json, CodecError> {
    Ok(match value {
        Value::Nil => Json::Null,
        Value::Bool(v) => Json::Bool(*v),
        Value::Int(v) => Json::Number((*v).into()),
        Value::Double(v) => Json::Number(Number::from_f64(*v).ok_or_else(|| {
            CodecError::Unrepresentable {
                message: format!("non-finite double {v}"),
            }
        })?),
        Value::String(v) => Json::String(v.clone()),
        Value::Base64(text) => tagged(BASE64_TAG, text.clone()),
        Value::Binary(data) => match protocol::base64(data) {
            Value::Base64(text) => tagged(BASE64_TAG, text),
            other => return to_json(&other),
        },
        Value::DateTime(text) => tagged(DATETIME_TAG, text.clone()),
        Value::Timestamp(_) => {
            let at = protocol::timestamp(value).map_err(|err| CodecError::Unrepresentable {
                message: err.to_string(),
            })?;
            match protocol::datetime(at) {
                Value::DateTime(text) => tagged(DATETIME_TAG, text),
                other => return to_json(&other),
            }
        }
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect::<Result<_, _>>()?),
        Value::Struct(members) => Json::Object(
            members
                .iter()
                .map(|(k, v)| Ok((k.clone(), to_json(v)?)))
                .collect::<Result<_, CodecError>>()?,
        ),
    })
}

fn from_json(json: Json) -> Value {
    match json {
        Json::Null => Value::Nil,
        Json::Bool(v) => Value::Bool(v),
        Json::Number(n) => match n.as_i64() {
            Some(v) => Value::Int(v),
            None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(v) => Value::String(v),
        Json::Array(items) => Value::Array(items.into_iter().map(from_json).collect()),
        Json::Object(object) => from_object(object),
    }
}

fn from_object(object: Map<String, Json>) -> Value {
    if object.len() == 1 {
        if let Some(Json::String(text)) = object.get(BASE64_TAG) {
            return Value::Base64(text.clone());
        }
        if let Some(Json::String(text)) = object.get(DATETIME_TAG) {
            return Value::DateTime(text.clone());
        }
    }
    let members: Members = object
        .into_iter()
        .map(|(k, v)| (k, from_json(v)))
        .collect();
    Value::Struct(members)
}

// ---------------------------------------------------------------------------
// Framing
// ---------------------------------------------------------------------------

fn check_encoding(encoding: &str) -> Result<(), CodecError> {
    match encoding.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => Ok(()),
        _ => Err(CodecError::UnsupportedEncoding {
            encoding: encoding.to_string(),
        }),
    }
}

fn parse(payload: &[u8]) -> Result<Json, CodecError> {
    serde_json::from_slice(payload).map_err(|err| CodecError::malformed(err.to_string()))
}

fn write(json: &Json, options: &OutputOptions) -> Result<Vec<u8>, CodecError> {
    check_encoding(&options.encoding)?;
    let mut out = Vec::new();
    let result = match options.verbosity {
        Verbosity::NoWhiteSpace => {
            json.serialize(&mut Serializer::with_formatter(&mut out, CompactFormatter))
        }
        Verbosity::NewlinesOnly => json.serialize(&mut Serializer::with_formatter(
            &mut out,
            PrettyFormatter::with_indent(b""),
        )),
        Verbosity::Pretty => json.serialize(&mut Serializer::with_formatter(
            &mut out,
            PrettyFormatter::with_indent(b"  "),
        )),
    };
    result.map_err(|err| CodecError::Unrepresentable {
        message: err.to_string(),
    })?;
    let text = String::from_utf8(out).map_err(|err| CodecError::Unrepresentable {
        message: err.to_string(),
    })?;
    Ok(escape(&text, options).into_bytes())
}

/// Applies `non-ascii` and `markup` escaping.
///
/// Both classes of character can only occur inside JSON strings, so the
/// serialized text is rewritten as a whole.
fn escape(text: &str, options: &OutputOptions) -> String {
    let non_ascii = options.escapes(Escaping::NonAscii);
    let markup = options.escapes(Escaping::Markup);
    if !non_ascii && !markup {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let escape = (markup && matches!(c, '<' | '>' | '&')) || (non_ascii && !c.is_ascii());
        if escape {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        } else {
            out.push(c);
        }
    }
    out
}
