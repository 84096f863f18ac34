//! Codec output options.
//!
//! [`OutputOptions`] is threaded unchanged from client or server
//! configuration into every codec call. The option keys and accepted values
//! follow the `xmlrpc-epi` output-option vocabulary:
//!
//! | Key | Values |
//! |-----|--------|
//! | `output_type` | `xml` (default), `php` |
//! | `verbosity` | `no_white_space`, `newlines_only`, `pretty` (default) |
//! | `escaping` | one or more of `cdata`, `non-ascii`, `non-print`, `markup` |
//! | `version` | `xmlrpc`, `soap 1.1`, `simple`, `auto` |
//! | `encoding` | any character-encoding label (default `utf-8`) |

use serde::Serialize;

/// Recognised option keys, in documentation order.
pub const OPTION_KEYS: [&str; 5] = ["output_type", "verbosity", "escaping", "version", "encoding"];

/// Whether results are returned encoded or as native data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    /// Encoded payload.
    Xml,
    /// Native data, no encoding.
    Php,
}

/// Compactness of the generated payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// No insignificant whitespace at all.
    NoWhiteSpace,
    /// Line breaks between elements, no indentation.
    NewlinesOnly,
    /// Line breaks and indentation.
    Pretty,
}

/// Characters escaped by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Escaping {
    /// Wrap text in CDATA sections.
    Cdata,
    /// Escape characters outside ASCII.
    NonAscii,
    /// Escape non-printable characters.
    NonPrint,
    /// Escape markup characters (`<`, `>`, `&`).
    Markup,
}

/// Vocabulary version spoken on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Version {
    /// XML-RPC.
    #[serde(rename = "xmlrpc")]
    XmlRpc,
    /// SOAP 1.1.
    #[serde(rename = "soap 1.1")]
    Soap11,
    /// SimpleRPC.
    #[serde(rename = "simple")]
    Simple,
    /// Answer in whichever version the request came in.
    #[serde(rename = "auto")]
    Auto,
}

impl OutputType {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "xml" => Some(Self::Xml),
            "php" => Some(Self::Php),
            _ => None,
        }
    }
}

impl Verbosity {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "no_white_space" => Some(Self::NoWhiteSpace),
            "newlines_only" => Some(Self::NewlinesOnly),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

impl Escaping {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "cdata" => Some(Self::Cdata),
            "non-ascii" => Some(Self::NonAscii),
            "non-print" => Some(Self::NonPrint),
            "markup" => Some(Self::Markup),
            _ => None,
        }
    }
}

impl Version {
    /// Parses a version label (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "xmlrpc" => Some(Self::XmlRpc),
            "soap 1.1" => Some(Self::Soap11),
            "simple" => Some(Self::Simple),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }

    /// Returns the canonical label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::XmlRpc => "xmlrpc",
            Self::Soap11 => "soap 1.1",
            Self::Simple => "simple",
            Self::Auto => "auto",
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options handed to every codec call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputOptions {
    /// Encoded or native output.
    pub output_type: OutputType,
    /// Payload compactness.
    pub verbosity: Verbosity,
    /// Characters to escape.
    pub escaping: Vec<Escaping>,
    /// Wire vocabulary.
    pub version: Version,
    /// Character encoding label.
    pub encoding: String,
}

impl Default for OutputOptions {
    /// Client defaults: pretty XML-RPC in UTF-8 with markup escaping.
    fn default() -> Self {
        Self {
            output_type: OutputType::Xml,
            verbosity: Verbosity::Pretty,
            escaping: vec![Escaping::Markup],
            version: Version::XmlRpc,
            encoding: "utf-8".to_string(),
        }
    }
}

impl OutputOptions {
    /// Server defaults: like the client defaults, but answering in the
    /// request's own vocabulary.
    pub fn server_default() -> Self {
        Self {
            version: Version::Auto,
            ..Self::default()
        }
    }

    /// Client defaults speaking XML-RPC.
    pub fn xmlrpc() -> Self {
        Self::default()
    }

    /// Client defaults speaking SOAP 1.1.
    pub fn soap() -> Self {
        Self {
            version: Version::Soap11,
            ..Self::default()
        }
    }

    /// Client defaults speaking SimpleRPC.
    pub fn simple() -> Self {
        Self {
            version: Version::Simple,
            ..Self::default()
        }
    }

    /// Returns `true` if `escaping` contains `mode`.
    pub fn escapes(&self, mode: Escaping) -> bool {
        self.escaping.contains(&mode)
    }

    /// Sets a single option by key.
    ///
    /// `escaping` accepts a comma-separated list. Returns `false`, leaving
    /// the options untouched, if `key` is not a recognised option or `value`
    /// is not valid for it.
    pub fn set_output_option(&mut self, key: &str, value: &str) -> bool {
        let value = value.trim();
        match key {
            "output_type" => OutputType::parse(value).map(|v| self.output_type = v),
            "verbosity" => Verbosity::parse(value).map(|v| self.verbosity = v),
            "escaping" => value
                .split(',')
                .map(|mode| Escaping::parse(mode.trim()))
                .collect::<Option<Vec<_>>>()
                .filter(|modes| !modes.is_empty())
                .map(|modes| self.escaping = modes),
            "version" => Version::parse(value).map(|v| self.version = v),
            "encoding" if !value.is_empty() => {
                self.encoding = value.to_string();
                Some(())
            }
            _ => None,
        }
        .is_some()
    }
}
