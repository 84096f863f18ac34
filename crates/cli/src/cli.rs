//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Environment variable naming the endpoint when `--url` is omitted.
pub(crate) const URL_ENV: &str = "RIPCORD_URL";

/// Calls remote procedures on a Ripcord-compatible endpoint.
#[derive(Parser, Debug)]
#[command(name = "ripcord", version)]
pub(crate) struct Cli {
    /// Endpoint to post requests to.
    #[arg(long, env = URL_ENV)]
    pub(crate) url: String,
    /// Namespace prefixed to the method name of `call`.
    #[arg(long, short = 'n')]
    pub(crate) namespace: Option<String>,
    /// Codec output option, for example `verbosity=no_white_space`. Repeatable.
    #[arg(long = "option", short = 'o', value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub(crate) options: Vec<(String, String)>,
    /// Fail when a single call is answered with a fault.
    #[arg(long)]
    pub(crate) raise_faults: bool,
    /// Print base64 and datetime results in their wire form.
    #[arg(long)]
    pub(crate) no_auto_decode: bool,
    /// Request timeout.
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    pub(crate) timeout: u64,
    /// Print the raw request and response to stderr.
    #[arg(long)]
    pub(crate) debug: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// What to send.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// Calls one method.
    Call {
        /// Method name, resolved against `--namespace`.
        method: String,
        /// Parameters as a JSON array.
        #[arg(value_name = "JSON", default_value = "[]")]
        params: String,
    },
    /// Submits a file of calls as one `system.multiCall` batch.
    ///
    /// The file holds either a JSON array of `{"methodName", "params"}`
    /// objects or an object mapping keys to such objects. `-` reads stdin.
    Batch {
        /// Path of the batch file.
        #[arg(long, short = 'f')]
        file: PathBuf,
    },
    /// Lists the methods the endpoint exposes.
    Methods,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, found `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing option name in `{raw}`"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
