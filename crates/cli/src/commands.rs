//! Command execution. Runs on a blocking thread: the client performs
//! synchronous round trips.

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use client::{Client, Reply};
use http_transport::{HttpTransport, HttpTransportOptions};
use json_codec::JsonCodec;
use protocol::{Codec, OutputOptions, Value, OPTION_KEYS};
use tracing::{debug, info_span};

use crate::cli::{Cli, Command};

/// Builds the client from the arguments and runs the command. Returns the
/// text to print on stdout.
pub(crate) fn execute(cli: &Cli) -> anyhow::Result<String> {
    let transport = HttpTransport::with_options(
        HttpTransportOptions::default()
            .timeout(Some(Duration::from_secs(cli.timeout)))
            .content_type(JsonCodec.content_type()),
    )
    .context("creating the HTTP transport")?;
    let client = connect(cli, transport)?;
    let outcome = run(&client, &cli.command);
    if cli.debug {
        eprint!("{}", exchange_report(&client)?);
    }
    outcome
}

/// Builds a JSON client over `transport` configured from `cli`.
pub(crate) fn connect(
    cli: &Cli,
    transport: impl protocol::Transport + 'static,
) -> anyhow::Result<Client> {
    let mut builder = Client::builder(&cli.url)
        .codec(JsonCodec)
        .transport(transport)
        .raise_faults(cli.raise_faults)
        .auto_decode(!cli.no_auto_decode);
    if let Some(namespace) = &cli.namespace {
        builder = builder.namespace(namespace);
    }
    let client = builder.build()?;
    for (key, value) in &cli.options {
        if !client.set_output_option(key, value) {
            bail!(
                "invalid output option {key}={value} (known options: {})",
                OPTION_KEYS.join(", ")
            );
        }
    }
    Ok(client)
}

/// Runs one command and renders its result as JSON.
pub(crate) fn run(client: &Client, command: &Command) -> anyhow::Result<String> {
    let span = info_span!("command", session = %client.session_id());
    let _guard = span.enter();

    let result = match command {
        Command::Call { method, params } => {
            let params = match parse_json(params.as_bytes())? {
                Value::Array(items) => items,
                other => bail!("parameters must be a JSON array, found {}", other.wire_type()),
            };
            debug!(method = %method, params = params.len(), "calling");
            match client.call(method, params)? {
                Reply::Value(value) => value,
                Reply::Batch(results) => results.to_value(),
                Reply::Composer(_) => {
                    bail!("{method} needs a list of calls; use the batch command")
                }
                Reply::Deferred(call) => bail!("{} was deferred unexpectedly", call.method()),
            }
        }
        Command::Batch { file } => {
            let entries: Vec<(String, Value)> = match parse_json(&read_input(file)?)? {
                Value::Array(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, entry)| (i.to_string(), entry))
                    .collect(),
                Value::Struct(members) => members.into_iter().collect(),
                other => bail!(
                    "a batch must be a JSON array or object of calls, found {}",
                    other.wire_type()
                ),
            };
            debug!(calls = entries.len(), "submitting batch");
            client.multi_call_with(entries)?.to_value()
        }
        Command::Methods => {
            client
                .namespace("system")
                .call("listMethods", Vec::new())?
                .into_value()
                .ok_or_else(|| anyhow!("system.listMethods returned no value"))?
        }
    };
    render(&result)
}

fn parse_json(text: &[u8]) -> anyhow::Result<Value> {
    JsonCodec
        .decode_response(text, "utf-8")
        .context("parsing JSON input")
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut input = Vec::new();
        std::io::stdin()
            .read_to_end(&mut input)
            .context("reading the batch from stdin")?;
        return Ok(input);
    }
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn render(value: &Value) -> anyhow::Result<String> {
    let payload = JsonCodec.encode_response(value, &OutputOptions::default())?;
    Ok(String::from_utf8(payload)?)
}

/// Renders the effective output options and the last exchange for `--debug`.
fn exchange_report(client: &Client) -> anyhow::Result<String> {
    let options = serde_json::to_string_pretty(&client.output_options())
        .context("rendering the output options")?;
    let mut report = format!("--- options\n{options}\n");
    for (label, payload) in [
        ("request", client.last_request()),
        ("response", client.last_response()),
    ] {
        if let Some(payload) = payload {
            report.push_str(&format!("--- {label}\n{}\n", String::from_utf8_lossy(&payload)));
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use clap::Parser;
    use protocol::Fault;
    use rstest::{fixture, rstest};
    use server::{LoopbackTransport, MethodDescriptor, Server};

    use super::*;

    #[fixture]
    fn endpoint() -> LoopbackTransport {
        let server = Server::builder(JsonCodec)
            .service(
                Some("math.add"),
                MethodDescriptor::anonymous(|args: &[Value]| {
                    Ok(Value::Int(args.iter().filter_map(Value::as_i64).sum()))
                }),
            )
            .build()
            .unwrap();
        LoopbackTransport::new(Arc::new(server))
    }

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["ripcord", "--url", "loopback://"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn output(endpoint: LoopbackTransport, args: &[&str]) -> anyhow::Result<Value> {
        let cli = cli(args);
        let client = connect(&cli, endpoint)?;
        let text = run(&client, &cli.command)?;
        Ok(JsonCodec.decode_response(text.as_bytes(), "utf-8")?)
    }

    #[rstest]
    fn call_resolves_the_namespace_flag(endpoint: LoopbackTransport) {
        let result = output(endpoint, &["-n", "math", "call", "add", "[1, 2, 3]"]).unwrap();
        assert_eq!(result, Value::Int(6));
    }

    #[rstest]
    fn call_rejects_non_array_params(endpoint: LoopbackTransport) {
        let err = output(endpoint, &["call", "math.add", "{}"]).unwrap_err();
        assert!(err.to_string().contains("JSON array"));
    }

    #[rstest]
    fn raised_faults_fail_the_command(endpoint: LoopbackTransport) {
        let err = output(endpoint, &["--raise-faults", "call", "nope"]).unwrap_err();
        assert_eq!(err.to_string(), "Method nope not found.");
    }

    #[rstest]
    fn unraised_faults_are_printed(endpoint: LoopbackTransport) {
        let result = output(endpoint, &["call", "nope"]).unwrap();
        assert_eq!(Fault::from_value(&result).map(|f| f.code), Some(-1));
    }

    #[rstest]
    fn multicall_through_call_returns_keyed_results(endpoint: LoopbackTransport) {
        let batch = r#"[{"a": {"methodName": "math.add", "params": [1, 2]}}]"#;
        let result = output(endpoint, &["call", "system.multiCall", batch]).unwrap();
        assert_eq!(result.get("a"), Some(&Value::Int(3)));
    }

    #[rstest]
    fn batch_file_results_follow_its_keys(endpoint: LoopbackTransport) {
        let path = std::env::temp_dir().join(format!("ripcord-batch-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"small": {"methodName": "math.add", "params": [1, 1]},
                "large": {"methodName": "math.add", "params": [40, 2]}}"#,
        )
        .unwrap();

        let result = output(endpoint, &["batch", "--file", path.to_str().unwrap()]);
        std::fs::remove_file(&path).unwrap();

        let result = result.unwrap();
        let keys: Vec<_> = result.as_struct().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["small", "large"]);
        assert_eq!(result.get("small"), Some(&Value::Int(2)));
        assert_eq!(result.get("large"), Some(&Value::Int(42)));
    }

    #[rstest]
    fn debug_report_shows_options_and_last_exchange(endpoint: LoopbackTransport) {
        let cli = cli(&["-o", "verbosity=no_white_space", "call", "math.add", "[2, 3]"]);
        let client = connect(&cli, endpoint).unwrap();
        run(&client, &cli.command).unwrap();

        let report = exchange_report(&client).unwrap();

        assert!(report.starts_with("--- options\n"));
        assert!(report.contains(r#""verbosity": "no_white_space""#));
        assert!(report.contains(
            "--- request\n{\"methodName\":\"math.add\",\"params\":[2,3]}\n"
        ));
        assert!(report.contains("--- response\n"));
    }

    #[rstest]
    fn methods_lists_the_endpoint(endpoint: LoopbackTransport) {
        let result = output(endpoint, &["methods"]).unwrap();
        assert!(result
            .as_array()
            .unwrap()
            .contains(&Value::from("math.add")));
    }

    #[rstest]
    fn unknown_output_options_are_rejected(endpoint: LoopbackTransport) {
        let err = output(endpoint, &["-o", "colour=blue", "methods"]).unwrap_err();
        assert!(err.to_string().starts_with("invalid output option colour=blue"));
    }
}
