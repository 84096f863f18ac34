//! Ripcord CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse arguments** with `clap`; the endpoint falls back to
//!    `RIPCORD_URL`.
//! 2. **Wire observability**: a JSON `tracing-subscriber` layer on stderr and,
//!    when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an OpenTelemetry OTLP
//!    exporter. Spans emitted by the client flow through both.
//! 3. **Construct infrastructure**: a `JsonCodec` and an `HttpTransport`
//!    injected into a `client::Client`.
//! 4. **Run the command** on a blocking thread and print the JSON result.

mod cli;
mod commands;
mod telemetry;

use clap::Parser;
use tracing::error;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let telemetry = telemetry::init()?;

    let outcome = tokio::task::spawn_blocking(move || commands::execute(&cli)).await;
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(join) => Err(anyhow::Error::new(join).context("command thread failed")),
    };
    if let Err(err) = &outcome {
        error!(error = %err, "command failed");
    }

    telemetry.shutdown();
    println!("{}", outcome?);
    Ok(())
}
