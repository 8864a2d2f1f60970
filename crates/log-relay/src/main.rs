//! Log relay CLI
//!
//! Reads one invocation payload (base64 + gzip log batch, bare or wrapped in
//! `{"awslogs": {"data": ...}}`) and posts one Slack notification per record.
//! Configuration comes from the environment; see the `config` crate.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use config::Settings;
use log_relay::run;
use notify::{ConsoleChannel, NotifyChannel, Notifier};
use stacktrace::Rules;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "log_relay=info,notify=info,stacktrace=info";

/// Relay application log records to Slack
#[derive(Parser)]
#[command(name = "log-relay")]
#[command(about = "Relay application log records to Slack with linked, shortened stack traces")]
#[command(version)]
struct Cli {
    /// File holding the invocation payload (reads stdin when omitted)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Print payloads as JSON lines instead of posting them
    #[arg(long)]
    dry_run: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

fn init_tracing(format: LogFormat, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("log_relay=debug,notify=debug,stacktrace=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format, cli.verbose);

    let settings = Settings::from_env().context("Failed to load settings")?;
    let rules = Rules::from_settings(&settings).context("Failed to compile rules")?;

    let notifier = if cli.dry_run {
        let console: Arc<dyn NotifyChannel> = Arc::new(ConsoleChannel::stdout());
        Notifier::with_channels(vec![console])
    } else {
        Notifier::from_settings(&settings)
    };

    let input = read_input(cli.input.as_ref())?;
    let summary = run(&input, &settings, &rules, &notifier)
        .await
        .context("Invocation failed")?;

    info!(
        received = summary.received,
        dispatched = summary.dispatched,
        "Invocation complete"
    );

    Ok(())
}
