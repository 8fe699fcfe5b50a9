//! ChainBind CLI: talk to a deployed contract through its ABI.
//!
//! # Commands
//! ```text
//! chainbind call  <contract> <method> --args <json> [--block N | --pending] [--send --from <addr>]
//! chainbind logs  <contract> <event> --from-block N [--to-block M] [--indexed <json>]
//! chainbind watch <contract> <event> [--from-block N | --monitor] [--limit K] [--indexed <json>]
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chainbind_observability::{init_tracing, BindingMetrics};
use clap::{Parser, Subcommand};

mod args;
mod cmd_call;
mod cmd_logs;
mod cmd_watch;
mod config;
mod output;

use config::Config;

#[derive(Parser)]
#[command(
    name = "chainbind",
    about = "Call Ethereum contracts and follow their events",
    long_about = "
ChainBind CLI: call contract methods, query historical events and watch
live ones, using nothing but the contract's JSON ABI.

ENVIRONMENT VARIABLES:
  CHAINBIND_HTTP_URL    JSON-RPC HTTP endpoint
  CHAINBIND_WS_URL      JSON-RPC WebSocket endpoint (required by `watch`)
  CHAINBIND_LOG_LEVEL   Log level (trace|debug|info|warn|error)
",
    version
)]
struct Cli {
    /// Config file (default: ./chainbind.yaml if present)
    #[arg(short, long, global = true, env = "CHAINBIND_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a contract method (or send a transaction with --send)
    Call(cmd_call::CallArgs),
    /// Print historical events in a block range
    Logs(cmd_logs::LogsArgs),
    /// Stream new events until interrupted
    Watch(cmd_watch::WatchArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.verbose {
        config.log.level = "debug".into();
    }
    config.log.json |= cli.json_logs;
    init_tracing(&config.log).context("install tracing subscriber")?;

    let metrics = BindingMetrics::new(&opentelemetry::global::meter("chainbind"));

    match cli.command {
        Commands::Call(a) => cmd_call::run(&config, &metrics, a).await,
        Commands::Logs(a) => cmd_logs::run(&config, &metrics, a).await,
        Commands::Watch(a) => cmd_watch::run(&config, &metrics, a).await,
    }
}
