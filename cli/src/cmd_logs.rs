//! `chainbind logs`: historical events in a block range.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chainbind_contract::BoundContract;
use chainbind_core::{EventFields, FilterOpts};
use chainbind_observability::BindingMetrics;
use clap::Args;
use tracing::warn;

use crate::args::parse_indexed;
use crate::config::Config;
use crate::output::print_event;

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Configured contract name or a contract address
    pub contract: String,
    /// Event name
    pub event: String,
    /// First block (inclusive)
    #[arg(long, default_value_t = 0)]
    pub from_block: u64,
    /// Last block (inclusive; default latest)
    #[arg(long)]
    pub to_block: Option<u64>,
    /// JSON array of indexed-argument constraints, e.g. '[null, ["0xabc..."]]'
    #[arg(long, default_value = "[]")]
    pub indexed: String,
    /// ABI JSON file (overrides the configured one)
    #[arg(long)]
    pub abi: Option<PathBuf>,
    /// One JSON object per line
    #[arg(long)]
    pub json: bool,
}

pub async fn run(config: &Config, metrics: &BindingMetrics, a: LogsArgs) -> Result<()> {
    let (address, abi_json) = config.contract(&a.contract, a.abi.as_deref())?;
    let endpoint = config.connect(false).await?;
    let contract = BoundContract::new(address, &abi_json, Arc::new(endpoint))?;
    let indexed = parse_indexed(&a.indexed)?;

    let opts = FilterOpts {
        start: a.from_block,
        end: a.to_block,
    };
    let mut events = contract
        .filter_logs::<EventFields>(&opts, &a.event, &indexed)
        .await?;
    metrics.record_logs_fetched(&a.event, events.remaining());

    let mut printed = 0usize;
    for ev in events.by_ref() {
        print_event(&ev, a.json)?;
        metrics.record_delivered(&a.event);
        printed += 1;
    }

    if let Some(e) = events.error() {
        warn!(printed, error = %e, "stopped at undecodable log");
        return Err(e.clone().into());
    }
    if !a.json {
        eprintln!("{printed} event(s)");
    }
    Ok(())
}
