//! `chainbind watch`: stream events until interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chainbind_contract::{BoundContract, MonitorOpts, WATCH_BUFFER};
use chainbind_core::{EventFields, WatchOpts};
use chainbind_observability::BindingMetrics;
use clap::Args;
use tokio::sync::mpsc;
use tracing::info;

use crate::args::parse_indexed;
use crate::config::Config;
use crate::output::print_event;

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Configured contract name or a contract address
    pub contract: String,
    /// Event name
    pub event: String,
    /// Replay history from this block before going live
    #[arg(long)]
    pub from_block: Option<u64>,
    /// Survive connection failures: resubscribe with backoff and re-read
    /// recent blocks every --tick-secs
    #[arg(long, conflicts_with = "from_block")]
    pub monitor: bool,
    /// Seconds between sweeps of recent blocks (with --monitor)
    #[arg(long, default_value_t = 900)]
    pub tick_secs: u64,
    /// Blocks behind the head each sweep starts from (with --monitor)
    #[arg(long, default_value_t = 100)]
    pub past_blocks: u64,
    /// Stop after this many events
    #[arg(long)]
    pub limit: Option<usize>,
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

pub async fn run(config: &Config, metrics: &BindingMetrics, a: WatchArgs) -> Result<()> {
    let (address, abi_json) = config.contract(&a.contract, a.abi.as_deref())?;
    let endpoint = config.connect(true).await?;
    let contract = BoundContract::new(address, &abi_json, Arc::new(endpoint))?;
    let indexed = parse_indexed(&a.indexed)?;

    let opts = WatchOpts {
        start: a.from_block,
    };
    let (tx, mut rx) = mpsc::channel(WATCH_BUFFER);
    let mut sub = if a.monitor {
        let monitor = MonitorOpts {
            tick: Duration::from_secs(a.tick_secs.max(1)),
            past_blocks: a.past_blocks,
            ..MonitorOpts::default()
        };
        contract
            .monitor_logs::<EventFields>(&monitor, &a.event, &indexed, tx)
            .await?
    } else if opts.start.is_some() {
        contract
            .backfill_and_watch::<EventFields>(&opts, &a.event, &indexed, tx)
            .await?
    } else {
        contract
            .watch_logs::<EventFields>(&opts, &a.event, &indexed, tx)
            .await?
    };
    metrics.record_subscription_opened(&a.event);
    info!(contract = %address, event = %a.event, "watching; Ctrl-C to stop");

    let mut seen = 0usize;
    loop {
        tokio::select! {
            next = rx.recv() => match next {
                Some(ev) => {
                    print_event(&ev, a.json)?;
                    metrics.record_delivered(&a.event);
                    seen += 1;
                    if a.limit.is_some_and(|limit| seen >= limit) {
                        sub.close();
                        break;
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                sub.close();
                break;
            }
        }
    }

    let phase = sub.closed().await;
    metrics.record_subscription_end(&a.event, &phase);
    info!(events = seen, %phase, "watch ended");
    match sub.err().await {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
