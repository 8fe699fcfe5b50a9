//! `chainbind call`: read-only call, or a transaction with `--send`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chainbind_contract::BoundContract;
use chainbind_core::{Address, BlockTag, CallOpts, TransactOpts, U256};
use chainbind_observability::BindingMetrics;
use clap::Args;
use tracing::info;

use crate::args::parse_args;
use crate::config::Config;

#[derive(Debug, Args)]
pub struct CallArgs {
    /// Configured contract name or a contract address
    pub contract: String,
    /// Method name
    pub method: String,
    /// JSON array of arguments, e.g. '["0xabc...", 1000]'
    #[arg(long, default_value = "[]")]
    pub args: String,
    /// ABI JSON file (overrides the configured one)
    #[arg(long)]
    pub abi: Option<PathBuf>,
    /// Evaluate at this block instead of latest
    #[arg(long, conflicts_with = "pending")]
    pub block: Option<u64>,
    /// Evaluate against the pending block
    #[arg(long)]
    pub pending: bool,
    /// Sender address
    #[arg(long)]
    pub from: Option<Address>,
    /// Submit as a transaction signed by the node instead of calling
    #[arg(long, requires = "from")]
    pub send: bool,
    /// Wei to attach when sending
    #[arg(long, default_value = "0")]
    pub value: U256,
    /// Gas limit when sending (estimated if omitted)
    #[arg(long)]
    pub gas: Option<u64>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(config: &Config, metrics: &BindingMetrics, a: CallArgs) -> Result<()> {
    let (address, abi_json) = config.contract(&a.contract, a.abi.as_deref())?;
    let endpoint = config.connect(false).await?;
    let contract = BoundContract::new(address, &abi_json, Arc::new(endpoint))?;
    let args = parse_args(&a.args)?;

    let started = Instant::now();
    if a.send {
        let from = a.from.context("--send requires --from")?;
        let mut opts = TransactOpts::sender(from).value(a.value);
        opts.gas_limit = a.gas;

        let result = contract.transact(&opts, &a.method, &args).await;
        metrics.record_call(&a.method, elapsed_ms(started), result.as_ref().map(|_| ()));
        let pending = result?;
        info!(tx = %pending.hash, gas = pending.gas, "submitted");

        if a.json {
            println!(
                "{}",
                serde_json::json!({ "hash": pending.hash, "to": pending.to, "gas": pending.gas })
            );
        } else {
            println!("{:#x}", pending.hash);
        }
        return Ok(());
    }

    let opts = CallOpts {
        from: a.from,
        block: match (a.block, a.pending) {
            (Some(n), _) => BlockTag::Number(n),
            (None, true) => BlockTag::Pending,
            (None, false) => BlockTag::Latest,
        },
    };
    let result = contract.call(&opts, &a.method, &args).await;
    metrics.record_call(&a.method, elapsed_ms(started), result.as_ref().map(|_| ()));
    let outputs = result?;

    if a.json {
        println!("{}", serde_json::to_string_pretty(&outputs)?);
    } else {
        for value in &outputs {
            println!("{value}");
        }
    }
    Ok(())
}

pub fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
