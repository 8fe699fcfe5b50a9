//! # chainbind-contract
//!
//! A generic bound contract: one address, one ABI, one endpoint.
//!
//! - [`BoundContract::call`] / [`BoundContract::transact`] / [`BoundContract::transfer`]
//! - [`BoundContract::filter_logs`]: historical logs as a [`LogIterator`]
//! - [`BoundContract::watch_logs`]: live logs pushed into a channel, controlled by a [`Subscription`]
//! - [`BoundContract::backfill_and_watch`]: history followed by live logs
//! - [`BoundContract::monitor_logs`]: live logs that survive feed failures, with periodic sweeps of recent blocks
//! - [`decode_log`]: decode a single raw log into a [`DecodedEvent`](chainbind_core::DecodedEvent)
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chainbind_contract::BoundContract;
//! use chainbind_core::{AbiValue, Address, CallOpts, ChainEndpoint, EventFields, FilterOpts};
//!
//! # async fn demo(endpoint: Arc<dyn ChainEndpoint>, abi: &str, token: Address, holder: Address) -> Result<(), chainbind_core::BindError> {
//! let erc20 = BoundContract::new(token, abi, endpoint)?;
//! let balance = erc20
//!     .call(&CallOpts::default(), "balanceOf", &[AbiValue::from(holder)])
//!     .await?;
//! println!("balance = {}", balance[0]);
//!
//! let mut transfers = erc20
//!     .filter_logs::<EventFields>(&FilterOpts::range(100, 200), "Transfer", &[])
//!     .await?;
//! for t in transfers.by_ref() {
//!     println!("{} {:?}", t.position(), t.event.get("value"));
//! }
//! if let Some(e) = transfers.error() {
//!     eprintln!("stopped early: {e}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod bound;
pub mod call;
pub mod callback;
pub mod decode;
pub mod dedup;
pub mod iterator;
pub mod monitor;
pub mod session;
pub mod subscription;

pub use bound::BoundContract;
pub use call::PendingTransaction;
pub use callback::WATCH_BUFFER;
pub use decode::decode_log;
pub use dedup::SeenLogs;
pub use iterator::LogIterator;
pub use monitor::MonitorOpts;
pub use session::ContractSession;
pub use subscription::Subscription;
