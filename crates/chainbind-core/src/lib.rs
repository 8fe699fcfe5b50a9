//! # chainbind-core
//!
//! Shared primitives for ChainBind contract bindings.
//!
//! - [`Log`], [`LogFilter`]: raw logs and the filters that select them
//! - [`AbiValue`], [`EventFields`], [`DecodedEvent`]: normalized values and events
//! - [`ChainEndpoint`]: the node seam (call, transact, logs, subscriptions)
//! - [`AbiCodec`]: the ABI seam (encode calls, decode outputs and logs)
//! - [`BindError`], [`TransportError`]: the error taxonomy

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod filter;
pub mod log;
pub mod opts;
pub mod phase;
pub mod value;

pub use codec::AbiCodec;
pub use endpoint::{ChainEndpoint, LogSubscription, RawLogStream, TransactionRequest, UnsubscribeFn};
pub use error::{BindError, TransportError};
pub use event::{DecodedEvent, EventFields, FromEventFields};
pub use filter::{LogFilter, TopicConstraint};
pub use log::{Log, LogKey, LogPosition};
pub use opts::{BlockTag, CallOpts, FilterOpts, TransactOpts, WatchOpts};
pub use phase::Phase;
pub use value::AbiValue;

pub use alloy_primitives::{Address, Bytes, B256, U256};
