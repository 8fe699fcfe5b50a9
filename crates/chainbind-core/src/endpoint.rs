//! The `ChainEndpoint` trait: the node-facing seam of a bound contract.

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::oneshot;

use crate::error::TransportError;
use crate::filter::LogFilter;
use crate::log::Log;
use crate::opts::BlockTag;

/// Stream of raw logs pushed by a live feed.
pub type RawLogStream = BoxStream<'static, Result<Log, TransportError>>;

/// Releases the server-side resources of a feed.
pub type UnsubscribeFn = Box<dyn FnOnce() + Send + 'static>;

/// A transaction or call to be sent to the node. The node fills unset fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Option<Address>,
    /// `None` only for contract creation.
    pub to: Option<Address>,
    pub data: Bytes,
    pub value: Option<U256>,
    pub gas: Option<u64>,
    pub gas_price: Option<U256>,
    pub nonce: Option<u64>,
}

/// A live log feed opened by [`ChainEndpoint::subscribe_logs`].
///
/// Logs arrive on `logs`; a feed failure is reported once on `errors`. The
/// unsubscribe action runs exactly once, either through
/// [`unsubscribe`](Self::unsubscribe) or when the feed is dropped.
pub struct LogSubscription {
    pub logs: RawLogStream,
    pub errors: oneshot::Receiver<TransportError>,
    unsubscribe: Option<UnsubscribeFn>,
}

impl LogSubscription {
    pub fn new(
        logs: RawLogStream,
        errors: oneshot::Receiver<TransportError>,
        unsubscribe: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            logs,
            errors,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Release the feed. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f();
        }
    }

    pub fn is_unsubscribed(&self) -> bool {
        self.unsubscribe.is_none()
    }
}

impl Drop for LogSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for LogSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSubscription")
            .field("unsubscribed", &self.is_unsubscribed())
            .finish_non_exhaustive()
    }
}

/// The operations a bound contract needs from a chain node.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; one endpoint is shared as
/// `Arc<dyn ChainEndpoint>` by many contracts, iterators and subscriptions.
#[async_trait]
pub trait ChainEndpoint: Send + Sync + 'static {
    /// Execute a read-only call (`eth_call`) and return the raw return data.
    async fn call(&self, tx: &TransactionRequest, block: BlockTag)
        -> Result<Bytes, TransportError>;

    /// Estimate the gas a transaction would consume.
    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, TransportError>;

    /// Submit a transaction and return its hash without waiting for inclusion.
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<B256, TransportError>;

    /// Number of the most recent block.
    async fn block_number(&self) -> Result<u64, TransportError>;

    /// Fetch every log matching `filter` in its block range.
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, TransportError>;

    /// Open a live feed of logs matching `filter`.
    async fn subscribe_logs(&self, filter: &LogFilter) -> Result<LogSubscription, TransportError>;

    /// Identifier for logs (URL or name).
    fn name(&self) -> &str {
        "endpoint"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn unsubscribe_runs_exactly_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let (_tx, rx) = oneshot::channel();
        let mut sub = LogSubscription::new(Box::pin(futures::stream::empty::<Result<Log, TransportError>>()), rx, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(sub.is_unsubscribed());
        drop(sub);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_unsubscribes() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let (_tx, rx) = oneshot::channel();
        let sub = LogSubscription::new(Box::pin(futures::stream::empty::<Result<Log, TransportError>>()), rx, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        drop(sub);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
