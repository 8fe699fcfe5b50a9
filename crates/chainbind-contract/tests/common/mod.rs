//! In-memory `ChainEndpoint` and ERC-20 fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc as fmpsc;
use futures::StreamExt;
use tokio::sync::oneshot;

use chainbind_contract::BoundContract;
use chainbind_core::{
    Address, BlockTag, Bytes, ChainEndpoint, Log, LogFilter, LogSubscription, TransactionRequest,
    TransportError, B256,
};
use chainbind_evm::fingerprint;

pub const ERC20_ABI: &str = r#"[
    {"type":"function","name":"transfer","stateMutability":"nonpayable",
     "inputs":[{"name":"to","type":"address"},{"name":"value","type":"uint256"}],
     "outputs":[{"name":"","type":"bool"}]},
    {"type":"function","name":"balanceOf","stateMutability":"view",
     "inputs":[{"name":"owner","type":"address"}],
     "outputs":[{"name":"","type":"uint256"}]},
    {"type":"event","name":"Transfer","anonymous":false,
     "inputs":[{"name":"from","type":"address","indexed":true},
               {"name":"to","type":"address","indexed":true},
               {"name":"value","type":"uint256","indexed":false}]},
    {"type":"event","name":"Approval","anonymous":false,
     "inputs":[{"name":"owner","type":"address","indexed":true},
               {"name":"spender","type":"address","indexed":true},
               {"name":"value","type":"uint256","indexed":false}]}
]"#;

pub const ALICE: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";
pub const BOB: &str = "0x000000000000000000000000000000000000bEEF";

pub fn token() -> Address {
    Address::repeat_byte(0x11)
}

pub fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

pub fn word(n: u64) -> Vec<u8> {
    let mut w = [0u8; 32];
    w[24..].copy_from_slice(&n.to_be_bytes());
    w.to_vec()
}

pub fn tx_hash(block: u64, index: u64) -> B256 {
    let mut h = [0u8; 32];
    h[16..24].copy_from_slice(&block.to_be_bytes());
    h[24..].copy_from_slice(&index.to_be_bytes());
    B256::from(h)
}

pub fn transfer_topic() -> B256 {
    fingerprint::event_topic("Transfer(address,address,uint256)")
}

/// A well-formed `Transfer(ALICE, BOB, value)` log.
pub fn transfer_log(block: u64, index: u64, value: u64) -> Log {
    Log {
        address: token(),
        topics: vec![
            transfer_topic(),
            addr(ALICE).into_word(),
            addr(BOB).into_word(),
        ],
        data: Bytes::from(word(value)),
        block_number: block,
        block_hash: None,
        transaction_hash: tx_hash(block, index),
        log_index: index,
        removed: false,
    }
}

/// A `Transfer` log whose body is truncated, so decoding it fails.
pub fn broken_log(block: u64, index: u64) -> Log {
    let mut log = transfer_log(block, index, 0);
    log.data = Bytes::from(vec![0u8; 7]);
    log
}

/// Test side of a live feed.
pub struct Feed {
    pub logs: fmpsc::UnboundedSender<Result<Log, TransportError>>,
    pub errors: Option<oneshot::Sender<TransportError>>,
}

impl Feed {
    pub fn push(&self, log: Log) {
        self.logs.unbounded_send(Ok(log)).unwrap();
    }

    pub fn fail(&mut self, err: TransportError) {
        let _ = self.errors.take().unwrap().send(err);
    }
}

#[derive(Default)]
pub struct MockEndpoint {
    pub history: Mutex<Vec<Log>>,
    pub history_error: Mutex<Option<TransportError>>,
    pub get_logs_filters: Mutex<Vec<LogFilter>>,
    pub call_results: Mutex<VecDeque<Result<Bytes, TransportError>>>,
    pub calls: Mutex<Vec<(TransactionRequest, BlockTag)>>,
    pub gas: u64,
    pub estimates: AtomicUsize,
    pub sent: Mutex<Vec<TransactionRequest>>,
    pub head: AtomicU64,
    pub feeds: Mutex<VecDeque<LogSubscription>>,
    pub subscribe_filters: Mutex<Vec<LogFilter>>,
    pub unsubscribes: Arc<AtomicUsize>,
}

impl MockEndpoint {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            gas: 50_000,
            ..Default::default()
        })
    }

    pub fn with_history(logs: Vec<Log>) -> Arc<Self> {
        let ep = Self::new();
        *ep.history.lock().unwrap() = logs;
        ep
    }

    /// Queue a feed for a later `subscribe_logs` call and return the test's
    /// end of it. Feeds are handed out in arming order.
    pub fn arm_feed(&self) -> Feed {
        let (log_tx, log_rx) = fmpsc::unbounded();
        let (err_tx, err_rx) = oneshot::channel();
        let counter = self.unsubscribes.clone();
        let sub = LogSubscription::new(log_rx.boxed(), err_rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        self.feeds.lock().unwrap().push_back(sub);
        Feed {
            logs: log_tx,
            errors: Some(err_tx),
        }
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscribe_filters.lock().unwrap().len()
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    /// Wait (bounded) until the feed has been released.
    pub async fn wait_unsubscribed(&self) {
        self.wait_unsubscribes(1).await;
    }

    /// Wait (bounded) until `n` feeds have been released.
    pub async fn wait_unsubscribes(&self, n: usize) {
        for _ in 0..200 {
            if self.unsubscribe_count() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("only {} of {n} feeds were unsubscribed", self.unsubscribe_count());
    }
}

#[async_trait]
impl ChainEndpoint for MockEndpoint {
    async fn call(&self, tx: &TransactionRequest, block: BlockTag) -> Result<Bytes, TransportError> {
        self.calls.lock().unwrap().push((tx.clone(), block));
        self.call_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Bytes::new()))
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<u64, TransportError> {
        self.estimates.fetch_add(1, Ordering::SeqCst);
        Ok(self.gas)
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<B256, TransportError> {
        self.sent.lock().unwrap().push(tx.clone());
        Ok(B256::repeat_byte(0xaa))
    }

    async fn block_number(&self) -> Result<u64, TransportError> {
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, TransportError> {
        self.get_logs_filters.lock().unwrap().push(filter.clone());
        match self.history_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(self.history.lock().unwrap().clone()),
        }
    }

    async fn subscribe_logs(&self, filter: &LogFilter) -> Result<LogSubscription, TransportError> {
        self.subscribe_filters.lock().unwrap().push(filter.clone());
        self.feeds
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::Unsupported("no feed armed".into()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn erc20(ep: &Arc<MockEndpoint>) -> BoundContract {
    BoundContract::new(token(), ERC20_ABI, ep.clone()).unwrap()
}
