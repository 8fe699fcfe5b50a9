//! `RpcEndpoint`: a `ChainEndpoint` over JSON-RPC transports.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy_primitives::{Bytes, B256};
use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;

use chainbind_core::{
    BlockTag, ChainEndpoint, Log, LogFilter, LogSubscription, TransactionRequest, TransportError,
};

use crate::transport::{self, HealthStatus, RpcTransport};
use crate::wire::{self, RpcLog};

/// Chain endpoint that issues requests on one transport and opens
/// subscriptions on another (or the same, if it can push).
pub struct RpcEndpoint {
    transport: Arc<dyn RpcTransport>,
    pubsub: Option<Arc<dyn RpcTransport>>,
    next_id: AtomicU64,
}

impl RpcEndpoint {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            transport,
            pubsub: None,
            next_id: AtomicU64::new(1),
        }
    }

    /// Route `eth_subscribe` to `pubsub` instead of the request transport.
    pub fn with_pubsub(mut self, pubsub: Arc<dyn RpcTransport>) -> Self {
        self.pubsub = Some(pubsub);
        self
    }

    pub fn health(&self) -> HealthStatus {
        self.pubsub
            .as_ref()
            .map_or_else(|| self.transport.health(), |p| p.health())
    }

    async fn request<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<R, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(method, id, "rpc request");
        transport::call(self.transport.as_ref(), id, method, params).await
    }
}

#[async_trait]
impl ChainEndpoint for RpcEndpoint {
    async fn call(
        &self,
        tx: &TransactionRequest,
        block: BlockTag,
    ) -> Result<Bytes, TransportError> {
        self.request(
            "eth_call",
            vec![
                wire::transaction_object(tx),
                Value::String(block.to_rpc_param()),
            ],
        )
        .await
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, TransportError> {
        let gas: String = self
            .request("eth_estimateGas", vec![wire::transaction_object(tx)])
            .await?;
        wire::parse_hex_u64(&gas)
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<B256, TransportError> {
        self.request("eth_sendTransaction", vec![wire::transaction_object(tx)])
            .await
    }

    async fn block_number(&self) -> Result<u64, TransportError> {
        let head: String = self.request("eth_blockNumber", vec![]).await?;
        wire::parse_hex_u64(&head)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, TransportError> {
        let raw: Vec<RpcLog> = self
            .request("eth_getLogs", vec![wire::filter_object(filter)])
            .await?;
        raw.into_iter().map(Log::try_from).collect()
    }

    async fn subscribe_logs(&self, filter: &LogFilter) -> Result<LogSubscription, TransportError> {
        let transport = self.pubsub.as_ref().unwrap_or(&self.transport);
        let raw = transport
            .subscribe("logs", vec![wire::filter_object(filter)])
            .await?;
        tracing::info!(subscription = %raw.id, url = transport.url(), "log subscription opened");

        let mut notifications = raw.notifications;
        let logs = futures::stream::poll_fn(move |cx| notifications.poll_recv(cx))
            .map(|v| {
                serde_json::from_value::<RpcLog>(v)
                    .map_err(TransportError::from)
                    .and_then(Log::try_from)
            })
            .boxed();

        Ok(LogSubscription::new(logs, raw.errors, raw.unsubscribe))
    }

    fn name(&self) -> &str {
        self.transport.url()
    }
}
