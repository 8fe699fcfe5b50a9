//! The `RpcTransport` trait, implemented by the HTTP and WebSocket clients.

use async_trait::async_trait;
use chainbind_core::{TransportError, UnsubscribeFn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::request::{JsonRpcRequest, JsonRpcResponse};
use crate::subscriptions::SubscriptionId;

/// Transport health as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    /// Connection lost; reconnecting.
    Unhealthy,
    /// Not tracked by this transport.
    Unknown,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A server-push subscription opened with `eth_subscribe`.
pub struct RawSubscription {
    pub id: SubscriptionId,
    /// The `result` payload of every `eth_subscription` notification.
    pub notifications: mpsc::UnboundedReceiver<Value>,
    /// Receives once if the subscription dies with the connection.
    pub errors: oneshot::Receiver<TransportError>,
    /// Sends `eth_unsubscribe` and stops dispatch.
    pub unsubscribe: UnsubscribeFn,
}

/// The central async trait every RPC transport implements.
///
/// # Object Safety
/// The trait is object-safe and can be stored as `Arc<dyn RpcTransport>`.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send a single JSON-RPC request and return the response.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Open a server-push subscription. Only bidirectional transports can.
    async fn subscribe(
        &self,
        kind: &str,
        params: Vec<Value>,
    ) -> Result<RawSubscription, TransportError> {
        let _ = (kind, params);
        Err(TransportError::Unsupported(format!(
            "{} cannot push notifications; use a WebSocket endpoint",
            self.url()
        )))
    }

    fn health(&self) -> HealthStatus {
        HealthStatus::Unknown
    }

    /// Return the transport's identifier (URL or name).
    fn url(&self) -> &str;
}

/// Call `method` and deserialize the result.
pub async fn call<T: DeserializeOwned>(
    transport: &dyn RpcTransport,
    id: u64,
    method: &str,
    params: Vec<Value>,
) -> Result<T, TransportError> {
    let resp = transport.send(JsonRpcRequest::new(id, method, params)).await?;
    let result = resp.into_result()?;
    Ok(serde_json::from_value(result)?)
}
