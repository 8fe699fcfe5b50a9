//! # chainbind-rpc
//!
//! Ethereum JSON-RPC plumbing for ChainBind.
//!
//! - `HttpRpcClient`: request/response over HTTP (`reqwest`)
//! - `WsRpcClient`: WebSocket with `eth_subscribe` dispatch and reconnect
//! - `RpcEndpoint`: maps `ChainEndpoint` onto `eth_call`, `eth_estimateGas`,
//!   `eth_sendTransaction`, `eth_getLogs` and `eth_subscribe("logs")`

pub mod endpoint;
pub mod http;
pub mod request;
pub mod subscriptions;
pub mod transport;
pub mod wire;
pub mod ws;

pub use endpoint::RpcEndpoint;
pub use http::{HttpClientConfig, HttpRpcClient};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use subscriptions::{SubscriptionId, SubscriptionManager};
pub use transport::{HealthStatus, RawSubscription, RpcTransport};
pub use ws::{WsClientConfig, WsRpcClient};
