//! WebSocket JSON-RPC client with reconnect and subscription dispatch.
//!
//! A background task owns the connection. Requests and subscriptions are
//! handed to it over a command channel; responses are routed back by a
//! connection-local request id, so callers may use any id scheme.
//!
//! When the connection drops, every in-flight request and every active
//! subscription fails with `TransportError::WebSocket`. The task then
//! reconnects with exponential backoff for subsequent requests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use chainbind_core::TransportError;

use crate::request::{JsonRpcRequest, JsonRpcResponse, RpcId};
use crate::subscriptions::{Registration, SubscriptionId, SubscriptionManager};
use crate::transport::{HealthStatus, RawSubscription, RpcTransport};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct WsClientConfig {
    /// Reconnect backoff starting duration.
    pub reconnect_initial: Duration,
    /// Maximum reconnect backoff.
    pub reconnect_max: Duration,
}

impl Default for WsClientConfig {
    fn default() -> Self {
        Self {
            reconnect_initial: Duration::from_millis(500),
            reconnect_max: Duration::from_secs(60),
        }
    }
}

/// Command sent from callers to the background WS task.
enum WsCommand {
    Send {
        req: JsonRpcRequest,
        tx: oneshot::Sender<Result<JsonRpcResponse, TransportError>>,
    },
    Subscribe {
        req: JsonRpcRequest,
        tx: oneshot::Sender<Result<Registration, TransportError>>,
    },
    Unsubscribe(SubscriptionId),
    Close,
}

impl WsCommand {
    fn fail(self, err: TransportError) {
        match self {
            Self::Send { tx, .. } => {
                let _ = tx.send(Err(err));
            }
            Self::Subscribe { tx, .. } => {
                let _ = tx.send(Err(err));
            }
            Self::Unsubscribe(_) | Self::Close => {}
        }
    }
}

/// A request awaiting its response on the current connection.
enum Pending {
    Call {
        caller_id: RpcId,
        tx: oneshot::Sender<Result<JsonRpcResponse, TransportError>>,
    },
    Subscribe {
        tx: oneshot::Sender<Result<Registration, TransportError>>,
    },
}

impl Pending {
    fn fail(self, err: TransportError) {
        match self {
            Self::Call { tx, .. } => {
                let _ = tx.send(Err(err));
            }
            Self::Subscribe { tx } => {
                let _ = tx.send(Err(err));
            }
        }
    }
}

enum ConnectionEnd {
    /// Client closed or dropped.
    Closed,
    /// Remote side went away.
    Lost,
}

pub struct WsRpcClient {
    url: String,
    cmd_tx: mpsc::UnboundedSender<WsCommand>,
    subscriptions: SubscriptionManager,
    connected: Arc<AtomicBool>,
    next_id: AtomicU64,
}

impl WsRpcClient {
    /// Connect to `url` and start the background task.
    pub async fn connect(
        url: impl Into<String>,
        config: WsClientConfig,
    ) -> Result<Self, TransportError> {
        let url = url.into();
        tracing::info!(url = %url, "connecting via WebSocket");
        let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::WebSocket(format!("connect {url}: {e}")))?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<WsCommand>();
        let subscriptions = SubscriptionManager::new();
        let connected = Arc::new(AtomicBool::new(true));

        tokio::spawn(ws_task(
            url.clone(),
            ws,
            cmd_rx,
            subscriptions.clone(),
            config,
            connected.clone(),
        ));

        Ok(Self {
            url,
            cmd_tx,
            subscriptions,
            connected,
            next_id: AtomicU64::new(1),
        })
    }

    /// Number of subscriptions currently receiving notifications.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    fn command(&self, cmd: WsCommand) -> Result<(), TransportError> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| TransportError::WebSocket("WS task closed".into()))
    }
}

impl Drop for WsRpcClient {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(WsCommand::Close);
    }
}

#[async_trait]
impl RpcTransport for WsRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let (tx, rx) = oneshot::channel();
        self.command(WsCommand::Send { req, tx })?;
        rx.await
            .map_err(|_| TransportError::WebSocket("WS response dropped".into()))?
    }

    async fn subscribe(
        &self,
        kind: &str,
        params: Vec<Value>,
    ) -> Result<RawSubscription, TransportError> {
        let req = JsonRpcRequest::new(
            self.next_id.fetch_add(1, Ordering::Relaxed),
            "eth_subscribe",
            std::iter::once(Value::String(kind.to_string()))
                .chain(params)
                .collect(),
        );
        let (tx, rx) = oneshot::channel();
        self.command(WsCommand::Subscribe { req, tx })?;
        let reg = rx
            .await
            .map_err(|_| TransportError::WebSocket("WS subscription dropped".into()))??;

        tracing::debug!(subscription = %reg.id, kind, "subscribed");
        let cmd_tx = self.cmd_tx.clone();
        let id = reg.id.clone();
        Ok(RawSubscription {
            id: reg.id,
            notifications: reg.notifications,
            errors: reg.errors,
            unsubscribe: Box::new(move || {
                let _ = cmd_tx.send(WsCommand::Unsubscribe(id));
            }),
        })
    }

    fn health(&self) -> HealthStatus {
        if self.connected.load(Ordering::Relaxed) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Background task that owns the WebSocket connection.
async fn ws_task(
    url: String,
    mut ws: WsStream,
    mut cmd_rx: mpsc::UnboundedReceiver<WsCommand>,
    subscriptions: SubscriptionManager,
    config: WsClientConfig,
    connected: Arc<AtomicBool>,
) {
    let mut backoff = config.reconnect_initial;

    loop {
        let end = run_connection(ws, &mut cmd_rx, &subscriptions).await;
        connected.store(false, Ordering::Relaxed);

        let lost = TransportError::WebSocket("connection lost".into());
        let failed = subscriptions.fail_all(lost);
        if let ConnectionEnd::Closed = end {
            tracing::debug!(url = %url, "WS client closed");
            return;
        }
        tracing::warn!(url = %url, failed_subscriptions = failed, "WS disconnected");

        ws = loop {
            // Nothing can be served while disconnected
            if !fail_queued(&mut cmd_rx) {
                return;
            }
            tracing::info!(url = %url, "reconnecting in {backoff:?}");
            time::sleep(backoff).await;
            backoff = (backoff * 2).min(config.reconnect_max);

            match tokio_tungstenite::connect_async(url.as_str()).await {
                Ok((stream, _)) => {
                    backoff = config.reconnect_initial;
                    break stream;
                }
                Err(e) => tracing::warn!(url = %url, error = %e, "WS reconnect failed"),
            }
        };
        connected.store(true, Ordering::Relaxed);
        tracing::info!(url = %url, "WS reconnected");
    }
}

/// Fail every queued command. Returns `false` if the client is gone.
fn fail_queued(cmd_rx: &mut mpsc::UnboundedReceiver<WsCommand>) -> bool {
    loop {
        match cmd_rx.try_recv() {
            Ok(WsCommand::Close) | Err(TryRecvError::Disconnected) => return false,
            Ok(cmd) => cmd.fail(TransportError::WebSocket("not connected".into())),
            Err(TryRecvError::Empty) => return true,
        }
    }
}

async fn run_connection(
    ws: WsStream,
    cmd_rx: &mut mpsc::UnboundedReceiver<WsCommand>,
    subscriptions: &SubscriptionManager,
) -> ConnectionEnd {
    let (mut sink, mut stream) = ws.split();
    let mut pending: HashMap<u64, Pending> = HashMap::new();
    let mut wire_id: u64 = 0;

    let end = loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let (mut req, entry) = match cmd {
                    None | Some(WsCommand::Close) => {
                        let _ = sink.send(Message::Close(None)).await;
                        break ConnectionEnd::Closed;
                    }
                    Some(WsCommand::Unsubscribe(id)) => {
                        if !subscriptions.remove(&id) {
                            continue;
                        }
                        let req = JsonRpcRequest {
                            id: RpcId::String(format!("unsubscribe-{id}")),
                            ..JsonRpcRequest::new(0, "eth_unsubscribe", vec![Value::String(id.0)])
                        };
                        if send_json(&mut sink, &req).await.is_err() {
                            break ConnectionEnd::Lost;
                        }
                        continue;
                    }
                    Some(WsCommand::Send { req, tx }) => {
                        let caller_id = req.id.clone();
                        (req, Pending::Call { caller_id, tx })
                    }
                    Some(WsCommand::Subscribe { req, tx }) => (req, Pending::Subscribe { tx }),
                };

                wire_id += 1;
                req.id = RpcId::Number(wire_id);
                pending.insert(wire_id, entry);
                if send_json(&mut sink, &req).await.is_err() {
                    break ConnectionEnd::Lost;
                }
            }
            msg = stream.next() => {
                match msg {
                    None => break ConnectionEnd::Lost,
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "WS receive error");
                        break ConnectionEnd::Lost;
                    }
                    Some(Ok(Message::Text(text))) => {
                        if let Some(orphan) = handle_message(text.as_str(), &mut pending, subscriptions) {
                            // The subscriber went away before the id arrived
                            subscriptions.remove(&orphan);
                            let req = JsonRpcRequest {
                                id: RpcId::String(format!("unsubscribe-{orphan}")),
                                ..JsonRpcRequest::new(0, "eth_unsubscribe", vec![Value::String(orphan.0)])
                            };
                            if send_json(&mut sink, &req).await.is_err() {
                                break ConnectionEnd::Lost;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => break ConnectionEnd::Lost,
                    _ => {}
                }
            }
        }
    };

    for (_, p) in pending.drain() {
        p.fail(TransportError::WebSocket("connection lost".into()));
    }
    end
}

async fn send_json<S>(sink: &mut S, req: &JsonRpcRequest) -> Result<(), ()>
where
    S: futures::Sink<Message> + Unpin,
{
    let text = match serde_json::to_string(req) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(error = %e, method = %req.method, "failed to encode request");
            return Ok(());
        }
    };
    sink.send(Message::Text(text.into())).await.map_err(|_| ())
}

/// Route one incoming text frame. Returns a subscription id that was
/// confirmed after its requester gave up, so the caller can cancel it.
fn handle_message(
    text: &str,
    pending: &mut HashMap<u64, Pending>,
    subscriptions: &SubscriptionManager,
) -> Option<SubscriptionId> {
    let Ok(val) = serde_json::from_str::<Value>(text) else {
        tracing::debug!("failed to parse WS message as JSON");
        return None;
    };

    if val.get("method").and_then(Value::as_str) == Some("eth_subscription") {
        let params = val.get("params")?;
        let id = params.get("subscription").and_then(Value::as_str)?;
        let result = params.get("result").cloned().unwrap_or(Value::Null);
        subscriptions.dispatch(&SubscriptionId(id.to_string()), result);
        return None;
    }

    let Ok(mut resp) = serde_json::from_value::<JsonRpcResponse>(val) else {
        return None;
    };
    let RpcId::Number(id) = resp.id else {
        return None;
    };

    match pending.remove(&id)? {
        Pending::Call { caller_id, tx } => {
            resp.id = caller_id;
            let _ = tx.send(Ok(resp));
            None
        }
        Pending::Subscribe { tx } => {
            let sub_id = resp
                .into_result()
                .and_then(|v| serde_json::from_value::<String>(v).map_err(TransportError::from));
            match sub_id {
                Ok(sub_id) => {
                    let reg = subscriptions.register(SubscriptionId(sub_id));
                    tx.send(Ok(reg)).err().and_then(|r| r.ok()).map(|reg| reg.id)
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_is_routed_with_caller_id() {
        let subs = SubscriptionManager::new();
        let mut pending = HashMap::new();
        let (tx, mut rx) = oneshot::channel();
        pending.insert(
            7,
            Pending::Call {
                caller_id: RpcId::Number(1234),
                tx,
            },
        );

        let orphan = handle_message(r#"{"jsonrpc":"2.0","id":7,"result":"0x1"}"#, &mut pending, &subs);
        assert!(orphan.is_none());
        let resp = rx.try_recv().unwrap().unwrap();
        assert_eq!(resp.id, RpcId::Number(1234));
        assert!(pending.is_empty());
    }

    #[test]
    fn subscribe_response_registers_before_notifications() {
        let subs = SubscriptionManager::new();
        let mut pending = HashMap::new();
        let (tx, mut rx) = oneshot::channel();
        pending.insert(1, Pending::Subscribe { tx });

        handle_message(r#"{"jsonrpc":"2.0","id":1,"result":"0xabc"}"#, &mut pending, &subs);
        handle_message(
            r#"{"jsonrpc":"2.0","method":"eth_subscription","params":{"subscription":"0xabc","result":{"n":1}}}"#,
            &mut pending,
            &subs,
        );

        let mut reg = rx.try_recv().unwrap().unwrap();
        assert_eq!(reg.id, SubscriptionId("0xabc".into()));
        assert_eq!(reg.notifications.try_recv().unwrap()["n"], 1);
    }

    #[test]
    fn abandoned_subscribe_is_reported_as_orphan() {
        let subs = SubscriptionManager::new();
        let mut pending = HashMap::new();
        let (tx, rx) = oneshot::channel();
        drop(rx);
        pending.insert(1, Pending::Subscribe { tx });

        let orphan = handle_message(r#"{"jsonrpc":"2.0","id":1,"result":"0xdead"}"#, &mut pending, &subs);
        assert_eq!(orphan, Some(SubscriptionId("0xdead".into())));
    }

    #[test]
    fn subscribe_error_is_forwarded() {
        let subs = SubscriptionManager::new();
        let mut pending = HashMap::new();
        let (tx, mut rx) = oneshot::channel();
        pending.insert(2, Pending::Subscribe { tx });

        handle_message(
            r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32601,"message":"notifications not supported"}}"#,
            &mut pending,
            &subs,
        );
        let err = rx.try_recv().unwrap().err().unwrap();
        assert!(matches!(err, TransportError::Rpc { code: -32601, .. }));
        assert!(subs.is_empty());
    }

    #[test]
    fn queued_commands_fail_while_disconnected() {
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let (tx, mut rx) = oneshot::channel();
        cmd_tx
            .send(WsCommand::Send {
                req: JsonRpcRequest::new(1, "eth_chainId", vec![]),
                tx,
            })
            .ok()
            .unwrap();

        assert!(fail_queued(&mut cmd_rx));
        assert!(matches!(rx.try_recv().unwrap(), Err(TransportError::WebSocket(_))));

        cmd_tx.send(WsCommand::Close).ok().unwrap();
        assert!(!fail_queued(&mut cmd_rx));
    }
}
