//! WebSocket subscription bookkeeping.
//!
//! Maps `eth_subscribe` ids to the channels of their consumers. A lost
//! connection fails every registered subscription: ids do not survive a
//! reconnect, so consumers must resubscribe.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chainbind_core::TransportError;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

/// A subscription id returned by `eth_subscribe`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub String);

impl From<String> for SubscriptionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct SubscriptionEntry {
    sender: mpsc::UnboundedSender<Value>,
    errors: oneshot::Sender<TransportError>,
}

/// Consumer side of one registered subscription.
pub struct Registration {
    pub id: SubscriptionId,
    pub notifications: mpsc::UnboundedReceiver<Value>,
    pub errors: oneshot::Receiver<TransportError>,
}

#[derive(Clone, Default)]
pub struct SubscriptionManager {
    entries: Arc<Mutex<HashMap<SubscriptionId, SubscriptionEntry>>>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriptionId, SubscriptionEntry>> {
        // A poisoned map is still structurally valid
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register(&self, id: SubscriptionId) -> Registration {
        let (sender, notifications) = mpsc::unbounded_channel();
        let (err_tx, errors) = oneshot::channel();
        self.lock().insert(
            id.clone(),
            SubscriptionEntry {
                sender,
                errors: err_tx,
            },
        );
        Registration {
            id,
            notifications,
            errors,
        }
    }

    /// Forward a notification. Returns `false` if the id is unknown or its
    /// consumer is gone.
    pub fn dispatch(&self, id: &SubscriptionId, message: Value) -> bool {
        match self.lock().get(id) {
            Some(entry) => entry.sender.send(message).is_ok(),
            None => {
                tracing::trace!(subscription = %id, "notification for unknown subscription");
                false
            }
        }
    }

    /// Remove a subscription. Returns `true` if it was registered.
    pub fn remove(&self, id: &SubscriptionId) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Fail and forget every subscription.
    pub fn fail_all(&self, err: TransportError) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        let count = drained.len();
        for (id, entry) in drained {
            tracing::debug!(subscription = %id, error = %err, "failing subscription");
            let _ = entry.errors.send(err.clone());
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
