//! Error taxonomy shared by every ChainBind crate.
//!
//! Both enums are `Clone` so a terminal failure can be stored in a
//! [`Phase`](crate::phase::Phase) and still be handed to the caller.

use thiserror::Error;

/// Errors raised by a chain endpoint or the transport beneath it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, non-2xx status, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// WebSocket connection/send/receive error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// JSON-RPC protocol-level error returned by the node.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// The connection or subscription was closed by the remote side.
    #[error("connection closed")]
    Closed,

    /// The transport cannot perform this operation (e.g. push over HTTP).
    #[error("unsupported by transport: {0}")]
    Unsupported(String),

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` if this error is transient and the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::WebSocket(_) | Self::Timeout { .. } | Self::Closed
        )
    }

    /// Returns `true` if this is a node-side execution error (revert etc.).
    pub fn is_execution_error(&self) -> bool {
        matches!(self, Self::Rpc { .. })
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        Self::Deserialization(e.to_string())
    }
}

/// Errors surfaced by a bound contract and its iterators/subscriptions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    #[error("invalid ABI: {reason}")]
    InvalidAbi { reason: String },

    #[error("method '{name}' not found in ABI")]
    UnknownMethod { name: String },

    #[error("event '{name}' not found in ABI")]
    UnknownEvent { name: String },

    /// Arguments do not match the method's declared inputs.
    #[error("cannot encode arguments for '{method}': {reason}")]
    Encoding { method: String, reason: String },

    /// Return data or a log payload does not match the ABI.
    #[error("decoding failed: {reason}")]
    Decoding { reason: String },

    /// topic0 of a log is not the requested event's signature hash.
    #[error("log signature mismatch for '{event}': expected {expected}, got {got}")]
    SignatureMismatch {
        event: String,
        expected: String,
        got: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A live subscription ended because its feed failed.
    #[error("subscription failed: {0}")]
    SubscriptionFailed(TransportError),
}

impl BindError {
    pub fn decoding(reason: impl Into<String>) -> Self {
        Self::Decoding {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error originated below the binding layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::SubscriptionFailed(_))
    }

    /// Short stable label, used as a metric attribute.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAbi { .. } => "invalid_abi",
            Self::UnknownMethod { .. } => "unknown_method",
            Self::UnknownEvent { .. } => "unknown_event",
            Self::Encoding { .. } => "encoding",
            Self::Decoding { .. } => "decoding",
            Self::SignatureMismatch { .. } => "signature_mismatch",
            Self::Transport(_) => "transport",
            Self::SubscriptionFailed(_) => "subscription_failed",
        }
    }
}
