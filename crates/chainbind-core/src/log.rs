//! Raw log records as returned by a chain endpoint.

use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

/// A single EVM log entry, undecoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    /// Emitting contract.
    pub address: Address,
    /// `topics[0]` is the event signature hash unless the event is anonymous.
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed fields.
    pub data: Bytes,
    pub block_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<B256>,
    pub transaction_hash: B256,
    pub log_index: u64,
    /// Set when the log was reverted by a chain reorganization.
    #[serde(default)]
    pub removed: bool,
}

impl Log {
    /// Position in the canonical chain ordering.
    pub fn position(&self) -> LogPosition {
        LogPosition {
            block_number: self.block_number,
            log_index: self.log_index,
        }
    }

    /// Identity used for duplicate suppression.
    pub fn key(&self) -> LogKey {
        LogKey {
            transaction_hash: self.transaction_hash,
            log_index: self.log_index,
            removed: self.removed,
        }
    }

    pub fn topic0(&self) -> Option<&B256> {
        self.topics.first()
    }
}

/// `(block_number, log_index)`, totally ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogPosition {
    pub block_number: u64,
    pub log_index: u64,
}

impl std::fmt::Display for LogPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.block_number, self.log_index)
    }
}

/// Dedup identity of a log. A reorg removal marker carries `removed = true`
/// and therefore never collides with the log it retracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogKey {
    pub transaction_hash: B256,
    pub log_index: u64,
    pub removed: bool,
}
