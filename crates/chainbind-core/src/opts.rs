//! Per-operation options for calls, transactions, filters and watches.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Block at which a read-only call is evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockTag {
    #[default]
    Latest,
    Pending,
    Number(u64),
}

impl BlockTag {
    /// JSON-RPC block parameter (`"latest"`, `"pending"`, `"0x1a"`).
    pub fn to_rpc_param(&self) -> String {
        match self {
            Self::Latest => "latest".to_string(),
            Self::Pending => "pending".to_string(),
            Self::Number(n) => format!("0x{n:x}"),
        }
    }
}

/// Options for a read-only contract call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOpts {
    /// Optional sender, for methods that read `msg.sender`.
    pub from: Option<Address>,
    pub block: BlockTag,
}

impl CallOpts {
    pub fn at_block(block: u64) -> Self {
        Self {
            block: BlockTag::Number(block),
            ..Default::default()
        }
    }

    pub fn pending() -> Self {
        Self {
            block: BlockTag::Pending,
            ..Default::default()
        }
    }
}

/// Options for a state-changing transaction.
///
/// Unset fields are filled by the node, except `gas_limit` which is
/// estimated before submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactOpts {
    pub from: Address,
    /// Wei attached to the call.
    pub value: U256,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<U256>,
    pub nonce: Option<u64>,
}

impl TransactOpts {
    pub fn sender(from: Address) -> Self {
        Self {
            from,
            ..Default::default()
        }
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn gas_limit(mut self, gas: u64) -> Self {
        self.gas_limit = Some(gas);
        self
    }
}

/// Historical block range for a log query. `end = None` means latest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOpts {
    pub start: u64,
    pub end: Option<u64>,
}

impl FilterOpts {
    pub fn range(start: u64, end: u64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn since(start: u64) -> Self {
        Self { start, end: None }
    }
}

/// Options for a live log subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchOpts {
    /// Requested start block; honoured by the backfill variant and forwarded
    /// to nodes that accept `fromBlock` on subscriptions.
    pub start: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_tag_rpc_param() {
        assert_eq!(BlockTag::Latest.to_rpc_param(), "latest");
        assert_eq!(BlockTag::Pending.to_rpc_param(), "pending");
        assert_eq!(BlockTag::Number(26).to_rpc_param(), "0x1a");
    }

    #[test]
    fn filter_opts_constructors() {
        assert_eq!(FilterOpts::range(1, 2).end, Some(2));
        assert_eq!(FilterOpts::since(7).end, None);
    }
}
