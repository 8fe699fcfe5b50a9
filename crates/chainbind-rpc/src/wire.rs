//! Conversions between ChainBind types and Ethereum JSON-RPC payloads.

use alloy_primitives::{Address, Bytes, B256};
use chainbind_core::{Log, LogFilter, TopicConstraint, TransactionRequest, TransportError};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Log object as returned by `eth_getLogs` and `eth_subscription`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub address: Address,
    #[serde(default)]
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
    /// `null` for pending logs.
    pub block_number: Option<String>,
    pub block_hash: Option<B256>,
    pub transaction_hash: Option<B256>,
    pub log_index: Option<String>,
    #[serde(default)]
    pub removed: bool,
}

impl TryFrom<RpcLog> for Log {
    type Error = TransportError;

    fn try_from(raw: RpcLog) -> Result<Self, Self::Error> {
        let missing =
            |field: &str| TransportError::Deserialization(format!("log without {field} (pending?)"));
        Ok(Log {
            address: raw.address,
            topics: raw.topics,
            data: raw.data,
            block_number: parse_hex_u64(raw.block_number.as_deref().ok_or_else(|| missing("blockNumber"))?)?,
            block_hash: raw.block_hash,
            transaction_hash: raw.transaction_hash.ok_or_else(|| missing("transactionHash"))?,
            log_index: parse_hex_u64(raw.log_index.as_deref().ok_or_else(|| missing("logIndex"))?)?,
            removed: raw.removed,
        })
    }
}

/// Parse a hex quantity (`"0x1a"`).
pub fn parse_hex_u64(s: &str) -> Result<u64, TransportError> {
    let hex = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(hex, 16)
        .map_err(|e| TransportError::Deserialization(format!("invalid quantity '{s}': {e}")))
}

pub fn quantity(n: u64) -> Value {
    Value::String(format!("0x{n:x}"))
}

fn topic_value(c: &TopicConstraint) -> Value {
    match c {
        TopicConstraint::Any => Value::Null,
        TopicConstraint::OneOf(values) if values.len() == 1 => json!(values[0]),
        TopicConstraint::OneOf(values) => json!(values),
    }
}

/// The filter object for `eth_getLogs` / `eth_subscribe("logs")`.
pub fn filter_object(filter: &LogFilter) -> Value {
    let mut obj = Map::new();
    match filter.addresses.as_slice() {
        [] => {}
        [one] => {
            obj.insert("address".into(), json!(one));
        }
        many => {
            obj.insert("address".into(), json!(many));
        }
    }
    let topics = filter.topics();
    if !topics.is_empty() {
        obj.insert(
            "topics".into(),
            Value::Array(topics.iter().map(topic_value).collect()),
        );
    }
    if let Some(from) = filter.from_block {
        obj.insert("fromBlock".into(), quantity(from));
    }
    if let Some(to) = filter.to_block {
        obj.insert("toBlock".into(), quantity(to));
    }
    Value::Object(obj)
}

/// The transaction object for `eth_call` / `eth_estimateGas` / `eth_sendTransaction`.
pub fn transaction_object(tx: &TransactionRequest) -> Value {
    let mut obj = Map::new();
    if let Some(from) = tx.from {
        obj.insert("from".into(), json!(from));
    }
    if let Some(to) = tx.to {
        obj.insert("to".into(), json!(to));
    }
    if !tx.data.is_empty() {
        obj.insert("data".into(), json!(tx.data));
    }
    if let Some(value) = tx.value {
        obj.insert("value".into(), Value::String(format!("0x{value:x}")));
    }
    if let Some(gas) = tx.gas {
        obj.insert("gas".into(), quantity(gas));
    }
    if let Some(price) = tx.gas_price {
        obj.insert("gasPrice".into(), Value::String(format!("0x{price:x}")));
    }
    if let Some(nonce) = tx.nonce {
        obj.insert("nonce".into(), quantity(nonce));
    }
    Value::Object(obj)
}
