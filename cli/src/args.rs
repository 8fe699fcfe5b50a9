//! Command-line argument values → `AbiValue`.
//!
//! Arguments are given as a JSON array. Plain JSON is mapped by shape:
//! `true`/`false` → bool, numbers and decimal strings → integers,
//! 40-hex-digit `0x` strings → addresses, other `0x` strings → bytes,
//! nested arrays → arrays, anything else → string. Fully tagged values
//! (`{"type": "uint", "value": 5}`) are accepted as-is.

use anyhow::{bail, Context, Result};
use chainbind_core::{AbiValue, Bytes};
use serde_json::Value;

pub fn parse_args(json: &str) -> Result<Vec<AbiValue>> {
    let value: Value = serde_json::from_str(json).context("parse --args JSON")?;
    let Value::Array(items) = value else {
        bail!("--args must be a JSON array, e.g. '[\"0xabc...\", 1000]'");
    };
    items.into_iter().map(to_abi_value).collect()
}

/// Parse `--indexed`: one entry per indexed parameter. `null` or `[]`
/// leaves a position open, a scalar pins it, an array allows any of its
/// values.
pub fn parse_indexed(json: &str) -> Result<Vec<Vec<AbiValue>>> {
    let value: Value = serde_json::from_str(json).context("parse --indexed JSON")?;
    let Value::Array(positions) = value else {
        bail!("--indexed must be a JSON array, e.g. '[null, [\"0xabc...\"]]'");
    };
    positions
        .into_iter()
        .map(|p| match p {
            Value::Null => Ok(Vec::new()),
            Value::Array(values) => values.into_iter().map(to_abi_value).collect(),
            scalar => Ok(vec![to_abi_value(scalar)?]),
        })
        .collect()
}

fn to_abi_value(value: Value) -> Result<AbiValue> {
    Ok(match value {
        Value::Bool(b) => AbiValue::Bool(b),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                AbiValue::Uint(u as u128)
            } else if let Some(i) = n.as_i64() {
                AbiValue::Int(i as i128)
            } else {
                bail!("'{n}' is not an integer");
            }
        }
        Value::String(s) => string_value(s)?,
        Value::Array(items) => {
            AbiValue::Array(items.into_iter().map(to_abi_value).collect::<Result<_>>()?)
        }
        obj @ Value::Object(_) => serde_json::from_value(obj).context("tagged ABI value")?,
        Value::Null => bail!("null is not an ABI value"),
    })
}

fn string_value(s: String) -> Result<AbiValue> {
    if let Some(hex) = s.strip_prefix("0x") {
        if hex.len() == 40 {
            return Ok(AbiValue::Address(s));
        }
        let bytes: Bytes = s.parse().with_context(|| format!("invalid hex '{s}'"))?;
        return Ok(AbiValue::Bytes(bytes.to_vec()));
    }
    if let Ok(u) = s.parse::<u128>() {
        return Ok(AbiValue::Uint(u));
    }
    if let Ok(i) = s.parse::<i128>() {
        return Ok(AbiValue::Int(i));
    }
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(AbiValue::BigUint(s));
    }
    Ok(AbiValue::Str(s))
}
