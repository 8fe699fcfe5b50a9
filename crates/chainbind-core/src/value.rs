//! Normalized ABI values.
//!
//! Contract arguments, call outputs and event fields are all expressed as
//! [`AbiValue`] so callers never touch the codec's internal representation.

use serde::{Deserialize, Serialize};

/// A decoded or to-be-encoded ABI value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AbiValue {
    Uint(u128),
    /// Uints that do not fit in u128, as a decimal string
    BigUint(String),
    Int(i128),
    /// Ints that do not fit in i128, as a decimal string
    BigInt(String),
    Bool(bool),
    /// `bytes`, `bytesN`, or the topic hash of an indexed reference type
    Bytes(Vec<u8>),
    Str(String),
    /// 20-byte address, 0x-prefixed hex (EIP-55 checksummed when decoded)
    Address(String),
    Array(Vec<AbiValue>),
    Tuple(Vec<(String, AbiValue)>),
}

impl AbiValue {
    pub fn address(s: impl Into<String>) -> Self {
        Self::Address(s.into())
    }

    pub fn as_u128(&self) -> Option<u128> {
        match self {
            Self::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&str> {
        match self {
            Self::Address(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    /// Short type label used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Uint(_) | Self::BigUint(_) => "uint",
            Self::Int(_) | Self::BigInt(_) => "int",
            Self::Bool(_) => "bool",
            Self::Bytes(_) => "bytes",
            Self::Str(_) => "string",
            Self::Address(_) => "address",
            Self::Array(_) => "array",
            Self::Tuple(_) => "tuple",
        }
    }
}

impl std::fmt::Display for AbiValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uint(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::BigUint(s) | Self::BigInt(s) | Self::Address(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Bytes(b) => write!(f, "0x{}", hex_lower(b)),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Tuple(fields) => {
                f.write_str("(")?;
                for (i, (name, item)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

impl From<bool> for AbiValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<u64> for AbiValue {
    fn from(v: u64) -> Self {
        Self::Uint(v as u128)
    }
}

impl From<u128> for AbiValue {
    fn from(v: u128) -> Self {
        Self::Uint(v)
    }
}

impl From<&str> for AbiValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<alloy_primitives::Address> for AbiValue {
    fn from(a: alloy_primitives::Address) -> Self {
        Self::Address(a.to_checksum(None))
    }
}
