//! Decoded events and the hook for typed event structs.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::error::BindError;
use crate::log::{Log, LogPosition};
use crate::value::AbiValue;

/// The decoded fields of one event occurrence, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFields {
    pub name: String,
    pub fields: Vec<(String, AbiValue)>,
}

impl EventFields {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Look up a field by name.
    pub fn get(&self, field: &str) -> Option<&AbiValue> {
        self.fields
            .iter()
            .find_map(|(n, v)| (n == field).then_some(v))
    }

    /// Like [`get`](Self::get), but a missing field is a decoding error.
    pub fn require(&self, field: &str) -> Result<&AbiValue, BindError> {
        self.get(field).ok_or_else(|| {
            BindError::decoding(format!("event '{}' has no field '{field}'", self.name))
        })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Conversion from generic decoded fields into a caller-defined event type.
///
/// Implement this for a struct to receive typed events from iterators and
/// subscriptions; [`EventFields`] itself is the identity implementation.
pub trait FromEventFields: Sized + Send + 'static {
    fn from_fields(fields: EventFields) -> Result<Self, BindError>;
}

impl FromEventFields for EventFields {
    fn from_fields(fields: EventFields) -> Result<Self, BindError> {
        Ok(fields)
    }
}

/// A decoded event together with the raw log it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedEvent<T = EventFields> {
    pub event: T,
    pub raw: Log,
}

impl<T> DecodedEvent<T> {
    pub fn block_number(&self) -> u64 {
        self.raw.block_number
    }

    pub fn transaction_hash(&self) -> B256 {
        self.raw.transaction_hash
    }

    pub fn log_index(&self) -> u64 {
        self.raw.log_index
    }

    pub fn address(&self) -> Address {
        self.raw.address
    }

    pub fn position(&self) -> LogPosition {
        self.raw.position()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DecodedEvent<U> {
        DecodedEvent {
            event: f(self.event),
            raw: self.raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_lookup() {
        let mut ev = EventFields::new("Transfer");
        ev.fields.push(("value".into(), AbiValue::Uint(10)));
        assert_eq!(ev.get("value"), Some(&AbiValue::Uint(10)));
        assert!(ev.get("missing").is_none());
        assert!(matches!(
            ev.require("missing"),
            Err(BindError::Decoding { .. })
        ));
    }

    #[test]
    fn identity_conversion() {
        let ev = EventFields::new("Ping");
        assert_eq!(EventFields::from_fields(ev.clone()).unwrap(), ev);
    }
}
