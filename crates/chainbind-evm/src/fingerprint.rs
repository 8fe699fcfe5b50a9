//! Keccak-256 fingerprints: event topics and function selectors.
//!
//! An event's topic0 is `keccak256("Name(type1,type2,...)")`; a function
//! selector is the first four bytes of the same hash over the function
//! signature.

use alloy_primitives::B256;
use tiny_keccak::{Hasher, Keccak};

pub fn keccak256(data: &[u8]) -> B256 {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    B256::from(output)
}

/// Topic0 of an event given its canonical signature.
pub fn event_topic(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

/// 4-byte selector of a function given its canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}
