//! # chainbind-evm
//!
//! EVM ABI codec for ChainBind, built on alloy's dynamic ABI support.
//!
//! - `EvmAbi`: parse a JSON ABI, encode calldata, decode outputs and logs
//! - `fingerprint`: keccak256 event topics and function selectors
//! - `normalizer` / `value`: conversion between alloy values and `AbiValue`

pub mod abi;
pub mod fingerprint;
pub mod normalizer;
pub mod value;

pub use abi::EvmAbi;
