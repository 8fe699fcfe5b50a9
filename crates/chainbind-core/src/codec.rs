//! The `AbiCodec` trait: ABI knowledge for one contract, behind a seam.

use alloy_primitives::{Bytes, B256};

use crate::error::BindError;
use crate::event::EventFields;
use crate::value::AbiValue;

/// Encodes calls and decodes outputs and logs for one contract ABI.
///
/// # Object Safety
/// The trait is object-safe and is shared as `Arc<dyn AbiCodec>` by a bound
/// contract and every iterator and subscription it opens. Implementations
/// are read-only after construction.
pub trait AbiCodec: Send + Sync + 'static {
    /// `selector ++ abi_encode(args)` for `method`.
    fn encode_call(&self, method: &str, args: &[AbiValue]) -> Result<Bytes, BindError>;

    /// Decode the return data of `method` into its declared outputs.
    fn decode_output(&self, method: &str, data: &[u8]) -> Result<Vec<AbiValue>, BindError>;

    /// Signature hash of `event`, or `None` if the event is anonymous.
    fn event_topic(&self, event: &str) -> Result<Option<B256>, BindError>;

    /// Topic encoding of `value` for the indexed parameter at `position`
    /// (0-based among the event's indexed parameters).
    fn encode_topic(
        &self,
        event: &str,
        position: usize,
        value: &AbiValue,
    ) -> Result<B256, BindError>;

    /// Unpack indexed topics and the data payload of one log.
    ///
    /// `topics` includes `topics[0]` for non-anonymous events. The signature
    /// check is the caller's responsibility.
    fn decode_log(&self, event: &str, topics: &[B256], data: &[u8])
        -> Result<EventFields, BindError>;

    /// Whether `method` exists in the ABI.
    fn has_method(&self, method: &str) -> bool;

    /// Whether `event` exists in the ABI.
    fn has_event(&self, event: &str) -> bool;
}
