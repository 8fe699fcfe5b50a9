//! `BoundContract`: one address bound to one ABI and one endpoint.

use std::sync::Arc;

use chainbind_core::{AbiCodec, AbiValue, Address, BindError, ChainEndpoint, LogFilter, TopicConstraint};
use chainbind_evm::EvmAbi;

/// A contract address plus the ABI knowledge and node access needed to
/// call it and read its logs.
///
/// Every per-contract method is `call`/`transact` with a method name, and
/// every event accessor is `filter_logs`/`watch_logs` with an event name.
/// Cloning is cheap; clones share the codec and the endpoint.
#[derive(Clone)]
pub struct BoundContract {
    pub(crate) address: Address,
    pub(crate) codec: Arc<dyn AbiCodec>,
    pub(crate) endpoint: Arc<dyn ChainEndpoint>,
}

impl BoundContract {
    /// Bind `address` using a JSON ABI.
    ///
    /// Fails with `InvalidAbi` if the document or any of its types cannot
    /// be parsed.
    pub fn new(
        address: Address,
        abi_json: &str,
        endpoint: Arc<dyn ChainEndpoint>,
    ) -> Result<Self, BindError> {
        let codec = EvmAbi::from_json(abi_json)?;
        Ok(Self::with_codec(address, Arc::new(codec), endpoint))
    }

    /// Bind `address` using an already-built codec.
    pub fn with_codec(
        address: Address,
        codec: Arc<dyn AbiCodec>,
        endpoint: Arc<dyn ChainEndpoint>,
    ) -> Self {
        Self {
            address,
            codec,
            endpoint,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn codec(&self) -> &Arc<dyn AbiCodec> {
        &self.codec
    }

    pub fn endpoint(&self) -> &Arc<dyn ChainEndpoint> {
        &self.endpoint
    }

    /// Build the log filter for `event` emitted by this contract.
    ///
    /// `indexed[i]` constrains the i-th indexed parameter to any of the
    /// given values; an empty set (or a missing entry) leaves it open.
    pub fn log_filter(
        &self,
        event: &str,
        indexed: &[Vec<AbiValue>],
        from_block: Option<u64>,
        to_block: Option<u64>,
    ) -> Result<LogFilter, BindError> {
        let mut filter = LogFilter::address(self.address);
        filter.topic0 = self.codec.event_topic(event)?;

        for (position, values) in indexed.iter().enumerate() {
            let constraint = if values.is_empty() {
                TopicConstraint::Any
            } else {
                TopicConstraint::OneOf(
                    values
                        .iter()
                        .map(|v| self.codec.encode_topic(event, position, v))
                        .collect::<Result<Vec<_>, _>>()?,
                )
            };
            filter = filter.indexed(constraint);
        }

        filter.from_block = from_block;
        filter.to_block = to_block;
        Ok(filter)
    }
}

impl std::fmt::Debug for BoundContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundContract")
            .field("address", &self.address)
            .field("endpoint", &self.endpoint.name())
            .finish_non_exhaustive()
    }
}
