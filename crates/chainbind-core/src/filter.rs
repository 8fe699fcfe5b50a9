//! Log filter passed to `eth_getLogs` / `eth_subscribe("logs")`.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::log::Log;

// ─── TopicConstraint ─────────────────────────────────────────────────────────

/// Constraint on one topic position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopicConstraint {
    /// Position is unconstrained (JSON `null`).
    #[default]
    Any,
    /// Topic must equal one of these values.
    OneOf(Vec<B256>),
}

impl TopicConstraint {
    pub fn matches(&self, topic: Option<&B256>) -> bool {
        match self {
            Self::Any => true,
            Self::OneOf(values) => topic.is_some_and(|t| values.contains(t)),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

// ─── LogFilter ───────────────────────────────────────────────────────────────

/// Which logs an iterator or subscription is interested in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    /// Emitting contracts (empty = any address).
    pub addresses: Vec<Address>,
    /// Event signature hash; `None` for anonymous events.
    pub topic0: Option<B256>,
    /// Constraints on `topics[1..]`, in indexed-parameter order.
    pub indexed: Vec<TopicConstraint>,
    /// Start block (inclusive); `None` = node default.
    pub from_block: Option<u64>,
    /// End block (inclusive); `None` = latest.
    pub to_block: Option<u64>,
}

impl LogFilter {
    /// Filter for a single contract address.
    pub fn address(addr: Address) -> Self {
        Self {
            addresses: vec![addr],
            ..Default::default()
        }
    }

    pub fn topic0(mut self, topic: B256) -> Self {
        self.topic0 = Some(topic);
        self
    }

    /// Append a constraint for the next indexed parameter.
    pub fn indexed(mut self, constraint: TopicConstraint) -> Self {
        self.indexed.push(constraint);
        self
    }

    pub fn from_block(mut self, block: u64) -> Self {
        self.from_block = Some(block);
        self
    }

    pub fn to_block(mut self, block: u64) -> Self {
        self.to_block = Some(block);
        self
    }

    /// The same filter with the block range cleared, for live subscriptions.
    pub fn without_range(&self) -> Self {
        Self {
            from_block: None,
            to_block: None,
            ..self.clone()
        }
    }

    /// Full topic constraint list with trailing wildcards trimmed.
    pub fn topics(&self) -> Vec<TopicConstraint> {
        let mut topics = Vec::with_capacity(self.indexed.len() + 1);
        topics.push(match self.topic0 {
            Some(t) => TopicConstraint::OneOf(vec![t]),
            None => TopicConstraint::Any,
        });
        topics.extend(self.indexed.iter().cloned());
        while topics.last().is_some_and(TopicConstraint::is_any) {
            topics.pop();
        }
        topics
    }

    pub fn matches_address(&self, address: &Address) -> bool {
        self.addresses.is_empty() || self.addresses.contains(address)
    }

    pub fn matches_block(&self, block: u64) -> bool {
        self.from_block.map_or(true, |from| block >= from)
            && self.to_block.map_or(true, |to| block <= to)
    }

    /// Evaluate the filter client-side.
    pub fn matches(&self, log: &Log) -> bool {
        self.matches_address(&log.address)
            && self.matches_block(log.block_number)
            && self
                .topics()
                .iter()
                .enumerate()
                .all(|(i, c)| c.matches(log.topics.get(i)))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;

    fn log_with(topics: Vec<B256>, block: u64) -> Log {
        Log {
            address: Address::repeat_byte(1),
            topics,
            data: Bytes::new(),
            block_number: block,
            block_hash: None,
            transaction_hash: B256::ZERO,
            log_index: 0,
            removed: false,
        }
    }

    #[test]
    fn trailing_wildcards_are_trimmed() {
        let f = LogFilter::address(Address::repeat_byte(1))
            .topic0(B256::repeat_byte(9))
            .indexed(TopicConstraint::OneOf(vec![B256::repeat_byte(2)]))
            .indexed(TopicConstraint::Any);
        assert_eq!(f.topics().len(), 2);
    }

    #[test]
    fn anonymous_filter_has_wildcard_topic0() {
        let f = LogFilter::default().indexed(TopicConstraint::OneOf(vec![B256::ZERO]));
        assert_eq!(f.topics()[0], TopicConstraint::Any);
        assert!(LogFilter::default().topics().is_empty());
    }

    #[test]
    fn matches_topics_address_and_range() {
        let sig = B256::repeat_byte(9);
        let f = LogFilter::address(Address::repeat_byte(1))
            .topic0(sig)
            .indexed(TopicConstraint::OneOf(vec![B256::repeat_byte(2), B256::repeat_byte(3)]))
            .from_block(10)
            .to_block(20);

        assert!(f.matches(&log_with(vec![sig, B256::repeat_byte(3)], 15)));
        assert!(!f.matches(&log_with(vec![sig, B256::repeat_byte(4)], 15)));
        assert!(!f.matches(&log_with(vec![sig], 15)));
        assert!(!f.matches(&log_with(vec![sig, B256::repeat_byte(2)], 21)));

        let mut other = log_with(vec![sig, B256::repeat_byte(2)], 15);
        other.address = Address::repeat_byte(7);
        assert!(!f.matches(&other));
    }

    #[test]
    fn without_range_clears_blocks_only() {
        let f = LogFilter::address(Address::ZERO).from_block(5).to_block(6);
        let live = f.without_range();
        assert_eq!(live.from_block, None);
        assert_eq!(live.to_block, None);
        assert_eq!(live.addresses, f.addresses);
    }
}
