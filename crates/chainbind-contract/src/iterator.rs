//! Historical log iteration over a finished block range.

use std::collections::{HashSet, VecDeque};
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::sync::Arc;

use chainbind_core::{
    AbiCodec, AbiValue, BindError, DecodedEvent, EventFields, FilterOpts, FromEventFields, Log,
    LogKey, Phase,
};
use tracing::{debug, warn};

use crate::bound::BoundContract;
use crate::decode::decode_log;

/// Lazily decodes the logs returned by one `eth_getLogs` query.
///
/// Logs are yielded in ascending (block, log index) order. Removed logs and
/// repeats of the same (transaction, log index) are skipped. The first log
/// that fails to decode ends iteration: `next` returns `None` and
/// [`error`](Self::error) reports the cause. Events yielded before the
/// failure remain valid.
pub struct LogIterator<T = EventFields> {
    event: String,
    codec: Arc<dyn AbiCodec>,
    pending: VecDeque<Log>,
    seen: HashSet<LogKey>,
    phase: Phase,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromEventFields> LogIterator<T> {
    pub fn new(event: impl Into<String>, codec: Arc<dyn AbiCodec>, logs: Vec<Log>) -> Self {
        let mut logs: Vec<Log> = logs.into_iter().filter(|l| !l.removed).collect();
        logs.sort_by_key(Log::position);
        Self {
            event: event.into(),
            codec,
            pending: logs.into(),
            seen: HashSet::new(),
            phase: Phase::Historical,
            _marker: PhantomData,
        }
    }

    /// The error that ended iteration, if any.
    pub fn error(&self) -> Option<&BindError> {
        self.phase.error()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Logs not yet yielded (before duplicate suppression).
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Release buffered logs. Idempotent; does not clear a recorded error.
    pub fn close(&mut self) {
        self.pending.clear();
        if !self.phase.is_terminal() {
            self.phase = Phase::Done;
        }
    }
}

impl<T: FromEventFields> Iterator for LogIterator<T> {
    type Item = DecodedEvent<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.phase.is_terminal() {
            return None;
        }
        while let Some(log) = self.pending.pop_front() {
            if !self.seen.insert(log.key()) {
                debug!(event = %self.event, position = %log.position(), "duplicate log skipped");
                continue;
            }
            let position = log.position();
            match decode_log::<T>(log, &self.event, self.codec.as_ref()) {
                Ok(decoded) => return Some(decoded),
                Err(e) => {
                    warn!(event = %self.event, %position, error = %e, "log decode failed; iteration stopped");
                    self.pending.clear();
                    self.phase = Phase::Failed(e);
                    return None;
                }
            }
        }
        self.phase = Phase::Done;
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.phase.is_terminal() {
            (0, Some(0))
        } else {
            (0, Some(self.pending.len()))
        }
    }
}

impl<T: FromEventFields> FusedIterator for LogIterator<T> {}

impl<T> std::fmt::Debug for LogIterator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogIterator")
            .field("event", &self.event)
            .field("remaining", &self.pending.len())
            .field("phase", &self.phase)
            .finish()
    }
}

impl BoundContract {
    /// Query the logs of `event` in `opts`' block range and iterate them.
    ///
    /// Issues exactly one `eth_getLogs` request; decoding happens as the
    /// iterator is advanced.
    pub async fn filter_logs<T: FromEventFields>(
        &self,
        opts: &FilterOpts,
        event: &str,
        indexed: &[Vec<AbiValue>],
    ) -> Result<LogIterator<T>, BindError> {
        let filter = self.log_filter(event, indexed, Some(opts.start), opts.end)?;
        let logs = self.endpoint.get_logs(&filter).await?;
        debug!(contract = %self.address, event, from = opts.start, to = ?opts.end, count = logs.len(), "logs fetched");
        Ok(LogIterator::new(event, self.codec.clone(), logs))
    }
}
