//! Long-running event monitoring that survives feed failures.
//!
//! A monitor keeps one live subscription open for as long as its handle
//! lives. When the feed fails with a transport error it is reopened after a
//! capped exponential backoff. Every `tick`, independently of the feed, the
//! monitor re-reads the last `past_blocks` blocks, so events missed while the
//! feed was down still arrive. Both sources share one dedup window and one
//! sink.
//!
//! Only transport failures are retried. A decode failure ends the monitor
//! and is reported through [`Subscription::err`], as with a plain
//! [`watch_logs`](BoundContract::watch_logs).

use std::time::Duration;

use chainbind_core::{
    AbiValue, BindError, DecodedEvent, FilterOpts, FromEventFields, Phase, TransportError,
    WatchOpts,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::bound::BoundContract;
use crate::callback::WATCH_BUFFER;
use crate::dedup::{SeenLogs, DEFAULT_SEEN_CAPACITY};
use crate::subscription::{quit_requested, Subscription};

/// Tuning for [`BoundContract::monitor_logs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOpts {
    /// Interval between sweeps of recent history.
    pub tick: Duration,
    /// How far behind the head each sweep starts.
    pub past_blocks: u64,
    /// Delay before the first resubscription attempt; doubles per
    /// consecutive failure.
    pub backoff_initial: Duration,
    /// Upper bound for the resubscription delay.
    pub backoff_max: Duration,
    /// Resubscribing sooner than this after the previous attempt is logged
    /// as a warning.
    pub alert_threshold: Duration,
    /// Number of recent logs remembered for dedup. Must cover the logs of
    /// `past_blocks` blocks, or sweeps re-deliver them.
    pub seen_capacity: usize,
}

impl Default for MonitorOpts {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(15 * 60),
            past_blocks: 100,
            backoff_initial: Duration::from_secs(1),
            backoff_max: Duration::from_secs(2 * 60),
            alert_threshold: Duration::from_secs(15 * 60),
            seen_capacity: DEFAULT_SEEN_CAPACITY,
        }
    }
}

/// The currently open live subscription.
struct Live<T> {
    sub: Subscription,
    rx: mpsc::Receiver<DecodedEvent<T>>,
}

enum Exit {
    Closed,
    ConsumerGone,
}

enum Wake<T> {
    Quit,
    ConsumerGone,
    Event(DecodedEvent<T>),
    LiveEnded,
    Retry,
    Sweep,
}

struct Monitor<T> {
    contract: BoundContract,
    event: String,
    indexed: Vec<Vec<AbiValue>>,
    opts: MonitorOpts,
    sink: mpsc::Sender<DecodedEvent<T>>,
    quit: watch::Receiver<bool>,
    seen: SeenLogs,
}

impl<T: FromEventFields> Monitor<T> {
    async fn run(
        mut self,
        first: Live<T>,
        phase: watch::Sender<Phase>,
        err_tx: oneshot::Sender<BindError>,
    ) {
        info!(event = %self.event, tick = ?self.opts.tick, past_blocks = self.opts.past_blocks, "monitor started");
        match self.drive(first).await {
            Ok(exit) => {
                match exit {
                    Exit::Closed => info!(event = %self.event, "monitor closed"),
                    Exit::ConsumerGone => info!(event = %self.event, "subscriber dropped; monitor closed"),
                }
                drop(err_tx);
                phase.send_replace(Phase::Done);
            }
            Err(e) => {
                warn!(event = %self.event, error = %e, "monitor failed");
                let _ = err_tx.send(e.clone());
                phase.send_replace(Phase::Failed(e));
            }
        }
    }

    async fn drive(&mut self, first: Live<T>) -> Result<Exit, BindError> {
        let mut live = Some(first);
        let mut retry_at: Option<Instant> = None;
        let mut backoff = self.opts.backoff_initial;
        let mut last_attempt = Instant::now();

        let mut sweep = tokio::time::interval_at(Instant::now() + self.opts.tick, self.opts.tick);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let wake = tokio::select! {
                biased;
                _ = quit_requested(&mut self.quit) => Wake::Quit,
                _ = self.sink.closed() => Wake::ConsumerGone,
                next = next_live(&mut live) => match next {
                    Some(ev) => Wake::Event(ev),
                    None => Wake::LiveEnded,
                },
                _ = retry_due(retry_at) => Wake::Retry,
                _ = sweep.tick() => Wake::Sweep,
            };

            let failure = match wake {
                Wake::Quit => return Ok(Exit::Closed),
                Wake::ConsumerGone => return Ok(Exit::ConsumerGone),
                Wake::Event(ev) => {
                    if let Some(exit) = self.forward(ev).await {
                        return Ok(exit);
                    }
                    continue;
                }
                Wake::Sweep => {
                    if let Some(exit) = self.sweep().await {
                        return Ok(exit);
                    }
                    continue;
                }
                Wake::LiveEnded => {
                    let Some(mut ended) = live.take() else {
                        continue;
                    };
                    // The feed never ends cleanly while the monitor holds
                    // its receiver.
                    ended
                        .sub
                        .err()
                        .await
                        .unwrap_or(BindError::SubscriptionFailed(TransportError::Closed))
                }
                Wake::Retry => {
                    retry_at = None;
                    let elapsed = last_attempt.elapsed();
                    if elapsed < self.opts.alert_threshold {
                        warn!(
                            event = %self.event,
                            ?elapsed,
                            "subscription had to be retried shortly after the last attempt; check node connectivity"
                        );
                    }
                    last_attempt = Instant::now();
                    match open_live(&self.contract, &self.event, &self.indexed).await {
                        Ok(reopened) => {
                            info!(event = %self.event, "resubscribed");
                            live = Some(reopened);
                            continue;
                        }
                        Err(e) => e,
                    }
                }
            };

            if !failure.is_transport() {
                return Err(failure);
            }
            if last_attempt.elapsed() >= self.opts.backoff_max {
                backoff = self.opts.backoff_initial;
            }
            error!(event = %self.event, error = %failure, retry_in = ?backoff, "subscription failed; resubscribing");
            retry_at = Some(Instant::now() + backoff);
            backoff = (backoff * 2).min(self.opts.backoff_max);
        }
    }

    /// Hand one event to the consumer unless it was already delivered.
    async fn forward(&mut self, ev: DecodedEvent<T>) -> Option<Exit> {
        if !self.seen.insert(ev.raw.key()) {
            debug!(event = %self.event, position = %ev.position(), "duplicate event skipped");
            return None;
        }
        tokio::select! {
            biased;
            _ = quit_requested(&mut self.quit) => Some(Exit::Closed),
            sent = self.sink.send(ev) => sent.err().map(|_| Exit::ConsumerGone),
        }
    }

    /// Re-read recent history and forward whatever the feed missed.
    async fn sweep(&mut self) -> Option<Exit> {
        let head = match self.contract.endpoint().block_number().await {
            Ok(head) => head,
            Err(e) => {
                warn!(event = %self.event, error = %e, "sweep could not read the chain head");
                return None;
            }
        };
        let from_block = head.saturating_sub(self.opts.past_blocks);
        debug!(event = %self.event, from_block, "sweeping recent events");

        let mut iter = match self
            .contract
            .filter_logs::<T>(&FilterOpts::since(from_block), &self.event, &self.indexed)
            .await
        {
            Ok(iter) => iter,
            Err(e) => {
                warn!(event = %self.event, error = %e, "sweep query failed");
                return None;
            }
        };
        let events: Vec<_> = iter.by_ref().collect();
        if let Some(e) = iter.error() {
            warn!(event = %self.event, error = %e, "sweep stopped at an undecodable log");
        }
        debug!(event = %self.event, fetched = events.len(), "sweep fetched");

        for ev in events {
            if let Some(exit) = self.forward(ev).await {
                return Some(exit);
            }
        }
        None
    }
}

async fn next_live<T>(live: &mut Option<Live<T>>) -> Option<DecodedEvent<T>> {
    match live {
        Some(l) => l.rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn retry_due(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn open_live<T: FromEventFields>(
    contract: &BoundContract,
    event: &str,
    indexed: &[Vec<AbiValue>],
) -> Result<Live<T>, BindError> {
    let (tx, rx) = mpsc::channel(WATCH_BUFFER);
    let sub = contract
        .watch_logs(&WatchOpts::default(), event, indexed, tx)
        .await?;
    Ok(Live { sub, rx })
}

impl BoundContract {
    /// Follow `event` indefinitely, pushing every occurrence into `sink`
    /// once.
    ///
    /// The live feed is reopened after transport failures and recent history
    /// is swept every `opts.tick`. Failing to open the first feed is returned
    /// directly. The returned [`Subscription`] stops the monitor on `close()`
    /// or drop and reports a non-transport failure through `err()`.
    pub async fn monitor_logs<T: FromEventFields>(
        &self,
        opts: &MonitorOpts,
        event: &str,
        indexed: &[Vec<AbiValue>],
        sink: mpsc::Sender<DecodedEvent<T>>,
    ) -> Result<Subscription, BindError> {
        let first = open_live::<T>(self, event, indexed).await?;

        let (quit_tx, quit_rx) = watch::channel(false);
        let (phase_tx, phase_rx) = watch::channel(Phase::Live);
        let (err_tx, err_rx) = oneshot::channel();

        let monitor = Monitor {
            contract: self.clone(),
            event: event.to_string(),
            indexed: indexed.to_vec(),
            opts: opts.clone(),
            sink,
            quit: quit_rx,
            seen: SeenLogs::new(opts.seen_capacity),
        };
        tokio::spawn(monitor.run(first, phase_tx, err_tx));

        Ok(Subscription {
            quit: quit_tx,
            phase: phase_rx,
            err: Some(err_rx),
        })
    }
}
