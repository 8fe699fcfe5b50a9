//! Live log subscriptions.
//!
//! A [`Subscription`] owns a background pump that moves logs from the
//! endpoint's raw feed into a caller-provided channel, decoding each one on
//! the way. The pump waits on three things at once: the next raw log, a
//! transport failure on the feed, and the caller's close signal. Delivery of
//! a decoded event races the same close and failure signals, so a slow
//! consumer can never pin the pump.
//!
//! Exit rules:
//! - `close()` (or dropping the handle, or dropping the receiver) ends the
//!   pump cleanly and `err()` yields `None`.
//! - A transport failure or a decode failure ends the pump and `err()` yields
//!   that error, exactly once.
//! - On every exit the endpoint subscription is released exactly once.

use std::sync::Arc;

use chainbind_core::{
    AbiCodec, AbiValue, BindError, DecodedEvent, FromEventFields, Log, LogSubscription, Phase,
    TransportError, WatchOpts,
};
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::bound::BoundContract;
use crate::decode::decode_log;
use crate::dedup::SeenLogs;

/// Handle to a running log subscription.
///
/// Dropping the handle closes the subscription.
///
/// Repeated logs are suppressed within a window of the most recent
/// [`DEFAULT_SEEN_CAPACITY`](crate::dedup::DEFAULT_SEEN_CAPACITY) distinct
/// logs; a node replaying an older log delivers it again.
#[derive(Debug)]
pub struct Subscription {
    pub(crate) quit: watch::Sender<bool>,
    pub(crate) phase: watch::Receiver<Phase>,
    pub(crate) err: Option<oneshot::Receiver<BindError>>,
}

impl Subscription {
    /// Ask the pump to stop.
    ///
    /// Returns immediately and may be called any number of times. At most one
    /// event that was already being handed over can still arrive afterwards.
    pub fn close(&self) {
        self.quit.send_replace(true);
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase.borrow().clone()
    }

    /// Wait for the subscription to end and return the error that ended it.
    ///
    /// Yields `Some(err)` once if it failed; `None` after a clean close and
    /// on every later call.
    pub async fn err(&mut self) -> Option<BindError> {
        let rx = self.err.take()?;
        rx.await.ok()
    }

    /// Wait until the pump has stopped and return its final phase.
    pub async fn closed(&self) -> Phase {
        let mut phase = self.phase.clone();
        loop {
            {
                let current = phase.borrow_and_update();
                if current.is_terminal() {
                    return current.clone();
                }
            }
            if phase.changed().await.is_err() {
                return phase.borrow().clone();
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// Why the pump stopped without an error.
enum Stop {
    Closed,
    ConsumerGone,
}

/// Moves raw logs from one endpoint feed into one consumer channel.
struct Pump<T> {
    event: String,
    codec: Arc<dyn AbiCodec>,
    sink: mpsc::Sender<DecodedEvent<T>>,
    quit: watch::Receiver<bool>,
    phase: watch::Sender<Phase>,
    seen: SeenLogs,
    errors_open: bool,
}

impl<T: FromEventFields> Pump<T> {
    /// Start the pump on `feed`, first replaying `backlog` (already sorted).
    fn spawn(
        event: &str,
        codec: Arc<dyn AbiCodec>,
        sink: mpsc::Sender<DecodedEvent<T>>,
        feed: LogSubscription,
        backlog: Vec<Log>,
    ) -> Subscription {
        let (quit_tx, quit_rx) = watch::channel(false);
        let initial = if backlog.is_empty() {
            Phase::Live
        } else {
            Phase::Historical
        };
        let (phase_tx, phase_rx) = watch::channel(initial);
        let (err_tx, err_rx) = oneshot::channel();

        let pump = Pump {
            event: event.to_string(),
            codec,
            sink,
            quit: quit_rx,
            phase: phase_tx,
            seen: SeenLogs::default(),
            errors_open: true,
        };
        tokio::spawn(pump.run(feed, backlog, err_tx));

        Subscription {
            quit: quit_tx,
            phase: phase_rx,
            err: Some(err_rx),
        }
    }

    async fn run(
        mut self,
        mut feed: LogSubscription,
        backlog: Vec<Log>,
        err_tx: oneshot::Sender<BindError>,
    ) {
        info!(event = %self.event, backlog = backlog.len(), "subscription started");
        let outcome = self.drive(&mut feed, backlog).await;
        feed.unsubscribe();

        match outcome {
            Ok(stop) => {
                match stop {
                    Stop::Closed => info!(event = %self.event, "subscription closed"),
                    Stop::ConsumerGone => info!(event = %self.event, "subscriber dropped; subscription closed"),
                }
                drop(err_tx);
                self.phase.send_replace(Phase::Done);
            }
            Err(e) => {
                warn!(event = %self.event, error = %e, "subscription failed");
                let _ = err_tx.send(e.clone());
                self.phase.send_replace(Phase::Failed(e));
            }
        }
    }

    async fn drive(&mut self, feed: &mut LogSubscription, backlog: Vec<Log>) -> Result<Stop, BindError> {
        for log in backlog {
            if let Some(stop) = self.deliver(feed, log).await? {
                return Ok(stop);
            }
        }
        self.phase.send_if_modified(|p| {
            let was_live = *p == Phase::Live;
            *p = Phase::Live;
            !was_live
        });

        loop {
            let log = tokio::select! {
                biased;
                _ = quit_requested(&mut self.quit) => return Ok(Stop::Closed),
                e = feed_failure(&mut feed.errors, &mut self.errors_open) => {
                    return Err(BindError::SubscriptionFailed(e));
                }
                _ = self.sink.closed() => return Ok(Stop::ConsumerGone),
                next = feed.logs.next() => match next {
                    Some(Ok(log)) => log,
                    Some(Err(e)) => return Err(BindError::SubscriptionFailed(e)),
                    None => return Err(BindError::SubscriptionFailed(TransportError::Closed)),
                },
            };
            if let Some(stop) = self.deliver(feed, log).await? {
                return Ok(stop);
            }
        }
    }

    /// Decode one log and hand it to the consumer.
    ///
    /// `Ok(None)` means keep going.
    async fn deliver(&mut self, feed: &mut LogSubscription, log: Log) -> Result<Option<Stop>, BindError> {
        // A reorg marker is not a repeat of the log it retracts, and a log
        // re-included after its marker is not a repeat either.
        if !self.seen.insert(log.key()) {
            debug!(event = %self.event, position = %log.position(), "duplicate log skipped");
            return Ok(None);
        }

        let position = log.position();
        let decoded = decode_log::<T>(log, &self.event, self.codec.as_ref())?;

        tokio::select! {
            biased;
            _ = quit_requested(&mut self.quit) => Ok(Some(Stop::Closed)),
            e = feed_failure(&mut feed.errors, &mut self.errors_open) => {
                Err(BindError::SubscriptionFailed(e))
            }
            sent = self.sink.send(decoded) => match sent {
                Ok(()) => {
                    debug!(event = %self.event, %position, "event delivered");
                    Ok(None)
                }
                Err(_) => Ok(Some(Stop::ConsumerGone)),
            },
        }
    }
}

/// Resolves once close was requested or the handle is gone.
pub(crate) async fn quit_requested(quit: &mut watch::Receiver<bool>) {
    loop {
        if *quit.borrow_and_update() {
            return;
        }
        if quit.changed().await.is_err() {
            return;
        }
    }
}

/// Resolves with the feed's transport error. If the feed drops its error
/// sender without reporting, this never resolves.
async fn feed_failure(
    errors: &mut oneshot::Receiver<TransportError>,
    open: &mut bool,
) -> TransportError {
    if *open {
        match errors.await {
            Ok(e) => return e,
            Err(_) => *open = false,
        }
    }
    std::future::pending().await
}

fn sorted_backlog(logs: Vec<Log>) -> Vec<Log> {
    let mut logs: Vec<Log> = logs.into_iter().filter(|l| !l.removed).collect();
    logs.sort_by_key(Log::position);
    logs
}

impl BoundContract {
    /// Subscribe to new occurrences of `event` and push them into `sink`.
    ///
    /// Subscription setup errors are returned directly. Once running, the
    /// subscription ends on `close()`, on a dropped `sink` receiver, or on the
    /// first transport or decode failure, which [`Subscription::err`] reports.
    pub async fn watch_logs<T: FromEventFields>(
        &self,
        opts: &WatchOpts,
        event: &str,
        indexed: &[Vec<AbiValue>],
        sink: mpsc::Sender<DecodedEvent<T>>,
    ) -> Result<Subscription, BindError> {
        let filter = self.log_filter(event, indexed, opts.start, None)?;
        let feed = self.endpoint.subscribe_logs(&filter).await?;
        debug!(contract = %self.address, event, endpoint = self.endpoint.name(), "log subscription opened");
        Ok(Pump::spawn(event, self.codec.clone(), sink, feed, Vec::new()))
    }

    /// Replay `event` logs from `opts.start` up to the current head, then
    /// continue with live logs, without gaps or duplicates at the seam.
    ///
    /// The live feed is opened before the history query so nothing mined in
    /// between is missed; logs seen in both are delivered once. Without a
    /// start block this behaves like [`watch_logs`](Self::watch_logs).
    pub async fn backfill_and_watch<T: FromEventFields>(
        &self,
        opts: &WatchOpts,
        event: &str,
        indexed: &[Vec<AbiValue>],
        sink: mpsc::Sender<DecodedEvent<T>>,
    ) -> Result<Subscription, BindError> {
        let live = self.log_filter(event, indexed, None, None)?;
        let feed = self.endpoint.subscribe_logs(&live).await?;

        let backlog = match opts.start {
            Some(start) => {
                let history = live.clone().from_block(start);
                // On failure `feed` is dropped here, which releases it.
                sorted_backlog(self.endpoint.get_logs(&history).await?)
            }
            None => Vec::new(),
        };
        debug!(contract = %self.address, event, backlog = backlog.len(), "backfill fetched");
        Ok(Pump::spawn(event, self.codec.clone(), sink, feed, backlog))
    }
}
