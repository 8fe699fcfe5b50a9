//! Monitors: resubscription after feed failures and periodic sweeps.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use chainbind_contract::MonitorOpts;
use chainbind_core::{BindError, DecodedEvent, EventFields, Phase, TransportError};
use common::*;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

async fn recv(rx: &mut mpsc::Receiver<DecodedEvent>) -> DecodedEvent {
    timeout(WAIT, rx.recv()).await.expect("timed out").expect("channel closed")
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Quick retries, no sweeps.
fn fast() -> MonitorOpts {
    MonitorOpts {
        tick: Duration::from_secs(3600),
        past_blocks: 50,
        backoff_initial: ms(10),
        backoff_max: ms(40),
        alert_threshold: ms(1),
        seen_capacity: 64,
    }
}

fn sweeping() -> MonitorOpts {
    MonitorOpts {
        tick: ms(20),
        ..fast()
    }
}

// ─── Resubscription ───────────────────────────────────────────────────────────

#[tokio::test]
async fn resubscribes_after_feed_failure() {
    let ep = MockEndpoint::new();
    let mut first = ep.arm_feed();
    let second = ep.arm_feed();
    let (tx, mut rx) = mpsc::channel(16);
    let mut sub = erc20(&ep)
        .monitor_logs::<EventFields>(&fast(), "Transfer", &[], tx)
        .await
        .unwrap();

    first.push(transfer_log(1, 0, 1));
    assert_eq!(recv(&mut rx).await.block_number(), 1);

    first.fail(TransportError::WebSocket("connection reset".into()));
    // The new feed repeats the last log before a new one.
    second.push(transfer_log(1, 0, 1));
    second.push(transfer_log(2, 0, 2));
    assert_eq!(recv(&mut rx).await.block_number(), 2);

    assert_eq!(ep.subscribe_count(), 2);
    assert_eq!(ep.unsubscribe_count(), 1);
    assert_eq!(sub.phase(), Phase::Live);

    sub.close();
    assert_eq!(timeout(WAIT, sub.closed()).await.unwrap(), Phase::Done);
    assert!(sub.err().await.is_none());
    ep.wait_unsubscribes(2).await;
}

#[tokio::test]
async fn keeps_retrying_while_the_node_refuses() {
    let ep = MockEndpoint::new();
    let mut first = ep.arm_feed();
    let (tx, mut rx) = mpsc::channel(16);
    let _sub = erc20(&ep)
        .monitor_logs::<EventFields>(&fast(), "Transfer", &[], tx)
        .await
        .unwrap();

    first.fail(TransportError::Closed);
    // No feed armed: every attempt in this window is refused.
    tokio::time::sleep(ms(150)).await;

    let next = ep.arm_feed();
    next.push(transfer_log(9, 0, 9));
    assert_eq!(recv(&mut rx).await.block_number(), 9);
    assert!(ep.subscribe_count() >= 3, "{} attempts", ep.subscribe_count());
}

#[tokio::test]
async fn decode_failure_is_not_retried() {
    let ep = MockEndpoint::new();
    let feed = ep.arm_feed();
    let _spare = ep.arm_feed();
    let (tx, mut rx) = mpsc::channel(16);
    let mut sub = erc20(&ep)
        .monitor_logs::<EventFields>(&fast(), "Transfer", &[], tx)
        .await
        .unwrap();

    feed.push(broken_log(1, 0));
    assert!(matches!(
        timeout(WAIT, sub.err()).await.unwrap(),
        Some(BindError::Decoding { .. })
    ));
    assert!(matches!(sub.closed().await, Phase::Failed(_)));
    assert!(timeout(WAIT, rx.recv()).await.unwrap().is_none());
    assert_eq!(ep.subscribe_count(), 1);
}

#[tokio::test]
async fn first_subscribe_failure_is_returned_directly() {
    let ep = MockEndpoint::new();
    let (tx, _rx) = mpsc::channel::<DecodedEvent>(1);
    let err = erc20(&ep)
        .monitor_logs(&fast(), "Transfer", &[], tx)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BindError::Transport(TransportError::Unsupported(_))
    ));
}

#[tokio::test]
async fn dropping_the_receiver_stops_the_monitor() {
    let ep = MockEndpoint::new();
    let _feed = ep.arm_feed();
    let (tx, rx) = mpsc::channel::<DecodedEvent>(4);
    let mut sub = erc20(&ep)
        .monitor_logs(&fast(), "Transfer", &[], tx)
        .await
        .unwrap();

    drop(rx);
    assert_eq!(timeout(WAIT, sub.closed()).await.unwrap(), Phase::Done);
    assert!(sub.err().await.is_none());
    ep.wait_unsubscribed().await;
}

// ─── Sweeps ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sweep_delivers_events_the_feed_missed() {
    let ep = MockEndpoint::with_history(vec![transfer_log(110, 0, 5)]);
    ep.head.store(120, Ordering::SeqCst);
    let _feed = ep.arm_feed();
    let (tx, mut rx) = mpsc::channel(16);
    let _sub = erc20(&ep)
        .monitor_logs::<EventFields>(&sweeping(), "Transfer", &[], tx)
        .await
        .unwrap();

    let missed = recv(&mut rx).await;
    assert_eq!(missed.block_number(), 110);
    assert_eq!(missed.event.get("value").and_then(|v| v.as_u128()), Some(5));

    // Later sweeps see the same log and stay quiet.
    assert!(timeout(ms(100), rx.recv()).await.is_err());

    let filters = ep.get_logs_filters.lock().unwrap();
    assert!(filters.len() >= 2, "{} sweeps", filters.len());
    assert_eq!(filters[0].from_block, Some(70));
    assert_eq!(filters[0].to_block, None);
    assert_eq!(filters[0].topic0, Some(transfer_topic()));
}

#[tokio::test]
async fn events_seen_live_are_not_repeated_by_sweeps() {
    let ep = MockEndpoint::with_history(vec![transfer_log(110, 0, 5), transfer_log(111, 0, 6)]);
    ep.head.store(111, Ordering::SeqCst);
    let feed = ep.arm_feed();
    feed.push(transfer_log(110, 0, 5));

    let (tx, mut rx) = mpsc::channel(16);
    let _sub = erc20(&ep)
        .monitor_logs::<EventFields>(&sweeping(), "Transfer", &[], tx)
        .await
        .unwrap();

    assert_eq!(recv(&mut rx).await.block_number(), 110);
    assert_eq!(recv(&mut rx).await.block_number(), 111);
    assert!(timeout(ms(100), rx.recv()).await.is_err());
}

#[tokio::test]
async fn sweep_failures_do_not_end_the_monitor() {
    let ep = MockEndpoint::new();
    *ep.history_error.lock().unwrap() = Some(TransportError::Timeout { ms: 10 });
    let feed = ep.arm_feed();
    let (tx, mut rx) = mpsc::channel(16);
    let sub = erc20(&ep)
        .monitor_logs::<EventFields>(&sweeping(), "Transfer", &[], tx)
        .await
        .unwrap();

    tokio::time::sleep(ms(60)).await;
    assert!(!ep.get_logs_filters.lock().unwrap().is_empty());
    assert_eq!(sub.phase(), Phase::Live);

    feed.push(transfer_log(3, 0, 1));
    assert_eq!(recv(&mut rx).await.block_number(), 3);
}
