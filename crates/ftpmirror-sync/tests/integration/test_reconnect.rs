//! Connection loss and recovery

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use ftpmirror_core::domain::MonitorPhase;
use ftpmirror_sync::testing::{MemoryRemote, RemoteCall};

use crate::common::{engine, local_tree, RECONNECT};

#[tokio::test(start_paused = true)]
async fn test_failed_connects_are_retried_with_fixed_delay() {
    let local = local_tree(&[("A/", b"")]);
    let remote = MemoryRemote::new();
    remote.fail_next_connects(4);
    let mut engine = engine(&remote, local.path());

    let started = tokio::time::Instant::now();
    engine.poll_once().await.unwrap();

    assert_eq!(started.elapsed(), RECONNECT * 4);
    assert_eq!(remote.connect_attempts(), 5);
    assert_eq!(remote.dirs(), vec!["A"]);
}

#[tokio::test]
async fn test_listing_failure_then_full_recompute() {
    let local = local_tree(&[]);
    let remote = MemoryRemote::new().with_dir("A").with_dir("B");
    let mut engine = engine(&remote, local.path());

    engine.poll_once().await.unwrap();
    let before = engine.state().last_remote_snapshot().cloned().unwrap();

    remote.fail_next_listings(1);
    assert!(engine.poll_once().await.is_err());
    assert_eq!(engine.state().last_remote_snapshot(), Some(&before));

    // Remote changed while we were disconnected
    let remote = remote.with_dir("C");
    engine.poll_once().await.unwrap();
    let after: Vec<_> = engine
        .state()
        .last_remote_snapshot()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    assert_eq!(after, vec!["A", "B", "C"]);
    assert_eq!(remote.connect_attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_running_engine_recovers_from_dropped_listing() {
    let local = local_tree(&[("A/", b"")]);
    let remote = MemoryRemote::new();
    let engine = engine(&remote, local.path());
    let (_tx, rx) = mpsc::channel(4);
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(engine.run(rx, shutdown.clone()));

    // First poll at t=0 uploads "A"
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(remote.dirs(), vec!["A"]);

    // Poll at t=5 fails; t=10 reconnects and succeeds
    remote.fail_next_listings(1);
    tokio::time::sleep(Duration::from_secs(10)).await;

    shutdown.cancel();
    let state = handle.await.unwrap();
    assert_eq!(state.phase(), MonitorPhase::Stopped);
    assert_eq!(remote.connect_attempts(), 2);
    assert_eq!(remote.calls().last(), Some(&RemoteCall::Close));
}
