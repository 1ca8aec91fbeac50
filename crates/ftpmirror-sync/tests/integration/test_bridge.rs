//! Change event bridge feeding a running engine

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use ftpmirror_sync::testing::{MemoryRemote, RemoteCall};
use ftpmirror_sync::{ChangeEvent, ChangeEventBridge, ChangeKind};

use crate::common::{engine, local_tree, write_entry};

const SETTLE: Duration = Duration::from_secs(5);

#[tokio::test(start_paused = true)]
async fn test_settled_burst_triggers_one_local_pass() {
    let local = local_tree(&[]);
    let remote = MemoryRemote::new();
    let engine = engine(&remote, local.path());

    let (event_tx, event_rx) = mpsc::channel(16);
    let (cmd_tx, cmd_rx) = mpsc::channel(4);
    let shutdown = CancellationToken::new();
    let bridge = ChangeEventBridge::new(event_rx, cmd_tx, SETTLE);

    let bridge_task = tokio::spawn(bridge.run(shutdown.clone()));
    let engine_task = tokio::spawn(engine.run(cmd_rx, shutdown.clone()));

    // Let the immediate first poll record the empty remote
    tokio::time::sleep(Duration::from_millis(100)).await;
    let listings = remote.count_calls(|c| *c == RemoteCall::List);

    write_entry(local.path(), "New/", b"");
    write_entry(local.path(), "New/f.txt", b"f");
    let new_dir = local.path().join("New");
    event_tx
        .send(ChangeEvent::new(ChangeKind::Created, &new_dir, true))
        .await
        .unwrap();
    event_tx
        .send(ChangeEvent::new(
            ChangeKind::Modified,
            new_dir.join("f.txt"),
            false,
        ))
        .await
        .unwrap();

    // Before the settle window ends and the next poll fires nothing happens
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(remote.dirs().is_empty());

    // The poll at t=5 sees an unchanged remote; the burst settles just after
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(remote.dirs(), vec!["New"]);
    assert_eq!(remote.file("New/f.txt"), Some(b"f".to_vec()));
    assert_eq!(
        remote.count_calls(|c| matches!(c, RemoteCall::MakeDirectory(_))),
        1
    );
    assert!(remote.count_calls(|c| *c == RemoteCall::List) > listings);

    shutdown.cancel();
    bridge_task.await.unwrap();
    engine_task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_local_change_without_polling_window() {
    // A long poll interval isolates the bridge path
    let local = local_tree(&[]);
    let remote = MemoryRemote::new();
    let engine = ftpmirror_sync::ReconciliationEngine::new(
        remote.connector(),
        local.path(),
        Duration::from_secs(3600),
        Duration::from_secs(5),
    );

    let (event_tx, event_rx) = mpsc::channel(16);
    let (cmd_tx, cmd_rx) = mpsc::channel(4);
    let shutdown = CancellationToken::new();
    let bridge = ChangeEventBridge::new(event_rx, cmd_tx, SETTLE);
    let bridge_task = tokio::spawn(bridge.run(shutdown.clone()));
    let engine_task = tokio::spawn(engine.run(cmd_rx, shutdown.clone()));

    tokio::time::sleep(Duration::from_millis(100)).await;
    let listings = remote.count_calls(|c| *c == RemoteCall::List);

    write_entry(local.path(), "D/", b"");
    event_tx
        .send(ChangeEvent::new(ChangeKind::Created, local.path().join("D"), true))
        .await
        .unwrap();

    tokio::time::sleep(SETTLE + Duration::from_secs(1)).await;
    assert_eq!(remote.dirs(), vec!["D"]);
    // Reconciled against the cached snapshot, no new listing
    assert_eq!(remote.count_calls(|c| *c == RemoteCall::List), listings);

    shutdown.cancel();
    bridge_task.await.unwrap();
    engine_task.await.unwrap();
}
