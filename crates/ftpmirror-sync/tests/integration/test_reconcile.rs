//! Full reconciliation passes

use ftpmirror_core::domain::RelativePath;

use crate::common::{engine, local_tree, mkdir_count, store_count, write_entry};
use ftpmirror_sync::testing::MemoryRemote;

fn rel(s: &str) -> RelativePath {
    RelativePath::new(s).unwrap()
}

#[tokio::test]
async fn test_empty_remote_receives_directory_and_file() {
    let local = local_tree(&[("A/", b""), ("A/x.txt", b"payload")]);
    let remote = MemoryRemote::new();
    let mut engine = engine(&remote, local.path());

    let report = engine.poll_once().await.unwrap().unwrap();

    assert_eq!(remote.dirs(), vec!["A"]);
    assert_eq!(remote.files().len(), 1);
    assert_eq!(remote.file("A/x.txt"), Some(b"payload".to_vec()));
    assert_eq!(report.upload.directories_created, vec![rel("A")]);
    assert_eq!(report.upload.bytes_uploaded, 7);
}

#[tokio::test]
async fn test_second_pass_is_a_no_op() {
    let local = local_tree(&[("A/", b""), ("A/x.txt", b"x")]);
    let remote = MemoryRemote::new();
    let mut engine = engine(&remote, local.path());

    engine.poll_once().await.unwrap();
    let (mkdirs, stores) = (mkdir_count(&remote), store_count(&remote));

    let report = engine.reconcile_now().await.unwrap();

    assert!(report.pending.is_empty());
    assert!(report.upload.is_empty());
    assert_eq!(mkdir_count(&remote), mkdirs);
    assert_eq!(store_count(&remote), stores);
}

#[tokio::test]
async fn test_nested_tree_is_created_parents_first() {
    let local = local_tree(&[
        ("A/B/C/", b""),
        ("A/a.txt", b"a"),
        ("A/B/b.txt", b"b"),
        ("A/B/C/c.txt", b"c"),
    ]);
    let remote = MemoryRemote::new();
    let mut engine = engine(&remote, local.path());

    let report = engine.poll_once().await.unwrap().unwrap();

    assert_eq!(report.pending, vec![rel("A"), rel("A/B"), rel("A/B/C")]);
    assert_eq!(
        report.upload.directories_created,
        vec![rel("A"), rel("A/B"), rel("A/B/C")]
    );
    assert_eq!(remote.files().len(), 3);
    assert!(report.upload.failures.is_empty());
}

#[tokio::test]
async fn test_existing_remote_directory_is_not_revisited() {
    // Directory presence is all that is compared
    let local = local_tree(&[("A/", b""), ("A/changed.txt", b"new")]);
    let remote = MemoryRemote::new()
        .with_dir("A")
        .with_file("A/changed.txt", b"old");
    let mut engine = engine(&remote, local.path());

    engine.poll_once().await.unwrap();

    assert_eq!(remote.file("A/changed.txt"), Some(b"old".to_vec()));
    assert_eq!(store_count(&remote), 0);
}

#[tokio::test]
async fn test_remote_only_directories_are_never_removed() {
    let local = local_tree(&[("A/", b"")]);
    let remote = MemoryRemote::new().with_dir("Z");
    let mut engine = engine(&remote, local.path());

    engine.poll_once().await.unwrap();

    assert_eq!(remote.dirs(), vec!["A", "Z"]);
}

#[tokio::test]
async fn test_file_removed_after_planning_is_not_uploaded() {
    let local = local_tree(&[("A/", b""), ("A/keep.txt", b"k")]);
    let remote = MemoryRemote::new();
    let mut engine = engine(&remote, local.path());

    // The plan is computed, then the tree changes before the pass
    let plan = engine.dry_run().await.unwrap();
    assert_eq!(plan.targets, vec![rel("A")]);
    write_entry(local.path(), "A/other.txt", b"o");
    std::fs::remove_file(local.path().join("A/keep.txt")).unwrap();

    let report = engine.reconcile_now().await.unwrap();
    assert_eq!(report.upload.files_uploaded, vec![rel("A/other.txt")]);
    assert!(report.upload.failures.is_empty());
    assert!(remote.file("A/keep.txt").is_none());
}

#[tokio::test]
async fn test_rejected_file_does_not_block_siblings() {
    let local = local_tree(&[("A/", b""), ("A/a.txt", b"a"), ("A/b.txt", b"b")]);
    let remote = MemoryRemote::new();
    remote.reject_store("A/a.txt");
    let mut engine = engine(&remote, local.path());

    let report = engine.poll_once().await.unwrap().unwrap();

    assert_eq!(report.upload.failures.len(), 1);
    assert_eq!(report.upload.failures[0].path, rel("A/a.txt"));
    assert_eq!(remote.file("A/b.txt"), Some(b"b".to_vec()));
}
