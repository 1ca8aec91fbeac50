//! Integration tests for listing and directory navigation

use ftpmirror_core::ports::{IRemoteConnector, TransportError};

use crate::common::{FakeFtpServer, FakeOptions};

#[tokio::test]
async fn test_list_empty_root() {
    let server = FakeFtpServer::start().await;
    let mut session = server.connector().connect().await.unwrap();

    let names = session.list_current_directory().await.unwrap();
    assert!(names.is_empty());
}

#[tokio::test]
async fn test_empty_directory_reply_550_is_empty_listing() {
    let server = FakeFtpServer::start_with(FakeOptions {
        empty_listing_code: Some(550),
        ..FakeOptions::default()
    })
    .await;
    let mut session = server.connector().connect().await.unwrap();

    let names = session.list_current_directory().await.unwrap();
    assert!(names.is_empty());

    // The session stays usable afterwards
    session.make_directory("A").await.unwrap();
    assert_eq!(session.list_current_directory().await.unwrap(), vec!["A"]);
}

#[tokio::test]
async fn test_list_uses_control_peer_for_data_connection() {
    // The fake server advertises 10.0.0.99 in every 227 reply
    let server = FakeFtpServer::start().await;
    server.add_dir("A");
    server.add_dir("B");
    server.add_file("notes.txt", b"hi");

    let mut session = server.connector().connect().await.unwrap();
    let mut names = session.list_current_directory().await.unwrap();
    names.sort();
    assert_eq!(names, vec!["A", "B", "notes.txt"]);
}

#[tokio::test]
async fn test_change_directory_and_back() {
    let server = FakeFtpServer::start().await;
    server.add_dir("A");
    server.add_dir("A/B");
    server.add_file("A/x.txt", b"x");

    let mut session = server.connector().connect().await.unwrap();
    session.change_directory("A").await.unwrap();
    let mut names = session.list_current_directory().await.unwrap();
    names.sort();
    assert_eq!(names, vec!["B", "x.txt"]);

    session.change_directory_up().await.unwrap();
    assert_eq!(session.list_current_directory().await.unwrap(), vec!["A"]);
}

#[tokio::test]
async fn test_change_directory_into_file_is_rejection() {
    let server = FakeFtpServer::start().await;
    server.add_file("notes.txt", b"hi");

    let mut session = server.connector().connect().await.unwrap();
    let err = session.change_directory("notes.txt").await.unwrap_err();
    assert!(err.is_rejection(), "{err}");
    assert!(matches!(err, TransportError::Rejected { code: 550, .. }));

    // Still connected
    assert_eq!(
        session.list_current_directory().await.unwrap(),
        vec!["notes.txt"]
    );
}

#[tokio::test]
async fn test_make_directory_twice_is_rejection() {
    let server = FakeFtpServer::start().await;
    let mut session = server.connector().connect().await.unwrap();

    session.make_directory("A").await.unwrap();
    session.make_directory("A/B").await.unwrap();
    assert!(server.has_dir("A"));
    assert!(server.has_dir("A/B"));

    let err = session.make_directory("A").await.unwrap_err();
    assert!(err.is_rejection());
}
