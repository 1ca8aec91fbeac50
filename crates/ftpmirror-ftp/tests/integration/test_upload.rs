//! Integration tests for STOR uploads

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use ftpmirror_core::ports::{IRemoteConnector, TransportError};

use crate::common::FakeFtpServer;

#[tokio::test]
async fn test_store_file_streams_content() {
    let server = FakeFtpServer::start().await;
    server.add_dir("A");
    let mut session = server.connector().connect().await.unwrap();

    let content = b"hello from the mirror".to_vec();
    let mut reader: &[u8] = &content;
    let sent = session.store_file("A/x.txt", &mut reader).await.unwrap();

    assert_eq!(sent, content.len() as u64);
    assert_eq!(server.file("A/x.txt"), Some(content));
}

#[tokio::test]
async fn test_store_file_from_disk() {
    let server = FakeFtpServer::start().await;
    let mut session = server.connector().connect().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.bin");
    let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, &content).unwrap();

    let mut file = tokio::fs::File::open(&path).await.unwrap();
    let sent = session.store_file("big.bin", &mut file).await.unwrap();

    assert_eq!(sent, 200_000);
    assert_eq!(server.file("big.bin"), Some(content));
}

#[tokio::test]
async fn test_store_empty_file() {
    let server = FakeFtpServer::start().await;
    let mut session = server.connector().connect().await.unwrap();

    let mut reader: &[u8] = &[];
    let sent = session.store_file("empty.txt", &mut reader).await.unwrap();
    assert_eq!(sent, 0);
    assert_eq!(server.file("empty.txt"), Some(Vec::new()));
}

#[tokio::test]
async fn test_store_into_missing_directory_is_rejection() {
    let server = FakeFtpServer::start().await;
    let mut session = server.connector().connect().await.unwrap();

    let mut reader: &[u8] = b"x";
    let err = session
        .store_file("missing/x.txt", &mut reader)
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Rejected { code: 553, .. }));

    // A rejected upload leaves the session usable
    session.make_directory("missing").await.unwrap();
    let mut reader: &[u8] = b"x";
    session.store_file("missing/x.txt", &mut reader).await.unwrap();
    assert_eq!(server.file("missing/x.txt"), Some(b"x".to_vec()));
}

/// A local source that fails on its first read
struct BrokenSource;

impl AsyncRead for BrokenSource {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "disk went away")))
    }
}

#[tokio::test]
async fn test_local_read_failure_aborts_and_removes_partial_file() {
    let server = FakeFtpServer::start().await;
    server.add_dir("A");
    let mut session = server.connector().connect().await.unwrap();

    let mut reader = (&b"first half"[..]).chain(BrokenSource);
    let err = session.store_file("A/x.txt", &mut reader).await.unwrap_err();

    assert!(matches!(err, TransportError::Io(_)));
    assert!(err.invalidates_session());
    assert_eq!(server.file("A/x.txt"), None);

    let commands = server.commands();
    let abort = commands.iter().position(|c| c == "ABOR").unwrap();
    assert_eq!(commands[abort + 1], "DELE A/x.txt");
}
