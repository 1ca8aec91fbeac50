//! Integration tests for connecting and authenticating

use ftpmirror_core::ports::{IRemoteConnector, TransportError};

use crate::common::{FakeFtpServer, FakeOptions};

#[tokio::test]
async fn test_connect_logs_in_and_selects_binary() {
    let server = FakeFtpServer::start().await;

    let mut session = server.connector().connect().await.expect("connect failed");
    session.close().await.expect("close failed");

    let commands = server.commands();
    assert_eq!(commands[0], "USER mike");
    assert_eq!(commands[1], "PASS pi");
    assert_eq!(commands[2], "TYPE I");
    assert_eq!(commands.last().map(String::as_str), Some("QUIT"));
}

#[tokio::test]
async fn test_wrong_password_is_authentication_error() {
    let server = FakeFtpServer::start().await;

    let result = server.connector_with_password("wrong").connect().await;
    assert!(matches!(result, Err(TransportError::Authentication(_))));
    // No command after the rejected PASS: the session was never handed out
    assert_eq!(server.commands().len(), 2);
}

#[tokio::test]
async fn test_unreachable_server_is_connection_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let connector = ftpmirror_ftp::connector::FtpConnector::with_timeouts(
        addr.to_string(),
        "mike",
        "pi",
        std::time::Duration::from_secs(2),
        std::time::Duration::from_secs(2),
    );
    let result = connector.connect().await;
    assert!(matches!(result, Err(TransportError::Connection(_))));
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let server = FakeFtpServer::start_with(FakeOptions {
        silent: true,
        ..FakeOptions::default()
    })
    .await;

    let result = server.connector().connect().await;
    match result {
        Err(err @ TransportError::Timeout(_)) => assert!(err.invalidates_session()),
        Err(other) => panic!("expected timeout, got {other}"),
        Ok(_) => panic!("expected timeout, got a session"),
    }
}

#[tokio::test]
async fn test_endpoint_names_user_and_address() {
    let server = FakeFtpServer::start().await;
    let endpoint = server.connector().endpoint();
    assert_eq!(endpoint, format!("ftp://mike@{}", server.address()));
}
