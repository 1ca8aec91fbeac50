//! FtpConnector - IRemoteConnector implementation over FTP
//!
//! Wraps [`FtpClient`] to fulfil the remote store port contract. A session
//! is only handed out after login and `TYPE I` both succeed; any earlier
//! failure drops the control connection.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tracing::{debug, info};

use ftpmirror_core::config::RemoteConfig;
use ftpmirror_core::ports::{IRemoteConnector, IRemoteSession, TransportError};

use crate::client::FtpClient;

// ============================================================================
// FtpConnector
// ============================================================================

/// Opens authenticated FTP sessions against one server
#[derive(Clone)]
pub struct FtpConnector {
    address: String,
    username: String,
    password: String,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl FtpConnector {
    /// Creates a connector from the `remote` configuration section
    pub fn new(remote: &RemoteConfig) -> Self {
        Self {
            address: remote.address(),
            username: remote.username.clone(),
            password: remote.password.clone(),
            connect_timeout: remote.connect_timeout(),
            io_timeout: remote.io_timeout(),
        }
    }

    /// Creates a connector for `address` with explicit time bounds
    pub fn with_timeouts(
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        connect_timeout: Duration,
        io_timeout: Duration,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            password: password.into(),
            connect_timeout,
            io_timeout,
        }
    }
}

impl std::fmt::Debug for FtpConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpConnector")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

#[async_trait]
impl IRemoteConnector for FtpConnector {
    async fn connect(&self) -> Result<Box<dyn IRemoteSession>, TransportError> {
        let mut client =
            FtpClient::connect(&self.address, self.connect_timeout, self.io_timeout).await?;
        client.login(&self.username, &self.password).await?;
        client.binary().await?;

        info!(address = %self.address, username = %self.username, "FTP session established");
        Ok(Box::new(FtpSession { client }))
    }

    fn endpoint(&self) -> String {
        format!("ftp://{}@{}", self.username, self.address)
    }
}

// ============================================================================
// FtpSession
// ============================================================================

/// One authenticated FTP control connection
pub struct FtpSession {
    client: FtpClient,
}

#[async_trait]
impl IRemoteSession for FtpSession {
    async fn list_current_directory(&mut self) -> Result<Vec<String>, TransportError> {
        Ok(self.client.nlst().await?)
    }

    async fn change_directory(&mut self, name: &str) -> Result<(), TransportError> {
        Ok(self.client.cwd(name).await?)
    }

    async fn change_directory_up(&mut self) -> Result<(), TransportError> {
        Ok(self.client.cdup().await?)
    }

    async fn make_directory(&mut self, path: &str) -> Result<(), TransportError> {
        Ok(self.client.mkd(path).await?)
    }

    async fn store_file(
        &mut self,
        remote_path: &str,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64, TransportError> {
        Ok(self.client.stor(remote_path, reader).await?)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        debug!("Closing FTP session");
        Ok(self.client.quit().await?)
    }
}
