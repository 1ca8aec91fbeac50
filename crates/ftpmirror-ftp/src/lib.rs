//! ftpmirror FTP - passive-mode FTP client adapter
//!
//! Provides the FTP implementation of the remote store port:
//! - Reply codec and PASV parsing (RFC 959)
//! - A stateful control-connection client with per-call timeouts
//! - `IRemoteConnector` / `IRemoteSession` implementations
//!
//! ## Modules
//!
//! - [`protocol`] - Reply parsing, command formatting and PASV decoding
//! - [`client`] - Control and data connection handling
//! - [`connector`] - Port implementations used by the sync engine

pub mod client;
pub mod connector;
pub mod protocol;

use ftpmirror_core::ports::TransportError;
use thiserror::Error;

/// Errors that can occur while talking to an FTP server
#[derive(Debug, Error)]
pub enum FtpError {
    /// The control connection could not be opened
    #[error("Could not connect to {address}: {source}")]
    Connect {
        /// `host:port` that was dialled
        address: String,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// The server refused the login
    #[error("Login rejected ({code}): {message}")]
    LoginRejected {
        /// Reply code (usually 530)
        code: u16,
        /// Reply text
        message: String,
    },

    /// A permanent negative reply (5xx)
    #[error("Permanent failure ({code}): {message}")]
    Permanent {
        /// Reply code
        code: u16,
        /// Reply text
        message: String,
    },

    /// A transient negative reply (4xx)
    #[error("Transient failure ({code}): {message}")]
    Transient {
        /// Reply code
        code: u16,
        /// Reply text
        message: String,
    },

    /// A well-formed reply that does not fit the command that was sent
    #[error("Unexpected reply to {command} ({code}): {message}")]
    UnexpectedReply {
        /// Command verb the reply answered
        command: String,
        /// Reply code
        code: u16,
        /// Reply text
        message: String,
    },

    /// The server sent a line that is not a valid reply
    #[error("Malformed reply: {0}")]
    Malformed(String),

    /// The server closed the control connection
    #[error("Control connection closed by server")]
    Closed,

    /// An operation exceeded its time bound
    #[error("Timed out during {0}")]
    Timeout(String),

    /// A socket-level I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reply code a server sends right before it drops the control connection
const SERVICE_NOT_AVAILABLE: u16 = 421;

impl From<FtpError> for TransportError {
    fn from(err: FtpError) -> Self {
        match err {
            FtpError::Connect { .. } | FtpError::Closed => {
                TransportError::Connection(err.to_string())
            }
            FtpError::LoginRejected { .. } => TransportError::Authentication(err.to_string()),
            FtpError::Transient { code, .. } if code == SERVICE_NOT_AVAILABLE => {
                TransportError::Connection(err.to_string())
            }
            FtpError::Permanent { code, message } => TransportError::Rejected { code, message },
            FtpError::Transient { code, message } => TransportError::Unavailable { code, message },
            FtpError::UnexpectedReply { .. } | FtpError::Malformed(_) => {
                TransportError::Protocol(err.to_string())
            }
            FtpError::Timeout(op) => TransportError::Timeout(op),
            FtpError::Io(e) => TransportError::Io(e),
        }
    }
}
