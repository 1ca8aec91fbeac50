//! FTP control-connection client
//!
//! [`FtpClient`] owns one control connection and opens a fresh passive data
//! connection for every listing or transfer. Every network await is bounded
//! by the configured I/O timeout; a timeout surfaces as
//! [`FtpError::Timeout`] and leaves the client unusable.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use ftpmirror_ftp::client::FtpClient;
//!
//! # async fn example() -> Result<(), ftpmirror_ftp::FtpError> {
//! let mut client = FtpClient::connect(
//!     "192.168.50.129:21",
//!     Duration::from_secs(10),
//!     Duration::from_secs(30),
//! )
//! .await?;
//! client.login("mike", "pi").await?;
//! client.binary().await?;
//! let names = client.nlst().await?;
//! println!("{names:?}");
//! client.quit().await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

use crate::protocol::{self, Reply};
use crate::FtpError;

/// Size of the buffer used when streaming a file to the data connection
const TRANSFER_CHUNK: usize = 64 * 1024;

/// Runs `fut`, failing with [`FtpError::Timeout`] if it takes longer than `limit`
async fn bounded<T, E, F>(limit: Duration, op: &str, fut: F) -> Result<T, FtpError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<FtpError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(FtpError::Timeout(op.to_string())),
    }
}

/// Fails with the reply's error unless its code is one of `accepted`
fn expect(reply: Reply, command: &str, accepted: &[u16]) -> Result<Reply, FtpError> {
    if accepted.contains(&reply.code) {
        Ok(reply)
    } else {
        Err(reply.into_error(command))
    }
}

/// A logged-in (or about to be) FTP control connection
pub struct FtpClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    /// Address the control connection reached; used for every data connection
    peer_ip: IpAddr,
    io_timeout: Duration,
}

impl FtpClient {
    /// Opens the control connection and consumes the server greeting
    ///
    /// # Arguments
    /// * `address` - `host:port` of the server
    /// * `connect_timeout` - bound on the TCP connect
    /// * `io_timeout` - bound on every later command, reply and transfer step
    pub async fn connect(
        address: &str,
        connect_timeout: Duration,
        io_timeout: Duration,
    ) -> Result<Self, FtpError> {
        let stream = match tokio::time::timeout(connect_timeout, TcpStream::connect(address)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(FtpError::Connect {
                    address: address.to_string(),
                    source,
                })
            }
            Err(_) => return Err(FtpError::Timeout(format!("connect to {address}"))),
        };

        let peer_ip = stream.peer_addr()?.ip();
        let (read_half, write_half) = stream.into_split();
        let mut client = Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            peer_ip,
            io_timeout,
        };

        // 120 "ready in nnn minutes" may precede the real greeting
        let mut greeting = client.read_reply("greeting").await?;
        while greeting.is_preliminary() {
            greeting = client.read_reply("greeting").await?;
        }
        let greeting = expect(greeting, "greeting", &[220])?;
        debug!(%address, greeting = %greeting.text, "Connected to FTP server");

        Ok(client)
    }

    /// IP address of the server as seen by the control connection
    pub fn peer_ip(&self) -> IpAddr {
        self.peer_ip
    }

    /// Authenticates with `USER` / `PASS`
    ///
    /// A server may accept the user without a password (230 straight after
    /// `USER`). A 530 at either step is reported as
    /// [`FtpError::LoginRejected`].
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), FtpError> {
        let reply = self.command("USER", Some(username)).await?;
        let reply = match reply.code {
            230 => return Ok(()),
            331 => self.command("PASS", Some(password)).await?,
            _ => return Err(login_error(reply)),
        };

        match reply.code {
            230 | 202 => {
                debug!(%username, "Logged in");
                Ok(())
            }
            _ => Err(login_error(reply)),
        }
    }

    /// Switches the session to binary (image) transfers
    pub async fn binary(&mut self) -> Result<(), FtpError> {
        let reply = self.command("TYPE", Some("I")).await?;
        expect(reply, "TYPE", &[200])?;
        Ok(())
    }

    /// Enters the child directory `name`
    pub async fn cwd(&mut self, name: &str) -> Result<(), FtpError> {
        let reply = self.command("CWD", Some(name)).await?;
        expect(reply, "CWD", &[200, 250])?;
        Ok(())
    }

    /// Moves to the parent of the current directory
    pub async fn cdup(&mut self) -> Result<(), FtpError> {
        let reply = self.command("CDUP", None).await?;
        expect(reply, "CDUP", &[200, 250])?;
        Ok(())
    }

    /// Creates the directory `path`
    pub async fn mkd(&mut self, path: &str) -> Result<(), FtpError> {
        let reply = self.command("MKD", Some(path)).await?;
        expect(reply, "MKD", &[250, 257])?;
        Ok(())
    }

    /// Lists the entry names of the current directory
    pub async fn nlst(&mut self) -> Result<Vec<String>, FtpError> {
        let data = self.open_passive().await?;
        let reply = self.command("NLST", None).await?;
        match reply.code {
            125 | 150 => {}
            // "No files found": an empty directory on many servers
            450 | 550 => {
                debug!(reply = %reply, "Empty listing");
                return Ok(Vec::new());
            }
            _ => return Err(reply.into_error("NLST")),
        }

        let mut data = BufReader::new(data);
        let mut names = Vec::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            let n = bounded(self.io_timeout, "NLST data", data.read_until(b'\n', &mut line)).await?;
            if n == 0 {
                break;
            }
            if let Some(name) = protocol::listing_entry_name(&String::from_utf8_lossy(&line)) {
                names.push(name);
            }
        }
        drop(data);

        let done = self.read_reply("NLST").await?;
        expect(done, "NLST", &[226, 250])?;
        trace!(count = names.len(), "Listing received");
        Ok(names)
    }

    /// Streams `reader` to the remote file `path`
    ///
    /// # Returns
    /// The number of bytes written to the data connection
    pub async fn stor(
        &mut self,
        path: &str,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64, FtpError> {
        let mut data = self.open_passive().await?;
        let reply = self.command("STOR", Some(path)).await?;
        expect(reply, "STOR", &[125, 150])?;

        let mut buf = vec![0u8; TRANSFER_CHUNK];
        let mut sent: u64 = 0;
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(n) => n,
                Err(err) => {
                    drop(data);
                    self.abort_store(path).await;
                    return Err(FtpError::Io(err));
                }
            };
            if n == 0 {
                break;
            }
            bounded(self.io_timeout, "STOR data", data.write_all(&buf[..n])).await?;
            sent += n as u64;
        }
        bounded(self.io_timeout, "STOR data", data.shutdown()).await?;
        drop(data);

        let done = self.read_reply("STOR").await?;
        expect(done, "STOR", &[226, 250])?;
        debug!(%path, bytes = sent, "Stored file");
        Ok(sent)
    }

    /// Sends `QUIT` and closes the control connection
    pub async fn quit(&mut self) -> Result<(), FtpError> {
        let reply = self.command("QUIT", None).await?;
        bounded(self.io_timeout, "QUIT", self.writer.shutdown()).await?;
        expect(reply, "QUIT", &[221, 200])?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Cancels a `STOR` whose local source failed and removes the partial file
    ///
    /// Servers treat the closed data connection as a normal end of file, so
    /// without `DELE` a truncated copy would be left behind. Both replies to
    /// the aborted transfer (the `STOR` reply then the `ABOR` reply) are
    /// consumed so the control connection stays in step. Failures here are
    /// only logged; the caller reports the original read error.
    async fn abort_store(&mut self, path: &str) {
        let line = protocol::format_command("ABOR", None);
        let sent = bounded(self.io_timeout, "ABOR", self.writer.write_all(line.as_bytes())).await;
        if let Err(err) = sent {
            warn!(%path, error = %err, "Could not abort interrupted upload");
            return;
        }
        for op in ["STOR", "ABOR"] {
            if let Err(err) = self.read_reply(op).await {
                warn!(%path, error = %err, "No reply while aborting upload");
                return;
            }
        }

        match self.command("DELE", Some(path)).await {
            Ok(reply) if reply.code == 250 => debug!(%path, "Removed partial upload"),
            Ok(reply) => warn!(%path, reply = %reply, "Partial upload left on server"),
            Err(err) => warn!(%path, error = %err, "Partial upload left on server"),
        }
    }

    /// Sends `PASV` and connects to the announced port
    ///
    /// The host in the 227 reply is ignored: servers behind NAT commonly
    /// announce a private address, so the control connection's peer is
    /// used instead.
    async fn open_passive(&mut self) -> Result<TcpStream, FtpError> {
        let reply = self.command("PASV", None).await?;
        let reply = expect(reply, "PASV", &[227])?;
        let endpoint = protocol::parse_pasv(&reply.text)?;
        let addr = SocketAddr::new(self.peer_ip, endpoint.port);

        trace!(
            %addr,
            advertised = %endpoint.advertised_host,
            "Opening data connection"
        );
        bounded(self.io_timeout, "data connect", TcpStream::connect(addr)).await
    }

    /// Sends one command and reads its first reply
    async fn command(&mut self, verb: &str, arg: Option<&str>) -> Result<Reply, FtpError> {
        debug!(command = %protocol::redact_command(verb, arg), "FTP >");
        let line = protocol::format_command(verb, arg);
        bounded(self.io_timeout, verb, self.writer.write_all(line.as_bytes())).await?;
        self.read_reply(verb).await
    }

    async fn read_reply(&mut self, op: &str) -> Result<Reply, FtpError> {
        let reply = bounded(self.io_timeout, op, protocol::read_reply(&mut self.reader)).await?;
        trace!(code = reply.code, text = %reply.text, "FTP <");
        Ok(reply)
    }
}

fn login_error(reply: Reply) -> FtpError {
    match reply.code {
        530 | 332 => FtpError::LoginRejected {
            code: reply.code,
            message: reply.text,
        },
        _ => reply.into_error("login"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_error_530() {
        assert!(matches!(
            login_error(Reply::new(530, "Login incorrect.")),
            FtpError::LoginRejected { code: 530, .. }
        ));
    }

    #[test]
    fn test_login_error_other_codes() {
        assert!(matches!(
            login_error(Reply::new(421, "Too many users")),
            FtpError::Transient { code: 421, .. }
        ));
    }

    #[test]
    fn test_expect_accepts_listed_codes() {
        assert!(expect(Reply::new(250, "ok"), "CWD", &[200, 250]).is_ok());
        assert!(matches!(
            expect(Reply::new(550, "no"), "CWD", &[200, 250]),
            Err(FtpError::Permanent { code: 550, .. })
        ));
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        tokio::time::pause();
        let result: Result<(), FtpError> = bounded(
            Duration::from_secs(30),
            "NLST",
            std::future::pending::<Result<(), FtpError>>(),
        )
        .await;
        assert!(matches!(result, Err(FtpError::Timeout(op)) if op == "NLST"));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port with nothing listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = FtpClient::connect(
            &addr.to_string(),
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(result, Err(FtpError::Connect { .. })));
    }
}
