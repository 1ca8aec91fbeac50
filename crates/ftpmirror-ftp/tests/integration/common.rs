//! Shared test helpers: a small scripted FTP server
//!
//! The server keeps an in-memory tree (directories and files keyed by
//! `/`-separated path relative to the root) and answers the subset of
//! RFC 959 the adapter uses. Its `227` replies advertise an unroutable
//! host so tests also prove the client dials the control peer instead.

use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use ftpmirror_ftp::connector::FtpConnector;

pub const USERNAME: &str = "mike";
pub const PASSWORD: &str = "pi";

/// Knobs for the scripted server
#[derive(Debug, Clone, Default)]
pub struct FakeOptions {
    /// Reply code for `NLST` on an empty directory (`None` sends an empty
    /// data stream instead)
    pub empty_listing_code: Option<u16>,
    /// Accept connections but never send a greeting
    pub silent: bool,
}

/// Observable server-side state
#[derive(Debug, Default)]
pub struct FakeState {
    pub dirs: BTreeSet<String>,
    pub files: BTreeMap<String, Vec<u8>>,
    pub commands: Vec<String>,
}

pub struct FakeFtpServer {
    addr: SocketAddr,
    state: Arc<Mutex<FakeState>>,
    task: JoinHandle<()>,
}

impl FakeFtpServer {
    pub async fn start() -> Self {
        Self::start_with(FakeOptions::default()).await
    }

    pub async fn start_with(options: FakeOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(FakeState::default()));

        let shared = Arc::clone(&state);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = Arc::clone(&shared);
                let options = options.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, state, options).await;
                });
            }
        });

        Self { addr, state, task }
    }

    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Connector with short time bounds pointing at this server
    pub fn connector(&self) -> FtpConnector {
        self.connector_with_password(PASSWORD)
    }

    pub fn connector_with_password(&self, password: &str) -> FtpConnector {
        FtpConnector::with_timeouts(
            self.address(),
            USERNAME,
            password,
            Duration::from_secs(2),
            Duration::from_millis(500),
        )
    }

    pub fn add_dir(&self, path: &str) {
        self.state.lock().unwrap().dirs.insert(path.to_string());
    }

    pub fn add_file(&self, path: &str, content: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(path.to_string(), content.to_vec());
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.state.lock().unwrap().dirs.contains(path)
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(path).cloned()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }
}

impl Drop for FakeFtpServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn join(cwd: &[String], name: &str) -> String {
    cwd.iter()
        .map(String::as_str)
        .chain(name.split('/').filter(|s| !s.is_empty()))
        .collect::<Vec<_>>()
        .join("/")
}

fn parent_exists(state: &FakeState, path: &str) -> bool {
    match path.rfind('/') {
        Some(idx) => state.dirs.contains(&path[..idx]),
        None => true,
    }
}

fn children(state: &FakeState, dir: &str) -> Vec<String> {
    let direct_child = |path: &String| -> Option<String> {
        let rest = if dir.is_empty() {
            path.as_str()
        } else {
            path.strip_prefix(dir)?.strip_prefix('/')?
        };
        (!rest.contains('/')).then(|| rest.to_string())
    };
    state
        .dirs
        .iter()
        .chain(state.files.keys())
        .filter_map(direct_child)
        .collect()
}

async fn serve(
    stream: TcpStream,
    state: Arc<Mutex<FakeState>>,
    options: FakeOptions,
) -> std::io::Result<()> {
    let (read_half, mut writer) = stream.into_split();
    if options.silent {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        return Ok(());
    }

    writer.write_all(b"220-Fake FTP\r\n220 Ready\r\n").await?;

    let mut lines = BufReader::new(read_half).lines();
    let mut cwd: Vec<String> = Vec::new();
    let mut passive: Option<TcpListener> = None;

    while let Some(line) = lines.next_line().await? {
        let (verb, arg) = match line.split_once(' ') {
            Some((v, a)) => (v.to_ascii_uppercase(), a.to_string()),
            None => (line.to_ascii_uppercase(), String::new()),
        };
        state.lock().unwrap().commands.push(line.clone());

        let reply: String = match verb.as_str() {
            "USER" => "331 Please specify the password.".into(),
            "PASS" if arg == PASSWORD => "230 Login successful.".into(),
            "PASS" => "530 Login incorrect.".into(),
            "TYPE" => "200 Switching to Binary mode.".into(),
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let port = listener.local_addr()?.port();
                passive = Some(listener);
                format!(
                    "227 Entering Passive Mode (10,0,0,99,{},{}).",
                    port / 256,
                    port % 256
                )
            }
            "NLST" => {
                let names = children(&state.lock().unwrap(), &cwd.join("/"));
                match (names.is_empty(), options.empty_listing_code, passive.take()) {
                    (true, Some(code), _) => format!("{code} No files found."),
                    (_, _, None) => "425 Use PASV first.".into(),
                    (_, _, Some(listener)) => {
                        writer.write_all(b"150 Here comes the listing.\r\n").await?;
                        let (mut data, _) = listener.accept().await?;
                        for name in names {
                            data.write_all(format!("{name}\r\n").as_bytes()).await?;
                        }
                        data.shutdown().await?;
                        "226 Directory send OK.".into()
                    }
                }
            }
            "CWD" => {
                let target = join(&cwd, &arg);
                if state.lock().unwrap().dirs.contains(&target) {
                    cwd = target.split('/').map(str::to_string).collect();
                    "250 Directory successfully changed.".into()
                } else {
                    "550 Failed to change directory.".into()
                }
            }
            "CDUP" => {
                cwd.pop();
                "250 Directory successfully changed.".into()
            }
            "MKD" => {
                let target = join(&cwd, &arg);
                let mut st = state.lock().unwrap();
                if st.dirs.contains(&target)
                    || st.files.contains_key(&target)
                    || !parent_exists(&st, &target)
                {
                    "550 Create directory operation failed.".into()
                } else {
                    st.dirs.insert(target.clone());
                    format!("257 \"/{target}\" created")
                }
            }
            "STOR" => {
                let target = join(&cwd, &arg);
                let writable = parent_exists(&state.lock().unwrap(), &target);
                match (writable, passive.take()) {
                    (false, _) => "553 Could not create file.".into(),
                    (true, None) => "425 Use PASV first.".into(),
                    (true, Some(listener)) => {
                        writer.write_all(b"150 Ok to send data.\r\n").await?;
                        let (mut data, _) = listener.accept().await?;
                        let mut content = Vec::new();
                        data.read_to_end(&mut content).await?;
                        state.lock().unwrap().files.insert(target, content);
                        "226 Transfer complete.".into()
                    }
                }
            }
            "ABOR" => "226 Abort successful.".into(),
            "DELE" => {
                let target = join(&cwd, &arg);
                if state.lock().unwrap().files.remove(&target).is_some() {
                    "250 Delete operation successful.".into()
                } else {
                    "550 Delete operation failed.".into()
                }
            }
            "QUIT" => {
                writer.write_all(b"221 Goodbye.\r\n").await?;
                return Ok(());
            }
            _ => "502 Command not implemented.".into(),
        };

        writer.write_all(format!("{reply}\r\n").as_bytes()).await?;
    }

    Ok(())
}
