//! In-memory remote store for tests
//!
//! [`MemoryRemote`] implements [`IRemoteConnector`] over a shared tree of
//! directories and files. Every session it hands out sees the same tree, and
//! every call is recorded so tests can assert on the exact conversation.
//! Failures are scripted up front (`fail_next_*`, `reject_store`, ...).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use ftpmirror_core::ports::{IRemoteConnector, IRemoteSession, TransportError};

/// One recorded interaction with the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Connect,
    List,
    ChangeDirectory(String),
    ChangeDirectoryUp,
    MakeDirectory(String),
    StoreFile(String),
    Close,
}

#[derive(Debug, Default)]
struct Inner {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    calls: Vec<RemoteCall>,
    connect_attempts: u32,
    failing_connects: u32,
    failing_listings: u32,
    rejected_stores: BTreeSet<String>,
    dropping_stores: BTreeSet<String>,
    busy_dirs: BTreeSet<String>,
}

impl Inner {
    fn is_dir(&self, path: &str) -> bool {
        path.is_empty() || self.dirs.contains(path)
    }

    fn children(&self, dir: &str) -> Vec<String> {
        self.dirs
            .iter()
            .chain(self.files.keys())
            .filter_map(|path| child_name(dir, path))
            .collect()
    }
}

/// Returns the name of `path` if it sits directly inside `dir`
fn child_name(dir: &str, path: &str) -> Option<String> {
    let rest = if dir.is_empty() {
        path
    } else {
        path.strip_prefix(dir)?.strip_prefix('/')?
    };
    (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_string())
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

fn rejected(code: u16, message: &str) -> TransportError {
    TransportError::Rejected {
        code,
        message: message.to_string(),
    }
}

/// A scripted, shared in-memory remote tree
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRemote {
    /// Creates an empty remote
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a directory (and its parents)
    pub fn with_dir(self, path: &str) -> Self {
        {
            let mut inner = self.lock();
            let mut current = String::new();
            for segment in path.split('/') {
                if !current.is_empty() {
                    current.push('/');
                }
                current.push_str(segment);
                inner.dirs.insert(current.clone());
            }
        }
        self
    }

    /// Adds a file; its parent directory must already exist or be the root
    pub fn with_file(self, path: &str, contents: &[u8]) -> Self {
        self.lock().files.insert(path.to_string(), contents.to_vec());
        self
    }

    // --- scripting ---

    /// The next `count` connection attempts fail
    pub fn fail_next_connects(&self, count: u32) {
        self.lock().failing_connects = count;
    }

    /// The next `count` listings fail as if the connection dropped
    pub fn fail_next_listings(&self, count: u32) {
        self.lock().failing_listings = count;
    }

    /// Storing `path` is rejected with a permanent negative reply
    pub fn reject_store(&self, path: &str) {
        self.lock().rejected_stores.insert(path.to_string());
    }

    /// The next store of `path` fails as if the connection dropped mid-transfer
    pub fn drop_connection_on_store(&self, path: &str) {
        self.lock().dropping_stores.insert(path.to_string());
    }

    /// Entering `path` fails with a transient negative reply
    pub fn busy_directory(&self, path: &str) {
        self.lock().busy_dirs.insert(path.to_string());
    }

    // --- inspection ---

    pub fn connect_attempts(&self) -> u32 {
        self.lock().connect_attempts
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls matching `predicate`
    pub fn count_calls(&self, predicate: impl Fn(&RemoteCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    /// All directories, sorted
    pub fn dirs(&self) -> Vec<String> {
        self.lock().dirs.iter().cloned().collect()
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(path).cloned()
    }

    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        self.lock().files.clone()
    }

    /// Shares this remote as a connector trait object
    pub fn connector(&self) -> Arc<dyn IRemoteConnector> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl IRemoteConnector for MemoryRemote {
    async fn connect(&self) -> Result<Box<dyn IRemoteSession>, TransportError> {
        let mut inner = self.lock();
        inner.connect_attempts += 1;
        inner.calls.push(RemoteCall::Connect);
        if inner.failing_connects > 0 {
            inner.failing_connects -= 1;
            return Err(TransportError::Connection("connection refused".to_string()));
        }
        drop(inner);

        Ok(Box::new(MemorySession {
            remote: self.clone(),
            cwd: Vec::new(),
        }))
    }

    fn endpoint(&self) -> String {
        "memory://remote".to_string()
    }
}

/// A session over a [`MemoryRemote`] with its own current directory
#[derive(Debug)]
pub struct MemorySession {
    remote: MemoryRemote,
    cwd: Vec<String>,
}

impl MemorySession {
    fn resolve(&self, path: &str) -> String {
        self.cwd
            .iter()
            .map(String::as_str)
            .chain(path.split('/').filter(|s| !s.is_empty()))
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[async_trait]
impl IRemoteSession for MemorySession {
    async fn list_current_directory(&mut self) -> Result<Vec<String>, TransportError> {
        let cwd = self.cwd.join("/");
        let mut inner = self.remote.lock();
        inner.calls.push(RemoteCall::List);
        if inner.failing_listings > 0 {
            inner.failing_listings -= 1;
            return Err(TransportError::Connection("connection reset".to_string()));
        }
        Ok(inner.children(&cwd))
    }

    async fn change_directory(&mut self, name: &str) -> Result<(), TransportError> {
        let target = self.resolve(name);
        let mut inner = self.remote.lock();
        inner.calls.push(RemoteCall::ChangeDirectory(name.to_string()));
        if inner.busy_dirs.contains(&target) {
            return Err(TransportError::Unavailable {
                code: 450,
                message: "Requested file action not taken".to_string(),
            });
        }
        if !inner.is_dir(&target) {
            return Err(rejected(550, "Not a directory"));
        }
        drop(inner);
        self.cwd = target
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Ok(())
    }

    async fn change_directory_up(&mut self) -> Result<(), TransportError> {
        self.remote.lock().calls.push(RemoteCall::ChangeDirectoryUp);
        self.cwd.pop();
        Ok(())
    }

    async fn make_directory(&mut self, path: &str) -> Result<(), TransportError> {
        let target = self.resolve(path);
        let mut inner = self.remote.lock();
        inner.calls.push(RemoteCall::MakeDirectory(path.to_string()));
        if inner.is_dir(&target) || inner.files.contains_key(&target) {
            return Err(rejected(550, "File exists"));
        }
        if !inner.is_dir(parent_of(&target)) {
            return Err(rejected(550, "No such file or directory"));
        }
        inner.dirs.insert(target);
        Ok(())
    }

    async fn store_file(
        &mut self,
        remote_path: &str,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64, TransportError> {
        let target = self.resolve(remote_path);
        {
            let mut inner = self.remote.lock();
            inner
                .calls
                .push(RemoteCall::StoreFile(remote_path.to_string()));
            if inner.dropping_stores.remove(&target) {
                return Err(TransportError::Connection(
                    "connection dropped during transfer".to_string(),
                ));
            }
            if inner.rejected_stores.contains(&target) {
                return Err(rejected(553, "Permission denied"));
            }
            if !inner.is_dir(parent_of(&target)) {
                return Err(rejected(553, "No such directory"));
            }
        }

        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).await?;
        let len = contents.len() as u64;
        self.remote.lock().files.insert(target, contents);
        Ok(len)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.remote.lock().calls.push(RemoteCall::Close);
        Ok(())
    }
}
