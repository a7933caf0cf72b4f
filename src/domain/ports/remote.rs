//! Remote Collaborator port
//!
//! The capability set a node needs from whatever carries bytes and commands
//! to the remote machine. The fleet never talks SSH itself; it holds a
//! `RemoteConnector` and the `RemoteSession`s it hands out.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::value_objects::NodeId;
use crate::error::{RemoteError, RemoteResult};

/// Whether a remote directory entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

/// One child of a listed remote directory (never `.` or `..`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Authentication material handed to the connector.
///
/// Collecting it (prompting, agents) happens outside the core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Private key passed to the transport, if any.
    pub identity_file: Option<PathBuf>,
}

impl Credentials {
    pub fn with_identity(path: impl Into<PathBuf>) -> Self {
        Self {
            identity_file: Some(path.into()),
        }
    }
}

/// Bounded retry for session establishment.
///
/// Connecting is the only remote step that is ever retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPolicy {
    /// Total attempts, at least 1.
    pub attempts: u32,
    /// Per-attempt timeout handed to the transport.
    pub timeout: Duration,
    /// Pause between failed attempts.
    pub delay: Duration,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            timeout: Duration::from_secs(10),
            delay: Duration::from_secs(1),
        }
    }
}

impl ConnectPolicy {
    /// Run `attempt` until it succeeds or the attempt budget is spent.
    ///
    /// `attempt` receives the 1-based attempt number and reports failure as a
    /// message; exhaustion becomes `RemoteError::Connection`.
    pub fn run<T>(
        &self,
        node: &NodeId,
        mut attempt: impl FnMut(u32) -> Result<T, String>,
    ) -> RemoteResult<T> {
        let attempts = self.attempts.max(1);
        let mut last_error = String::new();

        for n in 1..=attempts {
            match attempt(n) {
                Ok(value) => {
                    debug!(%node, attempt = n, "connected");
                    return Ok(value);
                }
                Err(message) => {
                    warn!(%node, attempt = n, of = attempts, error = %message, "connection attempt failed");
                    last_error = message;
                    if n < attempts && !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                }
            }
        }

        Err(RemoteError::Connection {
            node: node.clone(),
            attempts,
            message: last_error,
        })
    }
}

/// Opens sessions to nodes.
pub trait RemoteConnector: Send + Sync {
    /// Establish a session, retrying per the connector's `ConnectPolicy`.
    fn connect(
        &self,
        node: &NodeId,
        credentials: &Credentials,
    ) -> RemoteResult<Box<dyn RemoteSession>>;
}

/// An open session with one node.
///
/// Every call blocks until the remote step completes or definitively fails;
/// none of them retries.
pub trait RemoteSession: Send {
    /// Copy a local file to `remote`, replacing whatever is there.
    fn transfer(&mut self, local: &Path, remote: &str) -> RemoteResult<()>;

    /// Create one directory; the parent must exist.
    fn create_directory(&mut self, remote: &str) -> RemoteResult<()>;

    /// Delete one file.
    fn delete_file(&mut self, remote: &str) -> RemoteResult<()>;

    /// Delete one empty directory (shallow; callers recurse).
    fn delete_directory(&mut self, remote: &str) -> RemoteResult<()>;

    /// List the direct children of a directory.
    fn list_children(&mut self, remote: &str) -> RemoteResult<Vec<RemoteEntry>>;

    /// Run a command; success iff it exits with status 0.
    fn execute(&mut self, command: &str) -> RemoteResult<()>;

    /// Close the session. Further calls are undefined.
    fn disconnect(&mut self);
}
