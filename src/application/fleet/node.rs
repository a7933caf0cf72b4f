//! Node: one remote mirror of the local tree

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::ports::{Credentials, RemoteConnector, RemoteSession};
use crate::domain::value_objects::{join_remote, shell_quote, NodeId, RemoteRoot};
use crate::error::{NodeError, NodeResult, RemoteResult};

/// The one packaging format nodes are bootstrapped from.
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

/// Lifecycle of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Constructed, or bootstrap failed.
    Created,
    Initializing,
    Ready,
    /// Full rebuild in progress, or the last rebuild failed.
    Reinitializing,
    Destroyed,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeState::Created => "created",
            NodeState::Initializing => "initializing",
            NodeState::Ready => "ready",
            NodeState::Reinitializing => "reinitializing",
            NodeState::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

/// A remote machine mirroring the fleet's local root under `remote_root`.
pub struct Node {
    id: NodeId,
    remote_root: RemoteRoot,
    local_root: PathBuf,
    credentials: Credentials,
    connector: Arc<dyn RemoteConnector>,
    session: Option<Box<dyn RemoteSession>>,
    state: NodeState,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("remote_root", &self.remote_root)
            .field("state", &self.state)
            .field("connected", &self.session.is_some())
            .finish()
    }
}

impl Node {
    pub fn new(
        id: NodeId,
        remote_root: &str,
        local_root: impl Into<PathBuf>,
        credentials: Credentials,
        connector: Arc<dyn RemoteConnector>,
    ) -> NodeResult<Self> {
        let remote_root = RemoteRoot::new(remote_root)
            .map_err(|_| NodeError::EmptyRemoteRoot { node: id.clone() })?;
        Ok(Self {
            id,
            remote_root,
            local_root: local_root.into(),
            credentials,
            connector,
            session: None,
            state: NodeState::Created,
        })
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn remote_root(&self) -> &RemoteRoot {
        &self.remote_root
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Bootstrap the remote root from `archive`.
    ///
    /// Rejects an archive without the supported extension before any remote
    /// contact. On failure the node stays `Created`.
    pub fn initialize(&mut self, archive: &Path) -> NodeResult<()> {
        self.state = NodeState::Initializing;
        match self.bootstrap(archive) {
            Ok(()) => {
                self.state = NodeState::Ready;
                info!(node = %self.id, root = %self.remote_root, "node ready");
                Ok(())
            }
            Err(e) => {
                self.state = NodeState::Created;
                Err(e)
            }
        }
    }

    /// Empty the remote root, keeping the root directory itself.
    pub fn destroy(&mut self) -> NodeResult<()> {
        self.teardown()?;
        self.state = NodeState::Destroyed;
        info!(node = %self.id, root = %self.remote_root, "node destroyed");
        Ok(())
    }

    /// Tear the mirror down and rebuild it from `archive`.
    ///
    /// The rebuild is only attempted once the teardown succeeded. Either
    /// failure leaves the node `Reinitializing`.
    pub fn archive_changed(&mut self, archive: &Path) -> NodeResult<()> {
        self.state = NodeState::Reinitializing;
        info!(node = %self.id, "archive changed, rebuilding");

        self.teardown()?;
        self.bootstrap(archive)?;

        self.state = NodeState::Ready;
        info!(node = %self.id, "node rebuilt");
        Ok(())
    }

    pub fn file_added(&mut self, local: &Path) -> NodeResult<()> {
        let remote = self.mirror_path(local)?;
        self.session()?.transfer(local, &remote)?;
        Ok(())
    }

    pub fn directory_added(&mut self, local: &Path) -> NodeResult<()> {
        let remote = self.mirror_path(local)?;
        self.session()?.create_directory(&remote)?;
        Ok(())
    }

    pub fn file_deleted(&mut self, local: &Path) -> NodeResult<()> {
        let remote = self.mirror_path(local)?;
        self.session()?.delete_file(&remote)?;
        Ok(())
    }

    /// Remove the mirrored directory and everything below it.
    pub fn directory_deleted(&mut self, local: &Path) -> NodeResult<()> {
        let remote = self.mirror_path(local)?;
        empty_dir(self.session()?, &remote, true)?;
        Ok(())
    }

    /// Delete the remote copy, then transfer the local file again.
    pub fn file_changed(&mut self, local: &Path) -> NodeResult<()> {
        let remote = self.mirror_path(local)?;
        let session = self.session()?;
        session.delete_file(&remote)?;
        session.transfer(local, &remote)?;
        Ok(())
    }

    /// Close the session, if any.
    pub fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.disconnect();
        }
    }

    /// Empty the remote root over the open session, leaving the state alone.
    fn teardown(&mut self) -> NodeResult<()> {
        let root = self.remote_root.as_str().to_string();
        empty_dir(self.session()?, &root, false)?;
        Ok(())
    }

    fn bootstrap(&mut self, archive: &Path) -> NodeResult<()> {
        let name = archive_name(archive)?;

        // A fresh session per bootstrap
        self.disconnect();
        self.session = Some(self.connector.connect(&self.id, &self.credentials)?);

        let remote_archive = self.remote_root.child(name);
        let extract = format!(
            "tar -zxf {} -C {}",
            shell_quote(&remote_archive),
            shell_quote(self.remote_root.as_str())
        );
        let node = self.id.clone();
        let session = self.session()?;

        debug!(%node, remote = %remote_archive, "transferring archive");
        session.transfer(archive, &remote_archive)?;
        debug!(%node, command = %extract, "extracting archive");
        session.execute(&extract)?;
        session.delete_file(&remote_archive)?;
        Ok(())
    }

    fn session(&mut self) -> NodeResult<&mut (dyn RemoteSession + 'static)> {
        match self.session.as_deref_mut() {
            Some(session) => Ok(session),
            None => Err(NodeError::NotConnected {
                node: self.id.clone(),
            }),
        }
    }

    fn mirror_path(&self, local: &Path) -> NodeResult<String> {
        self.remote_root
            .mirror_of(&self.local_root, local)
            .map_err(|_| NodeError::OutsideRoot {
                path: local.to_path_buf(),
                root: self.local_root.clone(),
            })
    }
}

/// File name of `archive`, provided it carries the supported extension.
fn archive_name(archive: &Path) -> NodeResult<&str> {
    archive
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| name.len() > ARCHIVE_EXTENSION.len() && name.ends_with(ARCHIVE_EXTENSION))
        .ok_or_else(|| NodeError::UnsupportedArchive {
            path: archive.to_path_buf(),
            expected: ARCHIVE_EXTENSION,
        })
}

/// Recursively empty `dir`: subdirectories first, then files, then `dir`
/// itself when `remove_dir` is set.
fn empty_dir(session: &mut dyn RemoteSession, dir: &str, remove_dir: bool) -> RemoteResult<()> {
    let children = session.list_children(dir)?;

    for entry in children.iter().filter(|e| e.is_dir()) {
        empty_dir(session, &join_remote(dir, &entry.name), true)?;
    }
    for entry in children.iter().filter(|e| !e.is_dir()) {
        session.delete_file(&join_remote(dir, &entry.name))?;
    }

    if remove_dir {
        session.delete_directory(dir)?;
    }
    Ok(())
}
