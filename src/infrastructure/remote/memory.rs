//! In-memory Remote Collaborator
//!
//! Simulates every node's remote tree in memory and records each call, in
//! order, so tests can assert on exactly what a node asked the remote side to
//! do. The binary uses it for `--dry-run`.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::domain::ports::{
    ConnectPolicy, Credentials, EntryKind, RemoteConnector, RemoteEntry, RemoteSession,
};
use crate::domain::value_objects::NodeId;
use crate::error::{RemoteError, RemoteResult};

/// Collaborator operation, without arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOpKind {
    Connect,
    Transfer,
    CreateDirectory,
    DeleteFile,
    DeleteDirectory,
    ListChildren,
    Execute,
    Disconnect,
}

/// One recorded collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    Connect,
    Transfer { local: PathBuf, remote: String },
    CreateDirectory(String),
    DeleteFile(String),
    DeleteDirectory(String),
    ListChildren(String),
    Execute(String),
    Disconnect,
}

impl RemoteOp {
    pub fn kind(&self) -> RemoteOpKind {
        match self {
            RemoteOp::Connect => RemoteOpKind::Connect,
            RemoteOp::Transfer { .. } => RemoteOpKind::Transfer,
            RemoteOp::CreateDirectory(_) => RemoteOpKind::CreateDirectory,
            RemoteOp::DeleteFile(_) => RemoteOpKind::DeleteFile,
            RemoteOp::DeleteDirectory(_) => RemoteOpKind::DeleteDirectory,
            RemoteOp::ListChildren(_) => RemoteOpKind::ListChildren,
            RemoteOp::Execute(_) => RemoteOpKind::Execute,
            RemoteOp::Disconnect => RemoteOpKind::Disconnect,
        }
    }
}

/// A recorded call and the node it was made against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub node: NodeId,
    pub op: RemoteOp,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Per node: normalized remote path -> entry kind.
    trees: BTreeMap<NodeId, BTreeMap<String, EntryKind>>,
    calls: Vec<RemoteCall>,
    failures: HashSet<(NodeId, RemoteOpKind)>,
    /// Log each call at info level (dry-run output).
    announce: bool,
}

impl MemoryState {
    fn record(&mut self, node: &NodeId, op: RemoteOp) -> RemoteResult<()> {
        let kind = op.kind();
        if self.announce {
            info!(%node, ?op, "dry-run");
        }
        let command = format!("{:?}", op);
        self.calls.push(RemoteCall {
            node: node.clone(),
            op,
        });
        if self.failures.contains(&(node.clone(), kind)) {
            return Err(RemoteError::Command {
                command,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn tree(&mut self, node: &NodeId) -> &mut BTreeMap<String, EntryKind> {
        self.trees.entry(node.clone()).or_default()
    }
}

/// Shared handle to the simulated remote side of every node.
///
/// Cloning is cheap; all clones see the same trees and call log.
#[derive(Debug, Clone)]
pub struct MemoryRemote {
    state: Arc<Mutex<MemoryState>>,
    policy: ConnectPolicy,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    /// Single connect attempt, no delays.
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            policy: ConnectPolicy {
                attempts: 1,
                timeout: std::time::Duration::ZERO,
                delay: std::time::Duration::ZERO,
            },
        }
    }

    /// A remote that logs every call it receives.
    pub fn announcing() -> Self {
        let remote = Self::new();
        remote.lock().announce = true;
        remote
    }

    /// Use a custom connect policy (attempt count matters, delays do too).
    pub fn with_policy(mut self, policy: ConnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every `kind` call against `node` fail from now on.
    pub fn fail(&self, node: &NodeId, kind: RemoteOpKind) {
        self.lock().failures.insert((node.clone(), kind));
    }

    /// Undo a previous `fail`.
    pub fn heal(&self, node: &NodeId, kind: RemoteOpKind) {
        self.lock().failures.remove(&(node.clone(), kind));
    }

    /// Every call recorded so far, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Calls made against one node, in order.
    pub fn ops_for(&self, node: &NodeId) -> Vec<RemoteOp> {
        self.lock()
            .calls
            .iter()
            .filter(|call| &call.node == node)
            .map(|call| call.op.clone())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Pre-populate a file (and its parent directories) on a node.
    pub fn seed_file(&self, node: &NodeId, remote: &str) {
        let mut state = self.lock();
        insert_with_parents(state.tree(node), remote, EntryKind::File);
    }

    /// Pre-populate a directory (and its parents) on a node.
    pub fn seed_dir(&self, node: &NodeId, remote: &str) {
        let mut state = self.lock();
        insert_with_parents(state.tree(node), remote, EntryKind::Directory);
    }

    /// Kind of the entry at `remote` on `node`, if it exists.
    pub fn entry(&self, node: &NodeId, remote: &str) -> Option<EntryKind> {
        let state = self.lock();
        state
            .trees
            .get(node)
            .and_then(|tree| tree.get(&normalize(remote)).copied())
    }

    /// All paths present on a node, sorted.
    pub fn paths(&self, node: &NodeId) -> Vec<String> {
        let state = self.lock();
        state
            .trees
            .get(node)
            .map(|tree| tree.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl RemoteConnector for MemoryRemote {
    fn connect(
        &self,
        node: &NodeId,
        _credentials: &Credentials,
    ) -> RemoteResult<Box<dyn RemoteSession>> {
        self.policy.run(node, |_| {
            self.lock()
                .record(node, RemoteOp::Connect)
                .map_err(|e| e.to_string())
        })?;

        Ok(Box::new(MemorySession {
            node: node.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

/// Session against one simulated node.
pub struct MemorySession {
    node: NodeId,
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySession {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RemoteSession for MemorySession {
    fn transfer(&mut self, local: &Path, remote: &str) -> RemoteResult<()> {
        let node = self.node.clone();
        let mut state = self.lock();
        state.record(
            &node,
            RemoteOp::Transfer {
                local: local.to_path_buf(),
                remote: remote.to_string(),
            },
        )?;
        if remote.is_empty() {
            return Err(RemoteError::EmptyPath);
        }
        let tree = state.tree(&node);
        let path = normalize(remote);
        let refusal = if tree.get(&path) == Some(&EntryKind::Directory) {
            Some("destination is a directory")
        } else if !parent_exists(tree, &path) {
            Some("no such directory")
        } else {
            None
        };
        if let Some(message) = refusal {
            return Err(RemoteError::Transfer {
                local: local.to_path_buf(),
                remote: remote.to_string(),
                message: message.to_string(),
            });
        }
        tree.insert(path, EntryKind::File);
        Ok(())
    }

    fn create_directory(&mut self, remote: &str) -> RemoteResult<()> {
        let node = self.node.clone();
        let mut state = self.lock();
        state.record(&node, RemoteOp::CreateDirectory(remote.to_string()))?;
        if remote.is_empty() {
            return Err(RemoteError::EmptyPath);
        }
        let tree = state.tree(&node);
        let path = normalize(remote);
        if tree.contains_key(&path) {
            return Err(command_error("mkdir", remote, "already exists"));
        }
        if !parent_exists(tree, &path) {
            return Err(command_error("mkdir", remote, "no such directory"));
        }
        tree.insert(path, EntryKind::Directory);
        Ok(())
    }

    fn delete_file(&mut self, remote: &str) -> RemoteResult<()> {
        let node = self.node.clone();
        let mut state = self.lock();
        state.record(&node, RemoteOp::DeleteFile(remote.to_string()))?;
        let tree = state.tree(&node);
        let path = normalize(remote);
        match tree.get(&path) {
            Some(EntryKind::File) => {
                tree.remove(&path);
                Ok(())
            }
            Some(EntryKind::Directory) => Err(command_error("rm", remote, "is a directory")),
            // rm -f
            None => Ok(()),
        }
    }

    fn delete_directory(&mut self, remote: &str) -> RemoteResult<()> {
        let node = self.node.clone();
        let mut state = self.lock();
        state.record(&node, RemoteOp::DeleteDirectory(remote.to_string()))?;
        let tree = state.tree(&node);
        let path = normalize(remote);
        match tree.get(&path) {
            Some(EntryKind::Directory) => {
                if !children_of(tree, &path).is_empty() {
                    return Err(command_error("rmdir", remote, "directory not empty"));
                }
                tree.remove(&path);
                Ok(())
            }
            Some(EntryKind::File) => Err(command_error("rmdir", remote, "not a directory")),
            None => Err(command_error("rmdir", remote, "no such directory")),
        }
    }

    fn list_children(&mut self, remote: &str) -> RemoteResult<Vec<RemoteEntry>> {
        let node = self.node.clone();
        let mut state = self.lock();
        state.record(&node, RemoteOp::ListChildren(remote.to_string()))?;
        let tree = state.tree(&node);
        let path = normalize(remote);
        match tree.get(&path) {
            Some(EntryKind::Directory) => Ok(children_of(tree, &path)),
            Some(EntryKind::File) => Err(command_error("ls", remote, "not a directory")),
            None => Err(command_error("ls", remote, "no such directory")),
        }
    }

    fn execute(&mut self, command: &str) -> RemoteResult<()> {
        let node = self.node.clone();
        self.lock()
            .record(&node, RemoteOp::Execute(command.to_string()))
    }

    fn disconnect(&mut self) {
        let node = self.node.clone();
        // A failing disconnect has nothing to report to
        let _ = self.lock().record(&node, RemoteOp::Disconnect);
    }
}

fn command_error(command: &str, remote: &str, message: &str) -> RemoteError {
    RemoteError::Command {
        command: format!("{} {}", command, remote),
        message: message.to_string(),
    }
}

/// Drop trailing slashes so `/a/` and `/a` name the same entry.
fn normalize(remote: &str) -> String {
    let trimmed = remote.trim_end_matches('/');
    if trimmed.is_empty() && remote.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn parent_of(path: &str) -> Option<String> {
    match path.rsplit_once('/') {
        Some(("", _)) if path != "/" => Some("/".to_string()),
        Some((parent, _)) if !parent.is_empty() => Some(parent.to_string()),
        _ => None,
    }
}

/// Whether the directory that would hold `path` exists; `/` always does.
fn parent_exists(tree: &BTreeMap<String, EntryKind>, path: &str) -> bool {
    match parent_of(path) {
        None => true,
        Some(dir) if dir == "/" => true,
        Some(dir) => tree.get(&dir) == Some(&EntryKind::Directory),
    }
}

fn insert_with_parents(tree: &mut BTreeMap<String, EntryKind>, remote: &str, kind: EntryKind) {
    let path = normalize(remote);
    let mut parent = parent_of(&path);
    while let Some(dir) = parent {
        if dir == "/" {
            break;
        }
        tree.entry(dir.clone()).or_insert(EntryKind::Directory);
        parent = parent_of(&dir);
    }
    tree.insert(path, kind);
}

fn children_of(tree: &BTreeMap<String, EntryKind>, dir: &str) -> Vec<RemoteEntry> {
    tree.iter()
        .filter(|(path, _)| parent_of(path).as_deref() == Some(dir))
        .map(|(path, kind)| RemoteEntry {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            kind: *kind,
        })
        .collect()
}
