//! Error types for mirrorfleet
//!
//! Uses `thiserror` for library errors; one enum per layer so callers can
//! tell a dead host from a bad archive from a watcher that never started.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::value_objects::{NodeId, NodeSpecError};

/// Result type alias for Remote Collaborator operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Result type alias for node operations.
pub type NodeResult<T> = Result<T, NodeError>;

/// Result type alias for fleet operations.
pub type FleetResult<T> = Result<T, FleetError>;

/// Failures reported by a Remote Collaborator.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Session could not be established within the retry budget.
    #[error("could not connect to {node} after {attempts} attempt(s): {message}")]
    Connection {
        node: NodeId,
        attempts: u32,
        message: String,
    },

    /// Copying a local file to the node failed.
    #[error("transfer of {local} to {remote} failed: {message}")]
    Transfer {
        local: PathBuf,
        remote: String,
        message: String,
    },

    /// A remote command exited non-zero or could not be run.
    #[error("remote command `{command}` failed: {message}")]
    Command { command: String, message: String },

    /// Remote path argument was empty.
    #[error("remote path is empty")]
    EmptyPath,

    /// Local I/O error while talking to the collaborator.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of a single node operation.
#[derive(Error, Debug)]
pub enum NodeError {
    /// Archive does not carry the supported packaging extension.
    #[error("unsupported archive '{path}': expected a {expected} file")]
    UnsupportedArchive {
        path: PathBuf,
        expected: &'static str,
    },

    /// Operation needs a session but the node was never bootstrapped.
    #[error("node {node} has no open session")]
    NotConnected { node: NodeId },

    /// Local path has no mirror under the remote root.
    #[error("'{path}' has no mirror under local root '{root}'")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// Remote root was empty.
    #[error("remote root for {node} is empty")]
    EmptyRemoteRoot { node: NodeId },

    /// The Remote Collaborator reported a failure.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Failures starting the Change Detector.
#[derive(Error, Debug)]
pub enum DetectorError {
    /// OS change-notification facility could not be created.
    #[error("could not create the watch service: {0}")]
    WatchService(#[source] notify::Error),

    /// A directory could not be registered with the watch service.
    #[error("could not watch '{path}': {source}")]
    Register {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// Walking a directory tree for registration failed.
    #[error("could not walk '{path}': {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Background thread could not be spawned.
    #[error("could not spawn detector thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Failures of fleet membership operations.
#[derive(Error, Debug)]
pub enum FleetError {
    /// A node with the same (user, host, port) is already a member.
    #[error("node {0} is already part of the fleet")]
    DuplicateNode(NodeId),

    /// No member matches the given identity.
    #[error("node {0} is not part of the fleet")]
    NodeNotFound(NodeId),

    /// Bootstrap or teardown of a node failed.
    #[error("node {node}: {source}")]
    Node {
        node: NodeId,
        #[source]
        source: NodeError,
    },

    /// Change Detector failed to start on the first member.
    #[error("change detector failed to start: {0}")]
    Detector(#[from] DetectorError),

    /// Propagation engine thread could not be spawned.
    #[error("could not spawn propagation engine: {0}")]
    Engine(#[source] std::io::Error),

    /// Shutdown finished but some nodes could not be torn down.
    #[error("shutdown left {} node(s) behind: {}", .failed.len(), join_ids(.failed))]
    Shutdown { failed: Vec<NodeId> },
}

/// Failures loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    /// Path-valued field must be absolute.
    #[error("'{field}' must be an absolute path, got '{path}'")]
    NotAbsolute { field: &'static str, path: PathBuf },

    #[error("invalid node spec '{spec}': {source}")]
    NodeSpec {
        spec: String,
        #[source]
        source: NodeSpecError,
    },

    /// No config file found in any lookup location.
    #[error("no configuration found (tried {})", join_paths(.tried))]
    NotFound { tried: Vec<PathBuf> },
}

fn join_ids(ids: &[NodeId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
