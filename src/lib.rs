//! mirrorfleet - keep a fleet of remote machines mirroring a local tree
//!
//! Each node is bootstrapped from a packaged archive, then every local
//! filesystem change under the source root is propagated to every node for
//! as long as the fleet is non-empty.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod watcher;

// Re-exports for convenience
pub use application::{Fleet, FleetLayout, FleetStatus, Node, NodeState, ARCHIVE_EXTENSION};
pub use config::{Config, NodeConfig, SshConfig};
pub use domain::ports::{
    ConnectPolicy, Credentials, EntryKind, RemoteConnector, RemoteEntry, RemoteSession,
};
pub use domain::value_objects::{ChangeEvent, ChangeKind, NodeId, NodeSpec, RemoteRoot};
pub use error::{ConfigError, DetectorError, FleetError, FleetResult, NodeError, RemoteError};
pub use infrastructure::{MemoryRemote, SshConnector, SshOptions};
pub use watcher::{event_queue, ChangeDetector, DetectorHandle};
