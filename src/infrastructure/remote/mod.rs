//! Remote Collaborator implementations

pub mod memory;
pub mod ssh;

pub use memory::{MemoryRemote, MemorySession, RemoteCall, RemoteOp, RemoteOpKind};
pub use ssh::{SshConnector, SshOptions, SshSession};
