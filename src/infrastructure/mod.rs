//! Infrastructure Layer
//!
//! Concrete implementations of domain ports.
//!
//! ## Structure
//!
//! - `remote/` - Remote Collaborator bindings (system `ssh`, in-memory)

pub mod remote;

pub use remote::{MemoryRemote, SshConnector, SshOptions};
