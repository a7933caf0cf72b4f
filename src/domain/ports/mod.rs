//! Domain Ports (Interfaces)
//!
//! These traits define the boundaries of the domain layer.
//! Infrastructure layer provides concrete implementations.

pub mod remote;

pub use remote::{
    ConnectPolicy, Credentials, EntryKind, RemoteConnector, RemoteEntry, RemoteSession,
};
