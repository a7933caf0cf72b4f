//! Domain Value Objects
//!
//! Immutable value types shared by the watcher, the fleet and the remote
//! bindings.

mod change_event;
mod node_id;
mod remote_path;

pub use change_event::{ChangeEvent, ChangeKind};
pub use node_id::{NodeId, NodeSpec, NodeSpecError, DEFAULT_PORT};
pub use remote_path::{join_remote, shell_quote, RemotePathError, RemoteRoot};
