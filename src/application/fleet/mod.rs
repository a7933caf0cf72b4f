//! Fleet of remote mirrors
//!
//! - `Node` - one remote mirror (bootstrap, incremental sync, teardown, rebuild)
//! - `engine` - turns Change Events into node actions and fans them out
//! - `Fleet` - membership, lifecycle, and the lazily started pipeline

mod engine;
mod manager;
mod node;
mod status;

pub use engine::{plan, propagate, FleetLayout, NodeAction};
pub use manager::Fleet;
pub use node::{Node, NodeState, ARCHIVE_EXTENSION};
pub use status::{FleetStatus, NodeStatus};
