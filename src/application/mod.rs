//! Application Layer
//!
//! Orchestrates the domain ports into the running system: the fleet, its
//! nodes, and the propagation of detected changes to them.

pub mod fleet;

pub use fleet::{
    plan, Fleet, FleetLayout, FleetStatus, Node, NodeAction, NodeState, NodeStatus,
    ARCHIVE_EXTENSION,
};
