//! Human-readable and JSON fleet membership listing

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::domain::value_objects::NodeId;

use super::node::NodeState;

/// One member as reported by `Fleet::status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub id: NodeId,
    pub remote_root: String,
    pub state: NodeState,
}

/// Snapshot of a fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FleetStatus {
    pub local_root: PathBuf,
    pub archive: PathBuf,
    /// Change detector and propagation engine are running.
    pub pipeline_running: bool,
    /// Directories under watch, when the pipeline runs.
    pub watched_dirs: Option<usize>,
    pub nodes: Vec<NodeStatus>,
}

impl FleetStatus {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl fmt::Display for FleetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Fleet: {} node(s), pipeline {}",
            self.nodes.len(),
            if self.pipeline_running {
                "running"
            } else {
                "stopped"
            }
        )?;
        writeln!(f, "  local root: {}", self.local_root.display())?;
        write!(f, "  archive:    {}", self.archive.display())?;
        if let Some(dirs) = self.watched_dirs {
            write!(f, "\n  watching:   {} director(ies)", dirs)?;
        }

        let width = self
            .nodes
            .iter()
            .map(|n| n.id.to_string().len())
            .max()
            .unwrap_or(0);
        for node in &self.nodes {
            write!(
                f,
                "\n  {:<width$}  {}  {}",
                node.id.to_string(),
                node.remote_root,
                node.state,
                width = width
            )?;
        }
        Ok(())
    }
}
