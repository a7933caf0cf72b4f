//! Propagation Engine
//!
//! Sole consumer of the Event Queue. Each event is turned into one node
//! action and applied to every member, in identity order, while the fleet
//! lock is held.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::value_objects::{ChangeEvent, ChangeKind};
use crate::error::NodeResult;
use crate::watcher::EventReceiver;

use super::manager::FleetShared;
use super::node::Node;

/// Local paths the fleet mirrors from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetLayout {
    local_root: PathBuf,
    archive: PathBuf,
    archive_dir: PathBuf,
}

impl FleetLayout {
    pub fn new(local_root: impl Into<PathBuf>, archive: impl Into<PathBuf>) -> Self {
        let archive = archive.into();
        let archive_dir = archive
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        Self {
            local_root: local_root.into(),
            archive,
            archive_dir,
        }
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    /// Directory holding the archive; watched alongside the local root.
    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }
}

/// Node operation an event translates into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    FileAdded,
    DirectoryAdded,
    FileDeleted,
    DirectoryDeleted,
    FileChanged,
    ArchiveChanged,
}

impl NodeAction {
    pub fn apply(self, node: &mut Node, path: &Path) -> NodeResult<()> {
        match self {
            NodeAction::FileAdded => node.file_added(path),
            NodeAction::DirectoryAdded => node.directory_added(path),
            NodeAction::FileDeleted => node.file_deleted(path),
            NodeAction::DirectoryDeleted => node.directory_deleted(path),
            NodeAction::FileChanged => node.file_changed(path),
            NodeAction::ArchiveChanged => node.archive_changed(path),
        }
    }
}

/// Decide what, if anything, every node does for `event`.
///
/// The archive is never mirrored as a plain file: additions next to it and
/// its deletion are skipped, its modification means a full rebuild.
pub fn plan(event: &ChangeEvent, layout: &FleetLayout) -> Option<NodeAction> {
    let path = event.path();
    match event.kind() {
        ChangeKind::DirAdded => Some(NodeAction::DirectoryAdded),
        ChangeKind::FileAdded if path.parent() == Some(layout.archive_dir()) => None,
        ChangeKind::FileAdded => Some(NodeAction::FileAdded),
        ChangeKind::DirDeleted => Some(NodeAction::DirectoryDeleted),
        ChangeKind::FileDeleted if path == layout.archive() => None,
        ChangeKind::FileDeleted => Some(NodeAction::FileDeleted),
        ChangeKind::DirChanged => None,
        ChangeKind::FileChanged if path == layout.archive() => Some(NodeAction::ArchiveChanged),
        ChangeKind::FileChanged => Some(NodeAction::FileChanged),
    }
}

/// Apply `action` to every node; a failing node never stops the others.
///
/// Returns how many nodes failed.
pub fn propagate<'a>(
    action: NodeAction,
    path: &Path,
    nodes: impl IntoIterator<Item = &'a mut Node>,
) -> usize {
    let mut failures = 0;
    for node in nodes {
        if let Err(e) = action.apply(node, path) {
            warn!(node = %node.id(), ?action, path = %path.display(), error = %e, "propagation failed");
            failures += 1;
        }
    }
    failures
}

/// Consume events until the queue's producer is gone.
pub(crate) fn run(events: EventReceiver, shared: Arc<FleetShared>) {
    info!("propagation engine started");
    while let Some(event) = events.take() {
        shared.dispatch(&event);
    }
    info!("propagation engine stopped");
}
