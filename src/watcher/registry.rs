//! Watch Registration Set
//!
//! Every directory under the source root gets its own non-recursive watch so
//! the set of registered directories doubles as the record of which deleted
//! paths used to be directories.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::DetectorError;

/// The OS-level change-notification facility, reduced to what the registry needs.
pub trait WatchFacility: Send {
    /// Start observing the direct children of `dir`.
    fn watch_dir(&mut self, dir: &Path) -> Result<(), notify::Error>;
}

impl WatchFacility for RecommendedWatcher {
    fn watch_dir(&mut self, dir: &Path) -> Result<(), notify::Error> {
        self.watch(dir, RecursiveMode::NonRecursive)
    }
}

/// Registered directories plus the directories already reported deleted.
pub struct WatchRegistry<F> {
    facility: F,
    dirs: HashSet<PathBuf>,
    /// Deleted directories; the OS may report each deletion more than once.
    retired: HashSet<PathBuf>,
}

impl<F: WatchFacility> WatchRegistry<F> {
    pub fn new(facility: F) -> Self {
        Self {
            facility,
            dirs: HashSet::new(),
            retired: HashSet::new(),
        }
    }

    /// Register `root` and every directory below it, pre-order.
    ///
    /// Returns how many directories were newly registered.
    pub fn register_tree(&mut self, root: &Path) -> Result<usize, DetectorError> {
        let mut added = 0;
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry.map_err(|source| DetectorError::Walk {
                path: root.to_path_buf(),
                source,
            })?;
            if entry.file_type().is_dir() && self.register_dir(entry.path())? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Register a single directory; `false` if it was already registered.
    pub fn register_dir(&mut self, dir: &Path) -> Result<bool, DetectorError> {
        if self.dirs.contains(dir) {
            return Ok(false);
        }
        self.facility
            .watch_dir(dir)
            .map_err(|source| DetectorError::Register {
                path: dir.to_path_buf(),
                source,
            })?;
        debug!(dir = %dir.display(), "watching");
        self.revive(dir);
        self.dirs.insert(dir.to_path_buf());
        Ok(true)
    }

    /// A path exists again; deletions at or below it are real from now on.
    pub fn revive(&mut self, path: &Path) {
        self.retired.retain(|old| !old.starts_with(path));
    }

    /// Forget a deleted directory and everything registered below it.
    ///
    /// Returns `false` if `dir` was not registered.
    pub fn retire(&mut self, dir: &Path) -> bool {
        if !self.dirs.remove(dir) {
            return false;
        }
        let below: Vec<PathBuf> = self
            .dirs
            .iter()
            .filter(|d| d.starts_with(dir))
            .cloned()
            .collect();
        for d in below {
            self.dirs.remove(&d);
        }
        self.retired.insert(dir.to_path_buf());
        true
    }
}

// Read-only queries, available without a facility bound
impl<F> WatchRegistry<F> {
    pub fn is_registered(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    /// Whether `path` is, or lies under, a directory already reported deleted.
    pub fn is_retired(&self, path: &Path) -> bool {
        path.ancestors().any(|dir| self.retired.contains(dir))
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn facility(&self) -> &F {
        &self.facility
    }
}
