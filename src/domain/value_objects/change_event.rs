//! Change event value object
//!
//! One observed filesystem mutation under a watched directory.

use std::fmt;
use std::path::{Path, PathBuf};

/// What happened to the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    FileAdded,
    FileDeleted,
    FileChanged,
    DirAdded,
    DirDeleted,
    DirChanged,
}

impl ChangeKind {
    pub fn is_directory(&self) -> bool {
        matches!(
            self,
            ChangeKind::DirAdded | ChangeKind::DirDeleted | ChangeKind::DirChanged
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::FileAdded => "file_added",
            ChangeKind::FileDeleted => "file_deleted",
            ChangeKind::FileChanged => "file_changed",
            ChangeKind::DirAdded => "directory_added",
            ChangeKind::DirDeleted => "directory_deleted",
            ChangeKind::DirChanged => "directory_changed",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An absolute local path plus the kind of change observed on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    path: PathBuf,
    kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path.display())
    }
}
