//! Remote path value objects
//!
//! Remote paths are plain `/`-separated strings: the remote side is always a
//! POSIX host, whatever platform the local tree lives on.

use std::fmt;
use std::path::{Component, Path};

/// Error when a local path cannot be mapped onto a remote root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemotePathError {
    /// Remote root string is empty.
    EmptyRoot,
    /// Local path is not strictly below the local root.
    OutsideRoot,
}

impl fmt::Display for RemotePathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemotePathError::EmptyRoot => write!(f, "remote root is empty"),
            RemotePathError::OutsideRoot => write!(f, "path is not below the local root"),
        }
    }
}

impl std::error::Error for RemotePathError {}

/// Directory on a node that mirrors the fleet's local root.
///
/// Always stored with exactly one trailing `/` so joining is concatenation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteRoot(String);

impl RemoteRoot {
    pub fn new(root: impl Into<String>) -> Result<Self, RemotePathError> {
        let root = root.into();
        let trimmed = root.trim_end_matches('/');
        if root.is_empty() {
            return Err(RemotePathError::EmptyRoot);
        }
        // "/" trims down to "", which is the filesystem root
        Ok(Self(format!("{}/", trimmed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Remote location of a file name placed directly in the root.
    pub fn child(&self, name: &str) -> String {
        format!("{}{}", self.0, name)
    }

    /// Map `local_path` under `local_root` to its mirror under this root.
    ///
    /// `/src/a/b.txt` against `/src` with root `/remote/` gives `/remote/a/b.txt`.
    /// The local root itself has no mirror path: removing it must never
    /// translate into removing the remote root.
    pub fn mirror_of(&self, local_root: &Path, local_path: &Path) -> Result<String, RemotePathError> {
        let relative = local_path
            .strip_prefix(local_root)
            .map_err(|_| RemotePathError::OutsideRoot)?;

        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return Err(RemotePathError::OutsideRoot),
            }
        }

        if segments.is_empty() {
            return Err(RemotePathError::OutsideRoot);
        }

        Ok(format!("{}{}", self.0, segments.join("/")))
    }
}

impl fmt::Display for RemoteRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Join a remote directory and a child name with exactly one `/`.
pub fn join_remote(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

/// Quote a string for safe use in a remote POSIX shell command.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}
