use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use mirrorfleet::{Credentials, Fleet, MemoryRemote, NodeId};
use tempfile::TempDir;

pub const REMOTE_ROOT: &str = "/srv/mirror/";

/// How long background threads get before a test gives up.
pub const PATIENCE: Duration = Duration::from_secs(5);

/// A source root on disk with `dist/app.tar.gz` inside it.
pub struct SourceTree {
    dir: TempDir,
}

impl SourceTree {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let tree = Self { dir };
        tree.write("dist/app.tar.gz", "packaged");
        tree.write("README.md", "# app\n");
        tree
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn archive(&self) -> PathBuf {
        self.path("dist/app.tar.gz")
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, content).expect("write file");
        path
    }

    pub fn fleet(&self, remote: &MemoryRemote) -> Fleet {
        Fleet::new(self.root(), self.archive(), Arc::new(remote.clone()))
    }
}

pub fn node(host: &str) -> NodeId {
    NodeId::new("deploy", host, 22)
}

/// Create the remote root on `host`, as a provisioned machine would have it.
pub fn provision(remote: &MemoryRemote, host: &str) {
    remote.seed_dir(&node(host), REMOTE_ROOT);
}

pub fn join(fleet: &Fleet, remote: &MemoryRemote, host: &str) {
    provision(remote, host);
    fleet
        .add_node(node(host), REMOTE_ROOT, Credentials::default())
        .expect("node joins");
}

/// Remote mirror of a path below the source root.
pub fn mirrored(relative: &str) -> String {
    format!("{}{}", REMOTE_ROOT, relative)
}

/// Poll `check` until it holds or `PATIENCE` runs out.
pub fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + PATIENCE;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    check()
}
