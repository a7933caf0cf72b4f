//! Scenario: Real filesystem edits reach the nodes
//!
//! Journey: With the fleet running, a developer edits the source tree on
//! disk and the nodes follow without any explicit dispatch.

use std::fs;

use mirrorfleet::infrastructure::remote::RemoteOp;
use mirrorfleet::{EntryKind, MemoryRemote};

use crate::common::*;

/// SCENARIO: files and directories created on disk appear on every node.
#[test]
fn scenario_edits_on_disk_are_mirrored() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);
    join(&fleet, &remote, "web1");
    join(&fleet, &remote, "web2");

    tree.write("notes.txt", "hello");
    assert!(eventually(|| {
        ["web1", "web2"]
            .iter()
            .all(|h| remote.entry(&node(h), &mirrored("notes.txt")) == Some(EntryKind::File))
    }));

    fs::create_dir(tree.path("docs")).unwrap();
    assert!(eventually(|| {
        remote.entry(&node("web2"), &mirrored("docs")) == Some(EntryKind::Directory)
    }));

    // Only once the directory is under watch do its contents get noticed
    tree.write("docs/guide.md", "# guide");
    assert!(eventually(|| {
        remote.entry(&node("web1"), &mirrored("docs/guide.md")).is_some()
    }));

    fs::remove_file(tree.path("notes.txt")).unwrap();
    assert!(eventually(|| {
        ["web1", "web2"]
            .iter()
            .all(|h| remote.entry(&node(h), &mirrored("notes.txt")).is_none())
    }));
}

/// SCENARIO: removing a directory tree removes its mirror.
#[test]
fn scenario_removed_directory_disappears_from_nodes() {
    let tree = SourceTree::new();
    tree.write("assets/logo.svg", "<svg/>");
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);
    join(&fleet, &remote, "web1");
    remote.seed_file(&node("web1"), &mirrored("assets/logo.svg"));

    fs::remove_dir_all(tree.path("assets")).unwrap();

    assert!(eventually(|| remote.entry(&node("web1"), &mirrored("assets")).is_none()));
    let removals = remote
        .ops_for(&node("web1"))
        .into_iter()
        .filter(|op| *op == RemoteOp::DeleteDirectory(mirrored("assets")))
        .count();
    assert_eq!(removals, 1);
}

/// SCENARIO: writing a new archive rebuilds the mirror.
#[test]
fn scenario_repackaging_rebuilds_nodes() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);
    join(&fleet, &remote, "web1");
    remote.clear_calls();

    fs::write(tree.archive(), "repackaged").unwrap();

    assert!(eventually(|| {
        remote.ops_for(&node("web1")).contains(&RemoteOp::Transfer {
            local: tree.archive(),
            remote: mirrored("app.tar.gz"),
        })
    }));
}

/// SCENARIO: stopping drains the queue and leaves the nodes alone afterwards.
#[test]
fn scenario_stopped_fleet_ignores_later_edits() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);
    join(&fleet, &remote, "web1");

    fleet.stop();
    remote.clear_calls();
    tree.write("after-stop.txt", "ignored");
    std::thread::sleep(std::time::Duration::from_millis(200));

    assert!(remote.calls().is_empty());
    assert!(fleet.contains(&node("web1")));
}
