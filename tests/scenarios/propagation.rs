//! Scenario: Change events fanned out to every member
//!
//! Journey: Edits in the source tree reach all nodes in the same order,
//! the packaged archive only ever triggers a full rebuild, and one broken
//! node does not hold the others back.

use mirrorfleet::infrastructure::remote::{RemoteOp, RemoteOpKind};
use mirrorfleet::{ChangeEvent, ChangeKind, MemoryRemote};

use crate::common::*;

fn event(tree: &SourceTree, relative: &str, kind: ChangeKind) -> ChangeEvent {
    ChangeEvent::new(tree.path(relative), kind)
}

/// SCENARIO: every node observes the same operations in the same order.
#[test]
fn scenario_nodes_see_identical_operation_order() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);
    join(&fleet, &remote, "web1");
    join(&fleet, &remote, "web2");
    remote.clear_calls();

    let events = [
        event(&tree, "docs", ChangeKind::DirAdded),
        event(&tree, "docs/guide.md", ChangeKind::FileAdded),
        event(&tree, "docs/guide.md", ChangeKind::FileChanged),
        event(&tree, "docs/guide.md", ChangeKind::FileDeleted),
        event(&tree, "docs", ChangeKind::DirDeleted),
    ];
    for e in &events {
        assert_eq!(fleet.dispatch(e), 0, "{e}");
    }

    let web1 = remote.ops_for(&node("web1"));
    assert_eq!(web1, remote.ops_for(&node("web2")));
    assert_eq!(
        web1,
        vec![
            RemoteOp::CreateDirectory(mirrored("docs")),
            RemoteOp::Transfer {
                local: tree.path("docs/guide.md"),
                remote: mirrored("docs/guide.md"),
            },
            RemoteOp::DeleteFile(mirrored("docs/guide.md")),
            RemoteOp::Transfer {
                local: tree.path("docs/guide.md"),
                remote: mirrored("docs/guide.md"),
            },
            RemoteOp::DeleteFile(mirrored("docs/guide.md")),
            RemoteOp::ListChildren(mirrored("docs")),
            RemoteOp::DeleteDirectory(mirrored("docs")),
        ]
    );
}

/// SCENARIO: a node missing a file still takes its changes and deletions.
#[test]
fn scenario_files_absent_from_nodes_are_still_mirrored() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);
    join(&fleet, &remote, "web1");
    join(&fleet, &remote, "web2");
    remote.seed_file(&node("web2"), &mirrored("README.md"));

    assert_eq!(fleet.dispatch(&event(&tree, "README.md", ChangeKind::FileChanged)), 0);
    for host in ["web1", "web2"] {
        assert!(remote.entry(&node(host), &mirrored("README.md")).is_some());
    }

    assert_eq!(fleet.dispatch(&event(&tree, "gone.txt", ChangeKind::FileDeleted)), 0);
    assert_eq!(fleet.len(), 2);
}

/// SCENARIO: a file inside a directory no node has fails everywhere.
#[test]
fn scenario_file_under_unmirrored_directory_fails_on_every_node() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);
    join(&fleet, &remote, "web1");
    join(&fleet, &remote, "web2");

    let failures = fleet.dispatch(&event(&tree, "docs/guide.md", ChangeKind::FileAdded));

    assert_eq!(failures, 2);
    assert!(remote.entry(&node("web1"), &mirrored("docs")).is_none());
}

/// SCENARIO: a failing node is skipped and the rest still get the change.
#[test]
fn scenario_failing_node_does_not_block_the_others() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);
    for host in ["a", "b", "c"] {
        join(&fleet, &remote, host);
    }
    remote.fail(&node("b"), RemoteOpKind::Transfer);

    let failures = fleet.dispatch(&event(&tree, "notes.txt", ChangeKind::FileAdded));

    assert_eq!(failures, 1);
    for host in ["a", "c"] {
        assert!(remote.entry(&node(host), &mirrored("notes.txt")).is_some());
    }
    assert!(remote.entry(&node("b"), &mirrored("notes.txt")).is_none());
    assert_eq!(fleet.len(), 3);
}

/// SCENARIO: the archive and its siblings are never mirrored file by file.
#[test]
fn scenario_archive_directory_is_not_mirrored() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);
    join(&fleet, &remote, "web1");
    remote.clear_calls();

    fleet.dispatch(&event(&tree, "dist/app.tar.gz", ChangeKind::FileAdded));
    fleet.dispatch(&event(&tree, "dist/app.tar.gz", ChangeKind::FileDeleted));
    fleet.dispatch(&event(&tree, "dist/checksums.txt", ChangeKind::FileAdded));
    fleet.dispatch(&event(&tree, "dist", ChangeKind::DirChanged));

    assert!(remote.calls().is_empty());
}

/// SCENARIO: a repackaged archive rebuilds every node from scratch.
#[test]
fn scenario_archive_change_rebuilds_each_node() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);
    join(&fleet, &remote, "web1");
    join(&fleet, &remote, "web2");
    for host in ["web1", "web2"] {
        remote.seed_file(&node(host), &mirrored("stale.txt"));
    }
    remote.clear_calls();

    let failures = fleet.dispatch(&event(&tree, "dist/app.tar.gz", ChangeKind::FileChanged));

    assert_eq!(failures, 0);
    for host in ["web1", "web2"] {
        let ops = remote.ops_for(&node(host));
        assert_eq!(ops.first(), Some(&RemoteOp::ListChildren(REMOTE_ROOT.to_string())));
        assert!(ops.contains(&RemoteOp::Connect));
        assert!(ops.contains(&RemoteOp::Transfer {
            local: tree.archive(),
            remote: mirrored("app.tar.gz"),
        }));
        assert!(remote.entry(&node(host), &mirrored("stale.txt")).is_none());
    }
}

/// SCENARIO: events arriving while the fleet is empty are dropped.
#[test]
fn scenario_events_without_members_are_dropped() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);
    join(&fleet, &remote, "web1");
    fleet.remove_node(&node("web1")).unwrap();
    remote.clear_calls();

    assert_eq!(fleet.dispatch(&event(&tree, "late.txt", ChangeKind::FileAdded)), 0);
    assert!(remote.calls().is_empty());
}
