//! Scenario: Fleet membership over its lifetime
//!
//! Journey: An operator grows a fleet, removes nodes, and finally shuts
//! the whole fleet down while one node is unreachable.
//!
//! Success Criteria:
//! - The watch pipeline starts once, on the first successful join
//! - Membership changes never restart it
//! - Failed teardowns keep the node a member and are reported

use std::fs;
use std::sync::Arc;

use mirrorfleet::infrastructure::remote::{RemoteOp, RemoteOpKind};
use mirrorfleet::{Credentials, Fleet, FleetError, MemoryRemote, NodeState};

use crate::common::*;

/// SCENARIO: the first join starts the pipeline, later joins reuse it.
#[test]
fn scenario_first_join_starts_pipeline_once() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);
    assert_eq!(fleet.pipelines_started(), 0);
    assert!(!fleet.status().pipeline_running);

    join(&fleet, &remote, "web1");
    assert_eq!(fleet.pipelines_started(), 1);

    join(&fleet, &remote, "web2");
    assert_eq!(fleet.pipelines_started(), 1);
    assert_eq!(fleet.len(), 2);

    let status = fleet.status();
    assert!(status.pipeline_running);
    // source root and dist/
    assert_eq!(status.watched_dirs, Some(2));
    assert!(status.nodes.iter().all(|n| n.state == NodeState::Ready));
}

/// SCENARIO: a node that is already a member cannot join twice.
#[test]
fn scenario_duplicate_node_is_rejected_without_contact() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);
    join(&fleet, &remote, "web1");
    remote.clear_calls();

    let err = fleet
        .add_node(node("web1"), REMOTE_ROOT, Credentials::default())
        .unwrap_err();

    assert!(matches!(err, FleetError::DuplicateNode(ref id) if *id == node("web1")));
    assert!(remote.calls().is_empty());
    assert_eq!(fleet.len(), 1);
}

/// SCENARIO: a node that cannot be bootstrapped never becomes a member.
#[test]
fn scenario_failed_bootstrap_leaves_fleet_unchanged() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    provision(&remote, "web1");
    remote.fail(&node("web1"), RemoteOpKind::Execute);
    let fleet = tree.fleet(&remote);

    let err = fleet
        .add_node(node("web1"), REMOTE_ROOT, Credentials::default())
        .unwrap_err();

    assert!(matches!(err, FleetError::Node { .. }));
    assert!(fleet.is_empty());
    assert_eq!(fleet.pipelines_started(), 0);
    assert_eq!(remote.ops_for(&node("web1")).last(), Some(&RemoteOp::Disconnect));
}

/// SCENARIO: emptying and refilling the fleet keeps the same pipeline.
#[test]
fn scenario_refilled_fleet_reuses_pipeline() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);

    join(&fleet, &remote, "web1");
    fleet.remove_node(&node("web1")).unwrap();
    assert!(fleet.is_empty());

    join(&fleet, &remote, "web2");

    assert_eq!(fleet.pipelines_started(), 1);
    assert!(fleet.status().pipeline_running);
    assert_eq!(fleet.node_ids(), vec![node("web2")]);
}

/// SCENARIO: removing a node empties its mirror and drops it.
#[test]
fn scenario_remove_node_tears_mirror_down() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);
    join(&fleet, &remote, "web1");
    join(&fleet, &remote, "web2");
    remote.seed_file(&node("web1"), &mirrored("README.md"));
    remote.seed_file(&node("web1"), &mirrored("lib/core.rs"));

    fleet.remove_node(&node("web1")).unwrap();

    assert_eq!(fleet.node_ids(), vec![node("web2")]);
    assert_eq!(
        remote.paths(&node("web1")),
        vec!["/srv".to_string(), "/srv/mirror".to_string()]
    );
    assert_eq!(remote.ops_for(&node("web1")).last(), Some(&RemoteOp::Disconnect));

    let err = fleet.remove_node(&node("web1")).unwrap_err();
    assert!(matches!(err, FleetError::NodeNotFound(_)));
}

/// SCENARIO: a node whose teardown fails stays a member.
#[test]
fn scenario_remove_node_keeps_node_on_teardown_failure() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);
    join(&fleet, &remote, "web1");
    remote.fail(&node("web1"), RemoteOpKind::ListChildren);

    assert!(fleet.remove_node(&node("web1")).is_err());
    assert!(fleet.contains(&node("web1")));
}

/// SCENARIO: shutdown carries on past an unreachable node.
#[test]
fn scenario_shutdown_reports_nodes_it_could_not_tear_down() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);
    for host in ["n1", "n2", "n3"] {
        join(&fleet, &remote, host);
    }
    remote.fail(&node("n2"), RemoteOpKind::ListChildren);

    let err = fleet.shutdown_fleet().unwrap_err();

    match err {
        FleetError::Shutdown { failed } => assert_eq!(failed, vec![node("n2")]),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fleet.node_ids(), vec![node("n2")]);

    remote.heal(&node("n2"), RemoteOpKind::ListChildren);
    fleet.shutdown_fleet().unwrap();
    assert!(fleet.is_empty());
}

/// SCENARIO: the source root is missing, so the watch cannot start.
#[test]
fn scenario_detector_failure_drops_the_first_node() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("src");
    let archive = root.join("dist").join("app.tar.gz");
    let remote = MemoryRemote::new();
    provision(&remote, "web1");
    let fleet = Fleet::new(&root, &archive, Arc::new(remote.clone()));

    let err = fleet
        .add_node(node("web1"), REMOTE_ROOT, Credentials::default())
        .unwrap_err();

    assert!(matches!(err, FleetError::Detector(_)));
    assert!(fleet.is_empty());
    assert_eq!(fleet.pipelines_started(), 0);
    assert_eq!(remote.ops_for(&node("web1")).last(), Some(&RemoteOp::Disconnect));

    fs::create_dir_all(archive.parent().unwrap()).unwrap();
    fs::write(&archive, "packaged").unwrap();
    join(&fleet, &remote, "web1");
    assert_eq!(fleet.pipelines_started(), 1);
}

/// SCENARIO: stopping the pipeline is final.
#[test]
fn scenario_stopped_pipeline_is_not_restarted() {
    let tree = SourceTree::new();
    let remote = MemoryRemote::new();
    let fleet = tree.fleet(&remote);
    join(&fleet, &remote, "web1");

    fleet.stop();
    assert!(!fleet.status().pipeline_running);

    fleet.remove_node(&node("web1")).unwrap();
    join(&fleet, &remote, "web2");
    assert_eq!(fleet.pipelines_started(), 1);
    assert!(!fleet.status().pipeline_running);
}
