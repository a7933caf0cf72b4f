use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use mirrorfleet::config::{self, NodeConfig};
use mirrorfleet::{Fleet, FleetError, MemoryRemote, NodeSpec, RemoteConnector, RemoteRoot, SshConnector};
use tracing::{error, info};
use walkdir::WalkDir;

pub fn cmd_run(config: Option<&Path>, extra_nodes: Vec<NodeSpec>, dry_run: bool, json: bool) -> Result<()> {
    let loaded = config::resolve(config)?;
    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }

    let mut config = loaded.config;
    config
        .nodes
        .extend(extra_nodes.into_iter().map(NodeConfig::from));
    if config.nodes.is_empty() {
        bail!("no nodes configured: add [[nodes]] to {} or pass --node", loaded.path.display());
    }

    let connector: Arc<dyn RemoteConnector> = if dry_run {
        Arc::new(simulated_remote(&config.local_root, &config.nodes))
    } else {
        Arc::new(SshConnector::new(config.ssh.ssh_options()))
    };

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })
    .context("could not install the Ctrl+C handler")?;

    let fleet = Fleet::new(&config.local_root, &config.local_archive, connector);

    let mut failed_joins = 0;
    for node in &config.nodes {
        match fleet.add_node(node.id(), &node.remote_root, node.credentials(&config.ssh)) {
            Ok(()) => {}
            Err(e @ FleetError::Detector(_)) => return Err(e.into()),
            Err(e) => {
                error!(error = %e, "node could not join");
                failed_joins += 1;
            }
        }
    }

    print_status(&fleet, json);
    if fleet.is_empty() {
        bail!("no node could be bootstrapped");
    }

    info!("mirroring, press Ctrl+C to stop");
    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }

    info!("shutting down");
    let shutdown = fleet.shutdown_fleet();
    fleet.stop();
    print_status(&fleet, json);

    shutdown?;
    if failed_joins > 0 {
        bail!("{} node(s) failed to join the fleet", failed_joins);
    }
    Ok(())
}

fn print_status(fleet: &Fleet, json: bool) {
    let status = fleet.status();
    if json {
        println!("{}", status.to_json());
    } else {
        println!("{}", status);
    }
}

/// Remote side for `--dry-run`: every node starts with its root and the
/// local directory layout beneath it, standing in for the extracted archive.
fn simulated_remote(local_root: &Path, nodes: &[NodeConfig]) -> MemoryRemote {
    let remote = MemoryRemote::announcing();
    let dirs: Vec<_> = WalkDir::new(local_root)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect();

    for node in nodes {
        let Ok(root) = RemoteRoot::new(node.remote_root.as_str()) else {
            continue;
        };
        let id = node.id();
        remote.seed_dir(&id, root.as_str());
        for dir in &dirs {
            if let Ok(mirror) = root.mirror_of(local_root, dir) {
                remote.seed_dir(&id, &mirror);
            }
        }
    }
    remote
}
