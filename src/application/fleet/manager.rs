//! Fleet Manager
//!
//! Owns node membership. The first successful `add_node` starts the change
//! detector and the propagation engine; they keep running for the life of
//! the fleet, even if it later empties.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::domain::ports::{Credentials, RemoteConnector};
use crate::domain::value_objects::{ChangeEvent, NodeId};
use crate::error::{FleetError, FleetResult};
use crate::watcher::{event_queue, ChangeDetector, DetectorHandle};

use super::engine::{self, plan, propagate, FleetLayout};
use super::node::Node;
use super::status::{FleetStatus, NodeStatus};

/// Detector and engine started on the first membership.
struct Pipeline {
    detector: DetectorHandle,
    engine: JoinHandle<()>,
}

/// Everything guarded by the fleet lock.
pub(crate) struct Members {
    /// Keyed by identity; iteration order is the fan-out order.
    nodes: BTreeMap<NodeId, Node>,
    pipeline: Option<Pipeline>,
}

/// State shared between the fleet handle and its propagation engine.
pub(crate) struct FleetShared {
    layout: FleetLayout,
    members: Mutex<Members>,
}

impl FleetShared {
    fn lock(&self) -> MutexGuard<'_, Members> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one event to every current member, holding the lock throughout.
    pub(crate) fn dispatch(&self, event: &ChangeEvent) -> usize {
        let Some(action) = plan(event, &self.layout) else {
            debug!(%event, "nothing to propagate");
            return 0;
        };

        let mut members = self.lock();
        debug!(%event, nodes = members.nodes.len(), "propagating");
        propagate(action, event.path(), members.nodes.values_mut())
    }
}

/// A set of nodes mirroring one local root, bootstrapped from one archive.
pub struct Fleet {
    shared: Arc<FleetShared>,
    connector: Arc<dyn RemoteConnector>,
    pipelines_started: AtomicUsize,
}

impl Fleet {
    pub fn new(
        local_root: impl Into<PathBuf>,
        archive: impl Into<PathBuf>,
        connector: Arc<dyn RemoteConnector>,
    ) -> Self {
        Self {
            shared: Arc::new(FleetShared {
                layout: FleetLayout::new(local_root, archive),
                members: Mutex::new(Members {
                    nodes: BTreeMap::new(),
                    pipeline: None,
                }),
            }),
            connector,
            pipelines_started: AtomicUsize::new(0),
        }
    }

    pub fn layout(&self) -> &FleetLayout {
        &self.shared.layout
    }

    /// Bootstrap a node from the archive and make it a member.
    ///
    /// Rejects an identity that is already a member. The first member to
    /// join starts the change detector and the propagation engine; if the
    /// detector cannot start, the node is dropped again.
    pub fn add_node(
        &self,
        id: NodeId,
        remote_root: &str,
        credentials: Credentials,
    ) -> FleetResult<()> {
        let layout = &self.shared.layout;
        let mut members = self.shared.lock();

        if members.nodes.contains_key(&id) {
            warn!(node = %id, "duplicate node rejected");
            return Err(FleetError::DuplicateNode(id));
        }

        let mut node = Node::new(
            id.clone(),
            remote_root,
            layout.local_root(),
            credentials,
            Arc::clone(&self.connector),
        )
        .map_err(|source| FleetError::Node {
            node: id.clone(),
            source,
        })?;

        info!(node = %id, root = %node.remote_root(), "bootstrapping node");
        if let Err(source) = node.initialize(layout.archive()) {
            node.disconnect();
            warn!(node = %id, error = %source, "bootstrap failed");
            return Err(FleetError::Node { node: id, source });
        }

        let first = members.nodes.is_empty();
        members.nodes.insert(id.clone(), node);

        if first && self.pipelines_started.load(Ordering::SeqCst) == 0 {
            match self.start_pipeline() {
                Ok(pipeline) => members.pipeline = Some(pipeline),
                Err(e) => {
                    if let Some(mut node) = members.nodes.remove(&id) {
                        node.disconnect();
                    }
                    warn!(node = %id, error = %e, "pipeline failed to start, node dropped");
                    return Err(e);
                }
            }
        }

        info!(node = %id, members = members.nodes.len(), "node added");
        Ok(())
    }

    /// Tear a node's mirror down and drop it from the fleet.
    ///
    /// The node stays a member if the teardown fails.
    pub fn remove_node(&self, id: &NodeId) -> FleetResult<()> {
        let mut members = self.shared.lock();
        let node = members
            .nodes
            .get_mut(id)
            .ok_or_else(|| FleetError::NodeNotFound(id.clone()))?;

        node.destroy().map_err(|source| {
            warn!(node = %id, error = %source, "teardown failed, node kept");
            FleetError::Node {
                node: id.clone(),
                source,
            }
        })?;

        if let Some(mut node) = members.nodes.remove(id) {
            node.disconnect();
        }
        info!(node = %id, members = members.nodes.len(), "node removed");
        Ok(())
    }

    /// Destroy and remove every member, carrying on past failures.
    ///
    /// Nodes whose teardown failed remain members and are listed in the error.
    pub fn shutdown_fleet(&self) -> FleetResult<()> {
        let mut members = self.shared.lock();
        let ids: Vec<NodeId> = members.nodes.keys().cloned().collect();
        let mut failed = Vec::new();

        for id in ids {
            let Some(node) = members.nodes.get_mut(&id) else {
                continue;
            };
            match node.destroy() {
                Ok(()) => {
                    if let Some(mut node) = members.nodes.remove(&id) {
                        node.disconnect();
                    }
                }
                Err(e) => {
                    warn!(node = %id, error = %e, "teardown failed during shutdown");
                    failed.push(id);
                }
            }
        }

        if failed.is_empty() {
            info!("fleet shut down");
            Ok(())
        } else {
            Err(FleetError::Shutdown { failed })
        }
    }

    /// Apply one change event to every current member.
    ///
    /// This is what the propagation engine does for each queued event;
    /// returns the number of nodes that failed.
    pub fn dispatch(&self, event: &ChangeEvent) -> usize {
        self.shared.dispatch(event)
    }

    /// Stop the detector, then wait for the engine to drain the queue.
    ///
    /// A stopped pipeline is never started again for this fleet.
    pub fn stop(&self) {
        // Joined outside the lock: the engine needs it to finish draining
        let pipeline = self.shared.lock().pipeline.take();
        if let Some(pipeline) = pipeline {
            pipeline.detector.join();
            if pipeline.engine.join().is_err() {
                warn!("propagation engine panicked");
            }
            info!("pipeline stopped");
        }
    }

    pub fn len(&self) -> usize {
        self.shared.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.shared.lock().nodes.contains_key(id)
    }

    /// Member identities in fan-out order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.shared.lock().nodes.keys().cloned().collect()
    }

    /// How many times the detector/engine pair has been constructed.
    pub fn pipelines_started(&self) -> usize {
        self.pipelines_started.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> FleetStatus {
        let members = self.shared.lock();
        let pipeline = members
            .pipeline
            .as_ref()
            .filter(|p| p.detector.is_running());
        FleetStatus {
            local_root: self.shared.layout.local_root().to_path_buf(),
            archive: self.shared.layout.archive().to_path_buf(),
            pipeline_running: pipeline.is_some(),
            watched_dirs: pipeline.map(|p| p.detector.watched_dirs()),
            nodes: members
                .nodes
                .values()
                .map(|node| NodeStatus {
                    id: node.id().clone(),
                    remote_root: node.remote_root().to_string(),
                    state: node.state(),
                })
                .collect(),
        }
    }

    fn start_pipeline(&self) -> FleetResult<Pipeline> {
        let layout = &self.shared.layout;
        let (tx, rx) = event_queue();
        let detector = ChangeDetector::start(layout.local_root(), layout.archive_dir(), tx)?;

        let shared = Arc::clone(&self.shared);
        let engine = thread::Builder::new()
            .name("propagation-engine".to_string())
            .spawn(move || engine::run(rx, shared))
            .map_err(FleetError::Engine)?;

        self.pipelines_started.fetch_add(1, Ordering::SeqCst);
        Ok(Pipeline { detector, engine })
    }
}

impl Drop for Fleet {
    fn drop(&mut self) {
        self.stop();
    }
}
