//! Raw notification to Change Event classification

use std::path::Path;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};
use tracing::{debug, trace, warn};

use crate::domain::value_objects::{ChangeEvent, ChangeKind};

use super::registry::{WatchFacility, WatchRegistry};

/// Turn one raw notification into zero or more Change Events.
///
/// New directories are registered (with their whole subtree) before their
/// `DirAdded` is returned, so the caller can only enqueue it afterwards.
pub(crate) fn classify<F: WatchFacility>(
    event: &Event,
    registry: &mut WatchRegistry<F>,
) -> Vec<ChangeEvent> {
    if event.need_rescan() {
        warn!(paths = ?event.paths, "change notifications overflowed, events may be lost");
        return Vec::new();
    }

    let mut out = Vec::new();
    match event.kind {
        EventKind::Create(_) => {
            for path in &event.paths {
                created(path, registry, &mut out);
            }
        }
        EventKind::Remove(_) => {
            for path in &event.paths {
                removed(path, registry, &mut out);
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            for path in &event.paths {
                removed(path, registry, &mut out);
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            for path in &event.paths {
                created(path, registry, &mut out);
            }
        }
        // Always preceded by separate From and To notifications
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {}
        // macOS reports both halves of a rename this way
        EventKind::Modify(ModifyKind::Name(_)) => {
            for path in &event.paths {
                if path.exists() {
                    created(path, registry, &mut out);
                } else {
                    removed(path, registry, &mut out);
                }
            }
        }
        EventKind::Modify(_) => {
            for path in &event.paths {
                let kind = if path.is_dir() {
                    ChangeKind::DirChanged
                } else {
                    ChangeKind::FileChanged
                };
                out.push(ChangeEvent::new(path.clone(), kind));
            }
        }
        EventKind::Access(_) | EventKind::Any | EventKind::Other => {
            trace!(kind = ?event.kind, "ignored");
        }
    }
    out
}

fn created<F: WatchFacility>(
    path: &Path,
    registry: &mut WatchRegistry<F>,
    out: &mut Vec<ChangeEvent>,
) {
    registry.revive(path);

    if !path.is_dir() {
        out.push(ChangeEvent::new(path, ChangeKind::FileAdded));
        return;
    }
    if registry.is_registered(path) {
        trace!(dir = %path.display(), "duplicate creation");
        return;
    }
    match registry.register_tree(path) {
        Ok(count) => debug!(dir = %path.display(), count, "registered new directory"),
        // Gone again, or unreadable: the event still goes out
        Err(e) => warn!(dir = %path.display(), error = %e, "could not watch new directory"),
    }
    out.push(ChangeEvent::new(path, ChangeKind::DirAdded));
}

fn removed<F: WatchFacility>(
    path: &Path,
    registry: &mut WatchRegistry<F>,
    out: &mut Vec<ChangeEvent>,
) {
    if registry.retire(path) {
        out.push(ChangeEvent::new(path, ChangeKind::DirDeleted));
    } else if registry.is_retired(path) {
        trace!(path = %path.display(), "deletion under a deleted directory");
    } else {
        out.push(ChangeEvent::new(path, ChangeKind::FileDeleted));
    }
}
