//! Change Detector and Event Queue
//!
//! Watches the source root (and the archive's directory) with one
//! non-recursive watch per directory and turns raw notifications into
//! Change Events:
//! - New directories are registered before their event is enqueued
//! - Deleted directories are recognised from the registration set
//! - Overflow notifications are logged and dropped

mod classify;
mod detector;
mod queue;
mod registry;

pub use detector::{ChangeDetector, DetectorHandle};
pub use queue::{event_queue, EventReceiver, EventSender};
pub use registry::{WatchFacility, WatchRegistry};
