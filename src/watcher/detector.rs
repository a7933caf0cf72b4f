//! Change Detector background task

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, Watcher};
use tracing::{debug, info, warn};

use crate::error::DetectorError;

use super::classify::classify;
use super::queue::EventSender;
use super::registry::{WatchFacility, WatchRegistry};

/// How long the loop waits for a notification before re-checking the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

type Registry<F> = Arc<Mutex<WatchRegistry<F>>>;

/// Recursive watcher over the source root and the archive's directory.
pub struct ChangeDetector;

impl ChangeDetector {
    /// Register every directory under `source_root` plus `archive_dir`, then
    /// start emitting Change Events into `events` from a background thread.
    pub fn start(
        source_root: &Path,
        archive_dir: &Path,
        events: EventSender,
    ) -> Result<DetectorHandle, DetectorError> {
        let (raw_tx, raw_rx) = mpsc::channel();
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = raw_tx.send(res);
            },
            Config::default(),
        )
        .map_err(DetectorError::WatchService)?;

        let mut registry = WatchRegistry::new(watcher);
        registry.register_tree(source_root)?;
        registry.register_dir(archive_dir)?;
        info!(
            root = %source_root.display(),
            archive_dir = %archive_dir.display(),
            dirs = registry.len(),
            "change detector started"
        );

        spawn(registry, raw_rx, events)
    }
}

/// Run the event loop over an already populated registry.
pub(crate) fn spawn<F: WatchFacility + 'static>(
    registry: WatchRegistry<F>,
    raw: Receiver<notify::Result<Event>>,
    events: EventSender,
) -> Result<DetectorHandle<F>, DetectorError> {
    let registry = Arc::new(Mutex::new(registry));
    let running = Arc::new(AtomicBool::new(true));

    let thread = thread::Builder::new()
        .name("change-detector".to_string())
        .spawn({
            let registry = Arc::clone(&registry);
            let running = Arc::clone(&running);
            move || event_loop(raw, registry, events, running)
        })
        .map_err(DetectorError::Spawn)?;

    Ok(DetectorHandle {
        running,
        registry,
        thread: Some(thread),
    })
}

fn lock<F>(registry: &Mutex<WatchRegistry<F>>) -> MutexGuard<'_, WatchRegistry<F>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

fn event_loop<F: WatchFacility>(
    raw: Receiver<notify::Result<Event>>,
    registry: Registry<F>,
    events: EventSender,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::SeqCst) {
        match raw.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(event)) => {
                // Registration of new directories happens inside classify,
                // under the registration lock and before anything is enqueued
                let changes = classify(&event, &mut lock(&registry));
                for change in changes {
                    debug!(%change, "detected");
                    if !events.put(change) {
                        info!("event queue closed, change detector exiting");
                        return;
                    }
                }
                if lock(&registry).is_empty() {
                    warn!("no watched directories left, change detector exiting");
                    return;
                }
            }
            Ok(Err(e)) => warn!(error = %e, "watch error"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    info!("change detector stopped");
}

/// Control handle of a running detector.
///
/// Dropping the handle signals the loop to stop without waiting for it.
pub struct DetectorHandle<F = RecommendedWatcher> {
    running: Arc<AtomicBool>,
    registry: Registry<F>,
    thread: Option<JoinHandle<()>>,
}

impl<F> DetectorHandle<F> {
    /// Ask the loop to exit at its next poll.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Stop and wait for the loop to exit.
    pub fn join(mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("change detector thread panicked");
            }
        }
    }

    /// Whether the background loop is still alive.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Number of directories currently registered.
    pub fn watched_dirs(&self) -> usize {
        lock(&self.registry).len()
    }
}

impl<F> Drop for DetectorHandle<F> {
    fn drop(&mut self) {
        self.stop();
    }
}
