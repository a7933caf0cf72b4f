//! Event Queue
//!
//! Unbounded FIFO between the Change Detector (single producer) and the
//! Propagation Engine (single consumer). Sending never blocks.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use crate::domain::value_objects::ChangeEvent;

/// Producer half, owned by the detector.
#[derive(Debug)]
pub struct EventSender(mpsc::Sender<ChangeEvent>);

/// Consumer half, owned by the propagation engine.
#[derive(Debug)]
pub struct EventReceiver(mpsc::Receiver<ChangeEvent>);

/// Create a connected queue.
pub fn event_queue() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel();
    (EventSender(tx), EventReceiver(rx))
}

impl EventSender {
    /// Enqueue an event; `false` once the consumer is gone.
    pub fn put(&self, event: ChangeEvent) -> bool {
        self.0.send(event).is_ok()
    }
}

impl EventReceiver {
    /// Block until an event arrives; `None` once the producer is gone and
    /// the queue is drained.
    pub fn take(&self) -> Option<ChangeEvent> {
        self.0.recv().ok()
    }

    /// Like `take`, giving up after `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> Option<ChangeEvent> {
        match self.0.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}
