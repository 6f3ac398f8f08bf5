//! Client delivery: push observers and pull polling.
//!
//! Push delivery is exact: every transition reaches the registered
//! [`MotionObserver`] once, in order, on the processing thread. Pull
//! delivery is lossy: a [`Poller`] compares the latest snapshot against
//! what it saw last, so transitions that come and go between two polls are
//! never reported.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::engine::MotionEngine;
use crate::errors::MotionError;
use crate::types::{Direction, GestureEvent, MotionEvent, Movement, Snapshot};

/// Receives classification transitions.
pub trait MotionObserver: Send + Sync {
    fn on_direction_changed(&self, direction: Direction);
    fn on_movement_detected(&self, movement: Movement);
    fn on_gesture_detected(&self, gesture: &GestureEvent);

    fn on_source_unavailable(&self, _reason: &str) {}
}

/// Dispatch one event to the matching observer callback.
pub fn deliver(observer: &dyn MotionObserver, event: &MotionEvent) {
    match event {
        MotionEvent::DirectionChanged(d) => observer.on_direction_changed(*d),
        MotionEvent::MovementDetected(m) => observer.on_movement_detected(*m),
        MotionEvent::GestureDetected(g) => observer.on_gesture_detected(g),
        MotionEvent::SourceUnavailable(reason) => observer.on_source_unavailable(reason),
    }
}

// ============================================================================
// Channel Observer
// ============================================================================

/// Forwards every event into an mpsc channel.
pub struct ChannelObserver {
    tx: Mutex<Sender<MotionEvent>>,
}

impl ChannelObserver {
    pub fn new() -> (Arc<Self>, Receiver<MotionEvent>) {
        let (tx, rx) = mpsc::channel();
        (Arc::new(Self { tx: Mutex::new(tx) }), rx)
    }

    fn send(&self, event: MotionEvent) {
        if self.tx.lock().send(event).is_err() {
            trace!("event receiver dropped");
        }
    }
}

impl MotionObserver for ChannelObserver {
    fn on_direction_changed(&self, direction: Direction) {
        self.send(MotionEvent::DirectionChanged(direction));
    }

    fn on_movement_detected(&self, movement: Movement) {
        self.send(MotionEvent::MovementDetected(movement));
    }

    fn on_gesture_detected(&self, gesture: &GestureEvent) {
        self.send(MotionEvent::GestureDetected(gesture.clone()));
    }

    fn on_source_unavailable(&self, reason: &str) {
        self.send(MotionEvent::SourceUnavailable(reason.to_string()));
    }
}

// ============================================================================
// Poller
// ============================================================================

/// Last values a pull client has seen.
#[derive(Debug, Clone)]
struct LastSeen {
    direction: Direction,
    movement_count: u64,
    gesture_count: u64,
    source_available: bool,
}

impl Default for LastSeen {
    fn default() -> Self {
        Self {
            direction: Direction::Still,
            movement_count: 0,
            gesture_count: 0,
            source_available: true,
        }
    }
}

impl LastSeen {
    fn diff(&mut self, snapshot: &Snapshot) -> Vec<MotionEvent> {
        let mut events = Vec::new();

        if snapshot.direction != self.direction {
            self.direction = snapshot.direction;
            events.push(MotionEvent::DirectionChanged(snapshot.direction));
        }
        if snapshot.movement_count != self.movement_count {
            self.movement_count = snapshot.movement_count;
            events.push(MotionEvent::MovementDetected(snapshot.movement));
        }
        if snapshot.gesture_count != self.gesture_count {
            self.gesture_count = snapshot.gesture_count;
            if let Some(gesture) = &snapshot.last_gesture {
                events.push(MotionEvent::GestureDetected(gesture.clone()));
            }
        }
        if snapshot.source_available != self.source_available {
            self.source_available = snapshot.source_available;
            if !snapshot.source_available {
                events.push(MotionEvent::SourceUnavailable(
                    "sample source unavailable".to_string(),
                ));
            }
        }

        events
    }
}

/// Pull-mode client: reports what changed since its previous poll.
///
/// Directions are compared by value. Movements and gestures are compared
/// by occurrence count, so a repeated movement or gesture between polls is
/// still reported (once).
pub struct Poller {
    engine: Arc<MotionEngine>,
    seen: LastSeen,
}

impl Poller {
    pub fn new(engine: Arc<MotionEngine>) -> Self {
        Self {
            engine,
            seen: LastSeen::default(),
        }
    }

    pub fn poll(&mut self) -> Result<Vec<MotionEvent>, MotionError> {
        let snapshot = self.engine.snapshot()?;
        Ok(self.seen.diff(&snapshot))
    }
}

/// Runs a [`Poller`] on a timer thread, feeding an observer.
///
/// Stops on [`stop`](Self::stop), on drop, or once the engine terminates.
pub struct PollLoop {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PollLoop {
    pub fn spawn(
        engine: Arc<MotionEngine>,
        interval: Duration,
        observer: Arc<dyn MotionObserver>,
    ) -> Result<Self, MotionError> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let mut poller = Poller::new(engine);

        let handle = thread::Builder::new()
            .name("motion-poll".to_string())
            .spawn(move || loop {
                match poller.poll() {
                    Ok(events) => {
                        for event in &events {
                            deliver(observer.as_ref(), event);
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "poll loop stopping");
                        return;
                    }
                }
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => return,
                }
            })
            .map_err(|e| MotionError::InitializationFailure(format!("cannot spawn poll thread: {e}")))?;

        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender wakes the timer wait.
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PollLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}
