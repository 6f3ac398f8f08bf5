//! Synthetic motion and test helpers.
//!
//! Waveforms model a hand movement as an acceleration pulse along one axis
//! followed by the matching deceleration and a rest period, which is what
//! the default filter and thresholds are tuned for.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::bridge::MotionObserver;
use crate::engine::MotionEngine;
use crate::errors::MotionError;
use crate::gesture::{GestureDefinition, GestureError};
use crate::types::{Direction, GestureEvent, MotionEvent, Movement, Snapshot};

/// Peak acceleration of a synthetic movement, in m/s².
pub const PULSE_AMPLITUDE: f32 = 8.0;
/// Samples spent accelerating, and again decelerating.
pub const PULSE_SAMPLES: usize = 20;
/// Rest samples after each movement.
pub const REST_SAMPLES: usize = 50;

/// One movement: accelerate along `direction`, decelerate, then rest.
pub fn movement_waveform(direction: Direction) -> Vec<[f32; 3]> {
    let axis = direction.axis();
    let scaled = |k: f32| [axis[0] * k, axis[1] * k, axis[2] * k];

    let mut samples = Vec::with_capacity(2 * PULSE_SAMPLES + REST_SAMPLES);
    samples.extend(std::iter::repeat(scaled(PULSE_AMPLITUDE)).take(PULSE_SAMPLES));
    samples.extend(std::iter::repeat(scaled(-PULSE_AMPLITUDE)).take(PULSE_SAMPLES));
    samples.extend(std::iter::repeat([0.0; 3]).take(REST_SAMPLES));
    samples
}

/// Consecutive movements tracing `path`.
pub fn gesture_waveform(path: &[Direction]) -> Vec<[f32; 3]> {
    path.iter().copied().flat_map(movement_waveform).collect()
}

/// Waveform for a path string such as `"RDLDR"`.
pub fn script_from_path(path: &str) -> Result<Vec<[f32; 3]>, GestureError> {
    let def = GestureDefinition::parse("script", path)?;
    Ok(gesture_waveform(&def.directions))
}

/// Poll the engine until `done` holds for its snapshot, or the deadline passes.
pub fn wait_for(
    engine: &MotionEngine,
    timeout: Duration,
    mut done: impl FnMut(&Snapshot) -> bool,
) -> Result<Snapshot, MotionError> {
    let deadline = Instant::now() + timeout;
    loop {
        let snapshot = engine.snapshot()?;
        if done(&snapshot) || Instant::now() >= deadline {
            return Ok(snapshot);
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Wait until at least `sequence` classification steps have completed.
pub fn wait_for_sequence(
    engine: &MotionEngine,
    sequence: u64,
    timeout: Duration,
) -> Result<Snapshot, MotionError> {
    wait_for(engine, timeout, |s| s.sequence >= sequence)
}

/// Observer that records everything it is told.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<MotionEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MotionEvent> {
        self.events.lock().clone()
    }

    pub fn directions(&self) -> Vec<Direction> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                MotionEvent::DirectionChanged(d) => Some(*d),
                _ => None,
            })
            .collect()
    }

    pub fn movements(&self) -> Vec<Movement> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                MotionEvent::MovementDetected(m) => Some(*m),
                _ => None,
            })
            .collect()
    }

    pub fn gestures(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                MotionEvent::GestureDetected(g) => Some(g.name.clone()),
                _ => None,
            })
            .collect()
    }
}

impl MotionObserver for RecordingObserver {
    fn on_direction_changed(&self, direction: Direction) {
        self.events.lock().push(MotionEvent::DirectionChanged(direction));
    }

    fn on_movement_detected(&self, movement: Movement) {
        self.events.lock().push(MotionEvent::MovementDetected(movement));
    }

    fn on_gesture_detected(&self, gesture: &GestureEvent) {
        self.events.lock().push(MotionEvent::GestureDetected(gesture.clone()));
    }

    fn on_source_unavailable(&self, reason: &str) {
        self.events.lock().push(MotionEvent::SourceUnavailable(reason.to_string()));
    }
}
