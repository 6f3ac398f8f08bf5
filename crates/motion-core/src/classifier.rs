//! Single-threaded motion classifier.
//!
//! Turns batches of raw accelerometer readings into three change-driven
//! signals:
//!
//! - **direction**: the momentary acceleration direction of the low-pass
//!   filtered reading, published only when it differs from the previous one;
//! - **movement**: committed once the device comes to rest, naming the
//!   direction that led the displacement since the previous rest period;
//! - **gesture**: a registered direction path matched against the tail of
//!   the movement history.
//!
//! The classifier owns no threads and no locks; the engine runs it on its
//! processing thread and publishes [`Snapshot`]s of it.

use std::collections::VecDeque;
use std::time::Instant;

use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::gesture::GestureSet;
use crate::types::{AccelerationSample, Direction, GestureEvent, MotionEvent, Movement, Snapshot};

/// A run of consecutive classification steps with the same direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionRun {
    pub direction: Direction,
    /// Steps in this run, saturating at the configured maximum.
    pub length: u32,
    /// Set once the run has been consumed as the lead of a movement.
    pub processed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MovementRecord {
    movement: Movement,
    /// Set once the movement has been consumed by a gesture.
    processed: bool,
}

#[derive(Debug, Clone, Copy)]
struct Thresholds {
    filter_alpha: f32,
    axis: f32,
    quiescent: u32,
    max_run: u32,
    history: usize,
}

pub struct MotionClassifier {
    thresholds: Thresholds,
    gestures: GestureSet,

    filtered: [f32; 3],
    last_sample: AccelerationSample,

    runs: VecDeque<DirectionRun>,
    movements: VecDeque<MovementRecord>,

    movement_count: u64,
    gesture_count: u64,
    last_gesture: Option<GestureEvent>,
    steps: u64,
}

impl MotionClassifier {
    pub fn new(config: &EngineConfig, gestures: GestureSet) -> Self {
        let thresholds = Thresholds {
            filter_alpha: config.filter_alpha,
            axis: config.axis_threshold,
            quiescent: config.quiescent_threshold,
            max_run: config.max_run_length,
            history: config.history_length.max(2),
        };

        // Start at rest: one saturated, already consumed still run.
        let mut runs = VecDeque::with_capacity(thresholds.history);
        runs.push_back(DirectionRun {
            direction: Direction::Still,
            length: thresholds.max_run,
            processed: true,
        });
        let mut movements = VecDeque::with_capacity(thresholds.history);
        movements.push_back(MovementRecord {
            movement: Movement::Still,
            processed: true,
        });

        Self {
            thresholds,
            gestures,
            filtered: [0.0; 3],
            last_sample: AccelerationSample::zero(Instant::now()),
            runs,
            movements,
            movement_count: 0,
            gesture_count: 0,
            last_gesture: None,
            steps: 0,
        }
    }

    /// Run one classification step over a batch of readings.
    ///
    /// Every finite reading goes through the low-pass filter; the filtered
    /// value is classified once. Returns the transitions of this step in
    /// order. A batch without any finite reading is skipped and leaves the
    /// state untouched.
    pub fn update(&mut self, readings: &[AccelerationSample]) -> Vec<MotionEvent> {
        let start = Instant::now();
        let a = self.thresholds.filter_alpha;

        let mut latest = None;
        for reading in readings {
            if !reading.is_finite() {
                debug!(?reading, "skipping non-finite reading");
                continue;
            }
            for (f, raw) in self.filtered.iter_mut().zip(reading.as_array()) {
                *f = a * raw + (1.0 - a) * *f;
            }
            latest = Some(reading.timestamp);
        }
        let Some(timestamp) = latest else {
            return Vec::new();
        };

        let [x, y, z] = self.filtered;
        self.last_sample = AccelerationSample::at(x, y, z, timestamp);

        let mut events = Vec::new();
        let direction = self.classify(self.filtered);
        if let Some(changed) = self.commit_direction(direction) {
            events.push(MotionEvent::DirectionChanged(changed));
        }
        if let Some(movement) = self.detect_movement() {
            events.push(MotionEvent::MovementDetected(movement));
            if let Some(gesture) = self.detect_gesture(timestamp) {
                events.push(MotionEvent::GestureDetected(gesture));
            }
        }
        self.steps += 1;

        trace!(
            step = self.steps,
            elapsed_us = start.elapsed().as_micros() as u64,
            events = events.len(),
            "classification step"
        );
        events
    }

    /// Direction of a filtered reading.
    pub fn classify(&self, [x, y, z]: [f32; 3]) -> Direction {
        let t = self.thresholds.axis;
        let positive = |v: f32| v > t;
        let negative = |v: f32| v < -t;

        if [x, y, z].iter().all(|&v| !positive(v) && !negative(v)) {
            Direction::Still
        } else if negative(x) {
            Direction::Left
        } else if positive(x) {
            Direction::Right
        } else if negative(y) {
            Direction::Backward
        } else if positive(y) {
            Direction::Forward
        } else if negative(z) {
            Direction::Down
        } else {
            Direction::Up
        }
    }

    fn commit_direction(&mut self, direction: Direction) -> Option<Direction> {
        let max_run = self.thresholds.max_run;
        if let Some(last) = self.runs.back_mut() {
            if last.direction == direction {
                last.length = (last.length + 1).min(max_run);
                return None;
            }
        }

        if self.runs.len() == self.thresholds.history {
            self.runs.pop_front();
        }
        self.runs.push_back(DirectionRun {
            direction,
            length: 1,
            processed: false,
        });
        Some(direction)
    }

    fn is_quiescent(&self, run: &DirectionRun) -> bool {
        run.direction == Direction::Still && run.length >= self.thresholds.quiescent
    }

    fn detect_movement(&mut self) -> Option<Movement> {
        let newest = self.runs.back()?;
        if newest.processed || !self.is_quiescent(newest) {
            return None;
        }

        // The lead is the run right after the previous rest period. When the
        // bounded history no longer holds that rest period, the oldest run
        // retained stands in for it.
        let mut lead = None;
        for index in (0..self.runs.len() - 1).rev() {
            if self.is_quiescent(&self.runs[index]) {
                break;
            }
            lead = Some(index);
        }
        let lead = &mut self.runs[lead?];
        if lead.processed {
            return None;
        }
        lead.processed = true;
        let direction = lead.direction;
        if direction == Direction::Still {
            return None;
        }

        let movement = Movement::from(direction);
        if self.movements.len() == self.thresholds.history {
            self.movements.pop_front();
        }
        self.movements.push_back(MovementRecord {
            movement,
            processed: false,
        });
        self.movement_count += 1;
        Some(movement)
    }

    fn detect_gesture(&mut self, timestamp: Instant) -> Option<GestureEvent> {
        let mut best: Option<(usize, &str)> = None;
        for gesture in self.gestures.iter() {
            let len = gesture.len();
            if len > self.movements.len() {
                continue;
            }
            let matched = self
                .movements
                .iter()
                .rev()
                .zip(gesture.directions.iter().rev())
                .all(|(record, dir)| !record.processed && record.movement.direction() == *dir);
            if matched && best.map_or(true, |b| (len, gesture.name.as_str()) > b) {
                best = Some((len, gesture.name.as_str()));
            }
        }

        let (len, name) = best?;
        let name = name.to_string();
        for record in self.movements.iter_mut().rev().take(len) {
            record.processed = true;
        }
        self.gesture_count += 1;
        let event = GestureEvent {
            name,
            sequence: self.gesture_count,
            timestamp,
        };
        self.last_gesture = Some(event.clone());
        Some(event)
    }

    pub fn direction(&self) -> Direction {
        self.runs.back().map(|r| r.direction).unwrap_or(Direction::Still)
    }

    pub fn movement(&self) -> Movement {
        self.movements.back().map(|m| m.movement).unwrap_or(Movement::Still)
    }

    pub fn last_gesture(&self) -> Option<&GestureEvent> {
        self.last_gesture.as_ref()
    }

    pub fn last_sample(&self) -> AccelerationSample {
        self.last_sample
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn direction_history(&self) -> impl Iterator<Item = &DirectionRun> {
        self.runs.iter()
    }

    pub fn movement_history(&self) -> impl Iterator<Item = Movement> + '_ {
        self.movements.iter().map(|m| m.movement)
    }

    pub fn snapshot(&self, source_available: bool) -> Snapshot {
        Snapshot {
            sample: self.last_sample,
            direction: self.direction(),
            movement: self.movement(),
            last_gesture: self.last_gesture.clone(),
            movement_count: self.movement_count,
            gesture_count: self.gesture_count,
            sequence: self.steps,
            source_available,
        }
    }
}
