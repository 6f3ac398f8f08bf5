//! Value types shared by the classifier, the engine and its clients.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

// ============================================================================
// Samples
// ============================================================================

/// One 3-axis linear acceleration reading (m/s^2) with its capture instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelerationSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub timestamp: Instant,
}

impl AccelerationSample {
    /// Create a sample stamped with the current instant.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self::at(x, y, z, Instant::now())
    }

    /// Create a sample with an explicit timestamp.
    pub fn at(x: f32, y: f32, z: f32, timestamp: Instant) -> Self {
        Self { x, y, z, timestamp }
    }

    /// A zero reading, used before the first sample arrives.
    pub fn zero(timestamp: Instant) -> Self {
        Self::at(0.0, 0.0, 0.0, timestamp)
    }

    /// Whether every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn as_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

// ============================================================================
// Direction
// ============================================================================

/// Momentary acceleration direction of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Still,
    Left,
    Right,
    Up,
    Down,
    Forward,
    Backward,
}

impl Direction {
    /// Every non-still direction, in path-letter order.
    pub const MOVING: [Direction; 6] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
        Direction::Forward,
        Direction::Backward,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Direction::Still => "still",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }

    /// Parse a gesture path letter (`L R U D F B`, case-insensitive).
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'L' => Some(Direction::Left),
            'R' => Some(Direction::Right),
            'U' => Some(Direction::Up),
            'D' => Some(Direction::Down),
            'F' => Some(Direction::Forward),
            'B' => Some(Direction::Backward),
            _ => None,
        }
    }

    /// Path letter for this direction; `Still` has none.
    pub fn letter(self) -> Option<char> {
        match self {
            Direction::Still => None,
            Direction::Left => Some('L'),
            Direction::Right => Some('R'),
            Direction::Up => Some('U'),
            Direction::Down => Some('D'),
            Direction::Forward => Some('F'),
            Direction::Backward => Some('B'),
        }
    }

    /// Unit vector along the axis this direction points to.
    pub fn axis(self) -> [f32; 3] {
        match self {
            Direction::Still => [0.0, 0.0, 0.0],
            Direction::Left => [-1.0, 0.0, 0.0],
            Direction::Right => [1.0, 0.0, 0.0],
            Direction::Backward => [0.0, -1.0, 0.0],
            Direction::Forward => [0.0, 1.0, 0.0],
            Direction::Down => [0.0, 0.0, -1.0],
            Direction::Up => [0.0, 0.0, 1.0],
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Movement
// ============================================================================

/// Coarse motion class: a completed displacement between two rest periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Movement {
    Still,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    MoveForward,
    MoveBackward,
}

impl Movement {
    pub fn label(self) -> &'static str {
        match self {
            Movement::Still => "still",
            Movement::MoveLeft => "move-left",
            Movement::MoveRight => "move-right",
            Movement::MoveUp => "move-up",
            Movement::MoveDown => "move-down",
            Movement::MoveForward => "move-forward",
            Movement::MoveBackward => "move-backward",
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Movement::Still => Direction::Still,
            Movement::MoveLeft => Direction::Left,
            Movement::MoveRight => Direction::Right,
            Movement::MoveUp => Direction::Up,
            Movement::MoveDown => Direction::Down,
            Movement::MoveForward => Direction::Forward,
            Movement::MoveBackward => Direction::Backward,
        }
    }
}

impl From<Direction> for Movement {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Still => Movement::Still,
            Direction::Left => Movement::MoveLeft,
            Direction::Right => Movement::MoveRight,
            Direction::Up => Movement::MoveUp,
            Direction::Down => Movement::MoveDown,
            Direction::Forward => Movement::MoveForward,
            Direction::Backward => Movement::MoveBackward,
        }
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Gestures and events
// ============================================================================

/// One recognized gesture occurrence.
///
/// Gestures are events, not state: each occurrence carries its own
/// `sequence` number so two consecutive occurrences of the same gesture
/// remain distinguishable.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureEvent {
    pub name: String,
    /// 1-based count of gestures recognized since engine start.
    pub sequence: u64,
    pub timestamp: Instant,
}

impl fmt::Display for GestureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.sequence, self.name)
    }
}

/// A classification transition, as delivered to clients.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionEvent {
    DirectionChanged(Direction),
    MovementDetected(Movement),
    GestureDetected(GestureEvent),
    SourceUnavailable(String),
}

impl MotionEvent {
    pub fn label(&self) -> String {
        match self {
            MotionEvent::DirectionChanged(d) => d.label().to_string(),
            MotionEvent::MovementDetected(m) => m.label().to_string(),
            MotionEvent::GestureDetected(g) => g.name.clone(),
            MotionEvent::SourceUnavailable(reason) => reason.clone(),
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Latest published classification state.
///
/// Published as a whole after each classification step, so every field
/// belongs to the same step.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Filtered reading the current classification was computed from.
    pub sample: AccelerationSample,
    pub direction: Direction,
    pub movement: Movement,
    pub last_gesture: Option<GestureEvent>,
    pub movement_count: u64,
    pub gesture_count: u64,
    /// Number of completed classification steps.
    pub sequence: u64,
    pub source_available: bool,
}

impl Snapshot {
    pub fn initial(now: Instant) -> Self {
        Self {
            sample: AccelerationSample::zero(now),
            direction: Direction::Still,
            movement: Movement::Still,
            last_gesture: None,
            movement_count: 0,
            gesture_count: 0,
            sequence: 0,
            source_available: true,
        }
    }

    /// Label of the last gesture, empty when none has occurred.
    pub fn gesture_label(&self) -> &str {
        self.last_gesture.as_ref().map(|g| g.name.as_str()).unwrap_or("")
    }
}
