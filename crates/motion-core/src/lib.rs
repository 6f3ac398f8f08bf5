//! Motion Core Library
//!
//! Accelerometer-driven motion recognition for handheld devices.
//!
//! A [`MotionEngine`] consumes readings from a [`SampleSource`] on its own
//! processing thread and maintains three signals:
//!
//! - the current acceleration **direction** (still, left, right, up, down,
//!   forward, backward);
//! - the last committed **movement**, decided once the device rests again;
//! - the last recognized **gesture**, a registered path of movements.
//!
//! Clients either register a [`MotionObserver`] (push, every transition) or
//! poll the latest [`Snapshot`] (pull, latest value only).
//!
//! # Modules
//!
//! - [`types`]: samples, directions, movements, events and snapshots
//! - [`config`]: engine configuration (TOML and environment)
//! - [`gesture`]: gesture definitions
//! - [`classifier`]: the single-threaded classification state machine
//! - [`source`]: sample source abstraction and stock sources
//! - [`engine`]: processing thread and lifecycle
//! - [`bridge`]: push observers and pull polling
//! - [`harness`]: synthetic waveforms and test helpers

#![forbid(unsafe_code)]

pub mod bridge;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod errors;
pub mod gesture;
pub mod harness;
pub mod source;
pub mod types;

pub use bridge::{ChannelObserver, MotionObserver, PollLoop, Poller};
pub use classifier::MotionClassifier;
pub use config::{ConfigError, EngineConfig};
pub use engine::{LifecycleState, MotionEngine};
pub use errors::{MotionError, SourceError};
pub use gesture::{GestureDefinition, GestureError, GestureSet};
pub use source::{
    channel_source, channel_source_with_backlog, ChannelSource, SampleFeeder, SampleSource,
    ScriptedSource, DEFAULT_BACKLOG_HIGH_WATER,
};
pub use types::{AccelerationSample, Direction, GestureEvent, MotionEvent, Movement, Snapshot};
