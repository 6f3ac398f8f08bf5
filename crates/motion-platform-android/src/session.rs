//! Motion session: one engine fed by the Android sensor listener.
//!
//! The Java side registers a `SensorEventListener` and forwards each
//! accelerometer event through `nativeFeedSample`; everything behind that
//! call is plain Rust and runs on the host as well.

use std::sync::Arc;

use tracing::info;

use motion_core::{
    channel_source, EngineConfig, LifecycleState, MotionEngine, MotionObserver, SampleFeeder,
};

use crate::error::PlatformError;

/// Parse the JSON engine configuration handed over by the application.
///
/// Missing keys keep their defaults; an empty string means all defaults.
pub fn parse_config(json: &str) -> Result<EngineConfig, PlatformError> {
    let config = if json.trim().is_empty() {
        EngineConfig::default()
    } else {
        serde_json::from_str::<EngineConfig>(json)?
    };
    config
        .validate()
        .map_err(|e| PlatformError::Config(e.to_string()))?;
    Ok(config)
}

pub struct MotionSession {
    engine: MotionEngine,
    feeder: SampleFeeder,
}

impl MotionSession {
    /// Construct the engine; blocks until its processing thread is ready.
    pub fn new(config_json: &str, gesture_toml: &str) -> Result<Self, PlatformError> {
        let config = parse_config(config_json)?;
        let (feeder, source) = channel_source();
        let engine = MotionEngine::construct_with_document(config, gesture_toml, source)?;
        info!("motion session created");
        Ok(Self { engine, feeder })
    }

    pub fn state(&self) -> LifecycleState {
        self.engine.state()
    }

    pub fn resume(&self) -> Result<(), PlatformError> {
        Ok(self.engine.resume()?)
    }

    pub fn pause(&self) -> Result<(), PlatformError> {
        Ok(self.engine.pause()?)
    }

    pub fn terminate(&self) -> Result<(), PlatformError> {
        Ok(self.engine.terminate()?)
    }

    /// Forward one accelerometer reading, in m/s².
    pub fn feed(&self, x: f32, y: f32, z: f32) -> Result<(), PlatformError> {
        if !self.engine.state().is_live() {
            return Err(motion_core::MotionError::NotReady.into());
        }
        self.feeder
            .feed_xyz(x, y, z)
            .map_err(|e| PlatformError::Engine(e.into()))
    }

    /// Filtered reading behind the current classification.
    pub fn last_readings(&self) -> Result<[f32; 3], PlatformError> {
        Ok(self.engine.snapshot()?.sample.as_array())
    }

    pub fn direction_label(&self) -> Result<String, PlatformError> {
        Ok(self.engine.direction()?.label().to_string())
    }

    pub fn movement_label(&self) -> Result<String, PlatformError> {
        Ok(self.engine.movement()?.label().to_string())
    }

    /// Name of the last gesture, empty when none has been recognized.
    pub fn gesture_label(&self) -> Result<String, PlatformError> {
        Ok(self.engine.snapshot()?.gesture_label().to_string())
    }

    /// Install the push handler, or remove it with `None`.
    pub fn set_observer(&self, observer: Option<Arc<dyn MotionObserver>>) -> Result<(), PlatformError> {
        match observer {
            Some(observer) => self.engine.register_observer(observer)?,
            None => {
                self.engine.unregister_observer()?;
            }
        }
        Ok(())
    }

    pub fn engine(&self) -> &MotionEngine {
        &self.engine
    }
}
