//! Motion Platform Android - Rust library for the Android motion demo
//!
//! This crate provides JNI bindings to expose the motion engine to the
//! `net.qfstudio.motion.MotionLib` Java class. Sensor readings are pushed
//! in from Java; classification results are either polled or delivered to
//! a `MotionLibEventHandler`.

mod error;
mod session;

pub use error::PlatformError;
pub use session::{parse_config, MotionSession};

// JNI bindings - only compile on Android targets
#[cfg(target_os = "android")]
mod jni_bindings;
