//! Error types for Android platform

use motion_core::MotionError;
use thiserror::Error;

/// Motion Android platform errors
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Engine error: {0}")]
    Engine(#[from] MotionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JNI error: {0}")]
    Jni(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl PlatformError {
    /// Java exception class thrown for this error.
    pub fn exception_class(&self) -> &'static str {
        match self {
            PlatformError::Engine(e) if e.is_not_ready() => "java/lang/IllegalStateException",
            _ => "java/lang/RuntimeException",
        }
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(e: serde_json::Error) -> Self {
        PlatformError::Config(format!("JSON error: {}", e))
    }
}

impl From<jni::errors::Error> for PlatformError {
    fn from(e: jni::errors::Error) -> Self {
        PlatformError::Jni(e.to_string())
    }
}
