//! Error types for the motion engine.
//!
//! Lifecycle and resource errors propagate to the caller of the failing
//! operation. Classification-internal problems (a malformed reading, a
//! transient source glitch) never reach this layer: the processing thread
//! skips the input and keeps its previous state.

use thiserror::Error;

use crate::config::ConfigError;

// ============================================================================
// Source Errors
// ============================================================================

/// Errors reported by a [`SampleSource`](crate::source::SampleSource).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SourceError {
    /// The sensor cannot produce readings (denied, missing, disconnected).
    #[error("sample source unavailable: {0}")]
    Unavailable(String),

    /// A single read failed; the next read may succeed.
    #[error("sample source glitch: {0}")]
    Glitch(String),
}

// ============================================================================
// Engine Errors
// ============================================================================

/// Unified error type for engine operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MotionError {
    /// The processing context or a required resource could not be created.
    #[error("engine initialization failed: {0}")]
    InitializationFailure(String),

    /// Operation issued before the engine was ready or after it terminated.
    #[error("engine not available")]
    NotReady,

    /// The sample source could not be opened or (re)enabled.
    #[error("sample source unavailable: {0}")]
    SourceUnavailable(String),

    /// The source kept failing transiently while being enabled or disabled.
    #[error("sample source glitch: {0}")]
    SourceGlitch(String),

    /// A lifecycle operation was issued from an observer callback.
    #[error("lifecycle operation called from an observer callback")]
    ReentrantCall,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl MotionError {
    /// Whether the error means the engine handle is unusable.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, MotionError::NotReady)
    }
}

impl From<SourceError> for MotionError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Unavailable(reason) => MotionError::SourceUnavailable(reason),
            SourceError::Glitch(reason) => MotionError::SourceGlitch(reason),
        }
    }
}
