use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by segment operations.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to decode audio: {0}")]
    Decode(String),

    #[error("failed to decode {path:?}: {reason}")]
    DecodeFile { path: PathBuf, reason: String },

    #[error("failed to encode audio: {0}")]
    Encode(String),

    #[error("crossfade of {crossfade_ms}ms is longer than segment ({len_ms}ms)")]
    CrossfadeTooLong { crossfade_ms: f64, len_ms: u64 },

    #[error("gain must not be positive, got {0}dB")]
    PositiveGain(f64),

    #[error("start must be earlier than end: {start_ms}ms >= {end_ms}ms")]
    EmptyWindow { start_ms: f64, end_ms: f64 },

    #[error("unsupported channel count: {0}")]
    Channels(u16),

    #[error("resample error: {0}")]
    Resample(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AudioError {
    /// Reports whether the error comes from invalid timing arguments
    /// (crossfade length, fade gains or an empty fade window).
    pub fn is_timing(&self) -> bool {
        matches!(
            self,
            AudioError::CrossfadeTooLong { .. }
                | AudioError::PositiveGain(_)
                | AudioError::EmptyWindow { .. }
        )
    }
}

impl From<rubato::ResamplerConstructionError> for AudioError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        AudioError::Resample(e.to_string())
    }
}

impl From<rubato::ResampleError> for AudioError {
    fn from(e: rubato::ResampleError) -> Self {
        AudioError::Resample(e.to_string())
    }
}

impl From<hound::Error> for AudioError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(e) => AudioError::Io(e),
            other => AudioError::Decode(other.to_string()),
        }
    }
}

/// Result alias for segment operations.
pub type Result<T> = std::result::Result<T, AudioError>;
