use std::path::PathBuf;

use thiserror::Error;
use uta_audio::AudioError;

/// Errors returned by voicebank operations.
#[derive(Debug, Error)]
pub enum OtoError {
    #[error("line {line}: invalid entry {entry:?}: {reason}")]
    Parse {
        line: usize,
        entry: String,
        reason: String,
    },

    #[error("invalid frq data: {0}")]
    Format(String),

    #[error("alias {0:?} not found in voicebank")]
    NotFound(String),

    #[error("file not found: {0:?}")]
    FileNotFound(PathBuf),

    #[error("sample {alias:?}: {reason}")]
    Timing { alias: String, reason: String },

    #[error("pitch analysis failed: {0}")]
    Analysis(String),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl OtoError {
    /// Attaches a 1-based line number to a parse error.
    pub fn at_line(self, n: usize) -> Self {
        match self {
            OtoError::Parse { entry, reason, .. } => OtoError::Parse {
                line: n,
                entry,
                reason,
            },
            other => other,
        }
    }

    /// Reports whether the error is a timing error, including segment
    /// timing errors raised while slicing.
    pub fn is_timing(&self) -> bool {
        match self {
            OtoError::Timing { .. } => true,
            OtoError::Audio(e) => e.is_timing(),
            _ => false,
        }
    }
}

/// Result alias for voicebank operations.
pub type Result<T> = std::result::Result<T, OtoError>;
