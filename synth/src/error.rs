use thiserror::Error;
use uta_audio::AudioError;
use uta_oto::OtoError;

/// Errors returned by rendering.
#[derive(Debug, Error)]
pub enum SynthError {
    /// A single note failed to render. Rendering stops at the first one.
    #[error("note {index}: {source}")]
    Note {
        index: usize,
        #[source]
        source: Box<SynthError>,
    },

    #[error("note index {index} out of range for {len} notes")]
    NoteOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Oto(#[from] OtoError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("engine error: {0}")]
    Engine(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("track {name:?}: {reason}")]
    Track { name: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SynthError {
    /// Wraps this error with the index of the note that caused it.
    pub fn at_note(self, index: usize) -> Self {
        SynthError::Note {
            index,
            source: Box::new(self),
        }
    }

    /// Index of the failing note, if the error came from a note render.
    pub fn note_index(&self) -> Option<usize> {
        match self {
            SynthError::Note { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// The innermost error, with note context stripped.
    pub fn root(&self) -> &SynthError {
        match self {
            SynthError::Note { source, .. } => source.root(),
            other => other,
        }
    }

    /// Reports whether the error is a timing error from slicing or splicing.
    pub fn is_timing(&self) -> bool {
        match self.root() {
            SynthError::Oto(e) => e.is_timing(),
            SynthError::Audio(e) => e.is_timing(),
            _ => false,
        }
    }
}

/// Result alias for rendering.
pub type Result<T> = std::result::Result<T, SynthError>;
