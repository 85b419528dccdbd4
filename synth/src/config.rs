//! Project configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uta_audio::Format;

use crate::dsp::StretchMode;
use crate::engine::DefaultEngine;
use crate::error::{Result, SynthError};
use crate::pool;

/// Default output sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Rendering settings of a project.
///
/// Loaded from YAML (or JSON, which YAML parses too); every field is
/// optional:
///
/// ```yaml
/// name: twinkle
/// author: someone
/// voicebank: ./voice
/// sample_rate: 44100
/// workers: 4
/// stretch: loop
/// crossfade_ms: 10
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub author: String,

    /// Voicebank directory. Relative paths are resolved against the project
    /// file's directory.
    pub voicebank: PathBuf,

    /// Output sample rate in Hz.
    pub sample_rate: u32,

    /// Maximum number of notes rendered at once.
    pub workers: usize,

    /// How vowels are stretched to fit their notes.
    pub stretch: StretchMode,

    /// Crossfade between each consonant and its vowel.
    pub crossfade_ms: f64,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            author: String::new(),
            voicebank: PathBuf::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            workers: pool::default_workers(),
            stretch: StretchMode::default(),
            crossfade_ms: 0.0,
        }
    }
}

impl ProjectConfig {
    /// Parses and validates a configuration.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::from_yaml(&std::fs::read_to_string(path)?)?;
        config.resolve_paths(path);
        Ok(config)
    }

    /// Serializes to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Checks ranges serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(SynthError::Config("sample_rate must be positive".into()));
        }
        if self.workers == 0 {
            return Err(SynthError::Config("workers must be positive".into()));
        }
        if !self.crossfade_ms.is_finite() || self.crossfade_ms < 0.0 {
            return Err(SynthError::Config(format!(
                "crossfade_ms must be a non-negative number, got {}",
                self.crossfade_ms
            )));
        }
        Ok(())
    }

    /// Makes a relative voicebank path relative to the directory of `file`.
    pub(crate) fn resolve_paths(&mut self, file: &Path) {
        let Some(dir) = file.parent() else {
            return;
        };
        if self.voicebank.is_relative() {
            self.voicebank = dir.join(&self.voicebank);
        }
    }

    /// Output format: mono at the configured sample rate.
    pub fn format(&self) -> Format {
        Format::mono(self.sample_rate)
    }

    /// The built-in engine with this configuration's stretch mode.
    pub fn engine(&self) -> DefaultEngine {
        DefaultEngine::new(self.stretch)
    }
}
