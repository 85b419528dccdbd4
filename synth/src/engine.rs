//! Pitch and stretch capabilities used by the renderer.

use tracing::{debug, warn};
use uta_audio::Segment;
use uta_oto::{OtoError, Pitch, Sample, Voicebank};

use crate::dsp::{self, StretchMode, YinAnalyzer};
use crate::error::Result;

/// Pitch-shifting and time-stretching for the renderer.
///
/// Implementations are shared by every rendering thread and must be
/// thread-safe.
pub trait Engine: Send + Sync {
    /// Prepares the engine for rendering with `voicebank`.
    fn setup(&self, voicebank: &Voicebank) -> Result<()> {
        let _ = voicebank;
        Ok(())
    }

    /// Returns the audio of `sample` tuned to the MIDI note `target`.
    fn pitch(&self, voicebank: &Voicebank, sample: &Sample, target: f64) -> Result<Segment>;

    /// Returns `vowel` stretched or compressed to `duration_ms`.
    fn stretch(&self, vowel: &Segment, duration_ms: f64) -> Result<Segment>;
}

/// The built-in engine: YIN analysis, resampling pitch shift and
/// overlap-add or loop stretching.
#[derive(Debug, Clone, Default)]
pub struct DefaultEngine {
    pub analyzer: YinAnalyzer,
    pub stretch: StretchMode,
}

impl DefaultEngine {
    pub fn new(stretch: StretchMode) -> Self {
        Self {
            analyzer: YinAnalyzer::default(),
            stretch,
        }
    }
}

impl Engine for DefaultEngine {
    /// Analyses every sample up front so missing frq files are written once.
    ///
    /// Samples whose audio is missing are skipped with a warning; they only
    /// fail a render if a note actually uses them.
    fn setup(&self, voicebank: &Voicebank) -> Result<()> {
        for sample in voicebank.samples() {
            match voicebank.load_frq(&sample.alias, &self.analyzer) {
                Ok(_) => {}
                Err(OtoError::FileNotFound(path)) => {
                    warn!(alias = %sample.alias, path = %path.display(), "sample audio missing");
                }
                Err(e) => return Err(e.into()),
            }
        }
        debug!(samples = voicebank.len(), "engine ready");
        Ok(())
    }

    fn pitch(&self, voicebank: &Voicebank, sample: &Sample, target: f64) -> Result<Segment> {
        let frq = voicebank.load_frq(&sample.alias, &self.analyzer)?;
        let audio = voicebank.load(&sample.alias)?;

        if frq.average <= 0.0 {
            warn!(alias = %sample.alias, "sample has no voiced frames, not pitching");
            return Ok(audio.as_ref().clone());
        }

        let steps = target - Pitch::new(frq.average).midi() as f64;
        Ok(dsp::pitch_shift(&audio, steps, self.stretch)?)
    }

    fn stretch(&self, vowel: &Segment, duration_ms: f64) -> Result<Segment> {
        Ok(dsp::stretch(vowel, duration_ms, self.stretch))
    }
}
