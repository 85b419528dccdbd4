//! Note timelines.

use serde::{Deserialize, Deserializer, Serialize};
use uta_oto::Pitch;

/// A note on a track's timeline.
///
/// In YAML or JSON a note is tagged by `kind`:
///
/// ```yaml
/// - kind: sung
///   alias: ka
///   pitch: C4      # or a MIDI note number such as 60 or 60.5
///   duration_ms: 500
/// - kind: rest
///   duration_ms: 250
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Note {
    Rest {
        duration_ms: f64,
    },
    Sung {
        duration_ms: f64,
        /// Target pitch as a (fractional) MIDI note number.
        #[serde(deserialize_with = "deserialize_pitch")]
        pitch: f64,
        /// Voicebank alias of the sample to sing.
        alias: String,
        /// Replaces the sample's preutterance.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preutterance: Option<f64>,
        /// Replaces the sample's overlap.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        overlap: Option<f64>,
    },
}

impl Note {
    pub fn rest(duration_ms: f64) -> Self {
        Note::Rest { duration_ms }
    }

    pub fn sung(alias: impl Into<String>, pitch: f64, duration_ms: f64) -> Self {
        Note::Sung {
            duration_ms,
            pitch,
            alias: alias.into(),
            preutterance: None,
            overlap: None,
        }
    }

    /// Sets the preutterance override. Rests are returned unchanged.
    pub fn with_preutterance(mut self, ms: f64) -> Self {
        if let Note::Sung { preutterance, .. } = &mut self {
            *preutterance = Some(ms);
        }
        self
    }

    /// Sets the overlap override. Rests are returned unchanged.
    pub fn with_overlap(mut self, ms: f64) -> Self {
        if let Note::Sung { overlap, .. } = &mut self {
            *overlap = Some(ms);
        }
        self
    }

    pub fn duration_ms(&self) -> f64 {
        match self {
            Note::Rest { duration_ms } | Note::Sung { duration_ms, .. } => *duration_ms,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, Note::Rest { .. })
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            Note::Rest { .. } => None,
            Note::Sung { alias, .. } => Some(alias),
        }
    }
}

/// Total duration of a timeline in milliseconds.
pub fn total_duration(notes: &[Note]) -> f64 {
    notes.iter().map(Note::duration_ms).sum()
}

fn deserialize_pitch<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Midi(f64),
        Spn(String),
    }

    match Raw::deserialize(d)? {
        Raw::Midi(n) => Ok(n),
        Raw::Spn(s) => Pitch::parse(&s)
            .map(|p| p.midi() as f64)
            .map_err(serde::de::Error::custom),
    }
}

/// Tempo for converting beat lengths to milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tempo {
    /// Beats per minute.
    pub bpm: f64,
}

impl Tempo {
    pub const fn new(bpm: f64) -> Self {
        Self { bpm }
    }

    /// Converts a beat count to milliseconds.
    pub fn beats_to_ms(&self, beats: f64) -> f64 {
        beats * 60_000.0 / self.bpm
    }

    /// Creates a sung note lasting `beats` beats.
    pub fn sung(&self, alias: impl Into<String>, pitch: f64, beats: f64) -> Note {
        Note::sung(alias, pitch, self.beats_to_ms(beats))
    }

    /// Creates a rest lasting `beats` beats.
    pub fn rest(&self, beats: f64) -> Note {
        Note::rest(self.beats_to_ms(beats))
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(120.0)
    }
}
