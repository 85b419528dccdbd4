//! Musical pitch in scientific pitch notation or MIDI note numbers.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{OtoError, Result};

/// Frequency of A4 in Hz.
pub const CONCERT_PITCH: f64 = 440.0;

/// MIDI note number of A4.
const CONCERT_MIDI: f64 = 69.0;

static SPN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<note>[a-gA-G])(?P<accidental>#{1,2}|b{1,2})?(?P<octave>-1|\d)$")
        .expect("valid SPN pattern")
});

/// A musical pitch.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Pitch {
    /// Frequency in Hz.
    pub frequency: f64,
}

impl Pitch {
    pub fn new(frequency: f64) -> Self {
        Self { frequency }
    }

    /// Parses scientific pitch notation, such as `A4`, `C#5` or `Gb6`.
    ///
    /// Octaves run from -1 to 9; accidentals are `#`, `##`, `b` and `bb`.
    pub fn parse(spn: &str) -> Result<Pitch> {
        let invalid = || OtoError::Parse {
            line: 0,
            entry: spn.to_string(),
            reason: "invalid scientific pitch notation".into(),
        };

        let caps = SPN.captures(spn).ok_or_else(invalid)?;
        let note = match caps["note"].to_ascii_uppercase().as_str() {
            "C" => 0,
            "D" => 2,
            "E" => 4,
            "F" => 5,
            "G" => 7,
            "A" => 9,
            "B" => 11,
            _ => return Err(invalid()),
        };
        let accidental = match caps.name("accidental").map(|m| m.as_str()) {
            Some("#") => 1,
            Some("##") => 2,
            Some("b") => -1,
            Some("bb") => -2,
            _ => 0,
        };
        let octave: i32 = caps["octave"].parse().map_err(|_| invalid())?;

        // MIDI numbering starts at C-1.
        Ok(Pitch::from_midi(note + accidental + (octave + 1) * 12))
    }

    /// Creates a pitch from a MIDI note number.
    pub fn from_midi(note: i32) -> Pitch {
        Pitch::from_midi_f64(note as f64)
    }

    /// Creates a pitch from a fractional MIDI note number.
    pub fn from_midi_f64(note: f64) -> Pitch {
        Pitch::new(2f64.powf((note - CONCERT_MIDI) / 12.0) * CONCERT_PITCH)
    }

    /// Returns the nearest MIDI note number.
    pub fn midi(&self) -> i32 {
        self.midi_f64().round() as i32
    }

    /// Returns the fractional MIDI note number.
    pub fn midi_f64(&self) -> f64 {
        CONCERT_MIDI + 12.0 * (self.frequency / CONCERT_PITCH).log2()
    }

    /// Distance to `other` in semitones.
    pub fn semitones_to(&self, other: Pitch) -> f64 {
        other.midi_f64() - self.midi_f64()
    }
}

impl FromStr for Pitch {
    type Err = OtoError;

    fn from_str(s: &str) -> Result<Self> {
        Pitch::parse(s)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}Hz", self.frequency)
    }
}
