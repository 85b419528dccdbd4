//! Oto timing geometry of a single voice sample.

use std::path::Path;

use uta_audio::Segment;

use crate::error::{OtoError, Result};

/// A voice sample in a voicebank. All timing values are in milliseconds.
///
/// The sample's audio is laid out as follows:
///
/// ```text
/// |--offset--|--consonant--|------vowel------|--cutoff--|
///            ^             ^                 ^
///            start         vowel start       vowel end
/// ```
///
/// A negative cutoff is measured forward instead: the vowel ends
/// `|cutoff|` after the vowel start.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Path to the sample's audio file, relative to the voicebank directory.
    pub file: String,
    /// Name of the syllable the sample represents.
    pub alias: String,
    /// Region from the start of the file to ignore.
    pub offset: f64,
    /// Region after the offset that is never stretched.
    pub consonant: f64,
    /// Region from the end of the file to ignore (see above for negatives).
    pub cutoff: f64,
    /// How far the sample starts before the note it is sung on.
    pub preutterance: f64,
    /// How far the sample blends into the previous note's tail.
    pub overlap: f64,
}

const FIELDS: [&str; 5] = ["offset", "consonant", "cutoff", "preutterance", "overlap"];

impl Sample {
    /// Parses one oto.ini record: `file=alias,offset,consonant,cutoff,preutterance,overlap`.
    ///
    /// An empty alias defaults to the file name without its extension.
    /// Errors carry line 0; callers reading whole files attach the real line
    /// with [`OtoError::at_line`].
    pub fn parse(entry: &str) -> Result<Sample> {
        let invalid = |reason: String| OtoError::Parse {
            line: 0,
            entry: entry.to_string(),
            reason,
        };

        let line = entry.trim_end_matches(['\r', '\n']);
        let (file, value) = line
            .split_once('=')
            .ok_or_else(|| invalid("expected file=alias,...".into()))?;
        let file = file.trim();
        if file.is_empty() {
            return Err(invalid("empty file name".into()));
        }

        let mut parts = value.split(',');
        let alias = parts.next().unwrap_or_default().trim();
        let alias = if alias.is_empty() {
            Path::new(file)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(file)
                .to_string()
        } else {
            alias.to_string()
        };

        let mut values = [0.0f64; 5];
        for (slot, name) in values.iter_mut().zip(FIELDS) {
            let raw = parts
                .next()
                .ok_or_else(|| invalid(format!("missing {name}")))?
                .trim();
            *slot = raw
                .parse()
                .map_err(|_| invalid(format!("{name} is not a number: {raw:?}")))?;
        }
        if parts.next().is_some() {
            return Err(invalid("too many fields".into()));
        }

        let [offset, consonant, cutoff, preutterance, overlap] = values;
        Ok(Sample {
            file: file.to_string(),
            alias,
            offset,
            consonant,
            cutoff,
            preutterance,
            overlap,
        })
    }

    /// Returns the vowel region `[start, end)` within audio lasting `len_ms`.
    pub fn vowel_region(&self, len_ms: f64) -> (f64, f64) {
        let start = self.offset + self.consonant;
        let end = if self.cutoff < 0.0 {
            start + self.cutoff.abs()
        } else {
            len_ms - self.cutoff
        };
        (start, end)
    }

    /// Splits `audio` into its consonant and vowel regions.
    ///
    /// Fails with a timing error when the offset or consonant is negative,
    /// or when the vowel region is empty or inverted once clipped to the
    /// audio.
    pub fn slice(&self, audio: &Segment) -> Result<(Segment, Segment)> {
        let timing = |reason: String| OtoError::Timing {
            alias: self.alias.clone(),
            reason,
        };

        if self.offset < 0.0 {
            return Err(timing(format!("negative offset {}", self.offset)));
        }
        if self.consonant < 0.0 {
            return Err(timing(format!("negative consonant {}", self.consonant)));
        }

        let len_ms = audio.len() as f64;
        let (start, end) = self.vowel_region(len_ms);
        let (start, end) = (start.min(len_ms), end.min(len_ms));
        if end <= start {
            return Err(timing(format!(
                "empty vowel region [{start}ms, {end}ms) in {}ms of audio",
                audio.len()
            )));
        }

        Ok((audio.slice(self.offset..start), audio.slice(start..end)))
    }

    /// Reports the quality problem of an overlap longer than the preutterance.
    pub fn overlap_exceeds_preutterance(&self) -> bool {
        self.overlap > self.preutterance
    }
}
