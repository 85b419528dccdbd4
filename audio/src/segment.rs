//! Immutable audio segments indexed in milliseconds.
//!
//! A [`Segment`] owns its samples and never exposes them mutably. Every
//! editing operation returns a new segment; in-place edits go through
//! [`Segment::mutable`], which hands out a separate [`SegmentMut`] buffer that
//! is frozen back into a `Segment` when the edit is done.

use std::ops::{Bound, RangeBounds};

use crate::error::{AudioError, Result};
use crate::format::{Channels, Format};

/// Gain used as "silence" at the quiet end of a crossfade.
pub const SILENCE_DB: f64 = -120.0;

/// How many times an overlaid segment is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repeat {
    /// Mix the segment in once.
    #[default]
    Once,
    /// Mix the segment in `n` times back to back.
    Times(usize),
    /// Retile the segment until the end of the base segment.
    Loop,
}

/// Converts a gain in decibels to an amplitude factor.
pub fn db_to_amplitude(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// An immutable buffer of interleaved `f64` samples.
///
/// Samples can only be written through a [`SegmentMut`]:
///
/// ```compile_fail
/// let seg = uta_audio::Segment::silent(10.0, 1000);
/// seg.samples()[0] = 1.0;
/// ```
///
/// Edits land on the copy and leave the original untouched:
///
/// ```
/// let seg = uta_audio::Segment::silent(10.0, 1000);
/// let loud = seg.edit(|m| m.samples_mut()[0] = 1.0);
/// assert_eq!(seg.samples()[0], 0.0);
/// assert_eq!(loud.samples()[0], 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    samples: Vec<f64>,
    format: Format,
}

impl Segment {
    /// Creates a segment from interleaved samples.
    ///
    /// A trailing partial frame is dropped.
    pub fn from_samples(format: Format, mut samples: Vec<f64>) -> Self {
        let ch = format.channels.count();
        samples.truncate(samples.len() / ch * ch);
        Self { samples, format }
    }

    /// Creates a mono segment.
    pub fn mono(sample_rate: u32, samples: Vec<f64>) -> Self {
        Self::from_samples(Format::mono(sample_rate), samples)
    }

    /// Creates a silent mono segment lasting `duration_ms`.
    pub fn silent(duration_ms: f64, sample_rate: u32) -> Self {
        Self::silence(Format::mono(sample_rate), duration_ms)
    }

    /// Creates a silent segment in the given format lasting `duration_ms`.
    pub fn silence(format: Format, duration_ms: f64) -> Self {
        let frames = format.frames_in(duration_ms);
        Self {
            samples: vec![0.0; frames * format.channels.count()],
            format,
        }
    }

    /// Creates an empty segment in the given format.
    pub fn empty(format: Format) -> Self {
        Self {
            samples: Vec::new(),
            format,
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    pub fn channels(&self) -> Channels {
        self.format.channels
    }

    /// Returns the interleaved samples.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Consumes the segment and returns its samples.
    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }

    /// Returns the number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.format.channels.count()
    }

    /// Returns the exact duration in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.format.millis(self.frames())
    }

    /// Returns the duration rounded to whole milliseconds.
    pub fn len(&self) -> u64 {
        self.duration_ms().round() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns a copy of the frames covering `range` (in milliseconds).
    ///
    /// Bounds are clamped to the segment; an inverted range yields an empty
    /// segment.
    pub fn slice<R: RangeBounds<f64>>(&self, range: R) -> Segment {
        let start = match range.start_bound() {
            Bound::Included(ms) | Bound::Excluded(ms) => self.format.frames_in(*ms),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(ms) | Bound::Excluded(ms) => self.format.frames_in(*ms),
            Bound::Unbounded => self.frames(),
        };
        self.slice_frames(start, end)
    }

    /// Returns a copy of the frames `[start, end)`, clamped to the segment.
    pub fn slice_frames(&self, start: usize, end: usize) -> Segment {
        let frames = self.frames();
        let end = end.min(frames);
        let start = start.min(end);
        let ch = self.format.channels.count();
        Segment {
            samples: self.samples[start * ch..end * ch].to_vec(),
            format: self.format,
        }
    }

    /// Concatenates `other` after this segment.
    ///
    /// With a positive `crossfade_ms`, the tail of `self` fades out while the
    /// head of `other` fades in over the crossfade window, and the two are
    /// summed. `other` is converted to this segment's format first.
    pub fn append(&self, other: &Segment, crossfade_ms: f64) -> Result<Segment> {
        let other = other.conform(self.format)?;
        let ch = self.format.channels.count();

        if crossfade_ms <= 0.0 {
            let mut samples = Vec::with_capacity(self.samples.len() + other.samples.len());
            samples.extend_from_slice(&self.samples);
            samples.extend_from_slice(&other.samples);
            return Ok(Segment::from_samples(self.format, samples));
        }

        for len_ms in [self.len(), other.len()] {
            if crossfade_ms > len_ms as f64 {
                return Err(AudioError::CrossfadeTooLong {
                    crossfade_ms,
                    len_ms,
                });
            }
        }

        let xf = self
            .format
            .frames_in(crossfade_ms)
            .min(self.frames())
            .min(other.frames());
        if xf == 0 {
            return self.append(&other, 0.0);
        }

        let split = self.frames() - xf;
        let fade_out = self
            .slice_frames(split, self.frames())
            .fade(0.0, SILENCE_DB, None, None)?;
        let fade_in = other.slice_frames(0, xf).fade(SILENCE_DB, 0.0, None, None)?;

        let mut samples = Vec::with_capacity(self.samples.len() + other.samples.len() - xf * ch);
        samples.extend_from_slice(&self.samples[..split * ch]);
        samples.extend(
            fade_out
                .samples
                .iter()
                .zip(fade_in.samples.iter())
                .map(|(a, b)| a + b),
        );
        samples.extend_from_slice(&other.samples[xf * ch..]);

        Ok(Segment::from_samples(self.format, samples))
    }

    /// Mixes `other` into this segment starting at `position_ms`.
    ///
    /// The result keeps this segment's length: whatever runs past the end is
    /// dropped, so callers extend with silence first when needed.
    pub fn overlay(&self, other: &Segment, position_ms: f64) -> Result<Segment> {
        self.overlay_repeat(other, position_ms, Repeat::Once)
    }

    /// Like [`Segment::overlay`], repeating `other` as requested.
    pub fn overlay_repeat(
        &self,
        other: &Segment,
        position_ms: f64,
        repeat: Repeat,
    ) -> Result<Segment> {
        let other = other.conform(self.format)?;
        let mut out = self.mutable();
        let start = self.format.frames_in(position_ms);
        let step = other.frames();

        match repeat {
            Repeat::Once => out.mix_at(start, &other),
            Repeat::Times(n) => {
                for i in 0..n {
                    out.mix_at(start + i * step, &other);
                }
            }
            Repeat::Loop => {
                if step > 0 {
                    let mut at = start;
                    while at < out.frames() {
                        out.mix_at(at, &other);
                        at += step;
                    }
                }
            }
        }

        Ok(out.freeze())
    }

    /// Applies a logarithmic gain ramp from `from_db` to `to_db`.
    ///
    /// The ramp covers `[start_ms, end_ms)` (defaulting to the whole segment).
    /// Frames before the window keep `from_db`, frames after it keep `to_db`.
    /// Gains are attenuation only and must not be positive.
    pub fn fade(
        &self,
        from_db: f64,
        to_db: f64,
        start_ms: Option<f64>,
        end_ms: Option<f64>,
    ) -> Result<Segment> {
        for db in [from_db, to_db] {
            if db > 0.0 {
                return Err(AudioError::PositiveGain(db));
            }
        }

        let start_ms = start_ms.unwrap_or(0.0);
        let end_ms = end_ms.unwrap_or_else(|| self.duration_ms());
        if start_ms >= end_ms {
            return Err(AudioError::EmptyWindow { start_ms, end_ms });
        }

        if from_db == 0.0 && to_db == 0.0 {
            return Ok(self.clone());
        }

        let frames = self.frames();
        let start = self.format.frames_in(start_ms).min(frames);
        let end = self.format.frames_in(end_ms).min(frames);
        let width = end.saturating_sub(start).max(1) as f64;
        let from_amp = db_to_amplitude(from_db);
        let to_amp = db_to_amplitude(to_db);

        Ok(self.edit(|seg| {
            let ch = seg.format().channels.count();
            for (i, frame) in seg.samples_mut().chunks_exact_mut(ch).enumerate() {
                let amp = if i < start {
                    from_amp
                } else if i >= end {
                    to_amp
                } else {
                    let t = (i - start) as f64 / width;
                    db_to_amplitude(from_db + (to_db - from_db) * t)
                };
                for s in frame {
                    *s *= amp;
                }
            }
        }))
    }

    /// Returns a copy with a constant gain applied.
    pub fn gain(&self, db: f64) -> Segment {
        let amp = db_to_amplitude(db);
        self.edit(|seg| seg.samples_mut().iter_mut().for_each(|s| *s *= amp))
    }

    /// Returns a copy with the requested channel layout.
    ///
    /// Stereo to mono averages both channels; mono to stereo duplicates the
    /// channel. Matching layouts return an unchanged copy.
    pub fn set_channels(&self, channels: Channels) -> Segment {
        let samples = match (self.format.channels, channels) {
            (Channels::Stereo, Channels::Mono) => self
                .samples
                .chunks_exact(2)
                .map(|f| (f[0] + f[1]) / 2.0)
                .collect(),
            (Channels::Mono, Channels::Stereo) => {
                self.samples.iter().flat_map(|&s| [s, s]).collect()
            }
            _ => return self.clone(),
        };
        Segment {
            samples,
            format: self.format.with_channels(channels),
        }
    }

    /// Converts this segment to `format`, resampling and remixing as needed.
    pub fn conform(&self, format: Format) -> Result<Segment> {
        let seg = self.set_channels(format.channels);
        if seg.format.sample_rate == format.sample_rate {
            Ok(seg)
        } else {
            seg.resample(format.sample_rate)
        }
    }

    /// Returns a writable copy of this segment.
    pub fn mutable(&self) -> SegmentMut {
        SegmentMut {
            samples: self.samples.clone(),
            format: self.format,
        }
    }

    /// Turns this segment into a writable buffer without copying.
    pub fn into_mut(self) -> SegmentMut {
        SegmentMut {
            samples: self.samples,
            format: self.format,
        }
    }

    /// Runs `f` on a writable copy and returns the frozen result.
    pub fn edit(&self, f: impl FnOnce(&mut SegmentMut)) -> Segment {
        let mut seg = self.mutable();
        f(&mut seg);
        seg.freeze()
    }
}

/// A writable audio buffer detached from any [`Segment`].
///
/// Writes never affect the segment it was copied from. Call
/// [`SegmentMut::freeze`] to get an immutable segment back.
#[derive(Debug, Clone)]
pub struct SegmentMut {
    samples: Vec<f64>,
    format: Format,
}

impl SegmentMut {
    pub fn format(&self) -> Format {
        self.format
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.format.channels.count()
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f64] {
        &mut self.samples
    }

    /// Returns the writable interleaved samples covering `[start_ms, end_ms)`.
    pub fn window_mut(&mut self, start_ms: f64, end_ms: f64) -> &mut [f64] {
        let frames = self.frames();
        let end = self.format.frames_in(end_ms).min(frames);
        let start = self.format.frames_in(start_ms).min(end);
        let ch = self.format.channels.count();
        &mut self.samples[start * ch..end * ch]
    }

    /// Appends `ms` of silence.
    pub fn extend_silence(&mut self, ms: f64) {
        self.extend_frames(self.format.frames_in(ms));
    }

    /// Appends `frames` frames of silence.
    pub fn extend_frames(&mut self, frames: usize) {
        let n = frames * self.format.channels.count();
        self.samples.resize(self.samples.len() + n, 0.0);
    }

    /// Adds `other` sample-wise starting at frame `at`, stopping at the end
    /// of this buffer. Both must share a channel layout.
    pub fn mix_at(&mut self, at: usize, other: &Segment) {
        let ch = self.format.channels.count();
        let offset = at.saturating_mul(ch);
        if offset >= self.samples.len() {
            return;
        }
        for (dst, src) in self.samples[offset..].iter_mut().zip(other.samples()) {
            *dst += src;
        }
    }

    /// Freezes the buffer into an immutable segment.
    pub fn freeze(self) -> Segment {
        Segment::from_samples(self.format, self.samples)
    }
}
