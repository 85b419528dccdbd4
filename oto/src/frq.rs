//! Frq pitch-analysis files.
//!
//! Binary layout, all values little-endian:
//!
//! | offset | size | field                                      |
//! |--------|------|--------------------------------------------|
//! | 0      | 8    | magic `FREQ0003`                           |
//! | 8      | 4    | samples per frame (`i32`)                  |
//! | 12     | 8    | average frequency (`f64`)                  |
//! | 20     | 16   | reserved, zero                             |
//! | 36     | 4    | frame count (`i32`)                        |
//! | 40     | 16*n | frames: frequency (`f64`), amplitude (`f64`) |

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};
use tracing::warn;

use crate::error::{OtoError, Result};

/// File magic.
pub const MAGIC: &[u8; 8] = b"FREQ0003";

/// Size of the fixed header.
pub const HEADER_LEN: usize = 40;

/// Size of one encoded frame.
pub const FRAME_LEN: usize = 16;

/// Number of voiced frames the average frequency is taken over.
pub const AVERAGE_WINDOW: usize = 6;

/// Analysis hop used when a voicebank has no frq file yet.
pub const DEFAULT_SAMPLES_PER_FRAME: i32 = 256;

const RESERVED_LEN: usize = 16;

/// One analysis frame. A frequency of zero marks an unvoiced frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Frame {
    pub freq: f64,
    pub amp: f64,
}

impl Frame {
    pub fn new(freq: f64, amp: f64) -> Self {
        Self { freq, amp }
    }

    pub fn is_voiced(&self) -> bool {
        self.freq > 0.0
    }
}

/// Per-frame frequency and amplitude analysis of a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Frq {
    /// Audio samples covered by each frame.
    pub samples_per_frame: i32,
    /// Representative fundamental frequency in Hz.
    pub average: f64,
    pub frames: Vec<Frame>,
}

impl Frq {
    /// Creates a frq, deriving the average frequency from the frames.
    pub fn new(samples_per_frame: i32, frames: Vec<Frame>) -> Self {
        let average = Self::frame_average(&frames);
        Self {
            samples_per_frame,
            average,
            frames,
        }
    }

    /// Smooths the voiced frequencies with an [`AVERAGE_WINDOW`]-frame moving
    /// average and returns the mean of the smoothed values.
    ///
    /// Only windows lying fully inside the voiced run are taken, so the
    /// edge frames weigh less than the middle ones. Unvoiced frames are
    /// ignored. With fewer voiced frames than the window,
    /// all voiced frames are averaged and a warning is logged; with none the
    /// average is zero.
    pub fn frame_average(frames: &[Frame]) -> f64 {
        let voiced: Vec<f64> = frames
            .iter()
            .filter(|f| f.is_voiced())
            .map(|f| f.freq)
            .collect();

        if voiced.is_empty() {
            return 0.0;
        }
        if voiced.len() < AVERAGE_WINDOW {
            warn!(
                voiced = voiced.len(),
                window = AVERAGE_WINDOW,
                "too few voiced frames for a stable average"
            );
            return mean(&voiced);
        }

        let smoothed: Vec<f64> = voiced.windows(AVERAGE_WINDOW).map(mean).collect();
        mean(&smoothed)
    }

    /// Duration of the analysed audio in samples.
    pub fn sample_count(&self) -> usize {
        self.frames.len() * self.samples_per_frame.max(0) as usize
    }

    /// Returns the frame covering audio sample `index`, if any.
    pub fn frame_at(&self, index: usize) -> Option<&Frame> {
        if self.samples_per_frame <= 0 {
            return None;
        }
        self.frames.get(index / self.samples_per_frame as usize)
    }

    /// Encodes into the binary frq layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.frames.len() * FRAME_LEN);
        buf.put_slice(MAGIC);
        buf.put_i32_le(self.samples_per_frame);
        buf.put_f64_le(self.average);
        buf.put_bytes(0, RESERVED_LEN);
        buf.put_i32_le(self.frames.len() as i32);
        for frame in &self.frames {
            buf.put_f64_le(frame.freq);
            buf.put_f64_le(frame.amp);
        }
        buf.to_vec()
    }

    /// Decodes the binary frq layout.
    ///
    /// Bytes after the last declared frame are ignored.
    pub fn decode(data: &[u8]) -> Result<Frq> {
        if data.len() < HEADER_LEN {
            return Err(OtoError::Format(format!(
                "truncated header: {} bytes, need {HEADER_LEN}",
                data.len()
            )));
        }

        let mut buf = data;
        if &buf[..MAGIC.len()] != MAGIC {
            return Err(OtoError::Format(format!(
                "bad magic {:?}",
                String::from_utf8_lossy(&buf[..MAGIC.len()])
            )));
        }
        buf.advance(MAGIC.len());

        let samples_per_frame = buf.get_i32_le();
        let average = buf.get_f64_le();
        buf.advance(RESERVED_LEN);
        let count = buf.get_i32_le();
        if count < 0 {
            return Err(OtoError::Format(format!("negative frame count {count}")));
        }

        let count = count as usize;
        let need = count * FRAME_LEN;
        if buf.remaining() < need {
            return Err(OtoError::Format(format!(
                "truncated frames: {count} declared, {} bytes of frame data",
                buf.remaining()
            )));
        }

        let frames = (0..count)
            .map(|_| Frame::new(buf.get_f64_le(), buf.get_f64_le()))
            .collect();

        Ok(Frq {
            samples_per_frame,
            average,
            frames,
        })
    }

    /// Reads and decodes a whole frq stream.
    pub fn read_from<R: Read>(mut r: R) -> Result<Frq> {
        let mut data = Vec::new();
        r.read_to_end(&mut data)?;
        Self::decode(&data)
    }

    /// Encodes and writes this frq to `w`.
    pub fn write_to<W: Write>(&self, mut w: W) -> Result<()> {
        w.write_all(&self.encode())?;
        Ok(())
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
