//! WAV decoding and export.

use std::io::{Read, Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::{AudioError, Result};
use crate::format::{Channels, Format};
use crate::segment::Segment;

fn decode<R: Read>(reader: WavReader<R>) -> Result<Segment> {
    let spec = reader.spec();
    let channels =
        Channels::from_count(spec.channels).ok_or(AudioError::Channels(spec.channels))?;
    let format = Format {
        sample_rate: spec.sample_rate,
        channels,
    };

    let samples: Vec<f64> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f64 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    Ok(Segment::from_samples(format, samples))
}

impl Segment {
    /// Reads a WAV file into a segment.
    ///
    /// A missing file surfaces as [`AudioError::Io`] with
    /// `ErrorKind::NotFound`; anything unreadable as a decode error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Segment> {
        let path = path.as_ref();
        let reader = WavReader::open(path).map_err(|e| match e {
            hound::Error::IoError(e) => AudioError::Io(e),
            other => AudioError::DecodeFile {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })?;
        decode(reader).map_err(|e| match e {
            AudioError::Decode(reason) => AudioError::DecodeFile {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Reads WAV data from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Segment> {
        decode(WavReader::new(reader)?)
    }

    /// Writes the segment as 16-bit PCM WAV.
    ///
    /// Samples are clipped to `[-1.0, 1.0]`.
    pub fn write_wav<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let spec = WavSpec {
            channels: self.channels().count() as u16,
            sample_rate: self.sample_rate(),
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let encode = |e: hound::Error| AudioError::Encode(e.to_string());

        let mut w = WavWriter::new(writer, spec).map_err(encode)?;
        for &s in self.samples() {
            let v = (s.clamp(-1.0, 1.0) * i16::MAX as f64).round() as i16;
            w.write_sample(v).map_err(encode)?;
        }
        w.finalize().map_err(encode)
    }

    /// Exports the segment to a WAV file.
    pub fn export_wav(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::io::BufWriter::new(std::fs::File::create(path)?);
        self.write_wav(file)
    }
}
