//! Rubato-based sample rate conversion.
//!
//! Whole segments are converted in fixed-size blocks with a sinc
//! interpolator, then trimmed so the output keeps the input's duration.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

use crate::error::Result;
use crate::segment::Segment;

/// Number of frames fed to the resampler per block.
const CHUNK_SIZE: usize = 1024;

fn interpolation_parameters() -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    }
}

/// Resamples per-channel buffers by `ratio` (output rate / input rate).
///
/// The returned buffers hold `round(frames * ratio)` frames each.
pub fn resample_channels(channels: &[Vec<f64>], ratio: f64) -> Result<Vec<Vec<f64>>> {
    let num_channels = channels.len();
    let frames = channels.first().map_or(0, Vec::len);
    let expected = (frames as f64 * ratio).round() as usize;
    if num_channels == 0 || frames == 0 || expected == 0 {
        return Ok(vec![Vec::new(); num_channels]);
    }

    let mut resampler = SincFixedIn::<f64>::new(
        ratio,
        1.0,
        interpolation_parameters(),
        CHUNK_SIZE,
        num_channels,
    )?;
    let delay = resampler.output_delay();
    let mut output: Vec<Vec<f64>> = vec![Vec::with_capacity(expected + delay); num_channels];

    let mut pos = 0;
    while pos + CHUNK_SIZE <= frames {
        let block: Vec<&[f64]> = channels.iter().map(|c| &c[pos..pos + CHUNK_SIZE]).collect();
        let out = resampler.process(&block, None)?;
        append(&mut output, out);
        pos += CHUNK_SIZE;
    }

    if pos < frames {
        let block: Vec<&[f64]> = channels.iter().map(|c| &c[pos..]).collect();
        let out = resampler.process_partial(Some(block.as_slice()), None)?;
        append(&mut output, out);
    }

    // Flush the filter tail until the delayed output is complete.
    while output[0].len() < expected + delay {
        let out = resampler.process_partial(None::<&[Vec<f64>]>, None)?;
        if out.first().is_none_or(Vec::is_empty) {
            break;
        }
        append(&mut output, out);
    }

    for ch in &mut output {
        ch.drain(..delay.min(ch.len()));
        ch.resize(expected, 0.0);
    }
    Ok(output)
}

fn append(output: &mut [Vec<f64>], block: Vec<Vec<f64>>) {
    for (dst, src) in output.iter_mut().zip(block) {
        dst.extend(src);
    }
}

/// Splits interleaved samples into one buffer per channel.
pub fn deinterleave(samples: &[f64], num_channels: usize) -> Vec<Vec<f64>> {
    let mut out = vec![Vec::with_capacity(samples.len() / num_channels); num_channels];
    for frame in samples.chunks_exact(num_channels) {
        for (ch, &s) in out.iter_mut().zip(frame) {
            ch.push(s);
        }
    }
    out
}

/// Joins per-channel buffers into interleaved samples.
pub fn interleave(channels: &[Vec<f64>]) -> Vec<f64> {
    let frames = channels.first().map_or(0, Vec::len);
    let mut out = Vec::with_capacity(frames * channels.len());
    for i in 0..frames {
        for ch in channels {
            out.push(ch[i]);
        }
    }
    out
}

impl Segment {
    /// Returns a copy converted to `sample_rate`, keeping the duration.
    pub fn resample(&self, sample_rate: u32) -> Result<Segment> {
        if sample_rate == self.sample_rate() {
            return Ok(self.clone());
        }
        let ratio = sample_rate as f64 / self.sample_rate() as f64;
        debug!(
            from = self.sample_rate(),
            to = sample_rate,
            frames = self.frames(),
            "resampling segment"
        );

        let num_channels = self.channels().count();
        let channels = deinterleave(self.samples(), num_channels);
        let out = resample_channels(&channels, ratio)?;

        let mut format = self.format();
        format.sample_rate = sample_rate;
        Ok(Segment::from_samples(format, interleave(&out)))
    }

    /// Resamples by `ratio` but keeps the sample rate, which scales the
    /// duration by `ratio` and the pitch by `1 / ratio`.
    pub fn respeed(&self, ratio: f64) -> Result<Segment> {
        let num_channels = self.channels().count();
        let channels = deinterleave(self.samples(), num_channels);
        let out = resample_channels(&channels, ratio)?;
        Ok(Segment::from_samples(self.format(), interleave(&out)))
    }
}
