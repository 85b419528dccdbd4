//! YIN fundamental frequency estimation.

use tracing::debug;
use uta_audio::{Channels, Segment};
use uta_oto::frq::DEFAULT_SAMPLES_PER_FRAME;
use uta_oto::{Frame, Frq, FrqAnalyzer, OtoError};

/// Frames quieter than this RMS are reported unvoiced.
const SILENCE_RMS: f64 = 1e-4;

/// Estimates per-frame F0 with the YIN difference function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YinAnalyzer {
    /// Lowest detectable frequency in Hz.
    pub fmin: f64,
    /// Highest detectable frequency in Hz.
    pub fmax: f64,
    /// Hop between analysis frames.
    pub samples_per_frame: i32,
    /// Cumulative mean normalized difference below which a lag is accepted.
    pub threshold: f64,
}

impl Default for YinAnalyzer {
    fn default() -> Self {
        Self {
            fmin: 55.0,
            fmax: 1000.0,
            samples_per_frame: DEFAULT_SAMPLES_PER_FRAME,
            threshold: 0.15,
        }
    }
}

impl YinAnalyzer {
    /// Estimates the frequency of each frame in `samples`, a mono buffer.
    ///
    /// Frames too close to the end to fill the analysis buffer are reported
    /// unvoiced rather than estimated from zero padding.
    pub fn estimate(&self, samples: &[f64], sample_rate: u32) -> Vec<Frame> {
        let sr = sample_rate as f64;
        let tau_min = ((sr / self.fmax).floor() as usize).max(2);
        let tau_max = (sr / self.fmin).ceil() as usize;
        let window = tau_max;
        let hop = self.samples_per_frame.max(1) as usize;

        let count = samples.len().div_ceil(hop);
        let mut diff = vec![0.0; tau_max + 1];
        let mut buf = vec![0.0; window + tau_max];

        (0..count)
            .map(|i| {
                let start = i * hop;
                buf.iter_mut().enumerate().for_each(|(j, b)| {
                    *b = samples.get(start + j).copied().unwrap_or(0.0);
                });

                let rms = (buf[..window].iter().map(|s| s * s).sum::<f64>() / window as f64).sqrt();
                if rms < SILENCE_RMS || start + buf.len() > samples.len() {
                    return Frame::new(0.0, rms);
                }

                difference(&buf, window, &mut diff);
                cumulative_mean_normalize(&mut diff);
                match self.pick_lag(&diff, tau_min, tau_max) {
                    Some(tau) => Frame::new(sr / tau, rms),
                    None => Frame::new(0.0, rms),
                }
            })
            .collect()
    }

    /// Finds the first dip below the threshold and refines it by parabolic
    /// interpolation.
    fn pick_lag(&self, cmnd: &[f64], tau_min: usize, tau_max: usize) -> Option<f64> {
        let mut tau = tau_min;
        while tau < tau_max {
            if cmnd[tau] < self.threshold {
                while tau + 1 < tau_max && cmnd[tau + 1] < cmnd[tau] {
                    tau += 1;
                }
                return Some(parabolic(cmnd, tau));
            }
            tau += 1;
        }
        None
    }
}

fn difference(buf: &[f64], window: usize, diff: &mut [f64]) {
    diff[0] = 0.0;
    for tau in 1..diff.len() {
        diff[tau] = buf[..window]
            .iter()
            .zip(&buf[tau..tau + window])
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
    }
}

fn cumulative_mean_normalize(diff: &mut [f64]) {
    diff[0] = 1.0;
    let mut running = 0.0;
    for tau in 1..diff.len() {
        running += diff[tau];
        diff[tau] = if running > 0.0 {
            diff[tau] * tau as f64 / running
        } else {
            1.0
        };
    }
}

fn parabolic(y: &[f64], x: usize) -> f64 {
    if x == 0 || x + 1 >= y.len() {
        return x as f64;
    }
    let (a, b, c) = (y[x - 1], y[x], y[x + 1]);
    let denom = a - 2.0 * b + c;
    if denom.abs() < f64::EPSILON {
        x as f64
    } else {
        x as f64 + 0.5 * (a - c) / denom
    }
}

impl FrqAnalyzer for YinAnalyzer {
    fn analyze(&self, audio: &Segment) -> uta_oto::Result<Frq> {
        if self.fmin <= 0.0 || self.fmax <= self.fmin {
            return Err(OtoError::Analysis(format!(
                "invalid frequency range {}..{}Hz",
                self.fmin, self.fmax
            )));
        }
        let mono = audio.set_channels(Channels::Mono);
        let frames = self.estimate(mono.samples(), mono.sample_rate());
        debug!(frames = frames.len(), "estimated f0");
        Ok(Frq::new(self.samples_per_frame, frames))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f64, ms: f64, sample_rate: u32) -> Segment {
        let n = (ms * sample_rate as f64 / 1000.0).round() as usize;
        Segment::mono(
            sample_rate,
            (0..n)
                .map(|i| 0.5 * (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate as f64).sin())
                .collect(),
        )
    }

    #[test]
    fn test_yin_sine() {
        let frq = YinAnalyzer::default().analyze(&tone(220.0, 200.0, 22050)).unwrap();
        assert_eq!(frq.samples_per_frame, 256);
        assert!((frq.average - 220.0).abs() < 2.0, "average {}", frq.average);
    }

    #[test]
    fn test_yin_higher_tone() {
        let frq = YinAnalyzer::default().analyze(&tone(440.0, 150.0, 22050)).unwrap();
        assert!((frq.average - 440.0).abs() < 4.0, "average {}", frq.average);
    }

    #[test]
    fn test_yin_silence_unvoiced() {
        let frq = YinAnalyzer::default().analyze(&Segment::silent(100.0, 22050)).unwrap();
        assert!(!frq.frames.is_empty());
        assert!(frq.frames.iter().all(|f| !f.is_voiced()));
        assert_eq!(frq.average, 0.0);
    }

    #[test]
    fn test_yin_frame_count() {
        let frq = YinAnalyzer::default().analyze(&tone(220.0, 100.0, 22050)).unwrap();
        // 2205 samples at a 256 hop.
        assert_eq!(frq.frames.len(), 9);
    }

    #[test]
    fn test_yin_tail_frames_unvoiced() {
        // 401-sample window plus 401 lags: frames starting after 1403 lack context.
        let frq = YinAnalyzer::default().analyze(&tone(220.0, 100.0, 22050)).unwrap();
        let voiced: Vec<bool> = frq.frames.iter().map(|f| f.is_voiced()).collect();
        assert_eq!(voiced, [true, true, true, true, true, true, false, false, false]);
    }

    #[test]
    fn test_yin_invalid_range() {
        let yin = YinAnalyzer {
            fmin: 500.0,
            fmax: 100.0,
            ..Default::default()
        };
        assert!(matches!(
            yin.analyze(&Segment::silent(10.0, 22050)),
            Err(OtoError::Analysis(_))
        ));
    }
}
