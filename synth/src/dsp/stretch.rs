//! Time stretching of vowel segments.

use serde::{Deserialize, Serialize};
use uta_audio::{Repeat, Segment};

/// Length of an overlap-add grain.
const GRAIN_MS: f64 = 40.0;

/// How a vowel is brought to its target length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StretchMode {
    /// Retile the vowel until it fills the target.
    Loop,
    /// Hann-windowed overlap-add resynthesis at a constant grain rate.
    #[default]
    Ola,
}

/// Stretches or compresses `seg` to exactly `duration_ms`.
pub fn stretch(seg: &Segment, duration_ms: f64, mode: StretchMode) -> Segment {
    let format = seg.format();
    let target = format.frames_in(duration_ms);
    if target == 0 || seg.is_empty() {
        return Segment::silence(format, duration_ms);
    }
    if target == seg.frames() {
        return seg.clone();
    }

    let grain = format.frames_in(GRAIN_MS).max(2);
    match mode {
        StretchMode::Loop => loop_fill(seg, duration_ms),
        StretchMode::Ola if seg.frames() < grain => loop_fill(seg, duration_ms),
        StretchMode::Ola => ola(seg, target, grain),
    }
}

/// Fills `duration_ms` by repeating `seg` from the start.
pub fn loop_fill(seg: &Segment, duration_ms: f64) -> Segment {
    let base = Segment::silence(seg.format(), duration_ms);
    // Both share one format, so the overlay cannot fail.
    base.overlay_repeat(seg, 0.0, Repeat::Loop).unwrap_or(base)
}

/// Overlap-adds Hann grains read at `frames / target` of the write rate.
fn ola(seg: &Segment, target: usize, grain: usize) -> Segment {
    let format = seg.format();
    let ch = format.channels.count();
    let input = seg.samples();
    let frames = seg.frames();

    let hop_out = grain / 2;
    let ratio = (frames - grain) as f64 / target.saturating_sub(grain).max(1) as f64;
    // Sampled at half-frame offsets so no tap is exactly zero.
    let window: Vec<f64> = (0..grain)
        .map(|i| {
            let phase = (i as f64 + 0.5) / grain as f64;
            0.5 - 0.5 * (2.0 * std::f64::consts::PI * phase).cos()
        })
        .collect();

    let mut out = vec![0.0; (target + grain) * ch];
    let mut weight = vec![0.0; target + grain];

    let mut pos_out = 0;
    while pos_out < target {
        let pos_in = ((pos_out as f64 * ratio).round() as usize).min(frames - grain);
        for (i, w) in window.iter().enumerate() {
            let src = (pos_in + i) * ch;
            let dst = (pos_out + i) * ch;
            for c in 0..ch {
                out[dst + c] += input[src + c] * w;
            }
            weight[pos_out + i] += w;
        }
        pos_out += hop_out;
    }

    out.truncate(target * ch);
    for (frame, w) in out.chunks_exact_mut(ch).zip(&weight) {
        if *w > 0.0 {
            frame.iter_mut().for_each(|s| *s /= w);
        }
    }

    Segment::from_samples(format, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uta_audio::Format;

    fn ramp(ms: f64) -> Segment {
        let n = Format::mono(44100).frames_in(ms);
        Segment::mono(44100, (0..n).map(|i| ((i % 100) as f64 / 100.0) - 0.5).collect())
    }

    #[test]
    fn test_stretch_exact_length() {
        let vowel = ramp(200.0);
        for mode in [StretchMode::Ola, StretchMode::Loop] {
            for target in [0.0, 10.0, 150.0, 200.0, 333.0, 1200.0] {
                let out = stretch(&vowel, target, mode);
                assert_eq!(out.len(), target as u64, "{mode:?} {target}");
                assert_eq!(out.frames(), Format::mono(44100).frames_in(target));
            }
        }
    }

    #[test]
    fn test_stretch_identity() {
        let vowel = ramp(100.0);
        assert_eq!(stretch(&vowel, 100.0, StretchMode::Ola), vowel);
    }

    #[test]
    fn test_stretch_constant_signal_preserved() {
        let vowel = Segment::mono(44100, vec![0.25; 4410]);
        let out = stretch(&vowel, 450.0, StretchMode::Ola);
        for &s in out.samples() {
            assert!((s - 0.25).abs() < 1e-9, "sample {s}");
        }
    }

    #[test]
    fn test_stretch_stereo() {
        let vowel = ramp(100.0).set_channels(uta_audio::Channels::Stereo);
        let out = stretch(&vowel, 250.0, StretchMode::Ola);
        assert_eq!(out.len(), 250);
        assert!(out.format().is_stereo());
    }

    #[test]
    fn test_loop_fill_repeats() {
        let vowel = Segment::mono(1000, vec![1.0, 2.0, 3.0]);
        let out = loop_fill(&vowel, 8.0);
        assert_eq!(out.samples(), &[1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_short_vowel_falls_back_to_loop() {
        let vowel = Segment::mono(44100, vec![0.5; 100]);
        let out = stretch(&vowel, 20.0, StretchMode::Ola);
        assert_eq!(out.frames(), 882);
        assert!(out.samples().iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_stretch_empty_input() {
        let out = stretch(&Segment::silent(0.0, 44100), 50.0, StretchMode::Ola);
        assert_eq!(out.len(), 50);
        assert!(out.samples().iter().all(|&s| s == 0.0));
    }
}
