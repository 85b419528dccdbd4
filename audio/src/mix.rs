//! Additive mixdown of independently rendered tracks.

use crate::error::Result;
use crate::format::Format;
use crate::segment::Segment;

/// Mixes `tracks` into one segment in `format`.
///
/// Every track is converted to `format`, the output is as long as the
/// longest track, and samples are summed without clipping.
pub fn mix<'a>(format: Format, tracks: impl IntoIterator<Item = &'a Segment>) -> Result<Segment> {
    let tracks = tracks
        .into_iter()
        .map(|t| t.conform(format))
        .collect::<Result<Vec<_>>>()?;

    let frames = tracks.iter().map(Segment::frames).max().unwrap_or(0);
    let mut out = Segment::from_samples(format, vec![0.0; frames * format.channels.count()])
        .into_mut();

    for track in &tracks {
        out.mix_at(0, track);
    }
    Ok(out.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_extends_to_longest() {
        let a = Segment::silent(100.0, 44100).edit(|s| s.samples_mut().fill(0.25));
        let b = Segment::silent(300.0, 44100).edit(|s| s.samples_mut().fill(0.5));

        let mixed = mix(Format::MONO_44K, [&a, &b]).unwrap();
        assert_eq!(mixed.len(), 300);
        assert_eq!(mixed.samples()[0], 0.75);
        assert_eq!(*mixed.samples().last().unwrap(), 0.5);
    }

    #[test]
    fn test_mix_empty() {
        let mixed = mix(Format::MONO_44K, []).unwrap();
        assert!(mixed.is_empty());
    }

    #[test]
    fn test_mix_converts_layout() {
        let a = Segment::silent(10.0, 44100);
        let mixed = mix(Format::STEREO_44K, [&a]).unwrap();
        assert!(mixed.format().is_stereo());
        assert_eq!(mixed.frames(), a.frames());
    }
}
