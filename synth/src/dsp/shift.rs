//! Resampling pitch shift.

use uta_audio::{Result, Segment};

use super::stretch::{stretch, StretchMode};

/// Shifts `seg` by `steps` semitones, keeping its duration.
///
/// The audio is resampled by the frequency ratio, which changes both pitch
/// and length, and then stretched back to the original length.
pub fn pitch_shift(seg: &Segment, steps: f64, mode: StretchMode) -> Result<Segment> {
    if steps == 0.0 || seg.is_empty() {
        return Ok(seg.clone());
    }
    let ratio = 2f64.powf(steps / 12.0);
    let shifted = seg.respeed(1.0 / ratio)?;
    Ok(stretch(&shifted, seg.duration_ms(), mode))
}
