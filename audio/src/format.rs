//! Sample rate and channel layout of a segment.

/// Channel layout of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channels {
    Mono,
    Stereo,
}

impl Channels {
    /// Returns the number of interleaved samples per frame.
    pub const fn count(self) -> usize {
        match self {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        }
    }

    /// Maps a raw channel count to a layout, if supported.
    pub fn from_count(count: u16) -> Option<Self> {
        match count {
            1 => Some(Channels::Mono),
            2 => Some(Channels::Stereo),
            _ => None,
        }
    }
}

/// Describes how the samples of a segment are laid out in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Format {
    /// Sample rate in Hz (e.g., 44100, 48000).
    pub sample_rate: u32,
    /// Channel layout; stereo samples are interleaved.
    pub channels: Channels,
}

impl Format {
    /// Creates a mono format with the given sample rate.
    pub const fn mono(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: Channels::Mono,
        }
    }

    /// Creates a stereo format with the given sample rate.
    pub const fn stereo(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: Channels::Stereo,
        }
    }

    /// Returns the same sample rate with another channel layout.
    pub const fn with_channels(self, channels: Channels) -> Self {
        Self {
            sample_rate: self.sample_rate,
            channels,
        }
    }

    /// Returns true for stereo formats.
    pub fn is_stereo(&self) -> bool {
        self.channels == Channels::Stereo
    }

    /// Converts a duration in milliseconds to a frame count.
    ///
    /// Negative and non-finite durations map to zero frames.
    pub fn frames_in(&self, ms: f64) -> usize {
        let frames = (ms * self.sample_rate as f64 / 1000.0).round();
        if frames.is_finite() && frames > 0.0 {
            frames as usize
        } else {
            0
        }
    }

    /// Converts a frame count to an (unrounded) duration in milliseconds.
    pub fn millis(&self, frames: usize) -> f64 {
        frames as f64 / self.sample_rate as f64 * 1000.0
    }
}

// Common format presets
impl Format {
    /// 44.1kHz mono (CD quality mono)
    pub const MONO_44K: Format = Format::mono(44100);
    /// 48kHz mono
    pub const MONO_48K: Format = Format::mono(48000);
    /// 44.1kHz stereo (CD quality)
    pub const STEREO_44K: Format = Format::stereo(44100);
}

impl Default for Format {
    fn default() -> Self {
        Format::MONO_44K
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_channels() {
        assert_eq!(Format::mono(16000).channels.count(), 1);
        assert_eq!(Format::stereo(48000).channels.count(), 2);
        assert!(Format::STEREO_44K.is_stereo());
        assert!(!Format::MONO_44K.is_stereo());
    }

    #[test]
    fn test_channels_from_count() {
        assert_eq!(Channels::from_count(1), Some(Channels::Mono));
        assert_eq!(Channels::from_count(2), Some(Channels::Stereo));
        assert_eq!(Channels::from_count(6), None);
    }

    #[test]
    fn test_frames_in() {
        let fmt = Format::MONO_44K;
        assert_eq!(fmt.frames_in(1000.0), 44100);
        assert_eq!(fmt.frames_in(10.0), 441);
        // 0.5ms at 44.1kHz = 22.05 frames
        assert_eq!(fmt.frames_in(0.5), 22);
        assert_eq!(fmt.frames_in(-20.0), 0);
        assert_eq!(fmt.frames_in(f64::NAN), 0);
    }

    #[test]
    fn test_millis() {
        let fmt = Format::mono(16000);
        assert_eq!(fmt.millis(16000), 1000.0);
        assert_eq!(fmt.millis(1600), 100.0);
    }
}
