//! UTAU-style voicebanks.
//!
//! A voicebank is a directory of recorded samples plus an `oto.ini` that
//! annotates each one with its timing geometry:
//!
//! ```text
//! a.wav=a,0,100,0,50,20
//! file  alias offset consonant cutoff preutterance overlap
//! ```
//!
//! - [`Sample`]: one oto.ini record and the consonant/vowel slicing it implies
//! - [`Frq`]: the binary frequency map cached next to each sample
//! - [`Voicebank`]: alias lookup with memoized audio and frq loading
//! - [`Pitch`]: scientific pitch notation and MIDI note numbers
//!
//! # Example
//!
//! ```rust
//! use uta_oto::{Sample, Voicebank};
//!
//! let samples = Voicebank::parse_config("a.wav=a,0,100,0,50,20\n").unwrap();
//! let vb = Voicebank::new("voice", samples);
//!
//! let sample: &Sample = vb.get("a").unwrap();
//! assert_eq!(sample.consonant, 100.0);
//! assert!(vb.get("ka").is_err());
//! ```

mod cache;
mod error;
pub mod frq;
mod pitch;
mod sample;
mod voicebank;

pub use cache::Cache;
pub use error::{OtoError, Result};
pub use frq::{Frame, Frq};
pub use pitch::{Pitch, CONCERT_PITCH};
pub use sample::Sample;
pub use voicebank::{FrqAnalyzer, Voicebank, CONFIG_FILE};
