//! Audio segments for concatenative singing synthesis.
//!
//! This crate provides the buffer abstraction the stitcher works on:
//!
//! - [`Segment`]: an immutable, millisecond-indexed buffer of `f64` samples
//! - [`SegmentMut`]: the only writable view, detached from the segment it
//!   was copied from and frozen back when done
//! - [`mix`]: additive mixdown of independently rendered tracks
//!
//! # Example
//!
//! ```rust
//! use uta_audio::{Repeat, Segment};
//!
//! // 300ms of silence at 44.1kHz
//! let base = Segment::silent(300.0, 44100);
//!
//! // Retile a 50ms grain over the whole base
//! let grain = Segment::silent(50.0, 44100).gain(-6.0);
//! let looped = base.overlay_repeat(&grain, 0.0, Repeat::Loop).unwrap();
//! assert_eq!(looped.len(), 300);
//!
//! // Join two segments with a 20ms crossfade
//! let joined = base.append(&looped, 20.0).unwrap();
//! assert_eq!(joined.len(), 580);
//! ```

mod error;
mod format;
mod mix;
pub mod resample;
mod segment;
mod wav;

pub use error::{AudioError, Result};
pub use format::{Channels, Format};
pub use mix::mix;
pub use segment::{db_to_amplitude, Repeat, Segment, SegmentMut, SILENCE_DB};
