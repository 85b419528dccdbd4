//! Concatenative singing synthesis.
//!
//! Notes are sung by pitching a voicebank sample, fitting its vowel to the
//! note's length and splicing the result into a growing timeline:
//!
//! - [`Note`]: a sung note or a rest on a track's timeline
//! - [`Engine`]: the pitch and stretch capabilities, with [`DefaultEngine`]
//!   built in
//! - [`Renderer`]: the stitcher turning a note timeline into audio
//! - [`Project`]: named tracks rendered in parallel and mixed down
//!
//! # Example
//!
//! ```rust,no_run
//! use uta_synth::{DefaultEngine, Note, Renderer, Tempo};
//! use uta_audio::Format;
//! use uta_oto::Voicebank;
//!
//! let vb = Voicebank::open("voice").unwrap();
//! let engine = DefaultEngine::default();
//! let tempo = Tempo::new(120.0);
//!
//! let notes = vec![
//!     tempo.sung("ka", 60.0, 1.0),
//!     tempo.sung("a", 62.0, 1.0),
//!     Note::rest(250.0),
//! ];
//!
//! let renderer = Renderer::new(&vb, &engine, Format::MONO_44K).with_workers(4);
//! renderer.setup().unwrap();
//! let song = renderer.render(&notes).unwrap();
//! song.export_wav("song.wav").unwrap();
//! ```

mod config;
pub mod dsp;
mod engine;
mod error;
mod note;
mod pool;
mod project;
mod render;

pub use config::{ProjectConfig, DEFAULT_SAMPLE_RATE};
pub use engine::{DefaultEngine, Engine};
pub use error::{Result, SynthError};
pub use note::{total_duration, Note, Tempo};
pub use pool::{default_workers, run_indexed};
pub use project::{Project, ProjectFile, Track};
pub use render::{Renderer, Timing};
