//! Signal processing used by the default engine.

mod shift;
mod stretch;
mod yin;

pub use shift::pitch_shift;
pub use stretch::{loop_fill, stretch, StretchMode};
pub use yin::YinAnalyzer;
