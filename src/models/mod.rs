//! Data models for playback, listening stats and widget preferences

mod playback;
mod preferences;
mod stats;

pub use playback::*;
pub use preferences::*;
pub use stats::*;
