//! Streamer wrappers that transform the output of exactly one streamer.
//!
//! Effects compose linearly:
//!
//! ```text
//! source → Gain → Ctrl → Resampler → Volume → Engine::play
//! ```

pub mod ctrl;
pub mod gain;
pub mod resampler;
pub mod volume;

pub use ctrl::Ctrl;
pub use gain::Gain;
pub use resampler::Resampler;
pub use volume::Volume;
