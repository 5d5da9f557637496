//! # speaker-core
//!
//! Platform-agnostic playback and capture core.
//!
//! Applications build graphs of pull-based [`Streamer`]s, wrap them in
//! effects and hand them to an [`Engine`], which mixes everything that is
//! playing and feeds the output device from its real-time callback.
//! Capture devices are exposed as streamers too, so recorded audio can be
//! routed back into the same graph. Device backends implement the
//! [`AudioBackend`] trait and only ever see interleaved i16 LE bytes.
//!
//! ## Architecture
//!
//! ```text
//! speaker-core (this crate)
//! ├── traits/       ← Streamer, AudioBackend, DeviceHandle
//! ├── models/       ← Sample, SampleRate, EngineConfig, DeviceInfo, StreamError, EngineState
//! ├── processing/   ← Mixer, RingBuffer, PCM codec, Seq/Callback/Silence
//! ├── effects/      ← Gain, Volume, Ctrl, Resampler
//! ├── session/      ← Engine, PlaybackBridge, DeviceCapture
//! └── backend/      ← ManualBackend (headless, explicitly driven)
//! ```

pub mod backend;
pub mod effects;
pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use backend::ManualBackend;
pub use effects::{Ctrl, Gain, Resampler, Volume};
pub use models::config::{EngineConfig, StreamFormat};
pub use models::device::{DeviceInfo, DeviceKind};
pub use models::error::{Result, StreamError};
pub use models::sample::{Sample, SampleRate, SILENCE};
pub use models::state::EngineState;
pub use processing::compose::{Callback, Seq, Silence, StreamerFn};
pub use processing::mixer::Mixer;
pub use processing::ring_buffer::RingBuffer;
pub use session::capture::{CaptureCancel, CaptureOptions, CaptureStats, DeviceCapture};
pub use session::engine::{DeviceChooser, Engine, EngineLock};
pub use session::playback::PlaybackBridge;
pub use traits::backend::{AudioBackend, CaptureCallback, DeviceHandle, PlaybackCallback};
pub use traits::streamer::{shared, Shared, Streamer};
