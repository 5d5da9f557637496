//! # speaker-cpal
//!
//! cpal backend for speaker-core.
//!
//! Provides:
//! - `CpalBackend`: `AudioBackend` over a cpal host (ALSA/JACK, WASAPI, CoreAudio)
//! - `devices`: output/input enumeration as `DeviceInfo`
//! - `stream_thread`: device streams owned by dedicated watcher threads
//!
//! ## Usage
//! ```no_run
//! use speaker_core::{Engine, SampleRate};
//! use speaker_cpal::CpalBackend;
//!
//! let sr = SampleRate(44_100);
//! let mut engine = Engine::new(CpalBackend::new());
//! engine.init(sr, sr.n(std::time::Duration::from_millis(50)))?;
//! # Ok::<(), speaker_core::StreamError>(())
//! ```

pub mod backend;
pub mod devices;
pub mod stream_thread;

pub use backend::CpalBackend;
