use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::models::config::{EngineConfig, StreamFormat};
use crate::models::device::DeviceInfo;
use crate::models::error::StreamError;
use crate::models::sample::SampleRate;
use crate::models::state::EngineState;
use crate::processing::mixer::Mixer;
use crate::session::capture::{CaptureCancel, CaptureOptions, DeviceCapture};
use crate::session::playback::PlaybackBridge;
use crate::traits::backend::{AudioBackend, DeviceHandle};
use crate::traits::streamer::Streamer;

/// Picks the output device from the enumerated list during init. Returning
/// `None` keeps the device set with [`Engine::set_playback_device`].
pub type DeviceChooser<'a> = &'a dyn Fn(&[DeviceInfo]) -> Option<DeviceInfo>;

/// Exclusive access to the live mixer. While held, the output device
/// cannot pull new audio; drop it as soon as possible.
pub type EngineLock<'a> = MutexGuard<'a, Mixer>;

/// Owns one output device and the mixer it plays.
///
/// Data flow:
/// ```text
/// play(streamer) → [Mixer] ← lock ─ [PlaybackBridge] → i16 LE bytes → device
/// device capture → [RingBuffer] → DeviceCapture::stream → Streamer graph
/// ```
///
/// Several engines may coexist; each owns its own mixer, device handle and
/// registered captures. Dropping an engine closes it.
pub struct Engine<B: AudioBackend> {
    backend: B,
    config: EngineConfig,
    mixer: Arc<Mutex<Mixer>>,
    playback_device: DeviceInfo,
    player: Option<Box<dyn DeviceHandle>>,
    captures: Vec<CaptureCancel>,
    state: EngineState,
}

impl<B: AudioBackend> Engine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: EngineConfig::default(),
            mixer: Arc::new(Mutex::new(Mixer::new())),
            playback_device: DeviceInfo::default_playback(),
            player: None,
            captures: Vec::new(),
            state: EngineState::Idle,
        }
    }

    /// Start playback on the selected (initially the default) output device.
    ///
    /// `buffer_frames` is the number of frames pulled from the mixer at a
    /// time: larger buffers cost less CPU and survive scheduling hiccups,
    /// smaller ones react faster.
    pub fn init(&mut self, sample_rate: impl Into<SampleRate>, buffer_frames: usize) -> Result<(), StreamError> {
        self.init_device_selection(sample_rate, buffer_frames, None)
    }

    /// Like [`Engine::init`], letting `chooser` pick the output device from
    /// the enumerated list.
    pub fn init_device_selection(
        &mut self,
        sample_rate: impl Into<SampleRate>,
        buffer_frames: usize,
        chooser: Option<DeviceChooser<'_>>,
    ) -> Result<(), StreamError> {
        let config = EngineConfig {
            sample_rate: sample_rate.into(),
            buffer_frames,
            ..self.config.clone()
        };
        self.init_with_config(config, chooser)
    }

    /// Tear down any running device, then open and start a new one with an
    /// empty mixer.
    pub fn init_with_config(
        &mut self,
        config: EngineConfig,
        chooser: Option<DeviceChooser<'_>>,
    ) -> Result<(), StreamError> {
        config.validate()?;
        self.close();

        let mut device = self.playback_device.clone();
        if let Some(choose) = chooser {
            let devices = self.backend.playback_devices()?;
            if let Some(chosen) = choose(&devices) {
                device = chosen;
            }
        }

        self.mixer = Arc::new(Mutex::new(Mixer::new()));
        let bridge = PlaybackBridge::new(Arc::clone(&self.mixer), config.buffer_frames);
        let format = config.playback_format();

        let mut player = self
            .backend
            .open_playback(&device, format, bridge.into_callback())?;
        if let Err(e) = player.start() {
            player.stop();
            return Err(e);
        }

        log::debug!(
            "playback started on {} ({}, {} frames per update)",
            device.name,
            config.sample_rate,
            config.buffer_frames
        );
        self.player = Some(player);
        self.state = EngineState::Running {
            sample_rate: config.sample_rate,
            buffer_frames: config.buffer_frames,
        };
        self.config = config;
        Ok(())
    }

    /// Lock the mixer to change playing streamers without racing the
    /// device. Unlock by dropping the guard.
    pub fn lock(&self) -> EngineLock<'_> {
        self.mixer.lock()
    }

    /// Start playing all `streamers`.
    pub fn play<I>(&self, streamers: I)
    where
        I: IntoIterator<Item = Box<dyn Streamer>>,
    {
        self.mixer.lock().add(streamers);
    }

    pub fn play_one(&self, streamer: impl Streamer + 'static) {
        self.mixer.lock().add_one(streamer);
    }

    /// Remove every playing streamer.
    pub fn clear(&self) {
        self.mixer.lock().clear();
    }

    /// Stop and release the output device and wake any capture reader.
    /// Safe to call at any time, any number of times.
    pub fn close(&mut self) {
        for capture in self.captures.drain(..) {
            capture.cancel();
        }
        if let Some(mut player) = self.player.take() {
            player.stop();
            log::debug!("playback stopped");
        }
        if self.state.is_running() {
            self.state = EngineState::Closed;
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Wire format of the running output device.
    pub fn playback_format(&self) -> Result<StreamFormat, StreamError> {
        match self.state {
            EngineState::Running { .. } => Ok(self.config.playback_format()),
            _ => Err(StreamError::NotInitialized),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn playback_devices(&self) -> Result<Vec<DeviceInfo>, StreamError> {
        self.backend.playback_devices()
    }

    pub fn capture_devices(&self) -> Result<Vec<DeviceInfo>, StreamError> {
        self.backend.capture_devices()
    }

    /// Output device used by the next init.
    pub fn set_playback_device(&mut self, device: DeviceInfo) {
        self.playback_device = device;
    }

    pub fn playback_device(&self) -> &DeviceInfo {
        &self.playback_device
    }

    /// Open a capture device as a streamer, with ring size and wait timeout
    /// taken from the engine config.
    ///
    /// Does not need a running output device. The capture is cancelled
    /// when the engine closes. Reads block until data arrives; call
    /// [`DeviceCapture::non_blocking`] before handing the capture to
    /// [`Engine::play`] so the output device is never stalled.
    pub fn device_capture(
        &mut self,
        sample_rate: impl Into<SampleRate>,
        device: &DeviceInfo,
        buffer_frames: usize,
        channels: u16,
    ) -> Result<DeviceCapture, StreamError> {
        let options = CaptureOptions {
            periods: self.config.capture_periods,
            wait_timeout: self.config.capture_wait_timeout(),
            blocking: true,
        };
        self.device_capture_with(sample_rate, device, buffer_frames, channels, options)
    }

    pub fn device_capture_with(
        &mut self,
        sample_rate: impl Into<SampleRate>,
        device: &DeviceInfo,
        buffer_frames: usize,
        channels: u16,
        options: CaptureOptions,
    ) -> Result<DeviceCapture, StreamError> {
        let format = StreamFormat::new(sample_rate.into(), channels, buffer_frames);
        let capture = DeviceCapture::open(&self.backend, device, format, options)?;

        self.captures.retain(CaptureCancel::is_alive);
        self.captures.push(capture.cancel_token());
        Ok(capture)
    }
}

impl<B: AudioBackend> Drop for Engine<B> {
    fn drop(&mut self) {
        self.close();
    }
}
