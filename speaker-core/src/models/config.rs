use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::StreamError;
use super::sample::SampleRate;

/// Bytes per encoded sample on the device side (signed 16-bit).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Playback is always rendered as interleaved stereo.
pub const PLAYBACK_CHANNELS: u16 = 2;

/// Fixed wire format of one device stream for the lifetime of an
/// init/close cycle: i16 little-endian, interleaved by channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: SampleRate,
    pub channels: u16,
    pub buffer_frames: usize,
}

impl StreamFormat {
    pub fn new(sample_rate: SampleRate, channels: u16, buffer_frames: usize) -> Self {
        Self {
            sample_rate,
            channels,
            buffer_frames,
        }
    }

    /// Size of one interleaved frame in bytes.
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * BYTES_PER_SAMPLE
    }

    /// Size of one device buffer in bytes.
    pub fn buffer_bytes(&self) -> usize {
        self.buffer_frames * self.frame_bytes()
    }
}

/// Configuration for an engine init cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output sample rate (default: 44100).
    pub sample_rate: SampleRate,

    /// Frames pulled from the mixer per update (default: 4410, 100 ms).
    pub buffer_frames: usize,

    /// Capture ring capacity, in device buffers (default: 4).
    pub capture_periods: usize,

    /// Upper bound on a capture consumer's wait for data, in milliseconds.
    /// `None` waits until data arrives or the capture is cancelled.
    pub capture_wait_timeout_ms: Option<u64>,
}

impl EngineConfig {
    pub fn new(sample_rate: impl Into<SampleRate>, buffer_frames: usize) -> Self {
        Self {
            sample_rate: sample_rate.into(),
            buffer_frames,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        if self.sample_rate.0 == 0 {
            return Err(StreamError::Configuration("sample rate must be positive".into()));
        }
        if self.buffer_frames == 0 {
            return Err(StreamError::Configuration("buffer size must be positive".into()));
        }
        if self.capture_periods == 0 {
            return Err(StreamError::Configuration(
                "capture ring must hold at least one buffer".into(),
            ));
        }
        Ok(())
    }

    pub fn capture_wait_timeout(&self) -> Option<Duration> {
        self.capture_wait_timeout_ms.map(Duration::from_millis)
    }

    pub fn playback_format(&self) -> StreamFormat {
        StreamFormat::new(self.sample_rate, PLAYBACK_CHANNELS, self.buffer_frames)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: SampleRate(44_100),
            buffer_frames: 4_410,
            capture_periods: 4,
            capture_wait_timeout_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_rate_and_buffer() {
        assert!(EngineConfig::new(0, 512).validate().is_err());
        assert!(EngineConfig::new(48_000, 0).validate().is_err());

        let config = EngineConfig {
            capture_periods: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_partial_json() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"sample_rate": 48000, "capture_wait_timeout_ms": 250}"#).unwrap();

        assert_eq!(config.sample_rate, SampleRate(48_000));
        assert_eq!(config.buffer_frames, 4_410);
        assert_eq!(config.capture_wait_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn playback_format_is_stereo() {
        let format = EngineConfig::new(48_000, 256).playback_format();
        assert_eq!(format.channels, 2);
        assert_eq!(format.frame_bytes(), 4);
        assert_eq!(format.buffer_bytes(), 1024);
    }
}
