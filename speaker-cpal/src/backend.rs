//! `AudioBackend` over a cpal host.

use speaker_core::{
    AudioBackend, CaptureCallback, DeviceHandle, DeviceInfo, DeviceKind, PlaybackCallback, StreamError,
    StreamFormat,
};

use crate::devices;
use crate::stream_thread::{CpalStreamHandle, StreamCallback};

/// Host audio through cpal. Streams are opened as interleaved i16.
#[derive(Debug, Clone, Copy)]
pub struct CpalBackend {
    host_id: cpal::HostId,
}

impl CpalBackend {
    /// Use the platform's default host.
    pub fn new() -> Self {
        Self {
            host_id: cpal::default_host().id(),
        }
    }

    /// Use a specific host, e.g. JACK instead of ALSA.
    pub fn with_host(host_id: cpal::HostId) -> Self {
        Self { host_id }
    }

    pub fn host_id(&self) -> cpal::HostId {
        self.host_id
    }

    fn host(&self) -> Result<cpal::Host, StreamError> {
        cpal::host_from_id(self.host_id).map_err(|e| StreamError::DeviceEnumeration(e.to_string()))
    }

    fn open(
        &self,
        device: &DeviceInfo,
        expected: DeviceKind,
        format: StreamFormat,
        callback: StreamCallback,
    ) -> Result<Box<dyn DeviceHandle>, StreamError> {
        if device.kind != expected {
            return Err(StreamError::Configuration(format!(
                "{} is a {:?} device, expected {:?}",
                device.name, device.kind, expected
            )));
        }
        let handle = CpalStreamHandle::open(self.host_id, device, format, callback)?;
        Ok(Box::new(handle))
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn playback_devices(&self) -> Result<Vec<DeviceInfo>, StreamError> {
        devices::list(&self.host()?, DeviceKind::Playback)
    }

    fn capture_devices(&self) -> Result<Vec<DeviceInfo>, StreamError> {
        devices::list(&self.host()?, DeviceKind::Capture)
    }

    fn open_playback(
        &self,
        device: &DeviceInfo,
        format: StreamFormat,
        callback: PlaybackCallback,
    ) -> Result<Box<dyn DeviceHandle>, StreamError> {
        self.open(device, DeviceKind::Playback, format, StreamCallback::Playback(callback))
    }

    fn open_capture(
        &self,
        device: &DeviceInfo,
        format: StreamFormat,
        callback: CaptureCallback,
    ) -> Result<Box<dyn DeviceHandle>, StreamError> {
        self.open(device, DeviceKind::Capture, format, StreamCallback::Capture(callback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speaker_core::SampleRate;

    #[test]
    fn rejects_wrong_direction() {
        let backend = CpalBackend::new();
        let format = StreamFormat::new(SampleRate(44_100), 2, 441);
        let result = backend.open_playback(&DeviceInfo::default_capture(), format, Box::new(|_: &mut [u8]| {}));
        assert!(matches!(result, Err(StreamError::Configuration(_))));
    }

    #[test]
    fn enumeration_lists_only_requested_direction() {
        // May fail on CI machines without audio hardware
        let backend = CpalBackend::new();
        if let Ok(devices) = backend.playback_devices() {
            assert!(devices.iter().all(|d| d.kind == DeviceKind::Playback));
        }
    }

    #[test]
    fn unknown_device_fails_to_open() {
        let backend = CpalBackend::new();
        let format = StreamFormat::new(SampleRate(44_100), 2, 441);
        let device = DeviceInfo::new("no-such-device", "No Such Device", DeviceKind::Playback, false);
        let result = backend.open_playback(&device, format, Box::new(|_: &mut [u8]| {}));
        assert!(result.is_err());
    }
}
