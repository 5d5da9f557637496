use crate::models::device::DeviceInfo;
use crate::models::config::StreamFormat;
use crate::models::error::StreamError;

/// Real-time playback callback: fill the device's output slot with
/// interleaved i16 LE bytes.
pub type PlaybackCallback = Box<dyn FnMut(&mut [u8]) + Send + 'static>;

/// Real-time capture callback: receives interleaved i16 LE bytes exactly as
/// the device delivered them.
pub type CaptureCallback = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Interface to the host audio device layer.
///
/// Implemented by:
/// - `ManualBackend` (this crate), driven explicitly for offline rendering
/// - `CpalBackend` (`speaker-cpal`)
///
/// Callbacks fire on a thread owned by the backend. Keep them short and
/// never block inside them.
pub trait AudioBackend: Send + Sync {
    fn playback_devices(&self) -> Result<Vec<DeviceInfo>, StreamError>;

    fn capture_devices(&self) -> Result<Vec<DeviceInfo>, StreamError>;

    /// Open an output device. The device must not call `callback` until
    /// the returned handle is started.
    fn open_playback(
        &self,
        device: &DeviceInfo,
        format: StreamFormat,
        callback: PlaybackCallback,
    ) -> Result<Box<dyn DeviceHandle>, StreamError>;

    /// Open an input device. The device must not call `callback` until
    /// the returned handle is started.
    fn open_capture(
        &self,
        device: &DeviceInfo,
        format: StreamFormat,
        callback: CaptureCallback,
    ) -> Result<Box<dyn DeviceHandle>, StreamError>;
}

/// An opened device stream.
pub trait DeviceHandle: Send {
    fn start(&mut self) -> Result<(), StreamError>;

    /// Stop delivering callbacks and release the device. Must be safe to
    /// call more than once.
    fn stop(&mut self);
}
