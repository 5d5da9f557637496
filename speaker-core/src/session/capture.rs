use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::models::config::StreamFormat;
use crate::models::device::{DeviceInfo, DeviceKind};
use crate::models::error::StreamError;
use crate::models::sample::Sample;
use crate::processing::pcm;
use crate::processing::ring_buffer::RingBuffer;
use crate::traits::backend::{AudioBackend, DeviceHandle};
use crate::traits::streamer::Streamer;

/// Tuning for a capture stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Ring capacity in device buffers.
    pub periods: usize,
    /// Longest a read waits for the device; `None` waits until data
    /// arrives or the capture is cancelled.
    pub wait_timeout: Option<Duration>,
    /// When false a read never waits: an empty ring yields `(0, true)`.
    /// Captures pulled from the playback callback must not block.
    pub blocking: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            periods: 4,
            wait_timeout: None,
            blocking: true,
        }
    }
}

/// Point-in-time counters for a capture stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub buffered_bytes: usize,
    pub capacity_bytes: usize,
    pub overwritten_bytes: u64,
    pub deliveries: u64,
    pub resyncs: u64,
}

/// State shared between the device's capture callback and the reader.
struct RingState {
    ring: RingBuffer,
    /// The reader is parked on `ready` and wants exactly one wake-up.
    waiting: bool,
    cancelled: bool,
    deliveries: u64,
    resyncs: u64,
}

struct CaptureShared {
    state: Mutex<RingState>,
    ready: Condvar,
    frame_bytes: usize,
}

impl CaptureShared {
    /// Producer side, called on the device thread. Never blocks beyond the
    /// short ring lock.
    fn deliver(&self, bytes: &[u8]) {
        let mut state = self.state.lock();
        if state.cancelled {
            return;
        }
        state.deliveries += 1;

        if bytes.len() % self.frame_bytes != 0 {
            // A torn frame would shift every later sample across channels.
            log::warn!(
                "capture delivered {} bytes, not a multiple of {}-byte frames; resetting ring",
                bytes.len(),
                self.frame_bytes
            );
            state.ring.reset();
            state.resyncs += 1;
            return;
        }

        state.ring.write(bytes);
        if state.waiting {
            state.waiting = false;
            self.ready.notify_one();
        }
    }

    fn cancel(&self) {
        let mut state = self.state.lock();
        state.cancelled = true;
        state.waiting = false;
        self.ready.notify_all();
    }
}

/// Wakes and ends a [`DeviceCapture`] from any thread.
///
/// Holds only a weak reference; cancelling a capture that has already been
/// dropped does nothing.
#[derive(Clone)]
pub struct CaptureCancel(Weak<CaptureShared>);

impl CaptureCancel {
    pub fn cancel(&self) {
        if let Some(shared) = self.0.upgrade() {
            shared.cancel();
        }
    }

    /// Whether the capture it belongs to still exists.
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

/// A streamer reading from a capture device.
///
/// The device thread writes raw i16 LE bytes into a ring buffer
/// (overwriting the oldest on overflow); `stream` decodes whatever is
/// buffered, blocking only while the ring is empty. Only one thread may
/// call `stream` at a time.
///
/// The stream does not end on its own. After [`CaptureCancel::cancel`]
/// (or engine close) it returns `(0, false)` with no error.
pub struct DeviceCapture {
    shared: Arc<CaptureShared>,
    device: Box<dyn DeviceHandle>,
    format: StreamFormat,
    wait_timeout: Option<Duration>,
    blocking: bool,
    bytes: Vec<u8>,
    stopped: bool,
}

impl DeviceCapture {
    /// Open and start `device` on `backend`.
    pub fn open(
        backend: &dyn AudioBackend,
        device: &DeviceInfo,
        format: StreamFormat,
        options: CaptureOptions,
    ) -> Result<Self, StreamError> {
        if device.kind != DeviceKind::Capture {
            return Err(StreamError::Configuration(format!(
                "{} is not a capture device",
                device.name
            )));
        }
        if ![1, 2].contains(&format.channels) {
            return Err(StreamError::Configuration(format!(
                "unsupported capture channel count: {}",
                format.channels
            )));
        }
        if format.sample_rate.0 == 0 || format.buffer_frames == 0 || options.periods == 0 {
            return Err(StreamError::Configuration(
                "capture rate, buffer size and periods must be positive".into(),
            ));
        }

        let shared = Arc::new(CaptureShared {
            state: Mutex::new(RingState {
                ring: RingBuffer::new(format.buffer_bytes() * options.periods),
                waiting: false,
                cancelled: false,
                deliveries: 0,
                resyncs: 0,
            }),
            ready: Condvar::new(),
            frame_bytes: format.frame_bytes(),
        });

        let producer = Arc::clone(&shared);
        let mut handle = backend.open_capture(
            device,
            format,
            Box::new(move |bytes: &[u8]| producer.deliver(bytes)),
        )?;
        if let Err(e) = handle.start() {
            handle.stop();
            return Err(e);
        }
        log::debug!(
            "capture started on {} ({}, {} ch, {} frames)",
            device.name,
            format.sample_rate,
            format.channels,
            format.buffer_frames
        );

        Ok(Self {
            shared,
            device: handle,
            format,
            wait_timeout: options.wait_timeout,
            blocking: options.blocking,
            bytes: vec![0; format.buffer_bytes()],
            stopped: false,
        })
    }

    /// Switch to reads that return immediately on an empty ring, for
    /// captures played back through an engine.
    pub fn non_blocking(mut self) -> Self {
        self.blocking = false;
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn cancel_token(&self) -> CaptureCancel {
        CaptureCancel(Arc::downgrade(&self.shared))
    }

    pub fn stats(&self) -> CaptureStats {
        let state = self.shared.state.lock();
        CaptureStats {
            buffered_bytes: state.ring.count(),
            capacity_bytes: state.ring.capacity(),
            overwritten_bytes: state.ring.overwritten(),
            deliveries: state.deliveries,
            resyncs: state.resyncs,
        }
    }

    fn stop_device(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.device.stop();
        }
    }

    /// Wait until the ring holds data, then copy out up to `want` bytes of
    /// whole frames. `None` means the capture was cancelled.
    fn read_bytes(&mut self, want: usize) -> Option<usize> {
        let deadline = self.wait_timeout.map(|t| Instant::now() + t);
        let mut state = self.shared.state.lock();

        while self.blocking && state.ring.is_empty() && !state.cancelled {
            state.waiting = true;
            match deadline {
                Some(deadline) => {
                    if self.shared.ready.wait_until(&mut state, deadline).timed_out() {
                        state.waiting = false;
                        break;
                    }
                }
                None => self.shared.ready.wait(&mut state),
            }
        }
        if state.cancelled {
            return None;
        }

        let frame_bytes = self.format.frame_bytes();
        let take = want.min(state.ring.count()) / frame_bytes * frame_bytes;
        Some(state.ring.read_into(&mut self.bytes[..take]))
    }
}

impl Streamer for DeviceCapture {
    fn stream(&mut self, samples: &mut [Sample]) -> (usize, bool) {
        if self.stopped {
            return (0, false);
        }
        if samples.is_empty() {
            return (0, true);
        }
        let want = samples.len() * self.format.frame_bytes();
        if self.bytes.len() < want {
            self.bytes.resize(want, 0);
        }

        let Some(read) = self.read_bytes(want) else {
            self.stop_device();
            return (0, false);
        };
        let frames = pcm::decode_frames(&self.bytes[..read], self.format.channels, samples);
        (frames, true)
    }
}

impl Drop for DeviceCapture {
    fn drop(&mut self) {
        self.shared.cancel();
        self.stop_device();
    }
}
