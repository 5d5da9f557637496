//! A device layer with no hardware behind it.
//!
//! Callbacks fire only when the owner asks: [`ManualBackend::render`] plays
//! the role of the output device's real-time thread and
//! [`ManualBackend::deliver`] that of the input device's. Useful for
//! rendering offline and for exercising the engine deterministically.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::StreamFormat;
use crate::models::device::{DeviceInfo, DeviceKind};
use crate::models::error::StreamError;
use crate::traits::backend::{AudioBackend, CaptureCallback, DeviceHandle, PlaybackCallback};

enum Callback {
    Playback(PlaybackCallback),
    Capture(CaptureCallback),
}

/// One opened device. Only the callback sits behind a lock, so a callback
/// that is waiting never stops other slots from being found.
struct Slot {
    device: DeviceInfo,
    format: StreamFormat,
    running: AtomicBool,
    released: AtomicBool,
    callback: Mutex<Option<Callback>>,
}

impl Slot {
    fn is_running(&self, kind: DeviceKind) -> bool {
        self.device.kind == kind && self.running.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct ManualState {
    playback_devices: Vec<DeviceInfo>,
    capture_devices: Vec<DeviceInfo>,
    slots: Vec<Arc<Slot>>,
    fail_enumeration: bool,
    fail_open: bool,
    fail_start: bool,
}

/// Cloneable handle to a manually driven device layer. Clones share state,
/// so a test can keep one while the engine owns another.
#[derive(Clone)]
pub struct ManualBackend {
    inner: Arc<Mutex<ManualState>>,
}

impl Default for ManualBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualBackend {
    /// One default output ("Manual Output") and one default input
    /// ("Manual Input").
    pub fn new() -> Self {
        Self::with_devices(
            vec![DeviceInfo::new("manual-out", "Manual Output", DeviceKind::Playback, true)],
            vec![DeviceInfo::new("manual-in", "Manual Input", DeviceKind::Capture, true)],
        )
    }

    pub fn with_devices(playback: Vec<DeviceInfo>, capture: Vec<DeviceInfo>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualState {
                playback_devices: playback,
                capture_devices: capture,
                ..ManualState::default()
            })),
        }
    }

    pub fn set_fail_enumeration(&self, fail: bool) {
        self.inner.lock().fail_enumeration = fail;
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.inner.lock().fail_open = fail;
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.inner.lock().fail_start = fail;
    }

    /// Run the most recently opened running output device for `frames`
    /// frames and return the bytes it produced. Returns `None` when no
    /// output device is running.
    pub fn render(&self, frames: usize) -> Option<Vec<u8>> {
        let slot = self.running_slots(DeviceKind::Playback).pop()?;
        let mut out = vec![0u8; frames * slot.format.frame_bytes()];
        match slot.callback.lock().as_mut() {
            Some(Callback::Playback(cb)) => cb(&mut out),
            _ => return None,
        }
        Some(out)
    }

    /// Hand `bytes` to every running input device, as the hardware
    /// capture thread would.
    pub fn deliver(&self, bytes: &[u8]) {
        for slot in self.running_slots(DeviceKind::Capture) {
            if let Some(Callback::Capture(cb)) = slot.callback.lock().as_mut() {
                cb(bytes);
            }
        }
    }

    pub fn playback_running(&self) -> bool {
        !self.running_slots(DeviceKind::Playback).is_empty()
    }

    pub fn capture_running(&self) -> bool {
        !self.running_slots(DeviceKind::Capture).is_empty()
    }

    /// Device and format of the running output device, if any.
    pub fn active_playback(&self) -> Option<(DeviceInfo, StreamFormat)> {
        let slot = self.running_slots(DeviceKind::Playback).pop()?;
        Some((slot.device.clone(), slot.format))
    }

    fn running_slots(&self, kind: DeviceKind) -> Vec<Arc<Slot>> {
        // Collect first so callbacks never run under the backend lock.
        self.inner
            .lock()
            .slots
            .iter()
            .filter(|slot| slot.is_running(kind))
            .cloned()
            .collect()
    }

    fn open(
        &self,
        device: &DeviceInfo,
        format: StreamFormat,
        callback: Callback,
    ) -> Result<Box<dyn DeviceHandle>, StreamError> {
        let mut state = self.inner.lock();
        if state.fail_open {
            return Err(StreamError::DeviceOpen(format!("{} refused to open", device.name)));
        }
        let known = match device.kind {
            DeviceKind::Playback => &state.playback_devices,
            DeviceKind::Capture => &state.capture_devices,
        };
        let resolved = resolve(device, known)?;

        state.slots.retain(|slot| !slot.released.load(Ordering::SeqCst));
        let slot = Arc::new(Slot {
            device: resolved,
            format,
            running: AtomicBool::new(false),
            released: AtomicBool::new(false),
            callback: Mutex::new(Some(callback)),
        });
        state.slots.push(Arc::clone(&slot));

        Ok(Box::new(ManualHandle {
            slot,
            fail_start: state.fail_start,
        }))
    }
}

fn resolve(device: &DeviceInfo, known: &[DeviceInfo]) -> Result<DeviceInfo, StreamError> {
    let found = if device.is_default_placeholder() {
        known.iter().find(|d| d.is_default).or_else(|| known.first())
    } else {
        known.iter().find(|d| d.id == device.id)
    };
    found
        .cloned()
        .ok_or_else(|| StreamError::DeviceNotFound(device.name.clone()))
}

impl AudioBackend for ManualBackend {
    fn playback_devices(&self) -> Result<Vec<DeviceInfo>, StreamError> {
        let state = self.inner.lock();
        if state.fail_enumeration {
            return Err(StreamError::DeviceEnumeration("manual backend enumeration disabled".into()));
        }
        Ok(state.playback_devices.clone())
    }

    fn capture_devices(&self) -> Result<Vec<DeviceInfo>, StreamError> {
        let state = self.inner.lock();
        if state.fail_enumeration {
            return Err(StreamError::DeviceEnumeration("manual backend enumeration disabled".into()));
        }
        Ok(state.capture_devices.clone())
    }

    fn open_playback(
        &self,
        device: &DeviceInfo,
        format: StreamFormat,
        callback: PlaybackCallback,
    ) -> Result<Box<dyn DeviceHandle>, StreamError> {
        self.open(device, format, Callback::Playback(callback))
    }

    fn open_capture(
        &self,
        device: &DeviceInfo,
        format: StreamFormat,
        callback: CaptureCallback,
    ) -> Result<Box<dyn DeviceHandle>, StreamError> {
        self.open(device, format, Callback::Capture(callback))
    }
}

struct ManualHandle {
    slot: Arc<Slot>,
    fail_start: bool,
}

impl DeviceHandle for ManualHandle {
    fn start(&mut self) -> Result<(), StreamError> {
        let slot = &self.slot;
        if self.fail_start {
            return Err(StreamError::DeviceStart(format!("{} refused to start", slot.device.name)));
        }
        if slot.released.load(Ordering::SeqCst) {
            return Err(StreamError::DeviceStart(format!("{} already released", slot.device.name)));
        }
        slot.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.slot.running.store(false, Ordering::SeqCst);
        if !self.slot.released.swap(true, Ordering::SeqCst) {
            // Waits for a callback in flight, then drops it.
            self.slot.callback.lock().take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample::SampleRate;

    fn format() -> StreamFormat {
        StreamFormat::new(SampleRate(48_000), 2, 64)
    }

    #[test]
    fn callbacks_only_fire_while_running() {
        let backend = ManualBackend::new();
        let mut handle = backend
            .open_playback(
                &DeviceInfo::default_playback(),
                format(),
                Box::new(|out: &mut [u8]| out.fill(7)),
            )
            .unwrap();

        assert!(backend.render(4).is_none());

        handle.start().unwrap();
        assert_eq!(backend.render(4), Some(vec![7u8; 16]));

        handle.stop();
        handle.stop();
        assert!(backend.render(4).is_none());
        assert!(handle.start().is_err());
    }

    #[test]
    fn default_placeholder_resolves_to_default_device() {
        let backend = ManualBackend::with_devices(
            vec![
                DeviceInfo::new("a", "Speakers", DeviceKind::Playback, false),
                DeviceInfo::new("b", "Headphones", DeviceKind::Playback, true),
            ],
            Vec::new(),
        );
        let mut handle = backend
            .open_playback(&DeviceInfo::default_playback(), format(), Box::new(|_: &mut [u8]| {}))
            .unwrap();
        handle.start().unwrap();

        let (device, _) = backend.active_playback().unwrap();
        assert_eq!(device.name, "Headphones");
    }

    #[test]
    fn unknown_device_is_not_found() {
        let backend = ManualBackend::new();
        let ghost = DeviceInfo::new("ghost", "Ghost", DeviceKind::Capture, false);
        let result = backend.open_capture(&ghost, format(), Box::new(|_: &[u8]| {}));
        assert!(matches!(result, Err(StreamError::DeviceNotFound(_))));
    }

    #[test]
    fn capture_delivery_while_playback_callback_waits() {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let backend = ManualBackend::new();
        let (tx, rx) = mpsc::channel::<u8>();
        let mut output = backend
            .open_playback(
                &DeviceInfo::default_playback(),
                format(),
                Box::new(move |out: &mut [u8]| {
                    out.fill(rx.recv().unwrap_or(0));
                }),
            )
            .unwrap();
        let mut input = backend
            .open_capture(
                &DeviceInfo::default_capture(),
                format(),
                Box::new(move |bytes: &[u8]| {
                    let _ = tx.send(bytes[0]);
                }),
            )
            .unwrap();
        output.start().unwrap();
        input.start().unwrap();

        let renderer = backend.clone();
        let render = thread::spawn(move || renderer.render(1));
        thread::sleep(Duration::from_millis(20));

        assert!(backend.playback_running());
        assert!(backend.capture_running());
        backend.deliver(&[9, 9, 9, 9]);

        assert_eq!(render.join().unwrap(), Some(vec![9u8; 4]));
    }

    #[test]
    fn injected_failures() {
        let backend = ManualBackend::new();
        backend.set_fail_enumeration(true);
        assert!(matches!(backend.capture_devices(), Err(StreamError::DeviceEnumeration(_))));

        backend.set_fail_open(true);
        let result = backend.open_playback(&DeviceInfo::default_playback(), format(), Box::new(|_: &mut [u8]| {}));
        assert!(matches!(result, Err(StreamError::DeviceOpen(_))));
    }
}
