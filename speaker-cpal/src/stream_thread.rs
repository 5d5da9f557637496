//! Device streams owned by a dedicated watcher thread.
//!
//! A `cpal::Stream` is not `Send` on every host, so it never leaves the
//! thread that built it. The thread resolves the device, builds the stream
//! paused, reports the outcome back to the opener, then serves start/stop
//! commands until it is told to shut down or its handle is dropped.

use std::sync::Arc;
use std::thread;

use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;

use speaker_core::processing::pcm;
use speaker_core::{
    CaptureCallback, DeviceHandle, DeviceInfo, DeviceKind, PlaybackCallback, StreamError, StreamFormat,
};

use crate::devices;

/// Callback attached to a stream, by direction.
pub enum StreamCallback {
    Playback(PlaybackCallback),
    Capture(CaptureCallback),
}

impl StreamCallback {
    fn kind(&self) -> DeviceKind {
        match self {
            StreamCallback::Playback(_) => DeviceKind::Playback,
            StreamCallback::Capture(_) => DeviceKind::Capture,
        }
    }
}

enum Command {
    Start(Sender<Result<(), StreamError>>),
    Shutdown,
}

/// Build the cpal stream config for `format`.
///
/// With `fixed` set the device is asked for exactly `buffer_frames` frames
/// per callback; otherwise the host picks.
pub fn stream_config(format: StreamFormat, fixed: bool) -> cpal::StreamConfig {
    let buffer_size = if fixed {
        cpal::BufferSize::Fixed(format.buffer_frames.min(u32::MAX as usize) as u32)
    } else {
        cpal::BufferSize::Default
    };
    cpal::StreamConfig {
        channels: format.channels,
        sample_rate: cpal::SampleRate(format.sample_rate.0),
        buffer_size,
    }
}

/// Handle to a stream living on its watcher thread.
pub struct CpalStreamHandle {
    device_name: String,
    commands: Option<Sender<Command>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl CpalStreamHandle {
    /// Spawn the watcher thread and wait until the stream is built.
    pub fn open(
        host_id: cpal::HostId,
        device: &DeviceInfo,
        format: StreamFormat,
        callback: StreamCallback,
    ) -> Result<Self, StreamError> {
        let (ready_tx, ready_rx) = bounded::<Result<String, StreamError>>(1);
        let (cmd_tx, cmd_rx) = bounded::<Command>(1);
        let device = device.clone();
        let thread_name = match callback.kind() {
            DeviceKind::Playback => "speaker-playback",
            DeviceKind::Capture => "speaker-capture",
        };

        let handle = thread::Builder::new()
            .name(thread_name.into())
            .spawn(move || stream_loop(host_id, device, format, callback, ready_tx, cmd_rx))
            .map_err(|e| StreamError::DeviceOpen(format!("failed to spawn stream thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(device_name)) => {
                log::info!("opened {} ({} Hz, {} ch)", device_name, format.sample_rate.0, format.channels);
                Ok(Self {
                    device_name,
                    commands: Some(cmd_tx),
                    thread: Some(handle),
                })
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(StreamError::DeviceOpen("stream thread exited before reporting".into()))
            }
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl DeviceHandle for CpalStreamHandle {
    fn start(&mut self) -> Result<(), StreamError> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| StreamError::DeviceStart("stream already stopped".into()))?;
        let (reply_tx, reply_rx) = bounded(1);
        commands
            .send(Command::Start(reply_tx))
            .map_err(|_| StreamError::DeviceStart("stream thread is gone".into()))?;
        reply_rx
            .recv()
            .map_err(|_| StreamError::DeviceStart("stream thread is gone".into()))?
    }

    fn stop(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(Command::Shutdown);
        }
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("stream thread for {} panicked", self.device_name);
            }
            log::debug!("closed {}", self.device_name);
        }
    }
}

impl Drop for CpalStreamHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn stream_loop(
    host_id: cpal::HostId,
    device: DeviceInfo,
    format: StreamFormat,
    callback: StreamCallback,
    ready: Sender<Result<String, StreamError>>,
    commands: Receiver<Command>,
) {
    let stream = match build(host_id, &device, format, callback) {
        Ok((name, stream)) => {
            let _ = ready.send(Ok(name));
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    // A closed channel means the handle was dropped.
    while let Ok(command) = commands.recv() {
        match command {
            Command::Start(reply) => {
                let result = stream.play().map_err(|e| StreamError::DeviceStart(e.to_string()));
                let _ = reply.send(result);
            }
            Command::Shutdown => break,
        }
    }

    if let Err(e) = stream.pause() {
        log::debug!("pause on shutdown failed: {}", e);
    }
}

fn build(
    host_id: cpal::HostId,
    info: &DeviceInfo,
    format: StreamFormat,
    callback: StreamCallback,
) -> Result<(String, cpal::Stream), StreamError> {
    let host = cpal::host_from_id(host_id).map_err(|e| StreamError::DeviceOpen(e.to_string()))?;
    let device = devices::find(&host, info)?;
    let name = device.name().unwrap_or_else(|_| info.name.clone());
    let kind = callback.kind();

    let sample_format = match supported_ranges(&device, kind) {
        Ok(ranges) => negotiate_sample_format(&ranges, format).ok_or_else(|| {
            StreamError::DeviceOpen(format!(
                "{} has no i16 or f32 config for {} ch at {}",
                name, format.channels, format.sample_rate
            ))
        })?,
        Err(e) => {
            log::debug!("{}: cannot query supported configs ({}), trying i16", name, e);
            cpal::SampleFormat::I16
        }
    };
    if sample_format != cpal::SampleFormat::I16 {
        log::info!("{} has no native i16 stream, converting from {:?}", name, sample_format);
    }

    // Shared so a rejected fixed-buffer build can hand it to the retry.
    let callback = Arc::new(Mutex::new(callback));

    let stream = match build_with(&device, format, sample_format, true, &callback) {
        Ok(stream) => stream,
        Err(cpal::BuildStreamError::StreamConfigNotSupported) => {
            log::warn!(
                "{} rejected a fixed {}-frame buffer, using the host default",
                name,
                format.buffer_frames
            );
            build_with(&device, format, sample_format, false, &callback)
                .map_err(|e| StreamError::DeviceOpen(format!("{}: {}", name, e)))?
        }
        Err(e) => return Err(StreamError::DeviceOpen(format!("{}: {}", name, e))),
    };

    Ok((name, stream))
}

fn supported_ranges(
    device: &cpal::Device,
    kind: DeviceKind,
) -> Result<Vec<cpal::SupportedStreamConfigRange>, cpal::SupportedStreamConfigsError> {
    Ok(match kind {
        DeviceKind::Playback => device.supported_output_configs()?.collect(),
        DeviceKind::Capture => device.supported_input_configs()?.collect(),
    })
}

/// Pick the device sample format for `format`: native i16 when a supported
/// config covers the channel count and rate, f32 (converted at the callback)
/// otherwise. `None` when neither is offered.
pub fn negotiate_sample_format(
    supported: &[cpal::SupportedStreamConfigRange],
    format: StreamFormat,
) -> Option<cpal::SampleFormat> {
    let rate = cpal::SampleRate(format.sample_rate.0);
    let covers = |range: &cpal::SupportedStreamConfigRange| {
        range.channels() == format.channels
            && range.min_sample_rate() <= rate
            && rate <= range.max_sample_rate()
    };

    [cpal::SampleFormat::I16, cpal::SampleFormat::F32]
        .into_iter()
        .find(|wanted| supported.iter().any(|r| r.sample_format() == *wanted && covers(r)))
}

/// Expand i16 LE bytes into f32 device samples.
pub fn bytes_to_f32(bytes: &[u8], out: &mut [f32]) {
    for (sample, word) in out.iter_mut().zip(bytes.chunks_exact(2)) {
        *sample = pcm::decode_sample([word[0], word[1]]);
    }
}

/// Replace `out` with the i16 LE encoding of f32 device samples.
pub fn f32_to_bytes(samples: &[f32], out: &mut Vec<u8>) {
    out.clear();
    for &sample in samples {
        out.extend_from_slice(&pcm::encode_sample(sample).to_le_bytes());
    }
}

fn build_with(
    device: &cpal::Device,
    format: StreamFormat,
    sample_format: cpal::SampleFormat,
    fixed: bool,
    callback: &Arc<Mutex<StreamCallback>>,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    let config = stream_config(format, fixed);
    let kind = callback.lock().kind();
    let callback = Arc::clone(callback);
    // Conversion buffer for f32 streams, grown on first use.
    let mut scratch: Vec<u8> = Vec::new();

    match kind {
        DeviceKind::Playback => device.build_output_stream_raw(
            &config,
            sample_format,
            move |data: &mut cpal::Data, _: &cpal::OutputCallbackInfo| {
                let mut slot = callback.lock();
                let StreamCallback::Playback(cb) = &mut *slot else {
                    return;
                };
                if data.sample_format() != cpal::SampleFormat::F32 {
                    cb(data.bytes_mut());
                    return;
                }
                if let Some(out) = data.as_slice_mut::<f32>() {
                    scratch.resize(out.len() * 2, 0);
                    cb(scratch.as_mut_slice());
                    bytes_to_f32(&scratch, out);
                }
            },
            |e| log::error!("output stream error: {}", e),
            None,
        ),
        DeviceKind::Capture => device.build_input_stream_raw(
            &config,
            sample_format,
            move |data: &cpal::Data, _: &cpal::InputCallbackInfo| {
                let mut slot = callback.lock();
                let StreamCallback::Capture(cb) = &mut *slot else {
                    return;
                };
                match data.as_slice::<f32>() {
                    Some(samples) if data.sample_format() == cpal::SampleFormat::F32 => {
                        f32_to_bytes(samples, &mut scratch);
                        cb(scratch.as_slice());
                    }
                    _ => cb(data.bytes()),
                }
            },
            |e| log::error!("input stream error: {}", e),
            None,
        ),
    }
}
