//! Conversion between normalized float frames and the device's signed
//! 16-bit little-endian PCM.
//!
//! Encoding clamps to `[-1.0, 1.0]` and scales by `i16::MAX`; decoding
//! divides by the full signed 16-bit range (32768).

use crate::models::config::BYTES_PER_SAMPLE;
use crate::models::sample::Sample;

const DECODE_SCALE: f32 = 32_768.0;

/// Clamp a normalized value and convert it to a 16-bit integer sample.
pub fn encode_sample(value: f32) -> i16 {
    let clamped = value.clamp(-1.0, 1.0);
    (clamped * i16::MAX as f32) as i16
}

/// Convert one little-endian 16-bit sample to a normalized value.
pub fn decode_sample(bytes: [u8; 2]) -> f32 {
    i16::from_le_bytes(bytes) as f32 / DECODE_SCALE
}

/// Append interleaved stereo i16 LE bytes for `samples` to `out`.
///
/// Output grows by `samples.len() * 4` bytes.
pub fn encode_stereo(samples: &[Sample], out: &mut Vec<u8>) {
    out.reserve(samples.len() * 2 * BYTES_PER_SAMPLE);
    for frame in samples {
        for &value in frame {
            out.extend_from_slice(&encode_sample(value).to_le_bytes());
        }
    }
}

/// Decode interleaved i16 LE frames into `out`.
///
/// Mono frames are duplicated to both channels. For two or more channels
/// the first two of each frame become left and right. Trailing bytes that
/// don't make a whole frame are ignored. Returns the number of frames
/// written.
pub fn decode_frames(bytes: &[u8], channels: u16, out: &mut [Sample]) -> usize {
    if channels == 0 {
        return 0;
    }
    let frame_bytes = channels as usize * BYTES_PER_SAMPLE;
    let frames = out.len().min(bytes.len() / frame_bytes);

    for (frame, sample) in bytes.chunks_exact(frame_bytes).zip(out.iter_mut()).take(frames) {
        let left = decode_sample([frame[0], frame[1]]);
        *sample = if channels == 1 {
            [left, left]
        } else {
            [left, decode_sample([frame[2], frame[3]])]
        };
    }
    frames
}
