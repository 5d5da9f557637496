use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::{BYTES_PER_SAMPLE, PLAYBACK_CHANNELS};
use crate::models::sample::{silence, Sample, SILENCE};
use crate::processing::mixer::Mixer;
use crate::processing::pcm;
use crate::traits::backend::PlaybackCallback;

const FRAME_BYTES: usize = PLAYBACK_CHANNELS as usize * BYTES_PER_SAMPLE;

/// Feeds the output device from the shared mixer.
///
/// The device asks for arbitrary byte counts; the mixer is pulled in whole
/// buffers of `buffer_frames`. Encoded bytes the device hasn't asked for yet
/// stay in a carry-over buffer owned by the bridge until the next callback.
pub struct PlaybackBridge {
    mixer: Arc<Mutex<Mixer>>,
    samples: Vec<Sample>,
    carry: Vec<u8>,
}

impl PlaybackBridge {
    pub fn new(mixer: Arc<Mutex<Mixer>>, buffer_frames: usize) -> Self {
        Self {
            mixer,
            samples: vec![SILENCE; buffer_frames],
            carry: Vec::with_capacity(buffer_frames * FRAME_BYTES * 2),
        }
    }

    /// Fill the device's output slot.
    ///
    /// Never panics: a panicking streamer is dropped together with the rest
    /// of the mixer's members and the slot is filled with silence.
    pub fn fill(&mut self, out: &mut [u8]) {
        let whole = out.len() / FRAME_BYTES * FRAME_BYTES;
        if self.samples.is_empty() {
            out.fill(0);
            return;
        }
        while self.carry.len() < whole {
            self.update();
        }
        out[..whole].copy_from_slice(&self.carry[..whole]);
        out[whole..].fill(0);
        self.carry.drain(..whole);
    }

    /// Bytes encoded but not yet handed to the device.
    pub fn pending_bytes(&self) -> usize {
        self.carry.len()
    }

    pub fn into_callback(mut self) -> PlaybackCallback {
        Box::new(move |out: &mut [u8]| self.fill(out))
    }

    /// Pull one buffer from the mixer and append its encoding.
    fn update(&mut self) {
        let pulled = {
            let mut mixer = self.mixer.lock();
            let result = panic::catch_unwind(AssertUnwindSafe(|| mixer.stream(&mut self.samples)));
            if result.is_err() {
                mixer.clear();
            }
            result
        };
        if pulled.is_err() {
            log::error!("streamer panicked during playback; mixer cleared");
            silence(&mut self.samples);
        }
        pcm::encode_stereo(&self.samples, &mut self.carry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::compose::StreamerFn;

    fn counting_mixer() -> Arc<Mutex<Mixer>> {
        // Frame k (from 1) has left = right = k / 100.
        let mut next = 0u16;
        let mut mixer = Mixer::new();
        mixer.add_one(StreamerFn(move |samples: &mut [Sample]| {
            for s in samples.iter_mut() {
                next += 1;
                let v = level(next);
                *s = [v, v];
            }
            (samples.len(), true)
        }));
        Arc::new(Mutex::new(mixer))
    }

    fn level(k: u16) -> f32 {
        k as f32 / 100.0
    }

    fn expected(frames: std::ops::RangeInclusive<u16>) -> Vec<i16> {
        frames
            .flat_map(|k| {
                let w = pcm::encode_sample(level(k));
                [w, w]
            })
            .collect()
    }

    fn words(bytes: &[u8]) -> Vec<i16> {
        bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn carries_over_between_callbacks() {
        let mut bridge = PlaybackBridge::new(counting_mixer(), 4);

        let mut out = vec![0u8; 3 * FRAME_BYTES];
        bridge.fill(&mut out);
        assert_eq!(words(&out), expected(1..=3));
        assert_eq!(bridge.pending_bytes(), FRAME_BYTES);

        bridge.fill(&mut out);
        assert_eq!(words(&out), expected(4..=6));
        assert_eq!(bridge.pending_bytes(), 2 * FRAME_BYTES);
    }

    #[test]
    fn request_larger_than_buffer_pulls_repeatedly() {
        let mut bridge = PlaybackBridge::new(counting_mixer(), 2);

        let mut out = vec![0u8; 5 * FRAME_BYTES];
        bridge.fill(&mut out);
        assert_eq!(words(&out), expected(1..=5));
        assert_eq!(bridge.pending_bytes(), FRAME_BYTES);
    }

    #[test]
    fn empty_mixer_plays_silence() {
        let mut bridge = PlaybackBridge::new(Arc::new(Mutex::new(Mixer::new())), 8);

        let mut out = vec![0xAAu8; 16];
        bridge.fill(&mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn loud_mix_is_clipped() {
        let mut mixer = Mixer::new();
        for _ in 0..3 {
            mixer.add_one(StreamerFn(|s: &mut [Sample]| {
                s.fill([0.6, -0.6]);
                (s.len(), true)
            }));
        }
        let mut bridge = PlaybackBridge::new(Arc::new(Mutex::new(mixer)), 4);

        let mut out = vec![0u8; FRAME_BYTES];
        bridge.fill(&mut out);
        assert_eq!(words(&out), vec![i16::MAX, -i16::MAX]);
    }

    #[test]
    fn panicking_streamer_degrades_to_silence() {
        let mut mixer = Mixer::new();
        mixer.add_one(StreamerFn(|_: &mut [Sample]| -> (usize, bool) { panic!("boom") }));
        let mixer = Arc::new(Mutex::new(mixer));
        let mut bridge = PlaybackBridge::new(Arc::clone(&mixer), 4);

        let mut out = vec![0x55u8; 4 * FRAME_BYTES];
        bridge.fill(&mut out);

        assert!(out.iter().all(|&b| b == 0));
        assert!(mixer.lock().is_empty());
    }

    #[test]
    fn partial_frame_tail_is_zeroed() {
        let mut bridge = PlaybackBridge::new(counting_mixer(), 4);

        let mut out = vec![0xFFu8; FRAME_BYTES + 2];
        bridge.fill(&mut out);
        assert_eq!(words(&out[..FRAME_BYTES]), expected(1..=1));
        assert_eq!(&out[FRAME_BYTES..], &[0, 0]);
    }
}
