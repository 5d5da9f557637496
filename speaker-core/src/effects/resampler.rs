use crate::models::error::StreamError;
use crate::models::sample::{Sample, SampleRate, SILENCE};
use crate::traits::streamer::Streamer;

const CHUNK_FRAMES: usize = 512;

/// Changes the effective playback rate of a streamer.
///
/// Every output frame advances `ratio` source frames, interpolating
/// linearly between neighbours. `ratio > 1` plays faster (and higher),
/// `ratio < 1` slower. Converting between sample rates is the special case
/// `ratio = old / new`.
pub struct Resampler<S> {
    streamer: S,
    ratio: f64,
    /// Source frames not yet fully consumed; `pos` indexes into it.
    window: Vec<Sample>,
    pos: f64,
    chunk: Vec<Sample>,
    inner_done: bool,
    err: Option<StreamError>,
}

impl<S: Streamer> Resampler<S> {
    /// Resample `streamer` from `old` to `new` sample rate.
    pub fn new(old: SampleRate, new: SampleRate, streamer: S) -> Result<Self, StreamError> {
        if old.0 == 0 || new.0 == 0 {
            return Err(StreamError::Configuration(format!(
                "invalid resampling rates: {} -> {}",
                old, new
            )));
        }
        Self::with_ratio(old.0 as f64 / new.0 as f64, streamer)
    }

    pub fn with_ratio(ratio: f64, streamer: S) -> Result<Self, StreamError> {
        if !valid_ratio(ratio) {
            return Err(StreamError::Configuration(format!("invalid resampling ratio: {}", ratio)));
        }
        Ok(Self {
            streamer,
            ratio,
            window: Vec::with_capacity(CHUNK_FRAMES * 2),
            pos: 0.0,
            chunk: vec![SILENCE; CHUNK_FRAMES],
            inner_done: false,
            err: None,
        })
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Change the rate; non-positive or non-finite ratios are ignored.
    pub fn set_ratio(&mut self, ratio: f64) {
        if !valid_ratio(ratio) {
            log::warn!("ignoring invalid resampling ratio {}", ratio);
            return;
        }
        self.ratio = ratio;
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.streamer
    }

    /// Pull one chunk from the wrapped streamer. Returns false if nothing
    /// new was appended.
    fn refill(&mut self) -> bool {
        if self.inner_done {
            return false;
        }
        let (n, more) = self.streamer.stream(&mut self.chunk);
        let n = n.min(self.chunk.len());
        self.window.extend_from_slice(&self.chunk[..n]);
        if !more {
            self.inner_done = true;
            self.err = self.streamer.err();
        }
        n > 0
    }
}

fn valid_ratio(ratio: f64) -> bool {
    ratio.is_finite() && ratio > 0.0
}

impl<S: Streamer> Streamer for Resampler<S> {
    fn stream(&mut self, samples: &mut [Sample]) -> (usize, bool) {
        let mut filled = 0;
        for out in samples.iter_mut() {
            let index = self.pos as usize;
            while self.window.len() < index + 2 && self.refill() {}

            if index + 1 < self.window.len() {
                let frac = (self.pos - index as f64) as f32;
                let a = self.window[index];
                let b = self.window[index + 1];
                *out = [
                    a[0] + (b[0] - a[0]) * frac,
                    a[1] + (b[1] - a[1]) * frac,
                ];
            } else if index < self.window.len() && self.inner_done {
                *out = self.window[index];
            } else {
                break;
            }
            filled += 1;
            self.pos += self.ratio;
        }

        let consumed = (self.pos as usize).min(self.window.len());
        self.window.drain(..consumed);
        self.pos -= consumed as f64;

        let exhausted = self.inner_done && (self.pos as usize) >= self.window.len();
        if filled == 0 && exhausted {
            return (0, false);
        }
        (filled, true)
    }

    fn err(&self) -> Option<StreamError> {
        self.err.clone()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::processing::compose::StreamerFn;

    /// Emits 0, 1, 2, ... on both channels for `frames` frames.
    fn ramp(frames: usize) -> impl Streamer {
        let mut next = 0usize;
        StreamerFn(move |samples: &mut [Sample]| {
            if next >= frames {
                return (0, false);
            }
            let n = samples.len().min(frames - next);
            for s in &mut samples[..n] {
                *s = [next as f32, next as f32];
                next += 1;
            }
            (n, true)
        })
    }

    fn drain<S: Streamer>(mut s: S) -> Vec<Sample> {
        let mut all = Vec::new();
        let mut buf = [SILENCE; 64];
        loop {
            let (n, more) = s.stream(&mut buf);
            all.extend_from_slice(&buf[..n]);
            if !more {
                return all;
            }
        }
    }

    #[test]
    fn unit_ratio_is_passthrough() {
        let out = drain(Resampler::with_ratio(1.0, ramp(100)).unwrap());
        assert_eq!(out.len(), 100);
        assert_eq!(out[99], [99.0, 99.0]);
    }

    #[test]
    fn double_speed_halves_length() {
        let out = drain(Resampler::with_ratio(2.0, ramp(100)).unwrap());
        assert_eq!(out.len(), 50);
        assert_eq!(out[10], [20.0, 20.0]);
    }

    #[test]
    fn half_speed_interpolates() {
        let out = drain(Resampler::new(SampleRate(24_000), SampleRate(48_000), ramp(10)).unwrap());
        assert_eq!(out.len(), 20);
        assert_abs_diff_eq!(out[1][0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(out[7][1], 3.5, epsilon = 1e-6);
    }

    #[test]
    fn ratio_can_change_while_streaming() {
        let mut r = Resampler::with_ratio(1.0, ramp(1_000)).unwrap();
        let mut buf = [SILENCE; 10];
        r.stream(&mut buf);
        assert_eq!(buf[9], [9.0, 9.0]);

        r.set_ratio(2.0);
        r.stream(&mut buf);
        assert_eq!(buf[0], [10.0, 10.0]);
        assert_eq!(buf[1], [12.0, 12.0]);
        assert_eq!(r.ratio(), 2.0);
    }

    #[test]
    fn invalid_ratios_are_rejected() {
        assert!(Resampler::with_ratio(0.0, ramp(1)).is_err());
        assert!(Resampler::with_ratio(f64::NAN, ramp(1)).is_err());
        assert!(Resampler::new(SampleRate(0), SampleRate(44_100), ramp(1)).is_err());

        let mut r = Resampler::with_ratio(1.5, ramp(1)).unwrap();
        r.set_ratio(-2.0);
        assert_eq!(r.ratio(), 1.5);
    }

    #[test]
    fn propagates_inner_error() {
        struct Broken;
        impl Streamer for Broken {
            fn stream(&mut self, _: &mut [Sample]) -> (usize, bool) {
                (0, false)
            }
            fn err(&self) -> Option<StreamError> {
                Some(StreamError::Stream("truncated".into()))
            }
        }

        let mut r = Resampler::with_ratio(1.0, Broken).unwrap();
        let mut buf = [SILENCE; 4];
        assert_eq!(r.stream(&mut buf), (0, false));
        assert_eq!(r.err(), Some(StreamError::Stream("truncated".into())));
    }
}
