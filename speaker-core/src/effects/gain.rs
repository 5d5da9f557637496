use crate::models::error::StreamError;
use crate::models::sample::Sample;
use crate::traits::streamer::Streamer;

/// Amplifies the wrapped streamer by `1 + gain`.
///
/// `gain` is an offset from unity in linear units, not decibels: `0.0`
/// leaves the signal unchanged, `1.0` doubles it, `-1.0` silences it.
#[derive(Debug, Clone)]
pub struct Gain<S> {
    streamer: S,
    gain: f32,
}

impl<S: Streamer> Gain<S> {
    pub fn new(streamer: S, gain: f32) -> Self {
        Self { streamer, gain }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.streamer
    }
}

impl<S: Streamer> Streamer for Gain<S> {
    fn stream(&mut self, samples: &mut [Sample]) -> (usize, bool) {
        let (n, more) = self.streamer.stream(samples);
        let factor = 1.0 + self.gain;
        for frame in &mut samples[..n] {
            frame[0] *= factor;
            frame[1] *= factor;
        }
        (n, more)
    }

    fn err(&self) -> Option<StreamError> {
        self.streamer.err()
    }
}
