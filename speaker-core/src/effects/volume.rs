use crate::models::error::StreamError;
use crate::models::sample::Sample;
use crate::traits::streamer::Streamer;

/// Exponential volume control.
///
/// Frames are multiplied by `base^volume`, so equal steps of `volume`
/// sound like equal loudness steps. `volume == 0` is unity; `silent`
/// mutes the output while still advancing the wrapped streamer.
#[derive(Debug, Clone)]
pub struct Volume<S> {
    streamer: S,
    base: f32,
    volume: f32,
    silent: bool,
}

impl<S: Streamer> Volume<S> {
    /// Unity volume with `base` 2 (each step of 1.0 doubles amplitude).
    pub fn new(streamer: S) -> Self {
        Self::with_base(streamer, 2.0)
    }

    pub fn with_base(streamer: S, base: f32) -> Self {
        Self {
            streamer,
            base,
            volume: 0.0,
            silent: false,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    pub fn base(&self) -> f32 {
        self.base
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.streamer
    }

    fn factor(&self) -> f32 {
        if self.silent {
            0.0
        } else {
            self.base.powf(self.volume)
        }
    }
}

impl<S: Streamer> Streamer for Volume<S> {
    fn stream(&mut self, samples: &mut [Sample]) -> (usize, bool) {
        let (n, more) = self.streamer.stream(samples);
        let factor = self.factor();
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
