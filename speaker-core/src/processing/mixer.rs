use crate::models::sample::{silence, Sample, SILENCE};
use crate::traits::streamer::Streamer;

/// Sums an unordered, changing set of streamers into one stream.
///
/// Members that report `more == false` are evicted at the end of the pass
/// in which they ended and are never streamed again. The mixer itself never
/// ends: with no members it streams silence.
///
/// Summation is not saturated here; clipping happens when frames are
/// encoded for the device.
#[derive(Default)]
pub struct Mixer {
    streamers: Vec<Box<dyn Streamer>>,
    scratch: Vec<Sample>,
}

impl Mixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add streamers to the active set. Duplicates are not detected.
    pub fn add<I>(&mut self, streamers: I)
    where
        I: IntoIterator<Item = Box<dyn Streamer>>,
    {
        self.streamers.extend(streamers);
    }

    pub fn add_one(&mut self, streamer: impl Streamer + 'static) {
        self.streamers.push(Box::new(streamer));
    }

    /// Remove every active streamer.
    pub fn clear(&mut self) {
        self.streamers.clear();
    }

    /// Number of active streamers.
    pub fn len(&self) -> usize {
        self.streamers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streamers.is_empty()
    }

    /// Mix one buffer. Always fills `samples` completely and returns `more == true`.
    pub fn stream(&mut self, samples: &mut [Sample]) -> (usize, bool) {
        silence(samples);
        if self.scratch.len() < samples.len() {
            self.scratch.resize(samples.len(), SILENCE);
        }
        let scratch = &mut self.scratch[..samples.len()];

        self.streamers.retain_mut(|streamer| {
            let (n, more) = streamer.stream(scratch);
            let n = n.min(scratch.len());
            for (out, mixed) in samples.iter_mut().zip(&scratch[..n]) {
                out[0] += mixed[0];
                out[1] += mixed[1];
            }
            if !more {
                if let Some(err) = streamer.err() {
                    log::debug!("mixer evicted streamer after error: {}", err);
                }
            }
            more
        });

        (samples.len(), true)
    }
}

impl Streamer for Mixer {
    fn stream(&mut self, samples: &mut [Sample]) -> (usize, bool) {
        Mixer::stream(self, samples)
    }
}
