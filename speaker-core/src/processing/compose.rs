//! Small building-block streamers for assembling playback graphs.

use crate::models::error::StreamError;
use crate::models::sample::{silence, Sample};
use crate::traits::streamer::Streamer;

/// Streams silence, either forever or for a fixed number of frames.
#[derive(Debug, Clone)]
pub struct Silence {
    remaining: Option<usize>,
}

impl Silence {
    pub fn endless() -> Self {
        Self { remaining: None }
    }

    pub fn frames(count: usize) -> Self {
        Self {
            remaining: Some(count),
        }
    }
}

impl Streamer for Silence {
    fn stream(&mut self, samples: &mut [Sample]) -> (usize, bool) {
        match self.remaining.as_mut() {
            None => {
                silence(samples);
                (samples.len(), true)
            }
            Some(remaining) => {
                if *remaining == 0 {
                    return (0, false);
                }
                let n = samples.len().min(*remaining);
                silence(&mut samples[..n]);
                *remaining -= n;
                (n, true)
            }
        }
    }
}

/// A streamer backed by a closure.
pub struct StreamerFn<F>(pub F);

impl<F> Streamer for StreamerFn<F>
where
    F: FnMut(&mut [Sample]) -> (usize, bool) + Send,
{
    fn stream(&mut self, samples: &mut [Sample]) -> (usize, bool) {
        (self.0)(samples)
    }
}

/// Zero-length streamer that runs a closure once when it is reached.
///
/// Chained at the end of a [`Seq`] it signals that everything before it
/// has been played.
pub struct Callback<F> {
    f: Option<F>,
}

impl<F: FnOnce() + Send> Callback<F> {
    pub fn new(f: F) -> Self {
        Self { f: Some(f) }
    }
}

impl<F: FnOnce() + Send> Streamer for Callback<F> {
    fn stream(&mut self, _samples: &mut [Sample]) -> (usize, bool) {
        if let Some(f) = self.f.take() {
            f();
        }
        (0, false)
    }
}

/// Plays streamers one after another, filling each request across
/// boundaries.
///
/// If a member ends with an error the sequence stops there and reports it.
/// A member that fills nothing but promises more ends the current pull
/// early.
pub struct Seq {
    streamers: Vec<Box<dyn Streamer>>,
    current: usize,
    err: Option<StreamError>,
}

impl Seq {
    pub fn new(streamers: Vec<Box<dyn Streamer>>) -> Self {
        Self {
            streamers,
            current: 0,
            err: None,
        }
    }
}

impl Streamer for Seq {
    fn stream(&mut self, samples: &mut [Sample]) -> (usize, bool) {
        let mut filled = 0;
        while filled < samples.len() && self.current < self.streamers.len() {
            let streamer = &mut self.streamers[self.current];
            let (n, more) = streamer.stream(&mut samples[filled..]);
            filled += n;
            if n == 0 && more {
                // Member has nothing ready yet; don't spin on it.
                return (filled, true);
            }
            if !more {
                if let Some(err) = streamer.err() {
                    self.err = Some(err);
                    self.current = self.streamers.len();
                    break;
                }
                self.current += 1;
            }
        }
        let more = self.current < self.streamers.len() || filled > 0;
        (filled, more)
    }

    fn err(&self) -> Option<StreamError> {
        self.err.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn constant(value: f32, frames: usize) -> impl Streamer {
        let mut left = frames;
        StreamerFn(move |samples: &mut [Sample]| {
            if left == 0 {
                return (0, false);
            }
            let n = samples.len().min(left);
            samples[..n].fill([value, value]);
            left -= n;
            (n, true)
        })
    }

    #[test]
    fn limited_silence_ends() {
        let mut s = Silence::frames(5);
        let mut buf = [[1.0, 1.0]; 4];

        assert_eq!(s.stream(&mut buf), (4, true));
        assert_eq!(s.stream(&mut buf), (1, true));
        assert_eq!(s.stream(&mut buf), (0, false));
    }

    #[test]
    fn seq_crosses_member_boundaries() {
        let mut seq = Seq::new(vec![Box::new(constant(0.25, 3)), Box::new(constant(0.75, 3))]);
        let mut buf = [[0.0, 0.0]; 4];

        assert_eq!(seq.stream(&mut buf), (4, true));
        assert_eq!(buf[2], [0.25, 0.25]);
        assert_eq!(buf[3], [0.75, 0.75]);

        assert_eq!(seq.stream(&mut buf), (2, true));
        assert_eq!(seq.stream(&mut buf), (0, false));
        assert!(seq.err().is_none());
    }

    #[test]
    fn callback_fires_once_after_sequence() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let mut seq = Seq::new(vec![
            Box::new(constant(0.5, 2)),
            Box::new(Callback::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        ]);
        let mut buf = [[0.0, 0.0]; 8];

        assert_eq!(seq.stream(&mut buf), (2, true));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(seq.stream(&mut buf), (0, false));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn seq_returns_when_member_is_not_ready() {
        let mut pulls = 0usize;
        let mut seq = Seq::new(vec![
            Box::new(constant(0.5, 1)),
            Box::new(StreamerFn(move |_: &mut [Sample]| {
                pulls += 1;
                assert!(pulls < 100, "starved member pulled in a loop");
                (0, true)
            })),
        ]);
        let mut buf = [[0.0, 0.0]; 4];

        assert_eq!(seq.stream(&mut buf), (1, true));
        assert_eq!(buf[0], [0.5, 0.5]);
        assert_eq!(seq.stream(&mut buf), (0, true));
    }

    #[test]
    fn seq_stops_on_member_error() {
        struct Failing;
        impl Streamer for Failing {
            fn stream(&mut self, _: &mut [Sample]) -> (usize, bool) {
                (0, false)
            }
            fn err(&self) -> Option<StreamError> {
                Some(StreamError::Stream("decode failed".into()))
            }
        }

        let mut seq = Seq::new(vec![Box::new(Failing), Box::new(Silence::endless())]);
        let mut buf = [[0.0, 0.0]; 2];

        assert_eq!(seq.stream(&mut buf), (0, false));
        assert_eq!(seq.err(), Some(StreamError::Stream("decode failed".into())));
    }
}
