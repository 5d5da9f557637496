use crate::models::error::StreamError;
use crate::models::sample::{silence, Sample};
use crate::traits::streamer::Streamer;

/// Pause/resume gate around a streamer.
///
/// While paused the wrapped streamer is not advanced and the output is a
/// full buffer of silence. A `Ctrl` whose streamer has been taken ends.
#[derive(Debug, Clone)]
pub struct Ctrl<S> {
    streamer: Option<S>,
    paused: bool,
}

impl<S: Streamer> Ctrl<S> {
    pub fn new(streamer: S) -> Self {
        Self {
            streamer: Some(streamer),
            paused: false,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn toggle(&mut self) {
        self.paused = !self.paused;
    }

    /// Detach the wrapped streamer; the `Ctrl` ends on its next pull.
    pub fn take(&mut self) -> Option<S> {
        self.streamer.take()
    }

    pub fn inner_mut(&mut self) -> Option<&mut S> {
        self.streamer.as_mut()
    }
}

impl<S: Streamer> Streamer for Ctrl<S> {
    fn stream(&mut self, samples: &mut [Sample]) -> (usize, bool) {
        let Some(streamer) = self.streamer.as_mut() else {
            return (0, false);
        };
        if self.paused {
            silence(samples);
            return (samples.len(), true);
        }
        streamer.stream(samples)
    }

    fn err(&self) -> Option<StreamError> {
        self.streamer.as_ref().and_then(|s| s.err())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::compose::StreamerFn;

    fn counter() -> impl Streamer {
        let mut next = 0.0f32;
        StreamerFn(move |samples: &mut [Sample]| {
            for s in samples.iter_mut() {
                next += 1.0;
                *s = [next, next];
            }
            (samples.len(), true)
        })
    }

    #[test]
    fn paused_streams_silence_without_advancing() {
        let mut ctrl = Ctrl::new(counter());
        let mut buf = [[0.0, 0.0]; 2];

        ctrl.stream(&mut buf);
        assert_eq!(buf[1], [2.0, 2.0]);

        ctrl.set_paused(true);
        assert_eq!(ctrl.stream(&mut buf), (2, true));
        assert_eq!(buf, [[0.0, 0.0]; 2]);

        ctrl.toggle();
        ctrl.stream(&mut buf);
        assert_eq!(buf[0], [3.0, 3.0]);
    }

    #[test]
    fn taken_streamer_ends() {
        let mut ctrl = Ctrl::new(counter());
        assert!(ctrl.take().is_some());

        let mut buf = [[0.0, 0.0]; 2];
        assert_eq!(ctrl.stream(&mut buf), (0, false));
        assert!(ctrl.err().is_none());
    }
}
