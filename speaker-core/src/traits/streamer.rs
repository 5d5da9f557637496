use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::StreamError;
use crate::models::sample::Sample;

/// A pull-based audio source.
///
/// `stream` fills up to `samples.len()` frames and returns how many it
/// filled together with whether more data may follow. Once a streamer has
/// returned `more == false` it must not be streamed again; at that point
/// `err` distinguishes a clean end (`None`) from a failure.
///
/// Streamers pulled by the playback device run on the real-time thread and
/// must not block.
pub trait Streamer: Send {
    fn stream(&mut self, samples: &mut [Sample]) -> (usize, bool);

    fn err(&self) -> Option<StreamError> {
        None
    }
}

impl<S: Streamer + ?Sized> Streamer for Box<S> {
    fn stream(&mut self, samples: &mut [Sample]) -> (usize, bool) {
        (**self).stream(samples)
    }

    fn err(&self) -> Option<StreamError> {
        (**self).err()
    }
}

/// A streamer the application keeps a handle to while it plays.
///
/// Each pull locks the inner streamer, so parameter changes made through
/// the handle never race with the device thread.
pub type Shared<S> = Arc<Mutex<S>>;

/// Wrap `streamer` so it can be played and tuned at the same time.
pub fn shared<S: Streamer>(streamer: S) -> Shared<S> {
    Arc::new(Mutex::new(streamer))
}

impl<S: Streamer> Streamer for Arc<Mutex<S>> {
    fn stream(&mut self, samples: &mut [Sample]) -> (usize, bool) {
        self.lock().stream(samples)
    }

    fn err(&self) -> Option<StreamError> {
        self.lock().err()
    }
}
