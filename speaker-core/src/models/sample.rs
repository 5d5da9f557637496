use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One stereo frame: `[left, right]`, nominally within `[-1.0, 1.0]`.
pub type Sample = [f32; 2];

/// A frame of digital silence.
pub const SILENCE: Sample = [0.0, 0.0];

/// Fill every frame of `samples` with silence.
pub fn silence(samples: &mut [Sample]) {
    samples.fill(SILENCE);
}

/// Sample rate in frames per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleRate(pub u32);

impl SampleRate {
    /// Number of frames that span `duration` at this rate (rounded down).
    pub fn n(self, duration: Duration) -> usize {
        (duration.as_secs_f64() * self.0 as f64) as usize
    }

    /// Duration covered by `frames` frames at this rate.
    pub fn d(self, frames: usize) -> Duration {
        if self.0 == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(frames as f64 / self.0 as f64)
    }

    pub fn hz(self) -> u32 {
        self.0
    }
}

impl From<u32> for SampleRate {
    fn from(hz: u32) -> Self {
        Self(hz)
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}
