use super::sample::SampleRate;

/// Engine lifecycle.
///
/// ```text
/// idle → running ⇄ (re-init) → closed → running
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running { sample_rate: SampleRate, buffer_frames: usize },
    Closed,
}

impl EngineState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}
