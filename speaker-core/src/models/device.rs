use serde::{Deserialize, Serialize};

/// Identifier used for "whatever the host's default device is".
pub const DEFAULT_DEVICE_ID: &str = "default";

/// Direction of an audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Playback,
    Capture,
}

/// An audio device available for playback or capture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub kind: DeviceKind,
    pub is_default: bool,
}

impl DeviceInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: DeviceKind, is_default: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            is_default,
        }
    }

    /// Placeholder resolved by the backend to the host's default output.
    pub fn default_playback() -> Self {
        Self::new(DEFAULT_DEVICE_ID, DEFAULT_DEVICE_ID, DeviceKind::Playback, true)
    }

    /// Placeholder resolved by the backend to the host's default input.
    pub fn default_capture() -> Self {
        Self::new(DEFAULT_DEVICE_ID, DEFAULT_DEVICE_ID, DeviceKind::Capture, true)
    }

    /// Whether this is the unresolved default placeholder rather than a
    /// concrete enumerated device.
    pub fn is_default_placeholder(&self) -> bool {
        self.id == DEFAULT_DEVICE_ID
    }
}
