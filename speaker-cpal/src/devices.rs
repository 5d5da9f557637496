//! Device enumeration via cpal.
//!
//! cpal has no stable device identifiers, so the device name doubles as
//! the id. The `"default"` placeholder resolves to the host's default
//! device of the requested direction.

use cpal::traits::{DeviceTrait, HostTrait};

use speaker_core::{DeviceInfo, DeviceKind, StreamError};

/// List output or input devices of `host`.
pub fn list(host: &cpal::Host, kind: DeviceKind) -> Result<Vec<DeviceInfo>, StreamError> {
    let default_name = default_device(host, kind).and_then(|d| d.name().ok());
    let mut list = Vec::new();
    for device in devices_of(host, kind)? {
        match device.name() {
            Ok(name) => {
                let is_default = default_name.as_deref() == Some(name.as_str());
                list.push(DeviceInfo::new(name.clone(), name, kind, is_default));
            }
            Err(e) => log::debug!("skipping device without a name: {}", e),
        }
    }
    Ok(list)
}

/// Resolve `info` to a cpal device of the matching direction.
pub fn find(host: &cpal::Host, info: &DeviceInfo) -> Result<cpal::Device, StreamError> {
    if info.is_default_placeholder() {
        return default_device(host, info.kind)
            .ok_or_else(|| StreamError::DeviceNotFound(format!("no default {:?} device", info.kind)));
    }

    devices_of(host, info.kind)?
        .into_iter()
        .find(|d| d.name().map(|n| n == info.id).unwrap_or(false))
        .ok_or_else(|| StreamError::DeviceNotFound(info.id.clone()))
}

fn devices_of(host: &cpal::Host, kind: DeviceKind) -> Result<Vec<cpal::Device>, StreamError> {
    let devices = match kind {
        DeviceKind::Playback => host
            .output_devices()
            .map_err(|e| StreamError::DeviceEnumeration(e.to_string()))?
            .collect(),
        DeviceKind::Capture => host
            .input_devices()
            .map_err(|e| StreamError::DeviceEnumeration(e.to_string()))?
            .collect(),
    };
    Ok(devices)
}

fn default_device(host: &cpal::Host, kind: DeviceKind) -> Option<cpal::Device> {
    match kind {
        DeviceKind::Playback => host.default_output_device(),
        DeviceKind::Capture => host.default_input_device(),
    }
}
