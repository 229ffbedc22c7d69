use cpal::traits::{DeviceTrait, HostTrait};
use line_in_core::CaptureError;

/// Find an audio input device by name.
///
/// Matching tiers, in order: exact, case-insensitive, substring
/// (case-insensitive). This accepts full backend device names
/// ("alsa_input.pci-0000_00_1f.3.analog-stereo") as well as short or
/// partial ones ("analog-stereo").
pub fn find_input_device(host: &cpal::Host, name: &str) -> Result<cpal::Device, CaptureError> {
    let mut devices: Vec<(String, cpal::Device)> = Vec::new();
    let iter = host
        .input_devices()
        .map_err(|e| CaptureError::BackendInternal(e.to_string()))?;
    for device in iter {
        if let Ok(device_name) = device.name() {
            devices.push((device_name, device));
        }
    }

    let search = name.to_lowercase();

    if let Some(pos) = devices.iter().position(|(n, _)| n == name) {
        return Ok(devices.swap_remove(pos).1);
    }
    if let Some(pos) = devices.iter().position(|(n, _)| n.to_lowercase() == search) {
        return Ok(devices.swap_remove(pos).1);
    }
    if let Some(pos) = devices
        .iter()
        .position(|(n, _)| n.to_lowercase().contains(&search))
    {
        return Ok(devices.swap_remove(pos).1);
    }

    if devices.is_empty() {
        log::warn!("no audio input devices found");
    } else {
        let names: Vec<&str> = devices.iter().map(|(n, _)| n.as_str()).collect();
        log::warn!(
            "input device {:?} not found; available: {}",
            name,
            names.join(", ")
        );
    }
    Err(CaptureError::DeviceUnavailable)
}
