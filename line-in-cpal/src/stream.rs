//! Shared capture-thread plumbing for the cpal sources.
//!
//! `cpal::Stream` is not `Send`, so each source runs its stream on a
//! dedicated thread and reports startup success or failure back through a
//! readiness channel before settling into a run-flag park loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use line_in_core::{CaptureError, FormatDescriptor};

use crate::device::find_input_device;

/// Reject formats the cpal sources cannot produce: they build i16 input
/// streams, so only 16-bit signed PCM is supported.
pub(crate) fn ensure_i16(format: &FormatDescriptor) -> Result<(), CaptureError> {
    if format.bits_per_sample != 16 || !format.signed {
        return Err(CaptureError::FormatUnsupported(format!(
            "cpal sources capture 16-bit signed PCM, requested {}-bit {}",
            format.bits_per_sample,
            if format.signed { "signed" } else { "unsigned" }
        )));
    }
    Ok(())
}

/// Thread body: open the device, build and play an i16 input stream feeding
/// `data_fn`, report the outcome through `ready`, then hold the stream alive
/// until `running` is cleared.
pub(crate) fn run_input_stream(
    device_name: Option<String>,
    format: FormatDescriptor,
    running: Arc<AtomicBool>,
    ready: mpsc::Sender<Result<(), CaptureError>>,
    data_fn: impl FnMut(&[i16]) + Send + 'static,
) {
    match build_and_play(device_name, format, data_fn) {
        Ok(stream) => {
            let _ = ready.send(Ok(()));
            while running.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(20));
            }
            drop(stream);
        }
        Err(error) => {
            running.store(false, Ordering::Release);
            let _ = ready.send(Err(error));
        }
    }
}

fn build_and_play(
    device_name: Option<String>,
    format: FormatDescriptor,
    mut data_fn: impl FnMut(&[i16]) + Send + 'static,
) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();
    let device = match device_name {
        Some(name) => find_input_device(&host, &name)?,
        None => host
            .default_input_device()
            .ok_or(CaptureError::DeviceUnavailable)?,
    };
    log::debug!(
        "capturing from {:?}",
        device.name().unwrap_or_else(|_| "unknown".into())
    );

    let config = cpal::StreamConfig {
        channels: format.channels,
        sample_rate: cpal::SampleRate(format.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| data_fn(data),
            |error| log::error!("input stream error: {error}"),
            None,
        )
        .map_err(map_build_error)?;

    stream.play().map_err(map_play_error)?;
    Ok(stream)
}

fn map_build_error(error: cpal::BuildStreamError) -> CaptureError {
    match error {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::DeviceUnavailable,
        cpal::BuildStreamError::StreamConfigNotSupported => {
            CaptureError::FormatUnsupported("stream config not supported by device".into())
        }
        other => CaptureError::BackendInternal(other.to_string()),
    }
}

fn map_play_error(error: cpal::PlayStreamError) -> CaptureError {
    match error {
        cpal::PlayStreamError::DeviceNotAvailable => CaptureError::DeviceUnavailable,
        other => CaptureError::BackendInternal(other.to_string()),
    }
}
