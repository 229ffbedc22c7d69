//! Pool-and-notify capture source over cpal.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use parking_lot::Mutex;

use line_in_core::{
    BufferSlot, CaptureConfig, CaptureError, FormatDescriptor, PooledBackend, SlotFilledCallback,
};

use crate::stream::{ensure_i16, run_input_stream};

/// Push-driven cpal capture source backed by the caller's slot pool.
///
/// The cpal data callback fills the oldest submitted slot with little-endian
/// i16 sample bytes and fires the filled-slot callback each time one reaches
/// capacity. If the pool is exhausted (nothing has been re-submitted yet),
/// incoming samples are dropped and the overrun is logged — the callback
/// never blocks.
pub struct CpalPoolSource {
    device_name: Option<String>,
    format: FormatDescriptor,
    submitted: Arc<Mutex<VecDeque<BufferSlot>>>,
    running: Arc<AtomicBool>,
    capture_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CpalPoolSource {
    /// Create a source for the default input device, or a named one.
    pub fn new(device_name: Option<String>, config: &CaptureConfig) -> Result<Self, CaptureError> {
        let format = config.format();
        ensure_i16(&format)?;
        Ok(Self {
            device_name,
            format,
            submitted: Arc::new(Mutex::new(VecDeque::new())),
            running: Arc::new(AtomicBool::new(false)),
            capture_handle: Mutex::new(None),
        })
    }
}

impl PooledBackend for CpalPoolSource {
    fn format(&self) -> FormatDescriptor {
        self.format
    }

    fn submit(&self, slot: BufferSlot) -> Result<(), CaptureError> {
        self.submitted.lock().push_back(slot);
        Ok(())
    }

    fn start(&self, on_filled: SlotFilledCallback) -> Result<(), CaptureError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(CaptureError::InvalidState("capture already running".into()));
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let device_name = self.device_name.clone();
        let format = self.format;
        let running = Arc::clone(&self.running);

        let data_fn = {
            let submitted = Arc::clone(&self.submitted);
            let running = Arc::clone(&self.running);
            // The slot currently being filled and its write offset. Lives in
            // the callback, off the shared path.
            let mut current: Option<(BufferSlot, usize)> = None;
            move |data: &[i16]| {
                if !running.load(Ordering::Acquire) {
                    return;
                }
                let mut input = data;
                while !input.is_empty() {
                    if current.is_none() {
                        current = submitted.lock().pop_front().map(|slot| (slot, 0));
                    }
                    let Some((slot, used)) = current.as_mut() else {
                        log::warn!("buffer pool exhausted, dropping {} samples", input.len());
                        return;
                    };

                    let room = (slot.capacity() - *used) / 2;
                    let take = room.min(input.len());
                    let target = &mut slot.data_mut()[*used..*used + take * 2];
                    for (i, &sample) in input[..take].iter().enumerate() {
                        target[i * 2..i * 2 + 2].copy_from_slice(&sample.to_le_bytes());
                    }
                    *used += take * 2;
                    input = &input[take..];

                    if *used == slot.capacity() {
                        if let Some((slot, used)) = current.take() {
                            on_filled(slot.filled(used));
                        }
                    }
                }
            }
        };

        let handle = thread::Builder::new()
            .name("cpal-pool-capture".into())
            .spawn(move || {
                run_input_stream(device_name, format, running, ready_tx, data_fn);
            })
            .map_err(|e| {
                CaptureError::BackendInternal(format!("failed to spawn capture thread: {e}"))
            })?;
        *self.capture_handle.lock() = Some(handle);

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => {
                self.stop();
                Err(error)
            }
            Err(_) => {
                self.stop();
                Err(CaptureError::BackendInternal(
                    "capture thread exited before reporting readiness".into(),
                ))
            }
        }
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.capture_handle.lock().take() {
            let _ = handle.join();
        }
        // Slots still held here are released, not recycled.
        self.submitted.lock().clear();
    }
}
