//! Demand-and-signal capture source over cpal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use parking_lot::{Condvar, Mutex};

use line_in_core::{CaptureConfig, CaptureError, DemandBackend, FormatDescriptor};

use crate::ring::ByteRing;
use crate::stream::{ensure_i16, run_input_stream};

/// Ring headroom, in chunks: how much audio can pile up between reads
/// before the oldest bytes are dropped.
const RING_CHUNKS: usize = 8;

/// Pull-driven cpal capture source.
///
/// The capture thread streams sample bytes into a byte ring; `read_chunk`
/// blocks until a full chunk has accumulated, the way a PulseAudio simple
/// read would. `stop` unblocks any reader, which then gets an error.
pub struct CpalDemandSource {
    device_name: Option<String>,
    format: FormatDescriptor,
    ring: Arc<Mutex<ByteRing>>,
    data_ready: Arc<Condvar>,
    running: Arc<AtomicBool>,
    capture_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CpalDemandSource {
    /// Create a source for the default input device, or a named one.
    pub fn new(device_name: Option<String>, config: &CaptureConfig) -> Result<Self, CaptureError> {
        let format = config.format();
        ensure_i16(&format)?;
        Ok(Self {
            device_name,
            format,
            ring: Arc::new(Mutex::new(ByteRing::new(config.buffer_bytes * RING_CHUNKS))),
            data_ready: Arc::new(Condvar::new()),
            running: Arc::new(AtomicBool::new(false)),
            capture_handle: Mutex::new(None),
        })
    }
}

impl DemandBackend for CpalDemandSource {
    fn format(&self) -> FormatDescriptor {
        self.format
    }

    fn start(&self) -> Result<(), CaptureError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(CaptureError::InvalidState("capture already running".into()));
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let device_name = self.device_name.clone();
        let format = self.format;
        let running = Arc::clone(&self.running);

        let data_fn = {
            let ring = Arc::clone(&self.ring);
            let data_ready = Arc::clone(&self.data_ready);
            let running = Arc::clone(&self.running);
            move |data: &[i16]| {
                if !running.load(Ordering::Acquire) {
                    return;
                }
                let mut bytes = Vec::with_capacity(data.len() * 2);
                for &sample in data {
                    bytes.extend_from_slice(&sample.to_le_bytes());
                }
                let dropped = ring.lock().write(&bytes);
                if dropped > 0 {
                    log::debug!("reader behind, dropped {dropped} oldest bytes");
                }
                data_ready.notify_one();
            }
        };

        let handle = thread::Builder::new()
            .name("cpal-demand-capture".into())
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

    fn read_chunk(&self, size_bytes: usize) -> Result<Vec<u8>, CaptureError> {
        let mut ring = self.ring.lock();
        loop {
            if ring.len() >= size_bytes {
                return Ok(ring.read(size_bytes));
            }
            if !self.running.load(Ordering::Acquire) {
                return Err(CaptureError::InvalidState("capture stopped".into()));
            }
            self.data_ready.wait(&mut ring);
        }
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
        // Release any reader parked in read_chunk.
        self.data_ready.notify_all();
        if let Some(handle) = self.capture_handle.lock().take() {
            let _ = handle.join();
        }
        self.ring.lock().clear();
    }
}
