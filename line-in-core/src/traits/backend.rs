use std::sync::Arc;

use crate::models::error::CaptureError;
use crate::models::format::FormatDescriptor;
use crate::models::slot::{BufferSlot, FilledSlot};

/// Callback invoked when the producer has filled a submitted slot.
///
/// Fires on a backend-owned thread, possibly at realtime priority — it must
/// not block and must not allocate beyond the hand-off itself.
pub type SlotFilledCallback = Arc<dyn Fn(FilledSlot) + Send + Sync + 'static>;

/// Push-driven capture backend backed by a fixed pool of reusable buffers.
///
/// The caller pre-submits writable slots; the backend's producer fills them
/// at its own pace and hands each back through the [`SlotFilledCallback`].
/// Drained slots are re-submitted so the pool never shrinks.
///
/// Implemented by `CpalPoolSource` in the `line-in-cpal` crate.
pub trait PooledBackend: Send + Sync {
    /// The PCM format the producer fills slots with.
    fn format(&self) -> FormatDescriptor;

    /// Hand a writable slot to the backend, re-arming one buffer's worth of
    /// capture capacity.
    fn submit(&self, slot: BufferSlot) -> Result<(), CaptureError>;

    /// Arm the producer. Filled slots arrive asynchronously via `on_filled`,
    /// out of band with respect to this call.
    fn start(&self, on_filled: SlotFilledCallback) -> Result<(), CaptureError>;

    /// Halt the producer. Slots still held by the backend are released.
    fn stop(&self);
}

/// Pull-driven capture backend that performs one blocking read per request.
///
/// Implemented by `CpalDemandSource` in the `line-in-cpal` crate.
pub trait DemandBackend: Send + Sync {
    /// The PCM format reads are delivered in.
    fn format(&self) -> FormatDescriptor;

    /// Arm the capture source.
    fn start(&self) -> Result<(), CaptureError>;

    /// Read exactly `size_bytes` bytes of PCM, blocking the calling worker
    /// until they are available or the backend fails.
    fn read_chunk(&self, size_bytes: usize) -> Result<Vec<u8>, CaptureError>;

    /// Halt capture. Must unblock a concurrent `read_chunk`, which then
    /// returns an error.
    fn stop(&self);
}
