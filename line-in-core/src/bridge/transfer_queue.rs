use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::models::slot::FilledSlot;

struct QueueShared {
    pending: Mutex<Vec<FilledSlot>>,
    wake: Condvar,
    closed: AtomicBool,
}

/// Pool-and-notify hand-off of filled slots from the producer to the
/// delivery thread.
///
/// The producer appends under a short-held lock and rings a coalescing wake;
/// the delivery side detaches the whole pending sequence under the same lock
/// and walks it outside. The lock is never held while bytes are copied or
/// the consumer runs. Appending is O(1) beyond the lock, so a realtime
/// producer is never stalled by a slow consumer.
///
/// Wake-ups coalesce: any number of appends before one drain produce a
/// single batch, and the drain takes everything, so a merged or spurious
/// wake loses nothing.
#[derive(Clone)]
pub struct TransferQueue {
    shared: Arc<QueueShared>,
}

impl TransferQueue {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(QueueShared {
                pending: Mutex::new(Vec::new()),
                wake: Condvar::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Producer side: append a filled slot and wake the delivery thread.
    ///
    /// After [`close`](Self::close) the slot is dropped instead, releasing
    /// its memory rather than recycling it — late completions from the
    /// backend must not touch consumer state after teardown.
    pub fn push_filled(&self, slot: FilledSlot) {
        if self.shared.closed.load(Ordering::Acquire) {
            return;
        }
        {
            let mut pending = self.shared.pending.lock();
            // Re-check under the lock so a concurrent close never leaves a
            // slot stranded in the queue.
            if self.shared.closed.load(Ordering::Acquire) {
                return;
            }
            pending.push(slot);
        }
        self.shared.wake.notify_one();
    }

    /// Delivery side: block until at least one slot is pending, then detach
    /// the entire pending sequence. Returns `None` once the queue is closed.
    pub fn wait_batch(&self) -> Option<Vec<FilledSlot>> {
        let mut pending = self.shared.pending.lock();
        loop {
            if self.shared.closed.load(Ordering::Acquire) {
                return None;
            }
            if !pending.is_empty() {
                return Some(std::mem::take(&mut *pending));
            }
            self.shared.wake.wait(&mut pending);
        }
    }

    /// Detach whatever is pending right now without blocking. Draining an
    /// empty queue is a no-op and returns an empty batch.
    pub fn drain(&self) -> Vec<FilledSlot> {
        std::mem::take(&mut *self.shared.pending.lock())
    }

    /// Close the queue: pending undelivered slots are dropped, future
    /// appends are dropped, and blocked waiters return `None`.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        let dropped = std::mem::take(&mut *self.shared.pending.lock());
        if !dropped.is_empty() {
            log::debug!("transfer queue closed with {} undelivered slots", dropped.len());
        }
        self.shared.wake.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Number of slots currently awaiting delivery.
    pub fn pending_len(&self) -> usize {
        self.shared.pending.lock().len()
    }
}

impl Default for TransferQueue {
    fn default() -> Self {
        Self::new()
    }
}
