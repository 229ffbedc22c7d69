use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

struct DemandShared {
    /// The read ticket: true while one read is in flight or queued.
    reading: AtomicBool,
    requested: Mutex<bool>,
    wake: Condvar,
    closed: AtomicBool,
}

/// Demand-and-signal scheduler: at most one backend read in flight, and no
/// read at all unless the consumer asked for one.
///
/// `request` is the backpressure valve: a request while a read is already
/// ticketed is coalesced into it, never queued. The session's worker thread
/// parks in [`wait_request`] between reads; the delivery thread clears the
/// ticket with [`finish_read`] after the chunk has been handed over, then
/// re-requests if the consumer said to continue.
#[derive(Clone)]
pub struct DemandScheduler {
    shared: Arc<DemandShared>,
}

impl DemandScheduler {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(DemandShared {
                reading: AtomicBool::new(false),
                requested: Mutex::new(false),
                wake: Condvar::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Ask for one more chunk. Returns false if a read is already in flight
    /// (the request coalesces into it) or the scheduler is closed.
    pub fn request(&self) -> bool {
        if self.shared.closed.load(Ordering::Acquire) {
            return false;
        }
        if self
            .shared
            .reading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        *self.shared.requested.lock() = true;
        self.shared.wake.notify_one();
        true
    }

    /// Worker side: park until a read has been requested. Returns false once
    /// the scheduler is closed.
    pub fn wait_request(&self) -> bool {
        let mut requested = self.shared.requested.lock();
        loop {
            if self.shared.closed.load(Ordering::Acquire) {
                return false;
            }
            if *requested {
                *requested = false;
                return true;
            }
            self.shared.wake.wait(&mut requested);
        }
    }

    /// Delivery side: retire the ticket once the chunk has been delivered,
    /// making the scheduler accept the next request.
    pub fn finish_read(&self) {
        self.shared.reading.store(false, Ordering::Release);
    }

    /// Whether a read is currently ticketed.
    pub fn is_reading(&self) -> bool {
        self.shared.reading.load(Ordering::Acquire)
    }

    /// Close the scheduler: pending and future requests are refused and the
    /// parked worker is released.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        *self.shared.requested.lock() = false;
        self.shared.wake.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl Default for DemandScheduler {
    fn default() -> Self {
        Self::new()
    }
}
