use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::bridge::demand::DemandScheduler;
use crate::bridge::transfer_queue::TransferQueue;
use crate::models::chunk::AudioChunk;
use crate::models::config::CaptureConfig;
use crate::models::error::CaptureError;
use crate::models::format::FormatDescriptor;
use crate::models::slot::BufferSlot;
use crate::models::state::SessionState;
use crate::traits::backend::{DemandBackend, PooledBackend};
use crate::traits::consumer::ChunkConsumer;
use crate::traits::delegate::SessionDelegate;

/// Mutable session state shared with the delivery and worker threads.
struct SessionShared {
    state: Mutex<SessionState>,
    error: Mutex<Option<CaptureError>>,
    delegate: Mutex<Option<Arc<dyn SessionDelegate>>>,
}

impl SessionShared {
    fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::Created),
            error: Mutex::new(None),
            delegate: Mutex::new(None),
        }
    }

    fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Apply a state transition. `Ended` is terminal; a transition out of it
    /// (or into the current state) is refused and returns false.
    fn transition(&self, new_state: SessionState) -> bool {
        {
            let mut state = self.state.lock();
            if state.is_ended() || *state == new_state {
                return false;
            }
            *state = new_state;
        }
        if let Some(delegate) = self.delegate.lock().clone() {
            delegate.on_state_changed(new_state);
        }
        true
    }

    /// End the session because of an unrecoverable error. The first failure
    /// wins; anything after the session is `Ended` (including read errors
    /// provoked by a clean stop) is dropped.
    fn fail(&self, error: CaptureError) {
        if !self.transition(SessionState::Ended) {
            return;
        }
        log::error!("capture session failed: {error}");
        *self.error.lock() = Some(error.clone());
        if let Some(delegate) = self.delegate.lock().clone() {
            delegate.on_error(&error);
        }
    }
}

enum Strategy {
    /// Push-driven: a fixed slot pool cycles through the backend and the
    /// transfer queue.
    Pooled {
        backend: Arc<dyn PooledBackend>,
        queue: TransferQueue,
    },
    /// Pull-driven: single-outstanding blocking reads on a worker thread.
    Demand {
        backend: Arc<dyn DemandBackend>,
        scheduler: DemandScheduler,
    },
}

/// A line-in capture session: one backend, one transfer strategy, one
/// consumer.
///
/// Chunks are delivered in capture order to the consumer on a dedicated
/// delivery thread owned by the session. The producer side (a backend
/// callback thread or the blocking-read worker) never touches consumer
/// state; all hand-off goes through the strategy's bridge.
///
/// Lifecycle: `created → active → ended`. Dropping the session stops it.
pub struct CaptureSession {
    config: CaptureConfig,
    format: FormatDescriptor,
    shared: Arc<SessionShared>,
    strategy: Strategy,
    delivery_handle: Option<thread::JoinHandle<()>>,
    worker_handle: Option<thread::JoinHandle<()>>,
}

impl CaptureSession {
    /// Create a pool-and-notify session over `backend`.
    pub fn pooled(
        backend: Arc<dyn PooledBackend>,
        config: CaptureConfig,
    ) -> Result<Self, CaptureError> {
        let format = Self::negotiate(backend.format(), &config)?;
        Ok(Self {
            config,
            format,
            shared: Arc::new(SessionShared::new()),
            strategy: Strategy::Pooled {
                backend,
                queue: TransferQueue::new(),
            },
            delivery_handle: None,
            worker_handle: None,
        })
    }

    /// Create a demand-and-signal session over `backend`.
    pub fn on_demand(
        backend: Arc<dyn DemandBackend>,
        config: CaptureConfig,
    ) -> Result<Self, CaptureError> {
        let format = Self::negotiate(backend.format(), &config)?;
        Ok(Self {
            config,
            format,
            shared: Arc::new(SessionShared::new()),
            strategy: Strategy::Demand {
                backend,
                scheduler: DemandScheduler::new(),
            },
            delivery_handle: None,
            worker_handle: None,
        })
    }

    fn negotiate(
        backend_format: FormatDescriptor,
        config: &CaptureConfig,
    ) -> Result<FormatDescriptor, CaptureError> {
        config.validate().map_err(CaptureError::FormatUnsupported)?;
        if backend_format != config.format() {
            return Err(CaptureError::FormatUnsupported(format!(
                "backend captures {:?}, session configured for {:?}",
                backend_format,
                config.format()
            )));
        }
        Ok(backend_format)
    }

    pub fn set_delegate(&self, delegate: Arc<dyn SessionDelegate>) {
        *self.shared.delegate.lock() = Some(delegate);
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// The error that ended the session mid-stream, if any.
    pub fn last_error(&self) -> Option<CaptureError> {
        self.shared.error.lock().clone()
    }

    pub fn format(&self) -> FormatDescriptor {
        self.format
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Arm capture and hand the consumer to the delivery thread.
    ///
    /// For pool-and-notify this pre-submits the full buffer pool before
    /// starting the producer, so capture can begin at full capacity. A
    /// backend failure here is returned as a typed error and ends the
    /// session; nothing is retried.
    pub fn start(&mut self, consumer: Box<dyn ChunkConsumer>) -> Result<(), CaptureError> {
        if !self.shared.state().is_created() {
            return Err(CaptureError::InvalidState(
                "session already started".into(),
            ));
        }

        match &self.strategy {
            Strategy::Pooled { backend, queue } => {
                if let Err(error) = self.arm_pooled(backend, queue) {
                    backend.stop();
                    self.shared.transition(SessionState::Ended);
                    return Err(error);
                }
                let delivery = {
                    let queue = queue.clone();
                    let backend = Arc::clone(backend);
                    let shared = Arc::clone(&self.shared);
                    spawn_thread("chunk-delivery", move || {
                        run_pool_delivery(queue, backend, consumer, shared);
                    })?
                };
                self.delivery_handle = Some(delivery);
            }
            Strategy::Demand { backend, scheduler } => {
                if let Err(error) = backend.start() {
                    backend.stop();
                    self.shared.transition(SessionState::Ended);
                    return Err(error);
                }
                let (tx, rx) = mpsc::channel();
                let worker = {
                    let scheduler = scheduler.clone();
                    let backend = Arc::clone(backend);
                    let size = self.config.buffer_bytes;
                    spawn_thread("demand-read", move || {
                        run_demand_worker(scheduler, backend, tx, size);
                    })?
                };
                let delivery = {
                    let scheduler = scheduler.clone();
                    let backend = Arc::clone(backend);
                    let shared = Arc::clone(&self.shared);
                    spawn_thread("chunk-delivery", move || {
                        run_demand_delivery(rx, scheduler, backend, consumer, shared);
                    })?
                };
                self.worker_handle = Some(worker);
                self.delivery_handle = Some(delivery);
            }
        }

        self.shared.transition(SessionState::Active);
        Ok(())
    }

    fn arm_pooled(
        &self,
        backend: &Arc<dyn PooledBackend>,
        queue: &TransferQueue,
    ) -> Result<(), CaptureError> {
        for index in 0..self.config.pool_depth {
            backend.submit(BufferSlot::new(index, self.config.buffer_bytes))?;
        }
        let queue = queue.clone();
        backend.start(Arc::new(move |slot| queue.push_filled(slot)))
    }

    /// Ask for one more chunk (demand-and-signal only).
    ///
    /// A request while a read is already in flight coalesces into it. On a
    /// pool-and-notify session this is an accepted no-op: that variant is
    /// push-driven and paces itself.
    pub fn request_read(&self) -> Result<(), CaptureError> {
        if !self.shared.state().is_active() {
            return Err(CaptureError::InvalidState(
                "read requested on an inactive session".into(),
            ));
        }
        match &self.strategy {
            Strategy::Pooled { .. } => {
                log::debug!("request_read ignored: pool-and-notify session is push-driven");
            }
            Strategy::Demand { scheduler, .. } => {
                scheduler.request();
            }
        }
        Ok(())
    }

    /// End the session. Idempotent; safe to call with completions in flight.
    ///
    /// Buffers the backend hands back after this point are released rather
    /// than recycled or delivered.
    pub fn stop(&mut self) {
        self.shared.transition(SessionState::Ended);

        match &self.strategy {
            Strategy::Pooled { backend, queue } => {
                queue.close();
                backend.stop();
            }
            Strategy::Demand { backend, scheduler } => {
                scheduler.close();
                // Unblocks a read_chunk in flight on the worker.
                backend.stop();
            }
        }

        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.delivery_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_thread(
    name: &str,
    body: impl FnOnce() + Send + 'static,
) -> Result<thread::JoinHandle<()>, CaptureError> {
    thread::Builder::new()
        .name(name.into())
        .spawn(body)
        .map_err(|e| CaptureError::BackendInternal(format!("failed to spawn {name} thread: {e}")))
}

/// Pool-and-notify delivery loop.
///
/// Waits for a batch of filled slots, then for each slot: copy the bytes
/// into a chunk, re-submit the slot right away so the pool never starves,
/// and push the chunk. Re-submission happens for every slot in the batch
/// even after a consumer failure earlier in it; the failure ends the session
/// once the batch is done.
fn run_pool_delivery(
    queue: TransferQueue,
    backend: Arc<dyn PooledBackend>,
    mut consumer: Box<dyn ChunkConsumer>,
    shared: Arc<SessionShared>,
) {
    while let Some(batch) = queue.wait_batch() {
        let mut failure: Option<CaptureError> = None;

        for slot in batch {
            let chunk = AudioChunk::copy_from(slot.bytes());
            if let Err(error) = backend.submit(slot.into_slot()) {
                log::warn!("slot re-submission failed: {error}");
            }
            if failure.is_none() {
                // Continuation is ignored: this variant is push-driven.
                if let Err(message) = consumer.push(chunk) {
                    failure = Some(CaptureError::ConsumerFailure(message));
                }
            }
        }

        if let Some(error) = failure {
            shared.fail(error);
            queue.close();
            backend.stop();
            break;
        }
    }
}

/// Demand-and-signal worker: one blocking backend read per granted request.
fn run_demand_worker(
    scheduler: DemandScheduler,
    backend: Arc<dyn DemandBackend>,
    results: mpsc::Sender<Result<Vec<u8>, CaptureError>>,
    size_bytes: usize,
) {
    while scheduler.wait_request() {
        let result = backend.read_chunk(size_bytes);
        let failed = result.is_err();
        if results.send(result).is_err() || failed {
            break;
        }
    }
}

/// Demand-and-signal delivery loop: build the chunk, push it, retire the
/// read ticket, then let the consumer's continuation decide whether the next
/// read is dispatched.
fn run_demand_delivery(
    results: mpsc::Receiver<Result<Vec<u8>, CaptureError>>,
    scheduler: DemandScheduler,
    backend: Arc<dyn DemandBackend>,
    mut consumer: Box<dyn ChunkConsumer>,
    shared: Arc<SessionShared>,
) {
    while let Ok(result) = results.recv() {
        match result {
            Ok(bytes) => {
                if shared.state().is_ended() {
                    // Read completed against a stopped session: released,
                    // not delivered.
                    break;
                }
                let chunk = AudioChunk::from_vec(bytes);
                let verdict = consumer.push(chunk);
                scheduler.finish_read();
                match verdict {
                    Ok(continuation) => {
                        if continuation.is_continue() {
                            scheduler.request();
                        }
                    }
                    Err(message) => {
                        shared.fail(CaptureError::ConsumerFailure(message));
                        scheduler.close();
                        backend.stop();
                        break;
                    }
                }
            }
            Err(error) => {
                scheduler.finish_read();
                shared.fail(error);
                scheduler.close();
                backend.stop();
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::backend::SlotFilledCallback;
    use crate::traits::consumer::Continuation;
    use parking_lot::Condvar;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn wait_until(timeout_ms: u64, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    // --- Fakes ---

    struct FakePooledBackend {
        format: FormatDescriptor,
        submitted: Mutex<VecDeque<BufferSlot>>,
        on_filled: Mutex<Option<SlotFilledCallback>>,
        submit_count: AtomicUsize,
        stopped: AtomicBool,
        fail_start: Option<CaptureError>,
        fail_submit: Option<CaptureError>,
    }

    impl FakePooledBackend {
        fn new() -> Self {
            Self {
                format: FormatDescriptor::default(),
                submitted: Mutex::new(VecDeque::new()),
                on_filled: Mutex::new(None),
                submit_count: AtomicUsize::new(0),
                stopped: AtomicBool::new(false),
                fail_start: None,
                fail_submit: None,
            }
        }

        /// Simulate the producer: fill the oldest submitted slot with
        /// `bytes` and fire the completion callback.
        fn complete(&self, bytes: &[u8]) {
            let mut slot = self
                .submitted
                .lock()
                .pop_front()
                .expect("no submitted slot to fill");
            slot.data_mut()[..bytes.len()].copy_from_slice(bytes);
            let filled = slot.filled(bytes.len());
            let callback = self.on_filled.lock().clone().expect("backend not started");
            callback(filled);
        }

        fn submitted_len(&self) -> usize {
            self.submitted.lock().len()
        }
    }

    impl PooledBackend for FakePooledBackend {
        fn format(&self) -> FormatDescriptor {
            self.format
        }

        fn submit(&self, slot: BufferSlot) -> Result<(), CaptureError> {
            if let Some(error) = &self.fail_submit {
                return Err(error.clone());
            }
            self.submit_count.fetch_add(1, Ordering::SeqCst);
            self.submitted.lock().push_back(slot);
            Ok(())
        }

        fn start(&self, on_filled: SlotFilledCallback) -> Result<(), CaptureError> {
            if let Some(error) = &self.fail_start {
                return Err(error.clone());
            }
            *self.on_filled.lock() = Some(on_filled);
            Ok(())
        }

        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    struct FakeDemandBackend {
        format: FormatDescriptor,
        script: Mutex<VecDeque<Result<Vec<u8>, CaptureError>>>,
        script_wake: Condvar,
        read_count: AtomicUsize,
        stopped: AtomicBool,
        fail_start: Option<CaptureError>,
    }

    impl FakeDemandBackend {
        fn new(script: Vec<Result<Vec<u8>, CaptureError>>) -> Self {
            Self {
                format: FormatDescriptor::default(),
                script: Mutex::new(script.into()),
                script_wake: Condvar::new(),
                read_count: AtomicUsize::new(0),
                stopped: AtomicBool::new(false),
                fail_start: None,
            }
        }

        fn reads(&self) -> usize {
            self.read_count.load(Ordering::SeqCst)
        }
    }

    impl DemandBackend for FakeDemandBackend {
        fn format(&self) -> FormatDescriptor {
            self.format
        }

        fn start(&self) -> Result<(), CaptureError> {
            if let Some(error) = &self.fail_start {
                return Err(error.clone());
            }
            Ok(())
        }

        fn read_chunk(&self, _size_bytes: usize) -> Result<Vec<u8>, CaptureError> {
            self.read_count.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock();
            loop {
                if let Some(result) = script.pop_front() {
                    return result;
                }
                if self.stopped.load(Ordering::SeqCst) {
                    return Err(CaptureError::InvalidState("capture stopped".into()));
                }
                // Block like a real device read until data or stop.
                self.script_wake.wait(&mut script);
            }
        }

        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
            self.script_wake.notify_all();
        }
    }

    #[derive(Clone)]
    struct CollectingConsumer {
        chunks: Arc<Mutex<Vec<Vec<u8>>>>,
        verdicts: Arc<Mutex<VecDeque<Result<Continuation, String>>>>,
    }

    impl CollectingConsumer {
        fn new(verdicts: Vec<Result<Continuation, String>>) -> Self {
            Self {
                chunks: Arc::new(Mutex::new(Vec::new())),
                verdicts: Arc::new(Mutex::new(verdicts.into())),
            }
        }

        fn chunk_count(&self) -> usize {
            self.chunks.lock().len()
        }
    }

    impl ChunkConsumer for CollectingConsumer {
        fn push(&mut self, chunk: AudioChunk) -> Result<Continuation, String> {
            self.chunks.lock().push(chunk.bytes().to_vec());
            self.verdicts
                .lock()
                .pop_front()
                .unwrap_or(Ok(Continuation::Continue))
        }
    }

    // --- Pool-and-notify ---

    #[test]
    fn pooled_start_pre_submits_full_pool() {
        let backend = Arc::new(FakePooledBackend::new());
        let mut session =
            CaptureSession::pooled(backend.clone(), CaptureConfig::default()).unwrap();
        let consumer = CollectingConsumer::new(vec![]);

        session.start(Box::new(consumer)).unwrap();
        assert!(session.state().is_active());
        assert_eq!(backend.submitted_len(), 3);
    }

    #[test]
    fn pooled_delivers_three_fills_in_order_and_recycles() {
        let backend = Arc::new(FakePooledBackend::new());
        let mut session =
            CaptureSession::pooled(backend.clone(), CaptureConfig::default()).unwrap();
        let consumer = CollectingConsumer::new(vec![]);
        let chunks = consumer.chunks.clone();

        session.start(Box::new(consumer)).unwrap();

        backend.complete(&[1; 16]);
        backend.complete(&[2; 16]);
        backend.complete(&[3; 16]);

        assert!(wait_until(1000, || chunks.lock().len() == 3));
        let first_bytes: Vec<u8> = chunks.lock().iter().map(|c| c[0]).collect();
        assert_eq!(first_bytes, vec![1, 2, 3]);

        // All three slots went back to the backend: pool size unchanged.
        assert!(wait_until(1000, || backend.submitted_len() == 3));
        assert_eq!(backend.submit_count.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn pooled_start_failure_is_typed_not_fatal() {
        let mut backend = FakePooledBackend::new();
        backend.fail_start = Some(CaptureError::DeviceUnavailable);
        let mut session =
            CaptureSession::pooled(Arc::new(backend), CaptureConfig::default()).unwrap();

        let result = session.start(Box::new(CollectingConsumer::new(vec![])));
        assert_eq!(result, Err(CaptureError::DeviceUnavailable));
        assert!(session.state().is_ended());
    }

    #[test]
    fn pooled_submit_failure_is_typed_not_fatal() {
        let mut backend = FakePooledBackend::new();
        backend.fail_submit = Some(CaptureError::BackendInternal("status -50".into()));
        let mut session =
            CaptureSession::pooled(Arc::new(backend), CaptureConfig::default()).unwrap();

        let result = session.start(Box::new(CollectingConsumer::new(vec![])));
        assert_eq!(
            result,
            Err(CaptureError::BackendInternal("status -50".into()))
        );
        assert!(session.state().is_ended());
    }

    #[test]
    fn stop_is_idempotent_and_frees_late_completions() {
        let backend = Arc::new(FakePooledBackend::new());
        let mut session =
            CaptureSession::pooled(backend.clone(), CaptureConfig::default()).unwrap();
        let consumer = CollectingConsumer::new(vec![]);
        let chunks = consumer.chunks.clone();

        session.start(Box::new(consumer)).unwrap();
        session.stop();
        session.stop();
        assert!(session.state().is_ended());
        assert!(backend.stopped.load(Ordering::SeqCst));

        // A completion racing past stop is freed, never delivered or recycled.
        backend.complete(&[9; 16]);
        thread::sleep(Duration::from_millis(50));
        assert!(chunks.lock().is_empty());
        assert_eq!(backend.submit_count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn consumer_failure_mid_batch_still_recycles_whole_batch() {
        let queue = TransferQueue::new();
        let backend = Arc::new(FakePooledBackend::new());
        let shared = Arc::new(SessionShared::new());
        shared.transition(SessionState::Active);

        for i in 0..3u8 {
            let mut slot = BufferSlot::new(i as usize, 8);
            slot.data_mut().fill(i);
            queue.push_filled(slot.filled(8));
        }

        let consumer = CollectingConsumer::new(vec![Err("stream torn down".into())]);
        let chunks = consumer.chunks.clone();
        run_pool_delivery(
            queue.clone(),
            backend.clone(),
            Box::new(consumer),
            shared.clone(),
        );

        // One push failed, but every slot in the batch was re-submitted.
        assert_eq!(chunks.lock().len(), 1);
        assert_eq!(backend.submitted_len(), 3);
        assert!(shared.state().is_ended());
        assert_eq!(
            *shared.error.lock(),
            Some(CaptureError::ConsumerFailure("stream torn down".into()))
        );
        assert!(queue.is_closed());
    }

    #[test]
    fn pooled_request_read_is_accepted_noop() {
        let backend = Arc::new(FakePooledBackend::new());
        let mut session =
            CaptureSession::pooled(backend, CaptureConfig::default()).unwrap();
        session
            .start(Box::new(CollectingConsumer::new(vec![])))
            .unwrap();
        assert!(session.request_read().is_ok());
    }

    #[test]
    fn format_mismatch_rejected_at_creation() {
        let mut backend = FakePooledBackend::new();
        backend.format.sample_rate = 48_000;
        let result = CaptureSession::pooled(Arc::new(backend), CaptureConfig::default());
        assert!(matches!(
            result,
            Err(CaptureError::FormatUnsupported(_))
        ));
    }

    // --- Demand-and-signal ---

    #[test]
    fn demand_stop_verdict_reads_exactly_once() {
        let backend = Arc::new(FakeDemandBackend::new(vec![
            Ok(vec![1; 32]),
            Ok(vec![2; 32]),
        ]));
        let mut session =
            CaptureSession::on_demand(backend.clone(), CaptureConfig::default()).unwrap();
        let consumer =
            CollectingConsumer::new(vec![Ok(Continuation::Stop), Ok(Continuation::Stop)]);
        let chunks = consumer.chunks.clone();

        session.start(Box::new(consumer)).unwrap();
        session.request_read().unwrap();

        assert!(wait_until(1000, || chunks.lock().len() == 1));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(backend.reads(), 1);
        assert_eq!(chunks.lock()[0], vec![1; 32]);

        // A fresh explicit request dispatches the second read.
        session.request_read().unwrap();
        assert!(wait_until(1000, || chunks.lock().len() == 2));
        assert_eq!(backend.reads(), 2);
    }

    #[test]
    fn demand_continue_verdict_keeps_reading() {
        let backend = Arc::new(FakeDemandBackend::new(vec![
            Ok(vec![1; 32]),
            Ok(vec![2; 32]),
            Ok(vec![3; 32]),
        ]));
        let mut session =
            CaptureSession::on_demand(backend.clone(), CaptureConfig::default()).unwrap();
        let consumer = CollectingConsumer::new(vec![
            Ok(Continuation::Continue),
            Ok(Continuation::Continue),
            Ok(Continuation::Stop),
        ]);
        let chunks = consumer.chunks.clone();

        session.start(Box::new(consumer)).unwrap();
        session.request_read().unwrap();

        assert!(wait_until(1000, || chunks.lock().len() == 3));
        let first_bytes: Vec<u8> = chunks.lock().iter().map(|c| c[0]).collect();
        assert_eq!(first_bytes, vec![1, 2, 3]);

        thread::sleep(Duration::from_millis(50));
        assert_eq!(backend.reads(), 3);
    }

    #[test]
    fn demand_read_error_ends_session_once() {
        let backend = Arc::new(FakeDemandBackend::new(vec![Err(
            CaptureError::BackendInternal("pa_simple_read failed".into()),
        )]));
        let mut session =
            CaptureSession::on_demand(backend.clone(), CaptureConfig::default()).unwrap();
        let consumer = CollectingConsumer::new(vec![]);
        let chunks = consumer.chunks.clone();

        session.start(Box::new(consumer)).unwrap();
        session.request_read().unwrap();

        assert!(wait_until(1000, || session.state().is_ended()));
        assert_eq!(
            session.last_error(),
            Some(CaptureError::BackendInternal("pa_simple_read failed".into()))
        );
        assert!(chunks.lock().is_empty());
    }

    #[test]
    fn demand_consumer_failure_ends_session() {
        let backend = Arc::new(FakeDemandBackend::new(vec![Ok(vec![1; 32])]));
        let mut session =
            CaptureSession::on_demand(backend.clone(), CaptureConfig::default()).unwrap();
        let consumer = CollectingConsumer::new(vec![Err("push rejected".into())]);

        session.start(Box::new(consumer)).unwrap();
        session.request_read().unwrap();

        assert!(wait_until(1000, || session.state().is_ended()));
        assert_eq!(
            session.last_error(),
            Some(CaptureError::ConsumerFailure("push rejected".into()))
        );
    }

    #[test]
    fn demand_start_failure_is_typed_not_fatal() {
        let mut backend = FakeDemandBackend::new(vec![]);
        backend.fail_start = Some(CaptureError::DeviceUnavailable);
        let mut session =
            CaptureSession::on_demand(Arc::new(backend), CaptureConfig::default()).unwrap();

        let result = session.start(Box::new(CollectingConsumer::new(vec![])));
        assert_eq!(result, Err(CaptureError::DeviceUnavailable));
        assert!(session.state().is_ended());
    }

    #[test]
    fn stop_unblocks_pending_read_without_error() {
        // Empty script: the read blocks like a quiet device.
        let backend = Arc::new(FakeDemandBackend::new(vec![]));
        let mut session =
            CaptureSession::on_demand(backend.clone(), CaptureConfig::default()).unwrap();

        session
            .start(Box::new(CollectingConsumer::new(vec![])))
            .unwrap();
        session.request_read().unwrap();
        assert!(wait_until(1000, || backend.reads() == 1));

        session.stop();
        assert!(session.state().is_ended());
        // A clean stop is not an error, even though it aborted the read.
        assert_eq!(session.last_error(), None);
    }

    #[test]
    fn request_read_after_stop_is_invalid_state() {
        let backend = Arc::new(FakeDemandBackend::new(vec![]));
        let mut session =
            CaptureSession::on_demand(backend, CaptureConfig::default()).unwrap();
        session
            .start(Box::new(CollectingConsumer::new(vec![])))
            .unwrap();
        session.stop();

        assert!(matches!(
            session.request_read(),
            Err(CaptureError::InvalidState(_))
        ));
    }

    #[test]
    fn request_read_before_start_is_invalid_state() {
        let backend = Arc::new(FakeDemandBackend::new(vec![]));
        let session = CaptureSession::on_demand(backend, CaptureConfig::default()).unwrap();
        assert!(matches!(
            session.request_read(),
            Err(CaptureError::InvalidState(_))
        ));
    }

    #[test]
    fn double_start_is_invalid_state() {
        let backend = Arc::new(FakePooledBackend::new());
        let mut session =
            CaptureSession::pooled(backend, CaptureConfig::default()).unwrap();
        session
            .start(Box::new(CollectingConsumer::new(vec![])))
            .unwrap();
        let second = session.start(Box::new(CollectingConsumer::new(vec![])));
        assert!(matches!(second, Err(CaptureError::InvalidState(_))));
    }

    // --- Delegate ---

    struct RecordingDelegate {
        states: Mutex<Vec<SessionState>>,
        errors: Mutex<Vec<CaptureError>>,
    }

    impl SessionDelegate for RecordingDelegate {
        fn on_state_changed(&self, state: SessionState) {
            self.states.lock().push(state);
        }

        fn on_error(&self, error: &CaptureError) {
            self.errors.lock().push(error.clone());
        }
    }

    #[test]
    fn delegate_sees_lifecycle_and_single_error() {
        let backend = Arc::new(FakeDemandBackend::new(vec![Err(
            CaptureError::BackendInternal("status -1".into()),
        )]));
        let mut session =
            CaptureSession::on_demand(backend, CaptureConfig::default()).unwrap();
        let delegate = Arc::new(RecordingDelegate {
            states: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
        });
        session.set_delegate(delegate.clone());

        session
            .start(Box::new(CollectingConsumer::new(vec![])))
            .unwrap();
        session.request_read().unwrap();
        assert!(wait_until(1000, || session.state().is_ended()));
        session.stop();

        assert_eq!(
            *delegate.states.lock(),
            vec![SessionState::Active, SessionState::Ended]
        );
        assert_eq!(delegate.errors.lock().len(), 1);
    }
}
