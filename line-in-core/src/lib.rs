//! # line-in-core
//!
//! Platform-agnostic line-in capture bridge.
//!
//! Moves filled PCM buffers from an asynchronous producer (a realtime audio
//! callback or a blocking-read worker) to a single consumer loop, in capture
//! order, without blocking the producer and without overrunning the consumer.
//! Platform backends (cpal, or anything else) implement the backend traits
//! and plug into the generic `CaptureSession`.
//!
//! Two bridge strategies are provided:
//!
//! - **Pool-and-notify** ([`TransferQueue`]): a fixed pool of buffers cycles
//!   between the backend and the delivery thread; filled buffers are queued
//!   under a short-held lock and drained in whole batches on a coalesced
//!   wake.
//! - **Demand-and-signal** ([`DemandScheduler`]): the consumer requests one
//!   chunk at a time; a single blocking read is dispatched per request and
//!   the consumer's continuation verdict paces the next one.
//!
//! ## Architecture
//!
//! ```text
//! line-in-core (this crate)
//! ├── traits/   ← PooledBackend, DemandBackend, ChunkConsumer, SessionDelegate
//! ├── models/   ← AudioChunk, BufferSlot, FormatDescriptor, CaptureConfig,
//! │               CaptureError, SessionState
//! ├── bridge/   ← TransferQueue (pool-and-notify), DemandScheduler (demand-and-signal)
//! └── session/  ← CaptureSession (composition, delivery and worker threads)
//! ```

pub mod bridge;
pub mod models;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use bridge::demand::DemandScheduler;
pub use bridge::transfer_queue::TransferQueue;
pub use models::chunk::AudioChunk;
pub use models::config::CaptureConfig;
pub use models::error::CaptureError;
pub use models::format::FormatDescriptor;
pub use models::slot::{BufferSlot, FilledSlot};
pub use models::state::SessionState;
pub use session::capture::CaptureSession;
pub use traits::backend::{DemandBackend, PooledBackend, SlotFilledCallback};
pub use traits::consumer::{ChunkConsumer, Continuation};
pub use traits::delegate::SessionDelegate;
