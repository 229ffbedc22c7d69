use crate::models::chunk::AudioChunk;

/// The consumer's verdict after each delivered chunk.
///
/// Pool-and-notify sessions ignore it (they are push-driven); demand-and-signal
/// sessions use it to decide whether to dispatch the next read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Keep capturing; schedule the next read immediately.
    Continue,
    /// Pause until the caller explicitly requests more data.
    Stop,
}

impl Continuation {
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

/// Downstream sink for captured chunks — the stream layer.
///
/// `push` is invoked on the session's delivery thread, one chunk at a time,
/// in capture order. A returned error ends the session; it is surfaced as
/// `CaptureError::ConsumerFailure` rather than crashing the process.
pub trait ChunkConsumer: Send {
    fn push(&mut self, chunk: AudioChunk) -> Result<Continuation, String>;
}
