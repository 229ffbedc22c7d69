use thiserror::Error;

/// Errors that can occur while opening, running, or tearing down a capture
/// session.
///
/// Backend failures are always surfaced to the caller as one of these
/// variants; the library never terminates the process on a bad status code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("device not available")]
    DeviceUnavailable,

    #[error("format not supported: {0}")]
    FormatUnsupported(String),

    #[error("backend failure: {0}")]
    BackendInternal(String),

    #[error("consumer failed: {0}")]
    ConsumerFailure(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}
