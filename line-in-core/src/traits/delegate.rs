use crate::models::error::CaptureError;
use crate::models::state::SessionState;

/// Observer for session lifecycle events.
///
/// Methods are called from the session's capture and delivery threads, not
/// the thread that created the session. Implementations should marshal to
/// their own thread if needed.
pub trait SessionDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: SessionState);

    /// Called once if the session ends because of an error.
    fn on_error(&self, error: &CaptureError);
}
