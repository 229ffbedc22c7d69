/// Capture session lifecycle.
///
/// Transitions:
/// ```text
/// created → active → ended
/// ```
/// `Ended` is terminal: it is reached by `stop()`, by an unrecoverable
/// mid-stream error, or by dropping the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Active,
    Ended,
}

impl SessionState {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Ended)
    }
}
