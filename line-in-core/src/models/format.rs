use serde::{Deserialize, Serialize};

/// PCM format a session captures in.
///
/// Fixed at session creation; immutable for the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Sample rate in Hz.
    pub sample_rate: u32,

    /// Interleaved channel count.
    pub channels: u16,

    /// Bits per sample (8, 16, 24, or 32).
    pub bits_per_sample: u16,

    /// Whether samples are signed integers.
    pub signed: bool,
}

impl FormatDescriptor {
    /// Bytes per interleaved frame (one sample per channel).
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }
}

impl Default for FormatDescriptor {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            bits_per_sample: 16,
            signed: true,
        }
    }
}
