use serde::{Deserialize, Serialize};

use super::format::FormatDescriptor;

/// Configuration for a capture session.
///
/// The defaults reproduce the classic line-in setup: 44.1kHz stereo
/// 16-bit signed PCM, 8KiB buffers, a pool of three.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Sample rate in Hz (default: 44100).
    pub sample_rate: u32,

    /// Number of channels (default: 2 for stereo).
    pub channels: u16,

    /// Bit depth for PCM samples (default: 16). Valid values: 8, 16, 24, 32.
    pub bits_per_sample: u16,

    /// Size of one capture buffer / delivered chunk in bytes (default: 8192).
    pub buffer_bytes: usize,

    /// Number of buffers in the reusable pool, pool-and-notify only
    /// (default: 3).
    pub pool_depth: usize,
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if ![1, 2].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if ![8, 16, 24, 32].contains(&self.bits_per_sample) {
            return Err(format!("unsupported bit depth: {}", self.bits_per_sample));
        }
        let frame = self.format().frame_bytes();
        if self.buffer_bytes == 0 || self.buffer_bytes % frame != 0 {
            return Err(format!(
                "buffer size {} is not a multiple of the {}-byte frame",
                self.buffer_bytes, frame
            ));
        }
        if self.pool_depth == 0 {
            return Err("pool depth must be at least 1".into());
        }
        Ok(())
    }

    /// The format a session with this configuration captures in.
    pub fn format(&self) -> FormatDescriptor {
        FormatDescriptor {
            sample_rate: self.sample_rate,
            channels: self.channels,
            bits_per_sample: self.bits_per_sample,
            signed: true,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            bits_per_sample: 16,
            buffer_bytes: 8192,
            pool_depth: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CaptureConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_sample_rate() {
        let config = CaptureConfig {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_odd_buffer_size() {
        // 16-bit stereo frames are 4 bytes; 8190 is not a multiple
        let config = CaptureConfig {
            buffer_bytes: 8190,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_pool() {
        let config = CaptureConfig {
            pool_depth: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn format_matches_fields() {
        let format = CaptureConfig::default().format();
        assert_eq!(format.sample_rate, 44_100);
        assert_eq!(format.channels, 2);
        assert_eq!(format.bits_per_sample, 16);
        assert!(format.signed);
        assert_eq!(format.frame_bytes(), 4);
    }
}
