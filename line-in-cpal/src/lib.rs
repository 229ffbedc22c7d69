//! # line-in-cpal
//!
//! cpal backend for the line-in capture bridge.
//!
//! Provides:
//! - `CpalPoolSource` — pool-and-notify capture (fills caller-submitted
//!   buffer slots from the cpal data callback)
//! - `CpalDemandSource` — demand-and-signal capture (blocking per-chunk
//!   reads against an internal byte ring)
//! - `find_input_device` — input device lookup by exact, case-insensitive,
//!   or substring name match
//!
//! Both sources capture 16-bit signed PCM and work with whatever host cpal
//! selects (PipeWire, PulseAudio, ALSA, WASAPI, CoreAudio).
//!
//! ## Usage
//! ```ignore
//! use line_in_core::{CaptureConfig, CaptureSession};
//! use line_in_cpal::CpalPoolSource;
//! use std::sync::Arc;
//!
//! let config = CaptureConfig::default();
//! let source = Arc::new(CpalPoolSource::new(None, &config)?);
//! let mut session = CaptureSession::pooled(source, config)?;
//! session.start(consumer)?;
//! ```

pub mod demand_source;
pub mod device;
pub mod pool_source;
pub mod ring;
mod stream;

pub use demand_source::CpalDemandSource;
pub use device::find_input_device;
pub use pool_source::CpalPoolSource;
pub use ring::ByteRing;
