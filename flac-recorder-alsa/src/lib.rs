//! # flac-recorder-alsa
//!
//! Linux ALSA backend for flac-recorder.
//!
//! Provides:
//! - `AlsaBackend`: channel map and format probing on a PCM capture device
//! - `AlsaCaptureDevice`: non-blocking interleaved capture stream
//!
//! ## Platform Requirements
//! - Linux with the ALSA userspace library (`libasound2-dev` to build)
//!
//! ## Usage
//! ```ignore
//! use flac_recorder_alsa::AlsaBackend;
//! use flac_recorder_core::{Recorder, RecorderConfig};
//!
//! let backend = AlsaBackend::new("hw:1");
//! let recorder = Recorder::start(backend, RecorderConfig::new("hw:1"), surface, None)?;
//! ```

#[cfg(target_os = "linux")]
pub mod alsa_capture;

#[cfg(target_os = "linux")]
pub use alsa_capture::{AlsaBackend, AlsaCaptureDevice};
