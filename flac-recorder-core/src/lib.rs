//! # flac-recorder-core
//!
//! Hardware-agnostic capture-to-FLAC core library.
//!
//! Provides format negotiation, channel selection, streaming FLAC output and
//! the capture loop with its error recovery. Hardware backends (Linux ALSA)
//! implement the `CaptureBackend` trait and plug into the generic `Recorder`.
//!
//! ## Architecture
//!
//! ```text
//! flac-recorder-core (this crate)
//! ├── traits/       ← CaptureBackend, CaptureDevice, CaptureDelegate, ControlSurface
//! ├── models/       ← RecorderError, RecorderConfig, FrameFormat, CaptureState, etc.
//! ├── processing/   ← ChannelDownmixer, FLAC STREAMINFO header
//! ├── session/      ← FormatNegotiator, CaptureLoop, RecordingController, Recorder
//! └── storage/      ← FlacFileWriter, metadata
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types at crate root for convenience.
pub use models::config::RecorderConfig;
pub use models::error::{DeviceFault, ReadError, RecorderError};
pub use models::format::{ChannelPair, ChannelSelection, FrameFormat};
pub use models::recording_result::{RecordingMetadata, SessionSummary};
pub use models::state::{CaptureState, SessionOutcome};
pub use processing::channel_downmixer::ChannelDownmixer;
pub use session::capture_loop::{Activity, CaptureLoop};
pub use session::controller::{IntentFlags, RecordingController};
pub use session::negotiator::negotiate;
pub use session::recorder::Recorder;
pub use storage::flac_writer::{EncoderSpec, FlacFileWriter};
pub use traits::capture_backend::{CaptureBackend, CaptureDevice};
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::control_surface::{Button, Control, ControlSurface};
