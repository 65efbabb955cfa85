use thiserror::Error;

/// Errors surfaced by the recorder.
///
/// Only `Configuration` is meant to escape the capture subsystem; the others
/// are handled on the capture thread and reported through the delegate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    /// No usable format, or an invalid channel selection. Fatal to construction.
    #[error("configuration failed: {0}")]
    Configuration(String),

    /// The encoder rejected its parameters or the output file could not be created.
    #[error("encoder init failed: {0}")]
    EncoderInit(String),

    /// The hardware could not be opened or failed beyond recovery.
    #[error("device error: {0}")]
    Device(String),

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// A hard error returned by a capture device read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFault {
    /// Positive errno-style code reported by the backend.
    pub code: i32,
    pub message: String,
}

impl DeviceFault {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DeviceFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Outcome of a non-blocking device read that produced no frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// No data available yet. Retried silently.
    WouldBlock,
    /// Anything else. Counted and followed by a recovery attempt.
    Fault(DeviceFault),
}

impl From<DeviceFault> for ReadError {
    fn from(fault: DeviceFault) -> Self {
        Self::Fault(fault)
    }
}
