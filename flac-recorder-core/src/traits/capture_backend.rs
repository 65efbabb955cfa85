use crate::models::error::{DeviceFault, ReadError, RecorderError};
use crate::models::format::FrameFormat;

/// An open hardware input stream.
///
/// Owned by the capture thread for the length of one recording session and
/// released by dropping it.
pub trait CaptureDevice: Send {
    /// Read up to `buf.len() / bytes_per_frame` interleaved frames without
    /// blocking. Returns the number of frames read.
    fn read_frames(&mut self, buf: &mut [u8]) -> Result<usize, ReadError>;

    /// Try to bring the stream back after a hard read error.
    fn recover(&mut self, fault: &DeviceFault) -> Result<(), DeviceFault>;

    /// Stop the stream while keeping frames the hardware already buffered
    /// readable. The next read returns them, blocking briefly if needed.
    fn drain(&mut self) -> Result<(), DeviceFault>;
}

/// Interface for platform-specific capture hardware.
///
/// Implemented by:
/// - `AlsaBackend` (Linux)
///
/// Probing calls (`channel_counts`, `try_format`) may keep a handle open
/// between calls; `end_probe` releases it.
pub trait CaptureBackend: Send + 'static {
    type Device: CaptureDevice;

    /// Identifier of the hardware interface, used in messages.
    fn interface(&self) -> &str;

    /// Channel counts of the device's channel maps, in device order.
    fn channel_counts(&mut self) -> Result<Vec<u16>, RecorderError>;

    /// Attempt to configure the hardware with `format`.
    fn try_format(&mut self, format: &FrameFormat) -> Result<(), RecorderError>;

    /// Release anything held open by probing.
    fn end_probe(&mut self) {}

    /// Open a non-blocking capture stream with a negotiated format.
    fn open(&mut self, format: &FrameFormat) -> Result<Self::Device, RecorderError>;
}
