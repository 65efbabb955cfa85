use crate::models::error::RecorderError;
use crate::models::format::{ChannelSelection, FrameFormat};

/// Picks the two selected channels out of raw interleaved hardware frames
/// and packs them as interleaved stereo `i32` samples for the encoder.
///
/// This is a selection, not a mixdown: every output sample is exactly one
/// input sample. 32-bit input is divided by 256 to fit the encoder's 24-bit
/// ceiling; 16 and 24-bit input is passed through unscaled.
#[derive(Debug, Clone)]
pub struct ChannelDownmixer {
    format: FrameFormat,
    selection: ChannelSelection,
}

impl ChannelDownmixer {
    /// Fails if `selection` names a channel outside `format`'s frames.
    pub fn new(format: FrameFormat, selection: ChannelSelection) -> Result<Self, RecorderError> {
        selection.check_within(&format)?;
        Ok(Self { format, selection })
    }

    pub fn format(&self) -> &FrameFormat {
        &self.format
    }

    pub fn selection(&self) -> &ChannelSelection {
        &self.selection
    }

    /// Convert `frames` frames from `capture` into `out`.
    ///
    /// `out` is cleared first and holds `2 * frames` samples afterwards.
    /// Frames beyond what `capture` holds are ignored.
    pub fn convert(&self, capture: &[u8], frames: usize, out: &mut Vec<i32>) {
        out.clear();

        let stride = self.format.bytes_per_frame();
        let storage = self.format.storage_bytes();
        let width = self.format.sample_bytes();
        let bits = self.format.bits_per_sample;
        let frames = frames.min(capture.len() / stride);

        out.reserve(frames * 2);
        for frame in capture.chunks_exact(stride).take(frames) {
            for channel in self.selection.indices() {
                let offset = channel * storage;
                out.push(unpack_sample(&frame[offset..offset + width], bits));
            }
        }
    }
}

/// Copy a little-endian sample into the low end of a zeroed 32-bit slot.
///
/// 16 and 24-bit values are sign-extended from their own width rather than
/// zero-extended, so negative samples stay inside the encoder's range.
/// 32-bit values are divided by 256.
pub fn unpack_sample(bytes: &[u8], bits: u16) -> i32 {
    let mut slot = [0u8; 4];
    slot[..bytes.len()].copy_from_slice(bytes);
    let raw = i32::from_le_bytes(slot);

    if bits >= 32 {
        return raw / 256;
    }
    let shift = 32 - bits as u32;
    (raw << shift) >> shift
}
