//! FLAC container helpers.
//!
//! A recording starts with the `fLaC` marker and a single STREAMINFO metadata
//! block. Frame statistics are unknown until the stream ends, so the block is
//! written with placeholders first and patched in place on finish.
//!
//! Layout:
//! ```text
//! [0-3]    "fLaC"
//! [4]      last-metadata-block flag (1) | block type (0 = STREAMINFO)
//! [5-7]    block length = 34
//! [8-9]    min block size
//! [10-11]  max block size
//! [12-14]  min frame size (0 = unknown)
//! [15-17]  max frame size (0 = unknown)
//! [18-25]  sample rate (20 bits) | channels - 1 (3) | bits - 1 (5) | total samples (36)
//! [26-41]  MD5 of the unencoded audio (all zero = not computed)
//! ```
use crate::models::error::RecorderError;

pub const FLAC_MARKER: &[u8; 4] = b"fLaC";

/// Size of the STREAMINFO block body.
pub const STREAMINFO_SIZE: usize = 34;

/// File offset of the STREAMINFO body.
pub const STREAMINFO_OFFSET: u64 = 8;

/// Marker + block header + STREAMINFO. Audio frames start here.
pub const FLAC_HEADER_SIZE: usize = 8 + STREAMINFO_SIZE;

const MAX_TOTAL_SAMPLES: u64 = (1 << 36) - 1;

/// The STREAMINFO metadata block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfoBlock {
    pub min_block_size: u16,
    pub max_block_size: u16,
    pub min_frame_size: u32,
    pub max_frame_size: u32,
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
    pub total_samples: u64,
    pub md5: [u8; 16],
}

impl StreamInfoBlock {
    /// A block for a fixed-block-size stream whose length is not known yet.
    pub fn new(sample_rate: u32, channels: u8, bits_per_sample: u8, block_size: u16) -> Self {
        Self {
            min_block_size: block_size,
            max_block_size: block_size,
            min_frame_size: 0,
            max_frame_size: 0,
            sample_rate,
            channels,
            bits_per_sample,
            total_samples: 0,
            md5: [0; 16],
        }
    }

    /// Account for one encoded frame of `size` bytes.
    pub fn record_frame(&mut self, size: u32) {
        self.min_frame_size = if self.min_frame_size == 0 {
            size
        } else {
            self.min_frame_size.min(size)
        };
        self.max_frame_size = self.max_frame_size.max(size);
    }

    pub fn to_bytes(&self) -> [u8; STREAMINFO_SIZE] {
        let mut block = [0u8; STREAMINFO_SIZE];

        block[0..2].copy_from_slice(&self.min_block_size.to_be_bytes());
        block[2..4].copy_from_slice(&self.max_block_size.to_be_bytes());
        block[4..7].copy_from_slice(&self.min_frame_size.to_be_bytes()[1..]);
        block[7..10].copy_from_slice(&self.max_frame_size.to_be_bytes()[1..]);

        let packed = (u64::from(self.sample_rate) & 0xF_FFFF) << 44
            | u64::from(self.channels.saturating_sub(1) & 0x7) << 41
            | u64::from(self.bits_per_sample.saturating_sub(1) & 0x1F) << 36
            | self.total_samples.min(MAX_TOTAL_SAMPLES);
        block[10..18].copy_from_slice(&packed.to_be_bytes());

        block[18..34].copy_from_slice(&self.md5);
        block
    }

    pub fn from_bytes(block: &[u8]) -> Result<Self, RecorderError> {
        if block.len() < STREAMINFO_SIZE {
            return Err(RecorderError::Storage(format!(
                "STREAMINFO too short: {} bytes",
                block.len()
            )));
        }

        let be24 = |b: &[u8]| u32::from_be_bytes([0, b[0], b[1], b[2]]);
        let mut packed = [0u8; 8];
        packed.copy_from_slice(&block[10..18]);
        let packed = u64::from_be_bytes(packed);
        let mut md5 = [0u8; 16];
        md5.copy_from_slice(&block[18..34]);

        Ok(Self {
            min_block_size: u16::from_be_bytes([block[0], block[1]]),
            max_block_size: u16::from_be_bytes([block[2], block[3]]),
            min_frame_size: be24(&block[4..7]),
            max_frame_size: be24(&block[7..10]),
            sample_rate: (packed >> 44) as u32,
            channels: ((packed >> 41) & 0x7) as u8 + 1,
            bits_per_sample: ((packed >> 36) & 0x1F) as u8 + 1,
            total_samples: packed & MAX_TOTAL_SAMPLES,
            md5,
        })
    }
}

/// Generate the 42-byte file header: marker, block header, STREAMINFO.
pub fn generate_header(info: &StreamInfoBlock) -> [u8; FLAC_HEADER_SIZE] {
    let mut header = [0u8; FLAC_HEADER_SIZE];
    header[0..4].copy_from_slice(FLAC_MARKER);
    // Last metadata block, type 0, 24-bit length.
    header[4] = 0x80;
    header[5..8].copy_from_slice(&(STREAMINFO_SIZE as u32).to_be_bytes()[1..]);
    header[8..].copy_from_slice(&info.to_bytes());
    header
}

/// Read the STREAMINFO back from the start of a FLAC file.
pub fn parse_header(bytes: &[u8]) -> Result<StreamInfoBlock, RecorderError> {
    if bytes.len() < FLAC_HEADER_SIZE || &bytes[0..4] != FLAC_MARKER {
        return Err(RecorderError::Storage("not a FLAC stream".into()));
    }
    if bytes[4] & 0x7F != 0 {
        return Err(RecorderError::Storage("first metadata block is not STREAMINFO".into()));
    }
    StreamInfoBlock::from_bytes(&bytes[8..FLAC_HEADER_SIZE])
}
