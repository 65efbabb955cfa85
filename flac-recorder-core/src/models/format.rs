use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::RecorderError;

/// Highest bit depth the FLAC stream is written with.
pub const MAX_ENCODED_BITS: u16 = 24;

/// Hardware frame format, fixed once negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameFormat {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channel_count: u16,
}

impl FrameFormat {
    pub fn new(sample_rate: u32, bits_per_sample: u16, channel_count: u16) -> Self {
        Self {
            sample_rate,
            bits_per_sample,
            channel_count,
        }
    }

    /// Bytes one sample occupies in the hardware buffer.
    ///
    /// 24-bit samples live in the low three bytes of a 32-bit word.
    pub fn storage_bytes(&self) -> usize {
        match self.bits_per_sample {
            24 => 4,
            bits => bits as usize / 8,
        }
    }

    /// Bytes carrying significant sample data.
    pub fn sample_bytes(&self) -> usize {
        self.bits_per_sample as usize / 8
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.storage_bytes() * self.channel_count as usize
    }

    /// Frames in one capture buffer: 100ms of audio.
    pub fn frames_per_buffer(&self) -> usize {
        (self.sample_rate / 10) as usize
    }

    pub fn capture_buffer_len(&self) -> usize {
        self.frames_per_buffer() * self.bytes_per_frame()
    }

    /// Bit depth of the encoded output.
    pub fn encoded_bits(&self) -> u16 {
        self.bits_per_sample.min(MAX_ENCODED_BITS)
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} bit, {} channels",
            self.sample_rate, self.bits_per_sample, self.channel_count
        )
    }
}

/// The two hardware channels requested for recording, not yet validated
/// against a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelPair {
    pub left: u16,
    pub right: u16,
}

impl ChannelPair {
    pub fn new(left: u16, right: u16) -> Self {
        Self { left, right }
    }

    pub fn max(&self) -> u16 {
        self.left.max(self.right)
    }
}

impl Default for ChannelPair {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl FromStr for ChannelPair {
    type Err = RecorderError;

    /// Parses `"a,b"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (left, right) = s.split_once(',').ok_or_else(|| {
            RecorderError::Configuration(format!("invalid channels '{}', expecting 'a,b'", s))
        })?;
        let parse = |part: &str| {
            part.trim().parse::<u16>().map_err(|e| {
                RecorderError::Configuration(format!("invalid channel index '{}': {}", part.trim(), e))
            })
        };
        Ok(Self::new(parse(left)?, parse(right)?))
    }
}

impl fmt::Display for ChannelPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.left, self.right)
    }
}

/// Validated pair of channel indices, both inside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelSelection {
    left: u16,
    right: u16,
}

impl ChannelSelection {
    pub fn new(pair: ChannelPair, channel_count: u16) -> Result<Self, RecorderError> {
        if pair.left >= channel_count || pair.right >= channel_count {
            return Err(RecorderError::Configuration(format!(
                "all recorded channels must be less than the total number of channels ({}), got {}",
                channel_count, pair
            )));
        }
        Ok(Self {
            left: pair.left,
            right: pair.right,
        })
    }

    /// Check that both indices are inside frames of `format`.
    pub fn check_within(&self, format: &FrameFormat) -> Result<(), RecorderError> {
        if self.left.max(self.right) >= format.channel_count {
            return Err(RecorderError::Configuration(format!(
                "channels {},{} are outside {}-channel frames",
                self.left, self.right, format.channel_count
            )));
        }
        Ok(())
    }

    pub fn left(&self) -> u16 {
        self.left
    }

    pub fn right(&self) -> u16 {
        self.right
    }

    /// Selected channels in output order.
    pub fn indices(&self) -> [usize; 2] {
        [self.left as usize, self.right as usize]
    }
}
