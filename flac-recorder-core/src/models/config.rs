use std::path::PathBuf;
use std::time::Duration;

use super::error::RecorderError;
use super::format::ChannelPair;

/// Sleep between reads when the device has no data yet.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(500);

/// Phase length of the blinking Record indicator.
pub const DEFAULT_BLINK_INTERVAL: Duration = Duration::from_millis(200);

/// Configuration for a recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderConfig {
    /// Hardware interface identifier, e.g. `hw:1` or `default`.
    pub interface: String,

    /// Hardware channels written to the left and right output channels.
    pub channels: ChannelPair,

    /// Total hardware channel count, or None to read it from the channel maps.
    pub channel_count: Option<u16>,

    /// Directory where recording files are written. Must already exist.
    pub output_directory: PathBuf,

    /// Sleep applied after a read that returned no frames.
    pub poll_interval: Duration,

    /// Record indicator blink phase.
    pub blink_interval: Duration,

    /// Write a `.metadata.json` sidecar next to each recording.
    pub write_metadata: bool,
}

impl RecorderConfig {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            ..Default::default()
        }
    }

    /// Maps the command-line convention where `-1` means "detect".
    pub fn with_channel_count_arg(mut self, count: i32) -> Result<Self, RecorderError> {
        self.channel_count = match count {
            -1 => None,
            n if n > 0 && n <= u16::MAX as i32 => Some(n as u16),
            n => {
                return Err(RecorderError::Configuration(format!(
                    "invalid channel count: {}",
                    n
                )))
            }
        };
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), RecorderError> {
        if self.interface.is_empty() {
            return Err(RecorderError::Configuration("no capture interface given".into()));
        }
        if self.channel_count == Some(0) {
            return Err(RecorderError::Configuration("channel count must be positive".into()));
        }
        if !self.output_directory.is_dir() {
            return Err(RecorderError::Configuration(format!(
                "record directory {} does not exist or is not a directory",
                self.output_directory.display()
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(RecorderError::Configuration("poll interval must be positive".into()));
        }
        Ok(())
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            interface: String::new(),
            channels: ChannelPair::default(),
            channel_count: None,
            output_directory: PathBuf::from("."),
            poll_interval: DEFAULT_POLL_INTERVAL,
            blink_interval: DEFAULT_BLINK_INTERVAL,
            write_metadata: true,
        }
    }
}
