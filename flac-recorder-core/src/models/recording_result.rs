use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::format::FrameFormat;
use super::state::SessionOutcome;

/// Summary handed to the delegate when a recording session ends.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub file_path: PathBuf,
    pub frames_written: u64,
    pub duration_secs: f64,
    pub error_count: usize,
    pub outcome: SessionOutcome,
    pub checksum: String,
}

/// Metadata stored alongside a recording.
///
/// Serializable for the JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub file_path: String,
    pub duration_secs: f64,
    pub frames: u64,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
    pub source_channels: [u16; 2],
    pub interface: String,
    pub error_count: usize,
    pub outcome: SessionOutcome,
    pub checksum: String,
}

impl RecordingMetadata {
    pub fn from_summary(
        summary: &SessionSummary,
        format: &FrameFormat,
        source_channels: [u16; 2],
        interface: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            file_path: summary.file_path.to_string_lossy().into_owned(),
            duration_secs: summary.duration_secs,
            frames: summary.frames_written,
            sample_rate: format.sample_rate,
            bits_per_sample: format.encoded_bits(),
            channels: 2,
            source_channels,
            interface: interface.to_string(),
            error_count: summary.error_count,
            outcome: summary.outcome,
            checksum: summary.checksum.clone(),
        }
    }
}
