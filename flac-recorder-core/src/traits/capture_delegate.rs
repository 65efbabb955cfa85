use std::path::Path;

use crate::models::error::RecorderError;
use crate::models::recording_result::SessionSummary;
use crate::models::state::CaptureState;

/// Event delegate for capture loop notifications.
///
/// All methods are called from the capture thread. Keep them short; a slow
/// delegate delays the next device read.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the capture state changes.
    fn on_state_changed(&self, state: CaptureState);

    /// Called once the encoder and device are open.
    fn on_session_started(&self, file_path: &Path);

    /// Called when a session could not start or was aborted.
    fn on_error(&self, error: &RecorderError);

    /// Called after the file is finalized, for both clean and aborted sessions.
    fn on_session_finished(&self, summary: &SessionSummary);
}
