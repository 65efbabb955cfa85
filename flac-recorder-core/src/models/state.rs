/// Capture loop state machine.
///
/// State transitions:
/// ```text
/// idle → starting → capturing
///   ↑        ↓          ↓
///   └────────┴──────────┘  (start failure, stop, abort)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureState {
    Idle,
    Starting,
    Capturing,
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing)
    }
}

/// How a recording session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOutcome {
    /// Stopped on request, buffered frames drained.
    Completed,
    /// Ended by an unrecoverable device or encoder error.
    Aborted,
}
