use std::sync::Arc;
use std::thread;

use crate::models::config::RecorderConfig;
use crate::models::error::RecorderError;
use crate::models::format::{ChannelSelection, FrameFormat};
use crate::session::capture_loop::CaptureLoop;
use crate::session::controller::{IntentFlags, RecordingController};
use crate::session::negotiator;
use crate::traits::capture_backend::CaptureBackend;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::control_surface::{Button, Control, ControlSurface};

/// A running recorder: negotiated format, capture thread and controller.
///
/// Construction is the only place a `Configuration` error surfaces. Once
/// running, failures are logged and reported through the delegate, and the
/// capture thread lives until `shutdown` (or drop).
///
/// ```text
/// control thread                    capture thread ("flac-capture")
/// toggle()/poll() ──[IntentFlags]──→ CaptureLoop::run
///       │                                 │
///       └→ ControlSurface (indicator)     └→ CaptureDelegate (events)
/// ```
pub struct Recorder {
    controller: RecordingController,
    flags: Arc<IntentFlags>,
    format: FrameFormat,
    selection: ChannelSelection,
    capture_handle: Option<thread::JoinHandle<()>>,
}

impl Recorder {
    pub fn start<B: CaptureBackend>(
        mut backend: B,
        config: RecorderConfig,
        surface: Arc<dyn ControlSurface>,
        delegate: Option<Arc<dyn CaptureDelegate>>,
    ) -> Result<Self, RecorderError> {
        config.validate()?;
        let (format, selection) = negotiator::negotiate(&mut backend, config.channels, config.channel_count)?;

        let flags = Arc::new(IntentFlags::new());
        let controller = RecordingController::new(Arc::clone(&flags), surface, config.blink_interval);

        let mut capture = CaptureLoop::new(backend, format, selection, config)?;
        if let Some(delegate) = delegate {
            capture.set_delegate(delegate);
        }

        let loop_flags = Arc::clone(&flags);
        let handle = thread::Builder::new()
            .name("flac-capture".into())
            .spawn(move || capture.run(&loop_flags))
            .map_err(|e| RecorderError::Device(format!("failed to spawn capture thread: {}", e)))?;

        Ok(Self {
            controller,
            flags,
            format,
            selection,
            capture_handle: Some(handle),
        })
    }

    pub fn format(&self) -> &FrameFormat {
        &self.format
    }

    pub fn selection(&self) -> &ChannelSelection {
        &self.selection
    }

    pub fn is_recording(&self) -> bool {
        self.controller.is_on()
    }

    pub fn toggle(&self) -> bool {
        self.controller.toggle()
    }

    pub fn poll(&self) {
        self.controller.poll();
    }

    pub fn handle_control(&self, control: Control) -> Option<Button> {
        self.controller.handle_control(control)
    }

    /// Stop the capture thread, finalizing any open recording.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.capture_handle.take() else {
            return;
        };
        self.flags.request_stop();
        if handle.join().is_err() {
            log::error!("Capture thread panicked");
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.shutdown();
    }
}
