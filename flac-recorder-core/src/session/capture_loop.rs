use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Local;

use crate::models::config::RecorderConfig;
use crate::models::error::{DeviceFault, ReadError, RecorderError};
use crate::models::format::{ChannelSelection, FrameFormat};
use crate::models::recording_result::{RecordingMetadata, SessionSummary};
use crate::models::state::{CaptureState, SessionOutcome};
use crate::processing::channel_downmixer::ChannelDownmixer;
use crate::session::controller::IntentFlags;
use crate::storage::flac_writer::{self, EncoderSpec, FlacFileWriter};
use crate::storage::metadata;
use crate::traits::capture_backend::{CaptureBackend, CaptureDevice};
use crate::traits::capture_delegate::CaptureDelegate;

/// Upper bound on reads after a drain.
const MAX_DRAIN_READS: usize = 64;

/// What one iteration of the loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// No session, none wanted (or waiting for the operator to re-arm).
    Idle,
    /// A session was opened.
    Started,
    /// Opening a session failed.
    StartFailed,
    /// The device had nothing for us.
    Waiting,
    /// Frames were read and encoded.
    Captured(usize),
    /// A device fault was counted and the device recovered. Backs off like
    /// `Waiting` so a device that faults on every read is not spun on.
    Recovered,
    /// The session ended on request.
    Stopped,
    /// The session ended on an error it could not recover from.
    Aborted,
}

impl Activity {
    /// Whether the caller should back off before the next iteration.
    pub fn should_sleep(self) -> bool {
        matches!(self, Self::Idle | Self::StartFailed | Self::Waiting | Self::Recovered)
    }
}

/// One live recording: hardware handle plus encoder, created and released together.
struct RecordingSession<D: CaptureDevice> {
    device: D,
    encoder: FlacFileWriter,
    fault_logged: bool,
}

/// Owns the capture hardware and encoder on the capture thread.
///
/// Drives read → convert → encode while recording is wanted, opens and
/// finalizes sessions as the `on` intent changes, and recovers from device
/// faults. Nothing here ends the thread except the stop flag.
///
/// ```text
/// [CaptureDevice] → [capture buffer] → [ChannelDownmixer] → [conversion buffer] → [FlacFileWriter]
/// ```
pub struct CaptureLoop<B: CaptureBackend> {
    backend: B,
    downmixer: ChannelDownmixer,
    config: RecorderConfig,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    state: CaptureState,
    session: Option<RecordingSession<B::Device>>,
    capture_buffer: Vec<u8>,
    conversion_buffer: Vec<i32>,
    error_count: usize,
    // Set after a failed start or an abort; cleared once `on` is seen false.
    awaiting_rearm: bool,
}

impl<B: CaptureBackend> CaptureLoop<B> {
    pub fn new(
        backend: B,
        format: FrameFormat,
        selection: ChannelSelection,
        config: RecorderConfig,
    ) -> Result<Self, RecorderError> {
        Ok(Self {
            backend,
            downmixer: ChannelDownmixer::new(format, selection)?,
            config,
            delegate: None,
            state: CaptureState::Idle,
            session: None,
            capture_buffer: vec![0; format.capture_buffer_len()],
            conversion_buffer: Vec::with_capacity(format.frames_per_buffer() * 2),
            error_count: 0,
            awaiting_rearm: false,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Device faults since the last clean stop.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn format(&self) -> &FrameFormat {
        self.downmixer.format()
    }

    /// Loop until `flags` asks for a stop, then finalize any open session.
    pub fn run(&mut self, flags: &IntentFlags) {
        log::debug!("Capture loop running on {}", self.backend.interface());
        while !flags.stop_requested() {
            if self.step(flags.is_on()).should_sleep() {
                thread::sleep(self.config.poll_interval);
            }
        }
        self.shutdown();
        log::debug!("Capture loop stopped");
    }

    /// One iteration, given the current `on` intent.
    pub fn step(&mut self, on: bool) -> Activity {
        if !on {
            self.awaiting_rearm = false;
        }

        match (self.session.is_some(), on) {
            (false, true) if !self.awaiting_rearm => self.start_session(),
            (false, _) => Activity::Idle,
            (true, false) => self.stop_session(),
            (true, true) => self.capture_once(),
        }
    }

    /// Drain and finalize the open session, if any.
    pub fn shutdown(&mut self) {
        if self.session.is_some() {
            self.stop_session();
        }
    }

    fn start_session(&mut self) -> Activity {
        self.set_state(CaptureState::Starting);

        match self.open_session() {
            Ok(session) => {
                log::info!("Starting to record to {}", session.encoder.file_path().display());
                if let Some(ref delegate) = self.delegate {
                    delegate.on_session_started(session.encoder.file_path());
                }
                self.session = Some(session);
                self.set_state(CaptureState::Capturing);
                Activity::Started
            }
            Err(e) => {
                log::error!("Could not start recording: {}", e);
                self.report(&e);
                self.awaiting_rearm = true;
                self.set_state(CaptureState::Idle);
                Activity::StartFailed
            }
        }
    }

    fn open_session(&mut self) -> Result<RecordingSession<B::Device>, RecorderError> {
        let format = *self.downmixer.format();
        let device = self.backend.open(&format)?;
        let encoder = FlacFileWriter::create(self.next_output_path(), EncoderSpec::stereo_for(&format))?;
        Ok(RecordingSession {
            device,
            encoder,
            fault_logged: false,
        })
    }

    /// File names have millisecond resolution; wait out a collision.
    fn next_output_path(&self) -> PathBuf {
        let mut path = self.output_path_now();
        for _ in 0..10 {
            if !path.exists() {
                break;
            }
            thread::sleep(Duration::from_millis(1));
            path = self.output_path_now();
        }
        path
    }

    fn output_path_now(&self) -> PathBuf {
        self.config
            .output_directory
            .join(flac_writer::file_name_for_time(&Local::now()))
    }

    fn capture_once(&mut self) -> Activity {
        let Some(session) = self.session.as_mut() else {
            return Activity::Idle;
        };

        let frames = match session.device.read_frames(&mut self.capture_buffer) {
            Ok(0) | Err(ReadError::WouldBlock) => return Activity::Waiting,
            Ok(frames) => frames,
            Err(ReadError::Fault(fault)) => return self.handle_fault(fault),
        };

        match encode_frames(
            &self.downmixer,
            &self.capture_buffer,
            frames,
            &mut self.conversion_buffer,
            &mut session.encoder,
        ) {
            Ok(()) => Activity::Captured(frames),
            Err(e) => {
                self.abort_session(e);
                Activity::Aborted
            }
        }
    }

    fn handle_fault(&mut self, fault: DeviceFault) -> Activity {
        self.error_count += 1;
        let Some(session) = self.session.as_mut() else {
            return Activity::Idle;
        };

        if !session.fault_logged {
            log::warn!("Read error on {}: {}", self.backend.interface(), fault);
            session.fault_logged = true;
        }

        match session.device.recover(&fault) {
            Ok(()) => Activity::Recovered,
            Err(e) => {
                let error = RecorderError::Device(format!(
                    "{} did not recover: {}",
                    self.backend.interface(),
                    e
                ));
                self.abort_session(error);
                Activity::Aborted
            }
        }
    }

    fn stop_session(&mut self) -> Activity {
        let Some(mut session) = self.session.take() else {
            return Activity::Idle;
        };

        let mut outcome = SessionOutcome::Completed;
        match session.device.drain() {
            Ok(()) => {
                for _ in 0..MAX_DRAIN_READS {
                    let frames = match session.device.read_frames(&mut self.capture_buffer) {
                        Ok(frames) if frames > 0 => frames,
                        _ => break,
                    };
                    if let Err(e) = encode_frames(
                        &self.downmixer,
                        &self.capture_buffer,
                        frames,
                        &mut self.conversion_buffer,
                        &mut session.encoder,
                    ) {
                        log::error!("Failed to encode drained frames: {}", e);
                        self.report(&e);
                        outcome = SessionOutcome::Aborted;
                        break;
                    }
                }
            }
            Err(fault) => log::warn!("Drain failed on {}: {}", self.backend.interface(), fault),
        }

        self.close_session(session, outcome);
        match outcome {
            SessionOutcome::Completed => Activity::Stopped,
            SessionOutcome::Aborted => Activity::Aborted,
        }
    }

    fn abort_session(&mut self, error: RecorderError) {
        let Some(session) = self.session.take() else {
            return;
        };
        log::error!("Recording aborted: {}", error);
        self.report(&error);
        self.close_session(session, SessionOutcome::Aborted);
        self.awaiting_rearm = true;
    }

    /// Release the device, finalize the file and report the session.
    fn close_session(&mut self, session: RecordingSession<B::Device>, outcome: SessionOutcome) {
        let RecordingSession {
            device,
            mut encoder,
            ..
        } = session;
        drop(device);

        let summary = match encoder.finish() {
            Ok(stream) => SessionSummary {
                file_path: stream.file_path,
                frames_written: stream.frames,
                duration_secs: stream.duration_secs,
                error_count: self.error_count,
                outcome,
                checksum: stream.checksum,
            },
            Err(e) => {
                log::error!("Failed to finalize {}: {}", encoder.file_path().display(), e);
                self.report(&e);
                let frames = encoder.frames_pushed();
                SessionSummary {
                    file_path: encoder.file_path().to_path_buf(),
                    frames_written: frames,
                    duration_secs: frames as f64 / encoder.spec().sample_rate as f64,
                    error_count: self.error_count,
                    outcome: SessionOutcome::Aborted,
                    checksum: String::new(),
                }
            }
        };

        log::info!(
            "Stopped recording {} ({:.1}s, errors: {})",
            summary.file_path.display(),
            summary.duration_secs,
            summary.error_count
        );
        if summary.outcome == SessionOutcome::Completed {
            self.error_count = 0;
        }

        if self.config.write_metadata {
            self.write_metadata(&summary);
        }

        self.set_state(CaptureState::Idle);
        if let Some(ref delegate) = self.delegate {
            delegate.on_session_finished(&summary);
        }
    }

    fn write_metadata(&self, summary: &SessionSummary) {
        let selection = self.downmixer.selection();
        let metadata = RecordingMetadata::from_summary(
            summary,
            self.downmixer.format(),
            [selection.left(), selection.right()],
            self.backend.interface(),
        );
        if let Err(e) = metadata::write_metadata(&metadata, &summary.file_path) {
            log::warn!("{}", e);
            self.report(&e);
        }
    }

    fn set_state(&mut self, state: CaptureState) {
        if self.state == state {
            return;
        }
        self.state = state;
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(state);
        }
    }

    fn report(&self, error: &RecorderError) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(error);
        }
    }
}

fn encode_frames(
    downmixer: &ChannelDownmixer,
    capture: &[u8],
    frames: usize,
    conversion: &mut Vec<i32>,
    encoder: &mut FlacFileWriter,
) -> Result<(), RecorderError> {
    downmixer.convert(capture, frames, conversion);
    encoder.push_frames(conversion)
}
