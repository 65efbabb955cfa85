//! Terminal stand-ins for the pad controller: a logging Record indicator,
//! stdin commands, and a delegate that prints finished recordings.

use std::io::BufRead;
use std::path::Path;
use std::sync::mpsc::Sender;
use std::thread;

use flac_recorder_core::{
    Button, CaptureDelegate, CaptureState, Control, ControlSurface, RecorderError, SessionOutcome,
    SessionSummary,
};

/// Commands read from stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Toggle,
    Quit,
}

impl Command {
    /// Empty line or `r` toggles, `q` quits.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" | "r" => Some(Self::Toggle),
            "q" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Forward stdin commands to `tx` until `q` or end of input.
pub fn spawn_stdin_reader(tx: Sender<Command>) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new().name("stdin-commands".into()).spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match Command::parse(&line) {
                Some(command) => {
                    if tx.send(command).is_err() || command == Command::Quit {
                        return;
                    }
                }
                None => eprintln!("Commands: <enter> or r to start/stop recording, q to quit"),
            }
        }
        let _ = tx.send(Command::Quit);
    })
}

/// Indicator lights, written to the log instead of a controller.
pub struct LogSurface;

impl ControlSurface for LogSurface {
    fn send_control(&self, control: Control) {
        match Button::from_param(control.param) {
            Some(button) => log::trace!("{:?} light {}", button, if control.is_release() { "off" } else { "on" }),
            None => log::trace!("Control {} = {}", control.param, control.value),
        }
    }
}

/// Prints one line per finished recording to stdout.
pub struct ConsoleDelegate;

impl CaptureDelegate for ConsoleDelegate {
    fn on_state_changed(&self, state: CaptureState) {
        log::debug!("Capture state: {:?}", state);
    }

    fn on_session_started(&self, file_path: &Path) {
        println!("Recording to {}", file_path.display());
    }

    fn on_error(&self, error: &RecorderError) {
        eprintln!("Recorder: {}", error);
    }

    fn on_session_finished(&self, summary: &SessionSummary) {
        let status = match summary.outcome {
            SessionOutcome::Completed => "Saved",
            SessionOutcome::Aborted => "Aborted",
        };
        println!(
            "{} {} ({:.1}s, errors: {})",
            status,
            summary.file_path.display(),
            summary.duration_secs,
            summary.error_count
        );
    }
}
