mod console;
mod settings;

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use flac_recorder_core::Recorder;

use console::{Command, ConsoleDelegate, LogSurface};
use settings::Settings;

/// How often the control loop wakes up to blink the Record indicator.
const CONTROL_TICK: Duration = Duration::from_millis(5);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::from_args()?;
    let recorder = start_recorder(&settings)?;
    log::info!(
        "Recording channels {} of {} ({}) to {}",
        settings.recorder.channels,
        settings.recorder.interface,
        recorder.format(),
        settings.recorder.output_directory.display()
    );

    run(recorder, settings.record_on_start)
}

#[cfg(target_os = "linux")]
fn start_recorder(settings: &Settings) -> Result<Recorder> {
    let backend = flac_recorder_alsa::AlsaBackend::new(settings.recorder.interface.clone());
    Recorder::start(
        backend,
        settings.recorder.clone(),
        Arc::new(LogSurface),
        Some(Arc::new(ConsoleDelegate)),
    )
    .with_context(|| format!("failed to set up recording on {}", settings.recorder.interface))
}

#[cfg(not(target_os = "linux"))]
fn start_recorder(_settings: &Settings) -> Result<Recorder> {
    anyhow::bail!("ALSA capture is only available on Linux")
}

/// Control loop: stdin commands in, indicator blinking out.
fn run(mut recorder: Recorder, record_on_start: bool) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let _stdin = console::spawn_stdin_reader(tx).context("failed to spawn stdin reader")?;

    if record_on_start {
        recorder.toggle();
    }
    println!("Press <enter> to start/stop recording, q to quit");

    loop {
        match rx.recv_timeout(CONTROL_TICK) {
            Ok(Command::Toggle) => {
                recorder.toggle();
            }
            Ok(Command::Quit) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => recorder.poll(),
        }
    }

    recorder.shutdown();
    Ok(())
}
