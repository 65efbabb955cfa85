//! ALSA capture backend.
//!
//! Probes a PCM capture device for channel maps and formats, then opens it
//! non-blocking with interleaved access. Reads deliver raw little-endian
//! frames straight into the capture loop's buffer.

use alsa::pcm::{Access, ChmapPosition, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};

use flac_recorder_core::models::error::{DeviceFault, ReadError, RecorderError};
use flac_recorder_core::models::format::FrameFormat;
use flac_recorder_core::traits::capture_backend::{CaptureBackend, CaptureDevice};

/// errno for "try again" on Linux.
const EAGAIN: i32 = 11;

/// Hardware buffer requested on open, in microseconds.
const BUFFER_TIME_US: u32 = 500_000;

/// Capture hardware addressed by an ALSA PCM name such as `hw:1` or `default`.
pub struct AlsaBackend {
    interface: String,
    probe: Option<PCM>,
}

impl AlsaBackend {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            probe: None,
        }
    }

    /// The blocking handle used for probing, opened on first use.
    fn probe_pcm(&mut self) -> Result<&PCM, RecorderError> {
        if self.probe.is_none() {
            let pcm = PCM::new(&self.interface, Direction::Capture, false).map_err(|e| {
                RecorderError::Configuration(format!(
                    "could not open recording device {}: {}",
                    self.interface, e
                ))
            })?;
            self.probe = Some(pcm);
        }
        self.probe
            .as_ref()
            .ok_or_else(|| RecorderError::Configuration("probe handle missing".into()))
    }
}

impl CaptureBackend for AlsaBackend {
    type Device = AlsaCaptureDevice;

    fn interface(&self) -> &str {
        &self.interface
    }

    fn channel_counts(&mut self) -> Result<Vec<u16>, RecorderError> {
        let pcm = self.probe_pcm()?;
        // Devices without channel maps (pulse, plugins) yield nothing here
        Ok(pcm
            .query_chmaps()
            .map(|(_, map)| Vec::<ChmapPosition>::from(&map).len() as u16)
            .collect())
    }

    fn try_format(&mut self, format: &FrameFormat) -> Result<(), RecorderError> {
        let pcm = self.probe_pcm()?;
        apply_hw_params(pcm, format).map_err(|e| RecorderError::Device(e.to_string()))
    }

    fn end_probe(&mut self) {
        self.probe = None;
    }

    fn open(&mut self, format: &FrameFormat) -> Result<AlsaCaptureDevice, RecorderError> {
        let pcm = PCM::new(&self.interface, Direction::Capture, true).map_err(|e| {
            RecorderError::Device(format!("could not open recording device {}: {}", self.interface, e))
        })?;
        apply_hw_params(&pcm, format).map_err(|e| {
            RecorderError::Device(format!("failed to set recording parameters {}: {}", format, e))
        })?;
        log::debug!("Opened {} for capture ({})", self.interface, format);
        Ok(AlsaCaptureDevice { pcm })
    }
}

fn sample_format(bits: u16) -> Result<Format, alsa::Error> {
    match bits {
        16 => Ok(Format::S16LE),
        24 => Ok(Format::S24LE),
        32 => Ok(Format::S32LE),
        _ => Err(alsa::Error::unsupported("snd_pcm_hw_params_set_format")),
    }
}

fn apply_hw_params(pcm: &PCM, format: &FrameFormat) -> Result<(), alsa::Error> {
    let hwp = HwParams::any(pcm)?;
    hwp.set_access(Access::RWInterleaved)?;
    hwp.set_format(sample_format(format.bits_per_sample)?)?;
    hwp.set_channels(u32::from(format.channel_count))?;
    hwp.set_rate_resample(false)?;
    hwp.set_rate(format.sample_rate, ValueOr::Nearest)?;
    hwp.set_buffer_time_near(BUFFER_TIME_US, ValueOr::Nearest)?;
    pcm.hw_params(&hwp)
}

/// An open non-blocking capture stream.
pub struct AlsaCaptureDevice {
    pcm: PCM,
}

impl CaptureDevice for AlsaCaptureDevice {
    fn read_frames(&mut self, buf: &mut [u8]) -> Result<usize, ReadError> {
        match self.pcm.io_bytes().readi(buf) {
            Ok(frames) => Ok(frames),
            Err(e) if e.errno() == EAGAIN => Err(ReadError::WouldBlock),
            Err(e) => Err(ReadError::Fault(to_fault(&e))),
        }
    }

    fn recover(&mut self, fault: &DeviceFault) -> Result<(), DeviceFault> {
        let err = alsa::Error::new("snd_pcm_readi", fault.code);
        self.pcm.try_recover(err, true).map_err(|e| to_fault(&e))
    }

    fn drain(&mut self) -> Result<(), DeviceFault> {
        match self.pcm.drain() {
            Ok(()) => Ok(()),
            // A capture drain stops the stream at once; EAGAIN on a non-blocking handle is not a fault
            Err(e) if e.errno() == EAGAIN => Ok(()),
            Err(e) => Err(to_fault(&e)),
        }
    }
}

fn to_fault(e: &alsa::Error) -> DeviceFault {
    DeviceFault::new(e.errno(), e.to_string())
}
