//! Deterministic capture hardware and FLAC decoding for unit tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::{DeviceFault, ReadError, RecorderError};
use crate::models::format::FrameFormat;
use crate::traits::capture_backend::{CaptureBackend, CaptureDevice};

/// One scripted response of `read_frames`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ReadStep {
    Frames(usize),
    WouldBlock,
    Zero,
    Fault { recoverable: bool },
}

/// Sample value the scripted device produces for `channel` of frame `frame`.
pub(crate) fn sample_value(frame: u64, channel: u16) -> i32 {
    ((frame % 3000) as i32 - 1500) * 10 + channel as i32
}

/// Stereo samples the encoder should receive for frames `range`.
pub(crate) fn expected_stereo(range: std::ops::Range<u64>, left: u16, right: u16) -> Vec<i32> {
    range
        .flat_map(|frame| [sample_value(frame, left), sample_value(frame, right)])
        .collect()
}

#[derive(Debug, Default)]
struct Shared {
    script: VecDeque<ReadStep>,
    drain_frames: usize,
    draining: bool,
    pending_recovery: Option<bool>,
    fail_opens: usize,
    opens: usize,
    live_devices: usize,
    recoveries: usize,
    drains: usize,
    frames_delivered: u64,
}

/// Inspect and feed a scripted backend after it moved into a capture loop.
#[derive(Clone)]
pub(crate) struct ScriptHandle(Arc<Mutex<Shared>>);

impl ScriptHandle {
    pub fn push(&self, step: ReadStep) {
        self.0.lock().script.push_back(step);
    }

    pub fn push_all(&self, steps: impl IntoIterator<Item = ReadStep>) {
        self.0.lock().script.extend(steps);
    }

    /// Frames the device still holds when it is drained.
    pub fn set_drain_frames(&self, frames: usize) {
        self.0.lock().drain_frames = frames;
    }

    pub fn fail_next_opens(&self, count: usize) {
        self.0.lock().fail_opens = count;
    }

    pub fn opens(&self) -> usize {
        self.0.lock().opens
    }

    pub fn live_devices(&self) -> usize {
        self.0.lock().live_devices
    }

    pub fn recoveries(&self) -> usize {
        self.0.lock().recoveries
    }

    pub fn drains(&self) -> usize {
        self.0.lock().drains
    }

    pub fn frames_delivered(&self) -> u64 {
        self.0.lock().frames_delivered
    }

    pub fn script_is_empty(&self) -> bool {
        self.0.lock().script.is_empty()
    }
}

pub(crate) struct ScriptedBackend {
    name: String,
    channel_maps: Vec<u16>,
    accepted: Option<Vec<(u32, u16)>>,
    attempts: Vec<(u32, u16)>,
    probe_ended: usize,
    shared: Arc<Mutex<Shared>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            name: "scripted".into(),
            channel_maps: vec![2],
            accepted: None,
            attempts: Vec::new(),
            probe_ended: 0,
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_channel_maps(mut self, maps: Vec<u16>) -> Self {
        self.channel_maps = maps;
        self
    }

    /// Only accept these `(rate, bits)` pairs. Everything is accepted otherwise.
    pub fn accepting(mut self, formats: &[(u32, u16)]) -> Self {
        self.accepted = Some(formats.to_vec());
        self
    }

    pub fn handle(&self) -> ScriptHandle {
        ScriptHandle(Arc::clone(&self.shared))
    }

    pub fn format_attempts(&self) -> Vec<(u32, u16)> {
        self.attempts.clone()
    }

    pub fn probe_ended(&self) -> usize {
        self.probe_ended
    }
}

impl CaptureBackend for ScriptedBackend {
    type Device = ScriptedDevice;

    fn interface(&self) -> &str {
        &self.name
    }

    fn channel_counts(&mut self) -> Result<Vec<u16>, RecorderError> {
        Ok(self.channel_maps.clone())
    }

    fn try_format(&mut self, format: &FrameFormat) -> Result<(), RecorderError> {
        let pair = (format.sample_rate, format.bits_per_sample);
        self.attempts.push(pair);
        match self.accepted {
            Some(ref accepted) if !accepted.contains(&pair) => {
                Err(RecorderError::Device(format!("{} not supported", format)))
            }
            _ => Ok(()),
        }
    }

    fn end_probe(&mut self) {
        self.probe_ended += 1;
    }

    fn open(&mut self, format: &FrameFormat) -> Result<ScriptedDevice, RecorderError> {
        let mut shared = self.shared.lock();
        if shared.fail_opens > 0 {
            shared.fail_opens -= 1;
            return Err(RecorderError::Device(format!("cannot open {}", self.name)));
        }
        shared.opens += 1;
        shared.live_devices += 1;
        shared.draining = false;
        Ok(ScriptedDevice {
            format: *format,
            shared: Arc::clone(&self.shared),
        })
    }
}

/// Produces frames following `sample_value`, numbered across sessions.
pub(crate) struct ScriptedDevice {
    format: FrameFormat,
    shared: Arc<Mutex<Shared>>,
}

impl ScriptedDevice {
    fn fill(&self, shared: &mut Shared, buf: &mut [u8], frames: usize) {
        let storage = self.format.storage_bytes();
        let stride = self.format.bytes_per_frame();
        for (i, frame) in buf.chunks_exact_mut(stride).take(frames).enumerate() {
            let index = shared.frames_delivered + i as u64;
            for channel in 0..self.format.channel_count {
                let value = sample_value(index, channel);
                let raw = match self.format.bits_per_sample {
                    32 => (value << 8).to_le_bytes(),
                    _ => value.to_le_bytes(),
                };
                let offset = channel as usize * storage;
                frame[offset..offset + storage].copy_from_slice(&raw[..storage]);
            }
        }
        shared.frames_delivered += frames as u64;
    }
}

impl CaptureDevice for ScriptedDevice {
    fn read_frames(&mut self, buf: &mut [u8]) -> Result<usize, ReadError> {
        let capacity = buf.len() / self.format.bytes_per_frame();
        let mut shared = self.shared.lock();

        if shared.draining {
            let frames = shared.drain_frames.min(capacity);
            shared.drain_frames -= frames;
            self.fill(&mut shared, buf, frames);
            return Ok(frames);
        }

        match shared.script.pop_front() {
            None | Some(ReadStep::WouldBlock) => Err(ReadError::WouldBlock),
            Some(ReadStep::Zero) => Ok(0),
            Some(ReadStep::Fault { recoverable }) => {
                shared.pending_recovery = Some(recoverable);
                Err(ReadError::Fault(DeviceFault::new(32, "Broken pipe")))
            }
            Some(ReadStep::Frames(n)) => {
                let frames = n.min(capacity);
                if n > frames {
                    shared.script.push_front(ReadStep::Frames(n - frames));
                }
                self.fill(&mut shared, buf, frames);
                Ok(frames)
            }
        }
    }

    fn recover(&mut self, fault: &DeviceFault) -> Result<(), DeviceFault> {
        let mut shared = self.shared.lock();
        shared.recoveries += 1;
        match shared.pending_recovery.take() {
            Some(true) => Ok(()),
            _ => Err(DeviceFault::new(19, format!("no device after {}", fault.message))),
        }
    }

    fn drain(&mut self) -> Result<(), DeviceFault> {
        let mut shared = self.shared.lock();
        shared.drains += 1;
        shared.draining = true;
        Ok(())
    }
}

impl Drop for ScriptedDevice {
    fn drop(&mut self) {
        self.shared.lock().live_devices -= 1;
    }
}

/// Audio decoded back from a FLAC file.
pub(crate) struct DecodedFlac {
    pub sample_rate: u32,
    pub channels: usize,
    pub samples: Vec<i32>,
}

impl DecodedFlac {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Compare against encoder input. The decoder may return samples
    /// left-aligned in 32 bits instead of at their native width.
    pub fn matches(&self, expected: &[i32], bits: u16) -> bool {
        if self.samples == expected {
            return true;
        }
        let shift = 32 - bits as u32;
        self.samples.len() == expected.len()
            && self.samples.iter().zip(expected).all(|(d, e)| *d == e << shift)
    }
}

pub(crate) fn decode_flac(path: &Path) -> DecodedFlac {
    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::codecs::DecoderOptions;
    use symphonia::core::errors::Error;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = std::fs::File::open(path).unwrap();
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    hint.with_extension("flac");
    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .unwrap();
    let mut reader = probed.format;
    let params = reader.default_track().unwrap().codec_params.clone();
    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .unwrap();

    let mut samples = Vec::new();
    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => panic!("failed to read {}: {}", path.display(), e),
        };
        let decoded = decoder.decode(&packet).unwrap();
        let mut buf = SampleBuffer::<i32>::new(decoded.capacity() as u64, *decoded.spec());
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    DecodedFlac {
        sample_rate: params.sample_rate.unwrap(),
        channels: params.channels.unwrap().count(),
        samples,
    }
}
