use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use flacenc::bitsink::ByteSink;
use flacenc::component::{BitRepr, StreamInfo};
use flacenc::config::Encoder as EncoderConfig;
use flacenc::error::{Verified, Verify};
use flacenc::source::{Fill, FrameBuf};
use sha2::{Digest, Sha256};

use crate::models::error::RecorderError;
use crate::models::format::FrameFormat;
use crate::processing::flac_format::{self, StreamInfoBlock, STREAMINFO_OFFSET};

/// Inter-channel samples per encoded FLAC frame. The last frame may be shorter.
pub const BLOCK_SIZE: usize = 4096;

/// Parameters of the encoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSpec {
    pub channels: u16,
    pub bits_per_sample: u16,
    pub sample_rate: u32,
}

impl EncoderSpec {
    /// Stereo output at the device rate, at most 24 bits deep.
    pub fn stereo_for(format: &FrameFormat) -> Self {
        Self {
            channels: 2,
            bits_per_sample: format.encoded_bits(),
            sample_rate: format.sample_rate,
        }
    }

    pub fn validate(&self) -> Result<(), RecorderError> {
        if !(1..=8).contains(&self.channels) {
            return Err(RecorderError::EncoderInit(format!(
                "unsupported channel count: {}",
                self.channels
            )));
        }
        if ![8, 16, 24].contains(&self.bits_per_sample) {
            return Err(RecorderError::EncoderInit(format!(
                "unsupported bit depth: {}",
                self.bits_per_sample
            )));
        }
        if !(1..=655_350).contains(&self.sample_rate) {
            return Err(RecorderError::EncoderInit(format!(
                "unsupported sample rate: {}",
                self.sample_rate
            )));
        }
        Ok(())
    }
}

/// What a finished stream contains.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedStream {
    pub file_path: PathBuf,
    /// Inter-channel samples (frames, in capture terms) in the file.
    pub frames: u64,
    pub bytes_written: u64,
    pub duration_secs: f64,
    /// SHA-256 of the finished file, hex encoded.
    pub checksum: String,
}

/// Streaming FLAC file writer.
///
/// One writer is one output file. Samples are buffered until a full block is
/// available, each block is encoded into a FLAC frame and appended to the
/// file right away, so memory use does not grow with recording length.
///
/// ## File Format
///
/// ```text
/// [42-byte header: "fLaC" + STREAMINFO, patched on finish]
/// [frame 0: 4096 samples per channel]
/// [frame 1 ...]
/// [last frame: remaining samples]
/// ```
pub struct FlacFileWriter {
    file_path: PathBuf,
    spec: EncoderSpec,
    config: Verified<EncoderConfig>,
    stream_info: StreamInfo,
    header: StreamInfoBlock,
    framebuf: FrameBuf,
    file: Option<BufWriter<File>>,
    pending: Vec<i32>,
    frame_number: usize,
    frames_encoded: u64,
    total_bytes_written: u64,
    finished: Option<EncodedStream>,
    #[cfg(test)]
    fail_writes: bool,
}

impl FlacFileWriter {
    /// Create `file_path` and write a provisional header.
    ///
    /// Fails if the file already exists.
    pub fn create(file_path: PathBuf, spec: EncoderSpec) -> Result<Self, RecorderError> {
        spec.validate()?;

        let channels = spec.channels as usize;
        let config = EncoderConfig::default()
            .into_verified()
            .map_err(|e| RecorderError::EncoderInit(format!("invalid FLAC config: {:?}", e)))?;
        let stream_info = StreamInfo::new(
            spec.sample_rate as usize,
            channels,
            spec.bits_per_sample as usize,
        )
        .map_err(|e| RecorderError::EncoderInit(format!("invalid stream parameters: {:?}", e)))?;
        let framebuf = FrameBuf::with_size(channels, BLOCK_SIZE)
            .map_err(|e| RecorderError::EncoderInit(format!("failed to allocate block: {:?}", e)))?;

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file_path)
            .map_err(|e| {
                RecorderError::EncoderInit(format!("failed to create {}: {}", file_path.display(), e))
            })?;

        let header = StreamInfoBlock::new(
            spec.sample_rate,
            spec.channels as u8,
            spec.bits_per_sample as u8,
            BLOCK_SIZE as u16,
        );

        let mut writer = Self {
            file_path,
            spec,
            config,
            stream_info,
            header,
            framebuf,
            file: Some(BufWriter::new(file)),
            pending: Vec::with_capacity(BLOCK_SIZE * channels),
            frame_number: 0,
            frames_encoded: 0,
            total_bytes_written: 0,
            finished: None,
            #[cfg(test)]
            fail_writes: false,
        };
        writer
            .write_raw(&flac_format::generate_header(&header))
            .map_err(|e| RecorderError::EncoderInit(e.to_string()))?;
        Ok(writer)
    }

    /// Append interleaved samples, one per channel per frame.
    pub fn push_frames(&mut self, samples: &[i32]) -> Result<(), RecorderError> {
        if self.file.is_none() {
            return Err(RecorderError::Encoding("stream is already finished".into()));
        }
        let channels = self.spec.channels as usize;
        if samples.len() % channels != 0 {
            return Err(RecorderError::Encoding(format!(
                "{} samples do not fill whole {}-channel frames",
                samples.len(),
                channels
            )));
        }

        self.pending.extend_from_slice(samples);

        let block_len = BLOCK_SIZE * channels;
        let full = self.pending.len() / block_len * block_len;
        if full == 0 {
            return Ok(());
        }

        let pending = std::mem::take(&mut self.pending);
        let result = pending[..full]
            .chunks_exact(block_len)
            .try_for_each(|block| self.encode_block(block));
        self.pending = pending;
        self.pending.drain(..full);
        result
    }

    /// Encode what is left, patch the header and close the file.
    ///
    /// Calling it again returns the first result without touching the file.
    pub fn finish(&mut self) -> Result<EncodedStream, RecorderError> {
        if let Some(ref done) = self.finished {
            return Ok(done.clone());
        }

        let tail = std::mem::take(&mut self.pending);
        let tail_result = if tail.is_empty() {
            Ok(())
        } else {
            self.encode_block(&tail)
        };

        let writer = self
            .file
            .take()
            .ok_or_else(|| RecorderError::Storage("file is not open".into()))?;
        self.header.total_samples = self.frames_encoded;
        patch_header(writer, &self.header)
            .map_err(|e| RecorderError::Storage(format!("failed to finalize {}: {}", self.file_path.display(), e)))?;

        let checksum = sha256_file(&self.file_path)?;
        let done = EncodedStream {
            file_path: self.file_path.clone(),
            frames: self.frames_encoded,
            bytes_written: self.total_bytes_written,
            duration_secs: self.frames_encoded as f64 / self.spec.sample_rate as f64,
            checksum,
        };
        self.finished = Some(done.clone());

        tail_result.map(|_| done)
    }

    /// Frames handed to `push_frames` so far, encoded or still buffered.
    pub fn frames_pushed(&self) -> u64 {
        self.frames_encoded + (self.pending.len() / self.spec.channels as usize) as u64
    }

    /// Total bytes written so far (including the header).
    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    pub fn spec(&self) -> &EncoderSpec {
        &self.spec
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn encode_block(&mut self, samples: &[i32]) -> Result<(), RecorderError> {
        let channels = self.spec.channels as usize;
        let frames = samples.len() / channels;

        let bytes = if frames == BLOCK_SIZE {
            self.framebuf
                .fill_interleaved(samples)
                .map_err(|e| RecorderError::Encoding(format!("failed to fill block: {:?}", e)))?;
            encode_frame(&self.config, &self.framebuf, self.frame_number, &self.stream_info)?
        } else {
            let mut short = FrameBuf::with_size(channels, frames)
                .map_err(|e| RecorderError::Encoding(format!("failed to allocate block: {:?}", e)))?;
            short
                .fill_interleaved(samples)
                .map_err(|e| RecorderError::Encoding(format!("failed to fill block: {:?}", e)))?;
            encode_frame(&self.config, &short, self.frame_number, &self.stream_info)?
        };

        self.write_raw(&bytes)
            .map_err(|e| RecorderError::Encoding(format!("write failed: {}", e)))?;
        self.header.record_frame(bytes.len() as u32);
        self.frame_number += 1;
        self.frames_encoded += frames as u64;
        Ok(())
    }

    /// Make every later encoded-frame write fail.
    #[cfg(test)]
    pub(crate) fn fail_writes(&mut self) {
        self.fail_writes = true;
    }

    fn write_raw(&mut self, data: &[u8]) -> io::Result<()> {
        #[cfg(test)]
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "file is not open"))?;
        file.write_all(data)?;
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }
}

impl Drop for FlacFileWriter {
    fn drop(&mut self) {
        if self.finished.is_none() && self.file.is_some() {
            if let Err(e) = self.finish() {
                log::error!("Failed to finalize {}: {}", self.file_path.display(), e);
            }
        }
    }
}

/// Output file name for a session started at `time`: `YYYYMMDD-HHMMSS.mmm.flac`.
pub fn file_name_for_time<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}.flac", time.format("%Y%m%d-%H%M%S%.3f"))
}

fn encode_frame(
    config: &Verified<EncoderConfig>,
    framebuf: &FrameBuf,
    frame_number: usize,
    stream_info: &StreamInfo,
) -> Result<Vec<u8>, RecorderError> {
    let frame = flacenc::encode_fixed_size_frame(config, framebuf, frame_number, stream_info)
        .map_err(|e| RecorderError::Encoding(format!("frame {} failed: {:?}", frame_number, e)))?;
    let mut sink = ByteSink::new();
    frame
        .write(&mut sink)
        .map_err(|e| RecorderError::Encoding(format!("failed to write frame {}: {:?}", frame_number, e)))?;
    Ok(sink.into_inner())
}

fn patch_header(writer: BufWriter<File>, header: &StreamInfoBlock) -> io::Result<()> {
    let mut file = writer.into_inner().map_err(|e| e.into_error())?;
    file.seek(SeekFrom::Start(STREAMINFO_OFFSET))?;
    file.write_all(&header.to_bytes())?;
    file.flush()
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, RecorderError> {
    let mut file = File::open(path)
        .map_err(|e| RecorderError::Storage(format!("failed to read file for checksum: {}", e)))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| RecorderError::Storage(format!("failed to read file for checksum: {}", e)))?;
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
