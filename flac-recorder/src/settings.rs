//! Command-line options and the optional `key = value` config file.
//!
//! Every option can come from either place; values given on the command
//! line win over the file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;

use flac_recorder_core::{ChannelPair, RecorderConfig};

/// Keys accepted in a config file.
const KNOWN_KEYS: [&str; 5] = ["card", "channels", "channel-count", "record-dir", "record"];

/// Keys that are flags and may appear without a value.
const FLAG_KEYS: [&str; 1] = ["record"];

#[derive(Parser, Debug, Default)]
#[command(name = "flac-recorder", version, about = "Record two channels of an ALSA input to FLAC files")]
pub struct Cli {
    /// The card to record from, e.g. `hw:1`
    #[arg(long)]
    pub card: Option<String>,

    /// Channels for recording, comma separated [default: 0,1]
    #[arg(long)]
    pub channels: Option<String>,

    /// Total input channel count, for sources without channel maps.
    /// -1 reads it from the channel maps [default: -1]
    #[arg(long, allow_negative_numbers = true)]
    pub channel_count: Option<i32>,

    /// Directory recordings are written to. Must exist [default: .]
    #[arg(long)]
    pub record_dir: Option<PathBuf>,

    /// A config file with further options in it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Start recording on startup
    #[arg(long)]
    pub record: bool,
}

/// Parsed config file: option name to raw value.
#[derive(Debug, Default, PartialEq)]
pub struct ConfigFile {
    values: HashMap<String, String>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("could not open config file: {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut values = HashMap::new();

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = match line.split_once('=') {
                Some((key, value)) => (key.trim(), value.trim()),
                None if FLAG_KEYS.contains(&line) => (line, "true"),
                None if KNOWN_KEYS.contains(&line) => {
                    bail!("at line {}, '{}' requires a value", line_no, line)
                }
                None => bail!("at line {}, unknown argument: {}", line_no, line),
            };
            if !KNOWN_KEYS.contains(&key) {
                bail!("at line {}, unknown argument: {}", line_no, key);
            }
            values.insert(key.to_string(), value.to_string());
        }

        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Everything the binary needs to run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub recorder: RecorderConfig,
    pub record_on_start: bool,
}

impl Settings {
    /// Merge command-line values over config file values over defaults.
    pub fn resolve(cli: Cli, file: &ConfigFile) -> Result<Self> {
        let card = cli
            .card
            .or_else(|| file.get("card").map(str::to_string))
            .ok_or_else(|| anyhow!("no value given for card and no default exists"))?;

        let channels: ChannelPair = match cli.channels.as_deref().or(file.get("channels")) {
            Some(text) => text.parse()?,
            None => ChannelPair::default(),
        };

        let channel_count = match cli.channel_count {
            Some(count) => count,
            None => match file.get("channel-count") {
                Some(text) => text
                    .parse()
                    .with_context(|| format!("invalid channel-count: {}", text))?,
                None => -1,
            },
        };

        let record_dir = cli
            .record_dir
            .or_else(|| file.get("record-dir").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));

        let record_on_start = cli.record
            || match file.get("record") {
                Some(text) => text
                    .parse::<bool>()
                    .with_context(|| format!("invalid record value: {}", text))?,
                None => false,
            };

        let mut recorder = RecorderConfig::new(card).with_channel_count_arg(channel_count)?;
        recorder.channels = channels;
        recorder.output_directory = record_dir;

        Ok(Self {
            recorder,
            record_on_start,
        })
    }

    /// Parse the command line, read the config file it names, and merge.
    pub fn from_args() -> Result<Self> {
        let cli = Cli::parse();
        let file = match cli.config {
            Some(ref path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        Self::resolve(cli, &file)
    }
}
