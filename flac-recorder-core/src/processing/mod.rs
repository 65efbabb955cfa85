pub mod channel_downmixer;
pub mod flac_format;
