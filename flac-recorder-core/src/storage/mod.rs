pub mod flac_writer;
pub mod metadata;
