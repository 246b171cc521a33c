//! YM container parsing
//!
//! Loads Atari ST `.ym` register dumps into the frame model the converter
//! consumes. Handles the format family:
//!
//! - YM2!/YM3!: headerless interleaved register dumps (14 bytes per frame)
//! - YM3b: YM3 with a trailing 32-bit loop frame
//! - YM4!: adds metadata strings and digidrum samples
//! - YM5!/YM6!: adds master clock, player rate, loop frame and extra data
//!
//! Most files in the wild are LHA-compressed (usually LH5); decompression is
//! transparent, so callers hand in whatever bytes they have.
//!
//! Digidrum sample blocks are parsed past but not kept: software-driven PCM
//! cannot be expressed on the target chip and the converter does not attempt
//! it.

#![warn(missing_docs)]

pub mod compression;
pub mod parser;

use std::fs;
use std::path::Path;

pub use parser::{SongMetadata, YmSong};

/// Error type for YM file loading
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    /// Error while parsing the YM container
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Decompression error (LHA/LZH)
    #[error("Decompression error: {0}")]
    DecompressionError(String),

    /// IO error from the filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for SourceError {
    fn from(msg: String) -> Self {
        SourceError::Other(msg)
    }
}

impl From<&str> for SourceError {
    fn from(msg: &str) -> Self {
        SourceError::Other(msg.to_string())
    }
}

/// Result type for YM file loading
pub type Result<T> = std::result::Result<T, SourceError>;

/// Load a YM song from disk, auto-detecting format and compression
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<YmSong> {
    let path = path.as_ref();
    let data = fs::read(path)
        .map_err(|e| SourceError::Other(format!("Failed to read '{}': {e}", path.display())))?;
    load_bytes(&data)
}

/// Load a YM song from an in-memory byte buffer
pub fn load_bytes(data: &[u8]) -> Result<YmSong> {
    let data = compression::decompress_if_needed(data)?;
    parser::parse(&data)
}
