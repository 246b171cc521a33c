//! VGM encoder
//!
//! Serializes an [`SnCommand`] stream into a VGM 1.51 file: the 64-byte main
//! header, the command data (`0x50` SN writes interleaved with waits) and a
//! GD3 1.00 metadata tag. Loop bookkeeping is derived from the stream's
//! `LoopStart` marker; sample totals from its waits.
//!
//! Every fixed header field is plain ASCII/binary; text reaches the file
//! only inside the GD3 tag, encoded UTF-16LE as the GD3 spec requires.
//!
//! [`SnCommand`]: ym2sn_core::SnCommand

#![warn(missing_docs)]

mod gd3;
mod header;
mod writer;

/// Error types for VGM encoding
#[derive(thiserror::Error, Debug)]
pub enum VgmError {
    /// IO error while writing the output file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed command stream
    #[error("Invalid command stream: {0}")]
    StreamError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for VgmError {
    fn from(msg: String) -> Self {
        VgmError::Other(msg)
    }
}

impl From<&str> for VgmError {
    fn from(msg: &str) -> Self {
        VgmError::Other(msg.to_string())
    }
}

/// Result type for VGM encoding
pub type Result<T> = std::result::Result<T, VgmError>;

pub use gd3::Gd3Tag;
pub use header::VgmHeader;
pub use writer::{write_vgm, VgmSettings};
