//! YM2149 → SN76489 conversion engine
//!
//! Translates frame-oriented YM2149 PSG register dumps into an equivalent
//! SN76489 register-write stream, one 14-register frame at a time.
//!
//! The two chips do not line up: the YM has three 12-bit tone dividers, a
//! shared noise generator that can be mixed into any voice, and a hardware
//! envelope; the SN has three 10-bit tone channels and a single noise channel
//! with three fixed white-noise rates. This crate owns the per-frame decisions
//! that bridge the gap:
//!
//! - envelope simulation sampled at the output frame rate ([`EnvelopeGen`])
//! - frequency re-ranging with octave folding and periodic-noise bass
//!   substitution ([`ToneMapper`])
//! - collapse of the three YM noise mixers onto the one SN noise channel
//! - per-frame channel arbitration (bass election, tuned-white-noise takeover)
//! - differential register packetizing into [`SnCommand`] values
//!
//! Container parsing (`ym2sn-ym`) and VGM byte emission (`ym2sn-vgm`) are
//! separate crates; this one is a pure function of
//! `(frame stream, config) → command stream` and touches no I/O.
//!
//! # Quick start
//! ```no_run
//! use ym2sn_core::{ConversionConfig, Converter, SourceInfo, YmFrame};
//!
//! let frames: Vec<YmFrame> = vec![YmFrame::default(); 50];
//! let info = SourceInfo::default();
//! let mut converter = Converter::new(ConversionConfig::default());
//! let commands = converter.convert(&frames, &info).unwrap();
//! println!("{} commands, {} frames", commands.len(), converter.report().frames_processed);
//! ```

#![warn(missing_docs)]

mod arbiter;
mod config;
mod converter;
mod envelope;
mod frame;
mod freq;
mod noise;
mod packetizer;
mod report;
mod voice;
mod volume;

/// Error types for conversion operations
///
/// Frame-level anomalies (out-of-range tones, degenerate envelope periods)
/// never abort a run; they accumulate on [`ConversionReport`]. Only
/// configuration problems detected before streaming are fatal.
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    /// Envelope sample rate does not evenly subdivide the frame rate
    #[error("envelope sample rate {sample_rate} Hz is not an integer multiple of frame rate {frame_rate} Hz")]
    EnvelopeSampleRate {
        /// Requested envelope sampling rate
        sample_rate: u32,
        /// Source stream frame rate
        frame_rate: u32,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for ConvertError {
    /// Converts a String into `ConvertError::Other`.
    fn from(msg: String) -> Self {
        ConvertError::Other(msg)
    }
}

impl From<&str> for ConvertError {
    /// Converts a string slice into `ConvertError::Other`.
    fn from(msg: &str) -> Self {
        ConvertError::Other(msg.to_string())
    }
}

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;

// Public API exports
pub use config::{ChannelFilter, ConversionConfig, LfsrTap};
pub use converter::Converter;
pub use envelope::EnvelopeGen;
pub use frame::{SourceInfo, YmFrame, FRAME_REGISTERS};
pub use freq::{MappedTone, ToneMapper};
pub use packetizer::{NoiseRate, NoiseSetting, SnCommand, SnFrame};
pub use report::ConversionReport;
pub use voice::Voice;
pub use volume::{map_level, SN_AMPLITUDE, YM_AMPLITUDE};
