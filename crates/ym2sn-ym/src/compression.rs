//! Transparent LHA decompression
//!
//! Nearly every YM file in circulation is an LHA archive (LH5 method) with a
//! single member; an uncompressed dump passes through unchanged. Detection
//! scans for the `-lh?-` method signature rather than trusting an offset,
//! because LHA header levels 0-2 place it differently.

use crate::{Result, SourceError};
use std::io::Read;

/// Search window for the LHA method signature
///
/// Level 0/1 headers put the method at offset 2, level 2 headers can push it
/// to offset 25; 40 bytes covers every variant with margin.
const LHA_SEARCH_LIMIT: usize = 40;

/// The method signature `-lh?-` is five bytes
const LHA_SIGNATURE_LENGTH: usize = 5;

/// Decompression cap. YM files run 10 KB - 1 MB uncompressed; anything near
/// this limit is corrupt or hostile.
const MAX_DECOMPRESSED_SIZE: usize = 64 * 1024 * 1024;

/// Valid LHA compression level digits in the method signature
const LHA_MIN_VALID_LEVEL: u8 = b'0';
const LHA_MAX_VALID_LEVEL: u8 = b'7';

/// Decompress LHA data if compressed, otherwise return the input unchanged
pub fn decompress_if_needed(data: &[u8]) -> Result<Vec<u8>> {
    if !is_lha_compressed(data) {
        return Ok(data.to_vec());
    }

    let reader = delharc::LhaDecodeReader::new(data).map_err(|e| {
        SourceError::DecompressionError(format!("Failed to parse LHA archive: {e}"))
    })?;

    let mut decompressed = Vec::new();
    let mut limited = reader.take(MAX_DECOMPRESSED_SIZE as u64);
    limited
        .read_to_end(&mut decompressed)
        .map_err(|e| SourceError::DecompressionError(format!("LHA decompression failed: {e}")))?;

    if decompressed.len() >= MAX_DECOMPRESSED_SIZE {
        return Err(SourceError::DecompressionError(
            "Decompressed data exceeded the safety limit; the file may be corrupted".into(),
        ));
    }

    Ok(decompressed)
}

/// Detect the LHA method signature in the header window
pub fn is_lha_compressed(data: &[u8]) -> bool {
    let limit = data.len().min(LHA_SEARCH_LIMIT);
    if limit < LHA_SIGNATURE_LENGTH {
        return false;
    }
    data[..limit]
        .windows(LHA_SIGNATURE_LENGTH)
        .any(|window| {
            window[0] == b'-'
                && window[1] == b'l'
                && window[2] == b'h'
                && window[4] == b'-'
                && (LHA_MIN_VALID_LEVEL..=LHA_MAX_VALID_LEVEL).contains(&window[3])
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uncompressed_passthrough() {
        let data = b"YM3!abcdefghijklmn";
        let result = decompress_if_needed(data).expect("plain data must pass through");
        assert_eq!(result, data.to_vec());
    }

    #[test]
    fn test_detects_lh5_signature() {
        // Level-0 header shape: size byte, checksum, then the method
        let mut data = vec![0x22, 0x00];
        data.extend_from_slice(b"-lh5-");
        data.extend_from_slice(&[0u8; 40]);
        assert!(is_lha_compressed(&data));
    }

    #[test]
    fn test_rejects_invalid_level_digit() {
        let mut data = vec![0x22, 0x00];
        data.extend_from_slice(b"-lhx-");
        data.extend_from_slice(&[0u8; 40]);
        assert!(!is_lha_compressed(&data));
    }

    #[test]
    fn test_signature_outside_window_is_ignored() {
        let mut data = vec![0u8; 64];
        data.extend_from_slice(b"-lh5-");
        assert!(!is_lha_compressed(&data));
    }

    #[test]
    fn test_short_data_is_not_compressed() {
        assert!(!is_lha_compressed(b"YM"));
        assert!(!is_lha_compressed(b""));
    }
}
