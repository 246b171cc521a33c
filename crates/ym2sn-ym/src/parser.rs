//! YM format parsers
//!
//! Header layouts (all integers big-endian):
//!
//! ```text
//! YM2!/YM3!  magic(4) | frames, interleaved by register, 14 bytes each
//! YM3b       as YM3 plus trailing u32 loop frame
//! YM4!       magic(4) check(8) frames(4) attrs(4) drums(2) loop(4) = 26
//! YM5!/YM6!  magic(4) check(8) frames(4) attrs(4) drums(2) clock(4)
//!            rate(2) loop(4) extra(2) = 34
//! ```
//!
//! YM4 and later carry digidrum sample blocks (u32 size + data, repeated)
//! and three NUL-terminated strings (title, author, comment) between the
//! header and the frame data. Attribute bit 0 selects register-interleaved
//! frame layout; YM5/YM6 frames carry 16 registers of which the last two are
//! virtual effect registers this converter ignores.

use crate::Result;
use ym2sn_core::{SourceInfo, YmFrame, FRAME_REGISTERS};

/// Signature following the magic in YM4/YM5/YM6 headers
const CHECK_STRING: &[u8; 8] = b"LeOnArD!";

/// Registers stored per frame by YM5/YM6
const WIDE_FRAME_REGISTERS: usize = 16;

/// Upper bound on declared frame counts; a 100k-frame song is over half an
/// hour and anything larger is a corrupt header
const MAX_REASONABLE_FRAMES: u32 = 100_000;

/// Attribute bit 0: frame data is interleaved by register
const ATTR_INTERLEAVED: u32 = 1;

/// Song text metadata from YM4/YM5/YM6 containers
#[derive(Debug, Clone, Default)]
pub struct SongMetadata {
    /// Song title
    pub title: String,
    /// Composer name
    pub author: String,
    /// Free-form comment
    pub comment: String,
}

/// A parsed YM song: frames, stream info and text metadata
#[derive(Debug, Clone)]
pub struct YmSong {
    /// Register frames in playback order
    pub frames: Vec<YmFrame>,
    /// Stream metadata for the converter
    pub info: SourceInfo,
    /// Text metadata for the output container
    pub metadata: SongMetadata,
}

/// Parse an uncompressed YM file of any supported version
pub fn parse(data: &[u8]) -> Result<YmSong> {
    if data.len() < 4 {
        return Err("File too short for a YM signature".into());
    }
    match &data[0..4] {
        b"YM2!" | b"YM3!" => parse_ym3_family(data),
        b"YM4!" => parse_ym4(data),
        b"YM5!" | b"YM6!" => parse_ym5(data),
        magic => Err(format!(
            "Unsupported file format {:?}; supported: YM2, YM3, YM3b, YM4, YM5, YM6",
            String::from_utf8_lossy(magic)
        )
        .into()),
    }
}

/// YM2/YM3/YM3b: headerless interleaved dumps, optional trailing loop frame
fn parse_ym3_family(data: &[u8]) -> Result<YmSong> {
    let payload = &data[4..];

    // YM3b carries a trailing u32 loop frame; detect it by divisibility and
    // range, since the magic does not distinguish the variants
    let (payload, loop_frame) = if payload.len() % FRAME_REGISTERS == 4 && payload.len() > 4 {
        let body = &payload[..payload.len() - 4];
        let raw = u32::from_be_bytes(payload[payload.len() - 4..].try_into().unwrap());
        let frame_count = (body.len() / FRAME_REGISTERS) as u32;
        if raw < frame_count {
            (body, Some(raw))
        } else {
            return Err("Invalid YM3b loop frame (exceeds frame count)".into());
        }
    } else {
        (payload, None)
    };

    if !payload.len().is_multiple_of(FRAME_REGISTERS) {
        return Err(format!(
            "YM3 data size {} is not a multiple of {}",
            payload.len(),
            FRAME_REGISTERS
        )
        .into());
    }

    let frame_count = payload.len() / FRAME_REGISTERS;
    let frames = deinterleave(payload, frame_count, FRAME_REGISTERS);

    Ok(YmSong {
        frames,
        info: SourceInfo {
            source_clock_hz: 2_000_000,
            frame_rate_hz: 50,
            loop_frame,
            song_length_frames: frame_count as u32,
            attributes: ATTR_INTERLEAVED,
        },
        metadata: SongMetadata::default(),
    })
}

fn parse_ym4(data: &[u8]) -> Result<YmSong> {
    if data.len() < 26 {
        return Err("YM4 file too small for header".into());
    }
    if &data[4..12] != CHECK_STRING {
        return Err("Invalid YM4 signature".into());
    }
    let frame_count = read_frame_count(data, 12)?;
    let attributes = u32::from_be_bytes(data[16..20].try_into().unwrap());
    let digidrum_count = u16::from_be_bytes(data[20..22].try_into().unwrap());
    let loop_frame = u32::from_be_bytes(data[22..26].try_into().unwrap());

    let offset = skip_digidrums(data, 26, digidrum_count)?;
    let (metadata, offset) = parse_metadata_strings(data, offset)?;
    let frames = parse_frames(data, offset, frame_count, attributes, FRAME_REGISTERS)?;

    Ok(YmSong {
        frames,
        info: SourceInfo {
            source_clock_hz: 2_000_000,
            frame_rate_hz: 50,
            loop_frame: Some(loop_frame),
            song_length_frames: frame_count as u32,
            attributes,
        },
        metadata,
    })
}

fn parse_ym5(data: &[u8]) -> Result<YmSong> {
    if data.len() < 34 {
        return Err("YM5 file too small for header".into());
    }
    if &data[4..12] != CHECK_STRING {
        return Err("Invalid YM5 signature".into());
    }
    let frame_count = read_frame_count(data, 12)?;
    let attributes = u32::from_be_bytes(data[16..20].try_into().unwrap());
    let digidrum_count = u16::from_be_bytes(data[20..22].try_into().unwrap());
    let master_clock = u32::from_be_bytes(data[22..26].try_into().unwrap());
    let frame_rate = u16::from_be_bytes(data[26..28].try_into().unwrap());
    let loop_frame = u32::from_be_bytes(data[28..32].try_into().unwrap());
    let extra_data_size = u16::from_be_bytes(data[32..34].try_into().unwrap());

    let offset = 34usize
        .checked_add(extra_data_size as usize)
        .filter(|&o| o <= data.len())
        .ok_or("YM5 truncated in extra data section")?;
    let offset = skip_digidrums(data, offset, digidrum_count)?;
    let (metadata, offset) = parse_metadata_strings(data, offset)?;
    let frames = parse_frames(data, offset, frame_count, attributes, WIDE_FRAME_REGISTERS)?;

    Ok(YmSong {
        frames,
        info: SourceInfo {
            source_clock_hz: if master_clock > 0 {
                master_clock
            } else {
                2_000_000
            },
            frame_rate_hz: if frame_rate > 0 { frame_rate as u32 } else { 50 },
            loop_frame: Some(loop_frame),
            song_length_frames: frame_count as u32,
            attributes,
        },
        metadata,
    })
}

fn read_frame_count(data: &[u8], offset: usize) -> Result<usize> {
    let count = u32::from_be_bytes(data[offset..offset + 4].try_into().unwrap());
    if count == 0 {
        return Err("YM file declares zero frames".into());
    }
    if count > MAX_REASONABLE_FRAMES {
        return Err(format!(
            "Frame count {} exceeds limit of {}",
            count, MAX_REASONABLE_FRAMES
        )
        .into());
    }
    Ok(count as usize)
}

/// Skip digidrum sample blocks (u32 size + data, repeated)
fn skip_digidrums(data: &[u8], mut offset: usize, count: u16) -> Result<usize> {
    for _ in 0..count {
        if offset + 4 > data.len() {
            return Err("Incomplete digidrum size field".into());
        }
        let size = u32::from_be_bytes(data[offset..offset + 4].try_into().unwrap()) as usize;
        offset = offset
            .checked_add(4)
            .and_then(|o| o.checked_add(size))
            .filter(|&o| o <= data.len())
            .ok_or("Incomplete digidrum data")?;
    }
    Ok(offset)
}

/// Read the three NUL-terminated metadata strings
fn parse_metadata_strings(data: &[u8], mut offset: usize) -> Result<(SongMetadata, usize)> {
    let mut read_cstr = |label: &str| -> Result<String> {
        let start = offset;
        while offset < data.len() && data[offset] != 0 {
            offset += 1;
        }
        if offset >= data.len() {
            return Err(format!("Unterminated {label} string").into());
        }
        let text = String::from_utf8_lossy(&data[start..offset]).into_owned();
        offset += 1;
        Ok(text)
    };

    let title = read_cstr("title")?;
    let author = read_cstr("author")?;
    let comment = read_cstr("comment")?;
    Ok((
        SongMetadata {
            title,
            author,
            comment,
        },
        offset,
    ))
}

fn parse_frames(
    data: &[u8],
    offset: usize,
    frame_count: usize,
    attributes: u32,
    registers: usize,
) -> Result<Vec<YmFrame>> {
    let needed = frame_count
        .checked_mul(registers)
        .ok_or("Frame data size overflow")?;
    if offset + needed > data.len() {
        return Err(format!(
            "Frame data truncated: need {} bytes, have {}",
            needed,
            data.len().saturating_sub(offset)
        )
        .into());
    }
    let payload = &data[offset..offset + needed];

    if attributes & ATTR_INTERLEAVED != 0 {
        Ok(deinterleave(payload, frame_count, registers))
    } else {
        Ok((0..frame_count)
            .map(|j| {
                let mut regs = [0u8; FRAME_REGISTERS];
                regs.copy_from_slice(&payload[j * registers..j * registers + FRAME_REGISTERS]);
                YmFrame::new(regs)
            })
            .collect())
    }
}

/// Register-major to frame-major: register k of frame j sits at
/// `j + frame_count * k`
fn deinterleave(payload: &[u8], frame_count: usize, registers: usize) -> Vec<YmFrame> {
    (0..frame_count)
        .map(|j| {
            let mut regs = [0u8; FRAME_REGISTERS];
            for (k, reg) in regs.iter_mut().enumerate().take(registers.min(FRAME_REGISTERS)) {
                *reg = payload[j + frame_count * k];
            }
            YmFrame::new(regs)
        })
        .collect()
}
