//! Command stream serialization
//!
//! Maps the converter's logical commands onto VGM opcodes:
//!
//! ```text
//! Write(b)    → 0x50 b          SN76489 write
//! Wait(735)   → 0x62            one 60 Hz frame
//! Wait(882)   → 0x63            one 50 Hz frame
//! Wait(n)     → 0x61 nn nn      generic 16-bit wait
//! LoopStart   → (records the loop offset, no bytes)
//! End         → 0x66
//! ```
//!
//! and assembles header + data + GD3 into the final byte stream.

use crate::gd3::Gd3Tag;
use crate::header::{VgmHeader, VGM_HEADER_SIZE};
use crate::{Result, VgmError};
use ym2sn_core::{LfsrTap, SnCommand};

/// VGM opcodes the encoder emits
const CMD_SN_WRITE: u8 = 0x50;
const CMD_WAIT: u8 = 0x61;
const CMD_WAIT_NTSC_FRAME: u8 = 0x62;
const CMD_WAIT_PAL_FRAME: u8 = 0x63;
const CMD_END: u8 = 0x66;

/// Samples covered by the single-byte wait shortcuts
const NTSC_FRAME_SAMPLES: u16 = 735;
const PAL_FRAME_SAMPLES: u16 = 882;

/// Chip parameters for the output header
#[derive(Debug, Clone)]
pub struct VgmSettings {
    /// SN76489 clock in Hz
    pub sn_clock_hz: u32,
    /// Shift register tap, carried into the SNW header field
    pub lfsr_tap: LfsrTap,
    /// Recording rate hint (frame rate of the source dump)
    pub frame_rate_hz: u32,
    /// GD3 metadata, `None` to omit the tag
    pub gd3: Option<Gd3Tag>,
}

impl Default for VgmSettings {
    fn default() -> Self {
        VgmSettings {
            sn_clock_hz: 4_000_000,
            lfsr_tap: LfsrTap::default(),
            frame_rate_hz: 50,
            gd3: None,
        }
    }
}

/// Encode a command stream into a complete VGM file image
///
/// The stream must contain at most one `LoopStart` and end with `End`;
/// the converter upholds both.
pub fn write_vgm(commands: &[SnCommand], settings: &VgmSettings) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut total_samples = 0u32;
    let mut loop_point: Option<(u32, u32)> = None; // (data offset, samples before)
    let mut ended = false;

    for command in commands {
        if ended {
            return Err(VgmError::StreamError(
                "commands found after the end marker".into(),
            ));
        }
        match command {
            SnCommand::Write(byte) => {
                data.push(CMD_SN_WRITE);
                data.push(*byte);
            }
            SnCommand::Wait(samples) => {
                match *samples {
                    0 => {}
                    PAL_FRAME_SAMPLES => data.push(CMD_WAIT_PAL_FRAME),
                    NTSC_FRAME_SAMPLES => data.push(CMD_WAIT_NTSC_FRAME),
                    n => {
                        data.push(CMD_WAIT);
                        data.extend_from_slice(&n.to_le_bytes());
                    }
                }
                total_samples += *samples as u32;
            }
            SnCommand::LoopStart => {
                if loop_point.is_some() {
                    return Err(VgmError::StreamError("multiple loop markers".into()));
                }
                loop_point = Some((data.len() as u32, total_samples));
            }
            SnCommand::End => {
                data.push(CMD_END);
                ended = true;
            }
        }
    }
    if !ended {
        return Err(VgmError::StreamError("missing end marker".into()));
    }

    let gd3_bytes = settings.gd3.as_ref().map(Gd3Tag::to_bytes);
    let gd3_len = gd3_bytes.as_ref().map_or(0, Vec::len);
    let file_len = VGM_HEADER_SIZE + data.len() + gd3_len;

    let header = VgmHeader {
        eof_offset: (file_len - 0x04) as u32,
        sn76489_clock: settings.sn_clock_hz,
        gd3_offset: if gd3_bytes.is_some() {
            (VGM_HEADER_SIZE + data.len() - 0x14) as u32
        } else {
            0
        },
        total_samples,
        loop_offset: loop_point
            .map(|(offset, _)| VGM_HEADER_SIZE as u32 + offset - 0x1C)
            .unwrap_or(0),
        loop_samples: loop_point
            .map(|(_, samples)| total_samples - samples)
            .unwrap_or(0),
        sample_rate: settings.frame_rate_hz,
        snw: settings.lfsr_tap.width(),
        ..Default::default()
    };

    let mut out = Vec::with_capacity(file_len);
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&data);
    if let Some(gd3) = gd3_bytes {
        out.extend_from_slice(&gd3);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_stream() {
        let commands = [
            SnCommand::Write(0x9F),
            SnCommand::Wait(882),
            SnCommand::End,
        ];
        let vgm = write_vgm(&commands, &VgmSettings::default()).unwrap();
        assert_eq!(&vgm[0..4], b"Vgm ");
        assert_eq!(&vgm[0x40..], &[0x50, 0x9F, 0x63, 0x66]);
        assert_eq!(
            u32::from_le_bytes(vgm[0x04..0x08].try_into().unwrap()) as usize,
            vgm.len() - 4
        );
        assert_eq!(u32::from_le_bytes(vgm[0x18..0x1C].try_into().unwrap()), 882);
        assert_eq!(u32::from_le_bytes(vgm[0x14..0x18].try_into().unwrap()), 0);
    }

    #[test]
    fn test_wait_encodings() {
        let commands = [
            SnCommand::Wait(882),
            SnCommand::Wait(735),
            SnCommand::Wait(100),
            SnCommand::Wait(0),
            SnCommand::End,
        ];
        let vgm = write_vgm(&commands, &VgmSettings::default()).unwrap();
        assert_eq!(&vgm[0x40..], &[0x63, 0x62, 0x61, 100, 0, 0x66]);
        assert_eq!(
            u32::from_le_bytes(vgm[0x18..0x1C].try_into().unwrap()),
            882 + 735 + 100
        );
    }

    #[test]
    fn test_loop_bookkeeping() {
        let commands = [
            SnCommand::Write(0x9F),
            SnCommand::Wait(882),
            SnCommand::LoopStart,
            SnCommand::Write(0x8C),
            SnCommand::Wait(882),
            SnCommand::Wait(882),
            SnCommand::End,
        ];
        let vgm = write_vgm(&commands, &VgmSettings::default()).unwrap();
        // Loop point sits after the first write + wait = 3 data bytes
        assert_eq!(
            u32::from_le_bytes(vgm[0x1C..0x20].try_into().unwrap()),
            0x40 + 3 - 0x1C
        );
        assert_eq!(
            u32::from_le_bytes(vgm[0x20..0x24].try_into().unwrap()),
            882 * 2
        );
    }

    #[test]
    fn test_gd3_offset_and_content() {
        let settings = VgmSettings {
            gd3: Some(Gd3Tag::from_song("T", "g.ym", "A", "")),
            ..Default::default()
        };
        let commands = [SnCommand::End];
        let vgm = write_vgm(&commands, &settings).unwrap();
        let gd3_offset =
            u32::from_le_bytes(vgm[0x14..0x18].try_into().unwrap()) as usize + 0x14;
        assert_eq!(&vgm[gd3_offset..gd3_offset + 4], b"Gd3 ");
    }

    #[test]
    fn test_stream_validation() {
        assert!(write_vgm(&[SnCommand::Wait(1)], &VgmSettings::default()).is_err());
        assert!(write_vgm(
            &[SnCommand::End, SnCommand::Wait(1)],
            &VgmSettings::default()
        )
        .is_err());
        assert!(write_vgm(
            &[
                SnCommand::LoopStart,
                SnCommand::LoopStart,
                SnCommand::End
            ],
            &VgmSettings::default()
        )
        .is_err());
    }

    #[test]
    fn test_snw_follows_tap() {
        let settings = VgmSettings {
            lfsr_tap: LfsrTap::Bit16,
            ..Default::default()
        };
        let vgm = write_vgm(&[SnCommand::End], &settings).unwrap();
        assert_eq!(vgm[0x2A], 16);
    }
}
