//! Per-frame voice model
//!
//! Rebuilds the derived state of the three YM voices from each frame: the
//! tone frequency, the effective 5-bit volume (fixed level or envelope
//! sample), and the normalised mixer bits. Everything downstream —
//! classification, arbitration, noise collapse — works from these slots;
//! the raw registers are not consulted again.

use crate::config::ConversionConfig;
use crate::frame::YmFrame;
use crate::freq::ToneMapper;
use crate::volume::widen_level;

/// Envelope-driven voices fall back to full level when simulation is off
const FULL_LEVEL: u8 = 31;

/// Derived state for one YM voice, valid for one frame
#[derive(Debug, Clone, Copy)]
pub struct Voice {
    /// Tone frequency in millihertz (period 0 treated as 1)
    pub freq_millihz: u64,
    /// Effective 5-bit volume after envelope substitution
    pub volume5: u8,
    /// Level register selects the envelope generator
    pub env_selected: bool,
    /// Tone mixer bit, active-high
    pub tone_on: bool,
    /// Noise mixer bit, active-high
    pub noise_on: bool,
}

impl Voice {
    /// A voice is silent when nothing is mixed in or its level is zero
    pub fn is_silent(&self) -> bool {
        (!self.tone_on && !self.noise_on) || self.volume5 == 0
    }

    /// Volume contributed to a tone channel (zero when tone is not mixed)
    pub fn tone_volume5(&self) -> u8 {
        if self.tone_on {
            self.volume5
        } else {
            0
        }
    }
}

/// Build the three voice slots for one frame
///
/// `env_level5` is the envelope sample for this output tick. Voice order is
/// YM order A/B/C and carries through to the default SN channel mapping.
pub fn build_voices(
    frame: &YmFrame,
    env_level5: u8,
    mapper: &ToneMapper,
    cfg: &ConversionConfig,
) -> [Voice; 3] {
    std::array::from_fn(|index| {
        let env_selected = frame.env_selected(index);
        let mut tone_on = frame.tone_enabled(index);
        let mut noise_on = frame.noise_enabled(index);

        // Some rips drive a voice purely from the envelope with its tone
        // mixer bit off; treat those as tone-enabled
        if cfg.envelope_mix_hack && env_selected {
            tone_on = true;
        }

        if !cfg.channel_filter.voice(index) {
            tone_on = false;
            noise_on = false;
        }

        let volume5 = if env_selected {
            if cfg.disable_envelopes {
                FULL_LEVEL
            } else {
                env_level5
            }
        } else {
            widen_level(frame.level(index))
        };

        Voice {
            freq_millihz: mapper.ym_tone_millihz(frame.tone_period(index)),
            volume5,
            env_selected,
            tone_on,
            noise_on,
        }
    })
}
