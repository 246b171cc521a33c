//! Tone frequency mapping
//!
//! Maps YM tone periods onto the SN's narrower register range. The YM divider
//! is 12-bit (`clock / (16 * period)`), the SN's is 10-bit
//! (`clock / (32 * period)`), so at comparable clocks the SN floor sits about
//! two octaves above the YM's. Tones that fall below it are re-expressed as
//! periodic noise (whose tap divisor extends the range downward by 15× or
//! 16×) or flagged for a software-bass player; tones above the ceiling are
//! folded down by octaves.
//!
//! All arithmetic is integer millihertz with round-half-to-even division.
//! Fold decisions at range edges are settled by comparing cents error through
//! exact rational comparison, so output is byte-identical across platforms.

use crate::config::LfsrTap;

/// Largest value the SN 10-bit tone register holds
const MAX_SN_PERIOD: u64 = 1023;

/// Octave folds attempted before saturating at the register limit
const MAX_FOLDS: u8 = 8;

/// Integer division rounding half to even
pub(crate) fn div_round_half_even(numerator: u64, denominator: u64) -> u64 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    match (remainder * 2).cmp(&denominator) {
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => quotient + (quotient & 1),
        std::cmp::Ordering::Less => quotient,
    }
}

/// True when `|log(a_num/a_den)| < |log(b_num/b_den)|`, computed exactly
///
/// Used for cents-error tie-breaks: cents are `1200·log2(ratio)`, and only
/// the ordering of the absolute errors matters, never the magnitude.
fn closer_to_unity(a_num: u128, a_den: u128, b_num: u128, b_den: u128) -> bool {
    let (a_hi, a_lo) = if a_num >= a_den {
        (a_num, a_den)
    } else {
        (a_den, a_num)
    };
    let (b_hi, b_lo) = if b_num >= b_den {
        (b_num, b_den)
    } else {
        (b_den, b_num)
    };
    a_hi * b_lo < b_hi * a_lo
}

/// Outcome of mapping one YM tone onto the SN
///
/// Carries everything the arbiter needs to place the voice; the register
/// value is final, the classification drives channel assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedTone {
    /// Representable directly on an SN tone channel
    InRange {
        /// 10-bit SN tone register value
        period: u16,
    },
    /// Above the SN ceiling; folded down by whole octaves
    FoldedHigh {
        /// 10-bit SN tone register value after folding
        period: u16,
        /// Octaves the pitch dropped
        octaves: u8,
    },
    /// Below the SN floor; representable as periodic noise on channel C
    BassPeriodic {
        /// Tone register value for channel C when driving periodic noise
        period: u16,
        /// Octaves the pitch was raised to reach the periodic-noise band
        octaves: u8,
    },
    /// Below the SN floor, encoded for a software-bass player
    SoftwareBass {
        /// YM period right-shifted into the 10 data bits
        period: u16,
    },
}

/// YM tone period → SN tone register mapper
#[derive(Debug, Clone)]
pub struct ToneMapper {
    target_clock_hz: u32,
    source_clock_hz: u32,
    pn_divisor: u32,
    software_bass: bool,
}

impl ToneMapper {
    /// Create a mapper for a source/target clock pair
    pub fn new(
        target_clock_hz: u32,
        source_clock_hz: u32,
        tap: LfsrTap,
        software_bass: bool,
    ) -> Self {
        ToneMapper {
            target_clock_hz,
            source_clock_hz,
            pn_divisor: tap.divisor(),
            software_bass,
        }
    }

    /// YM tone frequency in millihertz; period 0 wraps to 1 as on hardware
    pub fn ym_tone_millihz(&self, ym_period: u16) -> u64 {
        let period = (ym_period & 0x0FFF).max(1) as u64;
        div_round_half_even(self.source_clock_hz as u64 * 1000, 16 * period)
    }

    /// YM noise frequency in millihertz; period 0 wraps to 1
    pub fn ym_noise_millihz(&self, noise_period: u8) -> u64 {
        let period = (noise_period & 0x1F).max(1) as u64;
        div_round_half_even(self.source_clock_hz as u64 * 1000, 16 * period)
    }

    /// Lowest frequency an SN tone channel can produce, in millihertz
    pub fn sn_floor_millihz(&self) -> u64 {
        div_round_half_even(self.target_clock_hz as u64 * 1000, 32 * MAX_SN_PERIOD)
    }

    /// SN tone register value for a white-noise shift rate driven by channel
    /// C (noise rate 3), clamped into the register range
    pub fn tuned_noise_period(&self, noise_millihz: u64) -> u16 {
        let numer = self.target_clock_hz as u64 * 1000;
        div_round_half_even(numer, 32 * noise_millihz.max(1)).clamp(1, MAX_SN_PERIOD) as u16
    }

    /// Map a YM tone period to an SN register value and classification
    pub fn map(&self, ym_period: u16) -> MappedTone {
        let freq = self.ym_tone_millihz(ym_period);
        let numer = self.target_clock_hz as u64 * 1000;
        let tone_den = 32 * freq;

        let n0 = div_round_half_even(numer, tone_den);
        if n0 == 0 {
            return self.fold_down(numer, tone_den);
        }
        if n0 <= MAX_SN_PERIOD {
            return MappedTone::InRange { period: n0 as u16 };
        }

        // Below the SN floor
        if self.software_bass {
            return MappedTone::SoftwareBass {
                period: (ym_period & 0x0FFF) >> 2,
            };
        }
        self.fit_periodic(numer, 32 * self.pn_divisor as u64 * freq)
    }

    /// Fold a too-high tone down by octaves until it fits above period 1
    fn fold_down(&self, numer: u64, den: u64) -> MappedTone {
        for octaves in 1..=MAX_FOLDS {
            let n = div_round_half_even(numer << octaves, den);
            if n >= 1 {
                // Clamping one octave earlier at period 1 may sit closer in
                // cents than the folded value does
                let clamp_ideal_den = (den as u128) << (octaves - 1);
                if closer_to_unity(numer as u128, clamp_ideal_den, n as u128 * den as u128, (numer as u128) << octaves)
                {
                    return MappedTone::FoldedHigh {
                        period: 1,
                        octaves: octaves - 1,
                    };
                }
                return MappedTone::FoldedHigh {
                    period: n.min(MAX_SN_PERIOD) as u16,
                    octaves,
                };
            }
        }
        MappedTone::FoldedHigh {
            period: 1,
            octaves: MAX_FOLDS,
        }
    }

    /// Fit a too-low tone into the periodic-noise band, raising it by octaves
    /// when it undershoots even that
    fn fit_periodic(&self, numer: u64, den: u64) -> MappedTone {
        let n0 = div_round_half_even(numer, den);
        if n0 <= MAX_SN_PERIOD {
            return MappedTone::BassPeriodic {
                period: n0.max(1) as u16,
                octaves: 0,
            };
        }
        for octaves in 1..=MAX_FOLDS {
            let shifted_den = den << octaves;
            let n = div_round_half_even(numer, shifted_den);
            if n <= MAX_SN_PERIOD {
                // Clamping one octave earlier at the register limit may sit
                // closer in cents than the raised value does
                let clamp_ideal_den = (den as u128) << (octaves - 1);
                if closer_to_unity(
                    MAX_SN_PERIOD as u128 * clamp_ideal_den,
                    numer as u128,
                    n as u128 * shifted_den as u128,
                    numer as u128,
                ) {
                    return MappedTone::BassPeriodic {
                        period: MAX_SN_PERIOD as u16,
                        octaves: octaves - 1,
                    };
                }
                return MappedTone::BassPeriodic {
                    period: n.max(1) as u16,
                    octaves,
                };
            }
        }
        MappedTone::BassPeriodic {
            period: MAX_SN_PERIOD as u16,
            octaves: MAX_FOLDS,
        }
    }
}
