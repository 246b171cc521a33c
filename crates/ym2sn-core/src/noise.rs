//! Noise mixer collapse
//!
//! The YM can mix its one noise generator into any of the three voices, each
//! at that voice's own level; the SN has a single noise channel with one
//! volume. The collapse takes the loudest contributing voice — averaging
//! sounds plausible but audibly thins percussion when two voices share a
//! drum — and snaps the YM noise frequency to the nearest of the SN's three
//! fixed white-noise rates.

use crate::freq::{div_round_half_even, ToneMapper};
use crate::packetizer::NoiseRate;
use crate::voice::Voice;

/// Divisors behind the SN's fixed white-noise rates
const FIXED_RATE_DIVISORS: [(u64, NoiseRate); 3] = [
    (512, NoiseRate::Div512),
    (1024, NoiseRate::Div1024),
    (2048, NoiseRate::Div2048),
];

/// Result of collapsing the YM noise mixers for one frame
#[derive(Debug, Clone, Copy)]
pub struct NoiseDecision {
    /// Loudest 5-bit volume among noise-mixed voices
    pub volume5: u8,
    /// Nearest fixed white-noise rate to the YM noise frequency
    pub rate: NoiseRate,
}

/// Collapse the frame's noise mix, or `None` when no voice enables noise
pub fn collapse(
    voices: &[Voice; 3],
    noise_period: u8,
    mapper: &ToneMapper,
    target_clock_hz: u32,
) -> Option<NoiseDecision> {
    let volume5 = voices
        .iter()
        .filter(|v| v.noise_on)
        .map(|v| v.volume5)
        .max()?;

    let noise_millihz = mapper.ym_noise_millihz(noise_period);
    let mut best = NoiseRate::Div512;
    let mut best_distance = u64::MAX;
    for (divisor, rate) in FIXED_RATE_DIVISORS {
        let rate_millihz = div_round_half_even(target_clock_hz as u64 * 1000, divisor);
        let distance = rate_millihz.abs_diff(noise_millihz);
        if distance < best_distance {
            best_distance = distance;
            best = rate;
        }
    }

    Some(NoiseDecision {
        volume5,
        rate: best,
    })
}
