//! Per-frame channel arbitration
//!
//! Three YM voices, one envelope and a mixable noise source have to land on
//! three SN tone channels and one noise channel. Most frames map A→0, B→1,
//! C→2 and nothing interesting happens. The contested resource is channel
//! C's tone register, which doubles as the clock source for noise rate 3:
//!
//! 1. With `tuned_white_noise` on, noisy frames commandeer it to pitch the
//!    white noise; the voice assigned there is muted for the frame.
//! 2. Otherwise a frame with out-of-range low tones elects one voice as the
//!    bass source: channel C's tone register carries the periodic-noise
//!    period, its own attenuation is closed, and the noise channel plays
//!    the bass voice's volume. The elected voice swaps channels with
//!    whichever voice held channel C so the remaining tones stay audible.
//!
//! Noise of either kind wins over bass: the noise channel can only do one
//! thing at a time, and dropping a kick drum for one frame is less audible
//! than dropping a snare hit.

use crate::config::ConversionConfig;
use crate::freq::{MappedTone, ToneMapper};
use crate::noise::NoiseDecision;
use crate::packetizer::{NoiseRate, NoiseSetting, SnFrame};
use crate::report::ConversionReport;
use crate::voice::Voice;
use crate::volume::map_level;

/// Channel C in the SN channel numbering
const BASS_CHANNEL: usize = 2;

/// Frame-level channel assignment, fixed across envelope sub-samples
#[derive(Debug, Clone, Copy)]
pub struct Assignment {
    /// SN tone channel per YM voice
    pub channel_of: [usize; 3],
    /// Voice elected as the periodic-noise bass source
    pub bass_voice: Option<usize>,
    /// Channel C tone period when tuned white noise owns it
    pub tuned_noise_period: Option<u16>,
    /// Noise control register target for the frame
    pub noise: Option<NoiseSetting>,
}

/// Decide the frame's channel assignment and record its warnings
///
/// Everything here depends only on per-frame state (mixer bits, tone
/// classifications, noise period); volumes are applied later, per envelope
/// sub-sample, by [`build_frame`].
pub fn arbitrate(
    voices: &[Voice; 3],
    tones: &[MappedTone; 3],
    noise: Option<&NoiseDecision>,
    noise_period: u8,
    mapper: &ToneMapper,
    cfg: &ConversionConfig,
    bass_bias: Option<usize>,
    report: &mut ConversionReport,
) -> Assignment {
    let noise_allowed = cfg.channel_filter.noise;
    let noise_active = noise.is_some() && noise_allowed;

    let mut assignment = Assignment {
        channel_of: [0, 1, 2],
        bass_voice: None,
        tuned_noise_period: None,
        noise: None,
    };

    // Warnings independent of the assignment outcome
    for voice in 0..3 {
        if voices[voice].tone_on && matches!(tones[voice], MappedTone::FoldedHigh { .. }) {
            report.folded_high[voice] += 1;
        }
    }

    let bass_candidates = (0..3)
        .filter(|&v| voices[v].tone_on && matches!(tones[v], MappedTone::BassPeriodic { .. }))
        .count();

    if noise_active {
        if cfg.tuned_white_noise && noise_period > 0 {
            let period = mapper.tuned_noise_period(mapper.ym_noise_millihz(noise_period));
            assignment.tuned_noise_period = Some(period);
            assignment.noise = Some(NoiseSetting {
                white: true,
                rate: NoiseRate::ToneC,
            });
        } else {
            assignment.noise = Some(NoiseSetting {
                white: true,
                rate: noise.map(|n| n.rate).unwrap_or(NoiseRate::Div512),
            });
        }
        if bass_candidates > 0 {
            report.bass_contention += 1;
        }
    } else if bass_candidates > 0 && noise_allowed {
        let elected = elect_bass(voices, tones, bass_bias);
        assignment.bass_voice = Some(elected);
        // Swap the elected voice onto channel C so the displaced voice keeps
        // a tone channel
        assignment.channel_of.swap(elected, BASS_CHANNEL);
        assignment.noise = Some(NoiseSetting {
            white: false,
            rate: NoiseRate::ToneC,
        });
        report.bass_frames += 1;
        if bass_candidates > 1 {
            report.bass_contention += 1;
        }
    }

    // Low voices that ended up without the bass channel get silenced
    for voice in 0..3 {
        if voices[voice].tone_on
            && matches!(tones[voice], MappedTone::BassPeriodic { .. })
            && assignment.bass_voice != Some(voice)
        {
            report.silenced_low[voice] += 1;
        }
    }
    if (0..3).any(|v| voices[v].tone_on && matches!(tones[v], MappedTone::SoftwareBass { .. })) {
        report.software_bass_frames += 1;
    }

    assignment
}

/// Pick the bass source: lowest frequency wins, ties resolve toward the
/// pre-scanned bias voice, then toward the lowest voice index
fn elect_bass(voices: &[Voice; 3], tones: &[MappedTone; 3], bass_bias: Option<usize>) -> usize {
    let mut best: Option<usize> = None;
    for voice in 0..3 {
        if !voices[voice].tone_on || !matches!(tones[voice], MappedTone::BassPeriodic { .. }) {
            continue;
        }
        best = Some(match best {
            None => voice,
            Some(current) => {
                if voices[voice].freq_millihz < voices[current].freq_millihz
                    || (voices[voice].freq_millihz == voices[current].freq_millihz
                        && bass_bias == Some(voice))
                {
                    voice
                } else {
                    current
                }
            }
        });
    }
    best.unwrap_or(0)
}

/// Build the SN register targets for one envelope sub-sample
pub fn build_frame(
    assignment: &Assignment,
    voices: &[Voice; 3],
    tones: &[MappedTone; 3],
    noise: Option<&NoiseDecision>,
    cfg: &ConversionConfig,
) -> SnFrame {
    let force = cfg.force_attenuation_mapping;
    let noise_allowed = cfg.channel_filter.noise;
    let mut frame = SnFrame {
        noise: assignment.noise,
        ..Default::default()
    };

    for voice in 0..3 {
        let channel = assignment.channel_of[voice];

        if assignment.bass_voice == Some(voice) {
            if let MappedTone::BassPeriodic { period, .. } = tones[voice] {
                frame.tone[BASS_CHANNEL] = Some(period);
            }
            frame.atten[BASS_CHANNEL] = 15;
            frame.atten[3] = map_level(voices[voice].tone_volume5(), force);
            continue;
        }

        if assignment.tuned_noise_period.is_some() && channel == BASS_CHANNEL {
            frame.tone[BASS_CHANNEL] = assignment.tuned_noise_period;
            frame.atten[BASS_CHANNEL] = 15;
            continue;
        }

        let level = voices[voice].tone_volume5();
        match tones[voice] {
            MappedTone::InRange { period } | MappedTone::FoldedHigh { period, .. } => {
                if level > 0 {
                    frame.tone[channel] = Some(period);
                    frame.atten[channel] = map_level(level, force);
                } else {
                    frame.atten[channel] = 15;
                }
            }
            MappedTone::SoftwareBass { period } => {
                if level > 0 {
                    frame.tone[channel] = Some(period);
                    frame.bass_flags[channel] = true;
                    frame.atten[channel] = map_level(level, force);
                } else {
                    frame.atten[channel] = 15;
                }
            }
            // Out of range and the bass channel is taken
            MappedTone::BassPeriodic { .. } => {
                frame.atten[channel] = 15;
            }
        }
    }

    if assignment.bass_voice.is_none() {
        if let Some(decision) = noise {
            if noise_allowed {
                frame.atten[3] = map_level(decision.volume5, force);
            }
        }
    }

    frame
}
