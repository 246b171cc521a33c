//! Conversion driver
//!
//! Owns everything that persists across frames — the envelope generator, the
//! packetizer's register cache and the report — and runs the pipeline:
//! voices are rebuilt from each frame, the envelope advances, the arbiter
//! assigns channels once per frame, and attenuations are resampled per
//! envelope sub-tick. Given the same frames and config the output stream is
//! byte-identical on every run and platform; all frequency arithmetic is
//! integer millihertz.

use crate::arbiter::{arbitrate, build_frame};
use crate::config::ConversionConfig;
use crate::envelope::EnvelopeGen;
use crate::frame::{SourceInfo, YmFrame};
use crate::freq::{MappedTone, ToneMapper};
use crate::noise::collapse;
use crate::packetizer::{Packetizer, SnCommand};
use crate::report::ConversionReport;
use crate::voice::build_voices;
use crate::{ConvertError, Result};

/// Frame rate assumed when the container declares none
const DEFAULT_FRAME_RATE: u32 = 50;

/// Source clock assumed when the container declares none
const DEFAULT_SOURCE_CLOCK: u32 = 2_000_000;

/// YM register stream → SN command stream converter
///
/// One converter owns one configuration and can run any number of
/// conversions; per-run state is reset at the top of [`convert`], so
/// repeated runs over the same input produce identical streams.
///
/// [`convert`]: Converter::convert
#[derive(Debug, Clone)]
pub struct Converter {
    cfg: ConversionConfig,
    report: ConversionReport,
}

impl Converter {
    /// Create a converter with the given configuration
    pub fn new(cfg: ConversionConfig) -> Self {
        Converter {
            cfg,
            report: ConversionReport::default(),
        }
    }

    /// The report accumulated by the most recent [`convert`] run
    ///
    /// [`convert`]: Converter::convert
    pub fn report(&self) -> &ConversionReport {
        &self.report
    }

    /// Convert a frame stream into SN commands
    ///
    /// Fails only on configuration problems detected before any frame is
    /// processed; frame-level anomalies accumulate on the report.
    pub fn convert(&mut self, frames: &[YmFrame], info: &SourceInfo) -> Result<Vec<SnCommand>> {
        self.report = ConversionReport::default();

        let frame_rate = if info.frame_rate_hz > 0 {
            info.frame_rate_hz
        } else {
            DEFAULT_FRAME_RATE
        };
        let source_clock = self.cfg.source_clock_hz.unwrap_or(if info.source_clock_hz > 0 {
            info.source_clock_hz
        } else {
            DEFAULT_SOURCE_CLOCK
        });
        if self.cfg.target_clock_hz == 0 {
            return Err(ConvertError::ConfigError(
                "target clock must be non-zero".into(),
            ));
        }

        let subdivision = match self.cfg.envelope_sample_rate_hz {
            None => 1,
            Some(rate) => {
                if rate == 0 || rate % frame_rate != 0 {
                    return Err(ConvertError::EnvelopeSampleRate {
                        sample_rate: rate,
                        frame_rate,
                    });
                }
                rate / frame_rate
            }
        };
        let tick_rate = frame_rate * subdivision;

        let mapper = ToneMapper::new(
            self.cfg.target_clock_hz,
            source_clock,
            self.cfg.lfsr_tap_bit,
            self.cfg.software_bass,
        );

        let bass_bias = if self.cfg.prescan {
            Some(self.prescan(frames, &mapper))
        } else {
            None
        };

        let mut envelope = EnvelopeGen::new();
        let mut packetizer = Packetizer::new(tick_rate);
        let mut out = Vec::new();
        packetizer.begin(&mut out);

        for (index, frame) in frames.iter().enumerate() {
            if info.loop_frame == Some(index as u32) {
                out.push(SnCommand::LoopStart);
            }

            let any_envelope = (0..3).any(|v| frame.env_selected(v));
            if any_envelope {
                self.report.enveloped_frames += 1;
                if frame.env_period() == 0 {
                    self.report.zero_envelope_periods += 1;
                }
            }
            let noise_in_frame = (0..3).any(|v| frame.noise_enabled(v));
            self.report.note_frame(
                std::array::from_fn(|v| frame.tone_period(v)),
                noise_in_frame.then(|| frame.noise_period()),
            );

            // Register writes take effect at frame start: period first, then
            // the retrigger if the shape register was written this frame
            envelope.set_period(frame.env_period());
            if let Some(shape) = frame.env_shape() {
                envelope.set_shape(shape);
            }

            let tones: [MappedTone; 3] =
                std::array::from_fn(|v| mapper.map(frame.tone_period(v)));

            // Channel assignment depends only on frame-level state, so probe
            // voices with a placeholder envelope level
            let probe = build_voices(frame, 0, &mapper, &self.cfg);
            let noise_probe = collapse(
                &probe,
                frame.noise_period(),
                &mapper,
                self.cfg.target_clock_hz,
            );
            let assignment = arbitrate(
                &probe,
                &tones,
                noise_probe.as_ref(),
                frame.noise_period(),
                &mapper,
                &self.cfg,
                bass_bias,
                &mut self.report,
            );

            for _ in 0..subdivision {
                if !self.cfg.disable_envelopes {
                    envelope.advance(source_clock, tick_rate);
                }
                let voices = build_voices(frame, envelope.level5(), &mapper, &self.cfg);
                let noise = collapse(
                    &voices,
                    frame.noise_period(),
                    &mapper,
                    self.cfg.target_clock_hz,
                );
                let sn = build_frame(&assignment, &voices, &tones, noise.as_ref(), &self.cfg);
                packetizer.emit(&sn, &mut out);
            }

            self.report.frames_processed += 1;
        }

        out.push(SnCommand::End);
        Ok(out)
    }

    /// Whole-tune analysis pass: tallies per-voice sub-floor tone frames and
    /// picks the voice the arbiter should favour in bass tie-breaks
    fn prescan(&mut self, frames: &[YmFrame], mapper: &ToneMapper) -> usize {
        let floor = mapper.sn_floor_millihz();
        let mut low = [0u32; 3];
        let mut multi = 0u32;

        for frame in frames {
            let mut low_in_frame = 0;
            for voice in 0..3 {
                if mapper.ym_tone_millihz(frame.tone_period(voice)) < floor {
                    low[voice] += 1;
                    low_in_frame += 1;
                }
            }
            if low_in_frame > 1 {
                multi += 1;
            }
        }

        let mut bias = 0;
        if low[1] > low[0] && low[1] > low[2] {
            bias = 1;
        }
        if low[2] > low[0] && low[2] > low[1] {
            bias = 2;
        }

        self.report.low_voice_frames = low;
        self.report.multi_low_frames = multi;
        self.report.bass_bias = Some(bias as u8);
        bias
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_rate_must_divide() {
        let mut converter = Converter::new(ConversionConfig {
            envelope_sample_rate_hz: Some(120),
            ..Default::default()
        });
        let err = converter
            .convert(&[YmFrame::default()], &SourceInfo::default())
            .unwrap_err();
        match err {
            ConvertError::EnvelopeSampleRate {
                sample_rate,
                frame_rate,
            } => {
                assert_eq!(sample_rate, 120);
                assert_eq!(frame_rate, 50);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_empty_stream_has_preamble_and_end() {
        let mut converter = Converter::new(ConversionConfig::default());
        let commands = converter.convert(&[], &SourceInfo::default()).unwrap();
        assert_eq!(commands.len(), 5);
        assert_eq!(commands[4], SnCommand::End);
    }

    #[test]
    fn test_loop_marker_placement() {
        let frames = vec![YmFrame::default(); 4];
        let info = SourceInfo {
            loop_frame: Some(2),
            song_length_frames: 4,
            ..Default::default()
        };
        let mut converter = Converter::new(ConversionConfig::default());
        let commands = converter.convert(&frames, &info).unwrap();
        let loops: Vec<usize> = commands
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, SnCommand::LoopStart))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(loops.len(), 1);
        // Preamble (4 writes) + two frames of waits precede the marker
        assert_eq!(loops[0], 6);
    }

    #[test]
    fn test_prescan_bias_follows_low_counts() {
        // Voice B holds a sub-floor tone, A and C stay mid-range
        let mut frame = YmFrame::default();
        frame.regs[7] = 0x38; // tones A+B+C on
        frame.regs[0] = 0x1C;
        frame.regs[1] = 0x01;
        frame.regs[2] = 0xFF;
        frame.regs[3] = 0x0F;
        frame.regs[4] = 0x1C;
        frame.regs[5] = 0x01;
        frame.regs[8] = 0x0F;
        frame.regs[9] = 0x0F;
        frame.regs[10] = 0x0F;

        let frames = vec![frame; 10];
        let mut converter = Converter::new(ConversionConfig::default());
        converter.convert(&frames, &SourceInfo::default()).unwrap();
        let report = converter.report();
        assert_eq!(report.low_voice_frames, [0, 10, 0]);
        assert_eq!(report.bass_bias, Some(1));
        assert_eq!(report.bass_frames, 10);
    }
}
