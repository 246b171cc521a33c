//! SN register targets and differential output
//!
//! The arbiter produces one [`SnFrame`] of intended chip state per output
//! tick; the [`Packetizer`] diffs it against the last-written register image
//! and emits only the bytes that change, followed by the tick's wait. The SN
//! is programmed through single-byte latches (`1cc t dddd`) with tone
//! periods taking a second data byte (`0 x dddddd`):
//!
//! ```text
//! 1 cc 0 pppp   tone latch, channel cc, period low nibble
//! 0 f pppppp    tone data, period bits 4-9 (f = software-bass flag)
//! 1 cc 1 aaaa   attenuation latch (15 = silence)
//! 1 11 0 0mrr   noise latch: m = white/periodic, rr = rate
//! ```
//!
//! Skipping unchanged noise latches matters beyond byte count: every noise
//! write resets the LFSR, which is audible as a click.

/// Largest number of data bytes one frame may emit (3 tone pairs, 4
/// attenuations, 1 noise latch)
pub const MAX_FRAME_BYTES: usize = 11;

/// Reference sample rate of the output timeline
pub const OUTPUT_SAMPLE_RATE: u64 = 44_100;

/// Noise shift rate selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseRate {
    /// clock / 512
    Div512,
    /// clock / 1024
    Div1024,
    /// clock / 2048
    Div2048,
    /// Driven by tone channel C's divider
    ToneC,
}

impl NoiseRate {
    fn bits(&self) -> u8 {
        match self {
            NoiseRate::Div512 => 0,
            NoiseRate::Div1024 => 1,
            NoiseRate::Div2048 => 2,
            NoiseRate::ToneC => 3,
        }
    }
}

/// Noise channel register target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoiseSetting {
    /// White (LFSR tapped) rather than periodic output
    pub white: bool,
    /// Shift rate selector
    pub rate: NoiseRate,
}

impl NoiseSetting {
    /// The 3-bit value the noise latch carries
    pub fn control_bits(&self) -> u8 {
        (if self.white { 4 } else { 0 }) | self.rate.bits()
    }
}

/// Intended SN state for one output tick
///
/// `None` tone entries mean "leave the register alone" — silent channels are
/// muted by attenuation, never by writing a placeholder period. At most one
/// of periodic-noise bass and tuned white noise may own channel C's tone
/// register in a frame; the arbiter guarantees that before the frame gets
/// here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnFrame {
    /// Tone period targets per SN channel
    pub tone: [Option<u16>; 3],
    /// Noise control target, `None` to preserve the current mode
    pub noise: Option<NoiseSetting>,
    /// Attenuation per channel (0-2 tone, 3 noise); 15 = silence
    pub atten: [u8; 4],
    /// Software-bass flag per tone channel
    pub bass_flags: [bool; 3],
}

impl Default for SnFrame {
    /// Everything silent, no register writes requested
    fn default() -> Self {
        SnFrame {
            tone: [None; 3],
            noise: None,
            atten: [15; 4],
            bass_flags: [false; 3],
        }
    }
}

/// Logical SN command stream element
///
/// The VGM encoder downstream maps `Write` to `0x50 byte` and the waits to
/// the `0x61`/`0x62`/`0x63` family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnCommand {
    /// One byte written to the SN data port
    Write(u8),
    /// Pause for a number of samples at the 44.1 kHz reference rate
    Wait(u16),
    /// Marks the frame playback loops back to (at most once per stream)
    LoopStart,
    /// End of stream
    End,
}

/// Differential register writer with the per-tick wait clock
#[derive(Debug, Clone)]
pub struct Packetizer {
    tone_cache: [Option<(u16, bool)>; 3],
    atten_cache: [Option<u8>; 4],
    noise_cache: Option<u8>,
    /// Output ticks emitted so far
    ticks: u64,
    /// Samples represented by the waits emitted so far
    samples_emitted: u64,
    /// Output ticks per second (frame rate × envelope subdivision)
    tick_rate: u64,
}

impl Packetizer {
    /// Create a packetizer for the given output tick rate
    pub fn new(tick_rate: u32) -> Self {
        Packetizer {
            tone_cache: [None; 3],
            atten_cache: [None; 4],
            noise_cache: None,
            ticks: 0,
            samples_emitted: 0,
            tick_rate: tick_rate.max(1) as u64,
        }
    }

    /// Emit the stream preamble: all four channels latched silent
    ///
    /// A player seeking into the stream mid-note then starts from silence
    /// instead of whatever the chip held.
    pub fn begin(&mut self, out: &mut Vec<SnCommand>) {
        for channel in 0..4u8 {
            out.push(SnCommand::Write(latch_atten(channel, 15)));
            self.atten_cache[channel as usize] = Some(15);
        }
    }

    /// Emit the delta between `frame` and the cached register image, then
    /// this tick's wait
    pub fn emit(&mut self, frame: &SnFrame, out: &mut Vec<SnCommand>) {
        for channel in 0..3usize {
            if let Some(period) = frame.tone[channel] {
                let target = (period & 0x03FF, frame.bass_flags[channel]);
                if self.tone_cache[channel] != Some(target) {
                    self.tone_cache[channel] = Some(target);
                    out.push(SnCommand::Write(latch_tone(channel as u8, target.0)));
                    out.push(SnCommand::Write(data_tone(target.0, target.1)));
                }
            }
        }

        if let Some(noise) = frame.noise {
            let bits = noise.control_bits();
            if self.noise_cache != Some(bits) {
                self.noise_cache = Some(bits);
                out.push(SnCommand::Write(latch_noise(bits)));
            }
        }

        for channel in 0..4usize {
            let atten = frame.atten[channel] & 0x0F;
            if self.atten_cache[channel] != Some(atten) {
                self.atten_cache[channel] = Some(atten);
                out.push(SnCommand::Write(latch_atten(channel as u8, atten)));
            }
        }

        self.wait(out);
    }

    /// Emit this tick's wait, accumulating the fractional remainder so the
    /// stream never drifts more than one sample from real time
    fn wait(&mut self, out: &mut Vec<SnCommand>) {
        self.ticks += 1;
        let due = OUTPUT_SAMPLE_RATE * self.ticks / self.tick_rate;
        let delta = due - self.samples_emitted;
        if delta > 0 {
            out.push(SnCommand::Wait(delta as u16));
            self.samples_emitted = due;
        }
    }
}

fn latch_tone(channel: u8, period: u16) -> u8 {
    0x80 | (channel << 5) | (period & 0x0F) as u8
}

fn data_tone(period: u16, bass_flag: bool) -> u8 {
    let data = ((period >> 4) & 0x3F) as u8;
    if bass_flag { data | 0x40 } else { data }
}

fn latch_atten(channel: u8, atten: u8) -> u8 {
    0x80 | (channel << 5) | 0x10 | (atten & 0x0F)
}

fn latch_noise(control: u8) -> u8 {
    0xE0 | (control & 0x07)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_bytes(commands: &[SnCommand]) -> Vec<u8> {
        commands
            .iter()
            .filter_map(|c| match c {
                SnCommand::Write(b) => Some(*b),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_preamble_silences_everything() {
        let mut packetizer = Packetizer::new(50);
        let mut out = Vec::new();
        packetizer.begin(&mut out);
        assert_eq!(data_bytes(&out), vec![0x9F, 0xBF, 0xDF, 0xFF]);
    }

    #[test]
    fn test_tone_write_encoding() {
        let mut packetizer = Packetizer::new(50);
        let mut out = Vec::new();
        let frame = SnFrame {
            tone: [Some(284), None, None],
            atten: [0, 15, 15, 15],
            ..Default::default()
        };
        packetizer.begin(&mut out);
        out.clear();
        packetizer.emit(&frame, &mut out);
        // 284 = 0x11C: latch carries nibble 0xC, data carries 0x11
        assert_eq!(data_bytes(&out), vec![0x8C, 0x11, 0x90]);
        assert_eq!(*out.last().unwrap(), SnCommand::Wait(882));
    }

    #[test]
    fn test_software_bass_flag_sets_data_bit6() {
        let mut packetizer = Packetizer::new(50);
        let mut out = Vec::new();
        let frame = SnFrame {
            tone: [None, None, Some(1023)],
            atten: [15, 15, 7, 15],
            bass_flags: [false, false, true],
            ..Default::default()
        };
        packetizer.begin(&mut out);
        out.clear();
        packetizer.emit(&frame, &mut out);
        assert_eq!(data_bytes(&out), vec![0xCF, 0x7F, 0xD7]);
    }

    #[test]
    fn test_unchanged_state_emits_only_wait() {
        let mut packetizer = Packetizer::new(50);
        let mut out = Vec::new();
        let frame = SnFrame {
            tone: [Some(100), Some(200), None],
            noise: Some(NoiseSetting {
                white: true,
                rate: NoiseRate::Div1024,
            }),
            atten: [3, 5, 15, 9],
            ..Default::default()
        };
        packetizer.begin(&mut out);
        packetizer.emit(&frame, &mut out);
        out.clear();
        for _ in 0..9 {
            packetizer.emit(&frame, &mut out);
        }
        assert_eq!(out, vec![SnCommand::Wait(882); 9]);
    }

    #[test]
    fn test_noise_latch_not_repeated() {
        // Rewriting an identical noise control still resets the LFSR on
        // hardware, so it must be suppressed
        let mut packetizer = Packetizer::new(50);
        let mut out = Vec::new();
        let frame = SnFrame {
            noise: Some(NoiseSetting {
                white: false,
                rate: NoiseRate::ToneC,
            }),
            atten: [15, 15, 15, 4],
            ..Default::default()
        };
        packetizer.begin(&mut out);
        out.clear();
        packetizer.emit(&frame, &mut out);
        assert_eq!(data_bytes(&out), vec![0xE3, 0xF4]);
        out.clear();
        packetizer.emit(&frame, &mut out);
        assert_eq!(data_bytes(&out), vec![]);
    }

    #[test]
    fn test_flag_change_reemits_period() {
        let mut packetizer = Packetizer::new(50);
        let mut out = Vec::new();
        let mut frame = SnFrame {
            tone: [None, None, Some(512)],
            atten: [15, 15, 0, 15],
            ..Default::default()
        };
        packetizer.begin(&mut out);
        packetizer.emit(&frame, &mut out);
        out.clear();
        frame.bass_flags[2] = true;
        packetizer.emit(&frame, &mut out);
        assert_eq!(data_bytes(&out).len(), 2, "same period, new flag, rewrite");
    }

    #[test]
    fn test_frame_byte_ceiling() {
        // Worst case: all three tones, noise mode and all four attenuations
        // change in one frame
        let mut packetizer = Packetizer::new(50);
        let mut out = Vec::new();
        let frame = SnFrame {
            tone: [Some(1), Some(2), Some(3)],
            noise: Some(NoiseSetting {
                white: true,
                rate: NoiseRate::Div512,
            }),
            atten: [0, 1, 2, 3],
            ..Default::default()
        };
        packetizer.emit(&frame, &mut out);
        assert_eq!(data_bytes(&out).len(), MAX_FRAME_BYTES);
    }

    #[test]
    fn test_wait_accumulator_bounds_drift() {
        // 44100 / 130 does not divide evenly; the emitted waits must track
        // the ideal timeline within one sample at every tick
        let mut packetizer = Packetizer::new(130);
        let mut out = Vec::new();
        let frame = SnFrame::default();
        let mut emitted = 0u64;
        for tick in 1..=1300u64 {
            out.clear();
            packetizer.emit(&frame, &mut out);
            for command in &out {
                if let SnCommand::Wait(n) = command {
                    emitted += *n as u64;
                }
            }
            let ideal = OUTPUT_SAMPLE_RATE * tick / 130;
            assert!(
                emitted.abs_diff(ideal) <= 1,
                "drift at tick {}: emitted {} ideal {}",
                tick,
                emitted,
                ideal
            );
        }
        assert_eq!(emitted, OUTPUT_SAMPLE_RATE * 10);
    }
}
