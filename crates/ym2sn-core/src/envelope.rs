//! YM2149 envelope generator
//!
//! The hardware envelope is a 5-bit counter stepped at
//! `master_clock / (256 * period)` Hz. Each 32-step ramp is one segment of a
//! shape; crossing the top of a segment picks the next one from the
//! CONT/ATT/ALT/HOLD bits of R13:
//!
//! ```text
//! CONT ATT ALT HOLD
//!  0    0   x   x   \___      0    1   x   x   /___
//!  1    0   0   0   \\\\      1    1   0   0   ////
//!  1    0   0   1   \___      1    1   0   1   /‾‾‾
//!  1    0   1   0   \/\/      1    1   1   0   /\/\
//!  1    0   1   1   \‾‾‾      1    1   1   1   /___
//! ```
//!
//! The generator here is sampled, not clocked: each output tick advances the
//! counter by however many envelope steps elapsed, computed by integer
//! division. Long periods therefore cost the same as short ones, where a
//! per-tick loop would be orders of magnitude slower than the frame loop for
//! slow fades.

const SHAPE_CONT: u8 = 1 << 3;
const SHAPE_ATT: u8 = 1 << 2;
const SHAPE_ALT: u8 = 1 << 1;
const SHAPE_HOLD: u8 = 1 << 0;

/// Steps in one ramp segment (the counter is 5-bit)
const SEGMENT_STEPS: u64 = 32;

/// Current ramp segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    /// Counting 0 → 31
    Rising,
    /// Counting 31 → 0
    Falling,
    /// Finished, output pinned at 0
    HoldLo,
    /// Finished, output pinned at 31
    HoldHi,
}

/// YM2149 hardware envelope generator, sampled at the output rate
#[derive(Debug, Clone)]
pub struct EnvelopeGen {
    shape: u8,
    period: u16,
    counter: u8,
    segment: Segment,
    /// Clock cycles carried between samples, scaled by the sample rate so
    /// the bookkeeping stays exact (units: cycles × sample_rate)
    cycle_acc: u64,
}

impl EnvelopeGen {
    /// Create a generator holding shape 0 at its start position
    pub fn new() -> Self {
        EnvelopeGen {
            shape: 0,
            period: 1,
            counter: 0,
            segment: Segment::Falling,
            cycle_acc: 0,
        }
    }

    /// Set the 16-bit envelope period (R12:R11)
    ///
    /// Period 0 is degenerate on the hardware and advances at the same rate
    /// as period 1; the substitution happens at step time so the raw value
    /// stays observable.
    pub fn set_period(&mut self, period: u16) {
        self.period = period;
    }

    /// Write the shape register (R13), retriggering the envelope
    ///
    /// Resets the counter, the segment and the envelope prescaler. Invalid
    /// high bits are masked off; every 4-bit value is a valid shape.
    pub fn set_shape(&mut self, shape: u8) {
        self.shape = shape & 0x0F;
        self.counter = 0;
        self.cycle_acc = 0;
        self.segment = if self.shape & SHAPE_ATT != 0 {
            Segment::Rising
        } else {
            Segment::Falling
        };
    }

    /// Advance by one output tick of `clock_hz / sample_rate_hz` seconds
    ///
    /// `sample_rate_hz` is the output tick rate (frame rate × subdivision).
    /// The elapsed envelope steps are computed analytically, so a tick is
    /// O(1) regardless of how many steps it spans.
    pub fn advance(&mut self, clock_hz: u32, sample_rate_hz: u32) {
        self.cycle_acc += clock_hz as u64;
        let threshold = 256 * self.period.max(1) as u64 * sample_rate_hz as u64;
        let steps = self.cycle_acc / threshold;
        self.cycle_acc %= threshold;
        self.step_by(steps);
    }

    /// Current 5-bit envelope level (0-31)
    pub fn level5(&self) -> u8 {
        match self.segment {
            Segment::Rising => self.counter,
            Segment::Falling => 31 - self.counter,
            Segment::HoldLo => 0,
            Segment::HoldHi => 31,
        }
    }

    /// Current level in the 4-bit SN volume domain
    pub fn level4(&self) -> u8 {
        self.level5() >> 1
    }

    fn step_by(&mut self, steps: u64) {
        match self.segment {
            Segment::HoldLo | Segment::HoldHi => return,
            Segment::Rising | Segment::Falling => {}
        }

        let remain = (31 - self.counter) as u64;
        if steps <= remain {
            self.counter += steps as u8;
            return;
        }
        // Consume the rest of this segment plus the step that crosses out of it
        let steps = steps - remain - 1;
        self.counter = 0;

        if self.shape & SHAPE_CONT == 0 {
            // One-shot preset shapes decay to silence after the first ramp
            self.segment = Segment::HoldLo;
            return;
        }

        let alt = self.shape & SHAPE_ALT != 0;
        if self.shape & SHAPE_HOLD != 0 {
            // ALT inverts the level the envelope parks at
            let ended_high = self.segment == Segment::Rising;
            self.segment = if ended_high != alt {
                Segment::HoldHi
            } else {
                Segment::HoldLo
            };
            return;
        }

        // Looping shape: whole segments are skipped by division, with the
        // direction flipping once per segment when ALT is set
        let mut next = match (self.segment, alt) {
            (Segment::Rising, true) => Segment::Falling,
            (Segment::Falling, true) => Segment::Rising,
            (seg, false) => seg,
            _ => unreachable!(),
        };
        let full_segments = steps / SEGMENT_STEPS;
        if alt && full_segments % 2 == 1 {
            next = match next {
                Segment::Rising => Segment::Falling,
                Segment::Falling => Segment::Rising,
                other => other,
            };
        }
        self.segment = next;
        self.counter = (steps % SEGMENT_STEPS) as u8;
    }
}

impl Default for EnvelopeGen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Step the generator one envelope step at a time by using a clock and
    /// sample rate with a 1:1 step-per-tick ratio
    fn tick_one_step(env: &mut EnvelopeGen) {
        // period 1 → one step per 256 cycles; 256 Hz clock at 1 Hz sampling
        env.advance(256, 1);
    }

    #[test]
    fn test_shape_start_levels() {
        let mut env = EnvelopeGen::new();
        env.set_shape(0x00);
        assert_eq!(env.level5(), 31, "decay shapes start at full level");

        env.set_shape(0x0C);
        assert_eq!(env.level5(), 0, "attack shapes start silent");
    }

    #[test]
    fn test_one_shot_decay_holds_low() {
        let mut env = EnvelopeGen::new();
        env.set_period(1);
        env.set_shape(0x00);
        for _ in 0..40 {
            tick_one_step(&mut env);
        }
        assert_eq!(env.level5(), 0);
        // stays parked
        for _ in 0..100 {
            tick_one_step(&mut env);
        }
        assert_eq!(env.level5(), 0);
    }

    #[test]
    fn test_attack_hold_high() {
        let mut env = EnvelopeGen::new();
        env.set_period(1);
        env.set_shape(0x0D); // /‾‾‾
        for _ in 0..31 {
            tick_one_step(&mut env);
        }
        assert_eq!(env.level5(), 31);
        tick_one_step(&mut env);
        assert_eq!(env.level5(), 31, "holds at the top after the ramp");
    }

    #[test]
    fn test_decay_alternate_hold_parks_high() {
        let mut env = EnvelopeGen::new();
        env.set_period(1);
        env.set_shape(0x0B); // \‾‾‾
        for _ in 0..64 {
            tick_one_step(&mut env);
        }
        assert_eq!(env.level5(), 31);
    }

    #[test]
    fn test_sawtooth_up_wraps() {
        let mut env = EnvelopeGen::new();
        env.set_period(1);
        env.set_shape(0x0C); // ////
        let mut levels = Vec::new();
        for _ in 0..70 {
            levels.push(env.level5());
            tick_one_step(&mut env);
        }
        assert_eq!(levels[0], 0);
        assert_eq!(levels[31], 31);
        assert_eq!(levels[32], 0, "sawtooth restarts after the ramp");
        assert_eq!(levels[63], 31);
        assert_eq!(levels[64], 0);
    }

    #[test]
    fn test_triangle_alternates() {
        let mut env = EnvelopeGen::new();
        env.set_period(1);
        env.set_shape(0x0E); // /\/\
        for _ in 0..32 {
            tick_one_step(&mut env);
        }
        // second segment counts back down
        assert_eq!(env.level5(), 31);
        for _ in 0..31 {
            tick_one_step(&mut env);
        }
        assert_eq!(env.level5(), 0);
        tick_one_step(&mut env);
        assert_eq!(env.level5(), 0, "third segment rises from 0 again");
        tick_one_step(&mut env);
        assert_eq!(env.level5(), 1);
    }

    #[test]
    fn test_analytic_skip_matches_single_steps() {
        // Advance two generators across the same span: one in a single
        // coarse tick, one step by step
        let mut coarse = EnvelopeGen::new();
        let mut fine = EnvelopeGen::new();
        for shape in 0..16u8 {
            coarse.set_period(3);
            coarse.set_shape(shape);
            fine.set_period(3);
            fine.set_shape(shape);

            // 2_000_000 cycles at period 3 → 2604 steps and change
            coarse.advance(2_000_000, 1);
            for _ in 0..2_000_000 / 256 {
                fine.advance(256, 1);
            }
            assert_eq!(
                coarse.level5(),
                fine.level5(),
                "shape {:#x} diverged between coarse and fine stepping",
                shape
            );
        }
    }

    #[test]
    fn test_period_zero_behaves_as_one() {
        let mut a = EnvelopeGen::new();
        let mut b = EnvelopeGen::new();
        a.set_period(0);
        a.set_shape(0x0C);
        b.set_period(1);
        b.set_shape(0x0C);
        for _ in 0..10 {
            a.advance(2_000_000, 50);
            b.advance(2_000_000, 50);
        }
        assert_eq!(a.level5(), b.level5());
    }

    #[test]
    fn test_retrigger_resets_position() {
        let mut env = EnvelopeGen::new();
        env.set_period(1);
        env.set_shape(0x0C);
        for _ in 0..20 {
            tick_one_step(&mut env);
        }
        assert_eq!(env.level5(), 20);
        env.set_shape(0x0C);
        assert_eq!(env.level5(), 0, "shape write restarts the ramp");
    }

    #[test]
    fn test_slow_rise_is_monotone_at_frame_rate() {
        // Continuous rising sawtooth with a long period, sampled at 50 Hz:
        // levels must form a non-decreasing ramp until the counter wraps
        let mut env = EnvelopeGen::new();
        env.set_period(0x0800);
        env.set_shape(0x0C);

        let mut previous = 0u8;
        for frame in 0..64 {
            env.advance(2_000_000, 50);
            let level = env.level5();
            assert!(
                level >= previous,
                "level decreased from {} to {} at frame {} before wrap",
                previous,
                level,
                frame
            );
            previous = level;
        }
        // 2e6 / (256 * 0x800) ≈ 3.8 steps/s → about 4.9 steps in 64 frames
        assert!(env.level5() >= 4 && env.level5() <= 5);
    }
}
