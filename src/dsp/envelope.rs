use crate::MIN_TIME;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Volume Envelope
===============

Every sampled voice is shaped by a DAHDSR envelope: the soundfont flavour of
the classic ADSR, with a silent DELAY before the attack and a HOLD at full
level between attack and decay.

Vocabulary
----------

  level       The envelope's current output value (0.0 to 1.0). Multiplies the
              interpolated sample value.

  stage       Which segment we're in: Idle, Delay, Attack, Hold, Decay,
              Sustain, or Release.

  ramp        Every stage except Idle and Sustain is a straight line from the
              level the stage started at to a target level, over a fixed
              number of samples.

  forced      A release with a caller-supplied (short) time. Used when a voice
  release     must go quiet quickly: bank unload, "all sound off".


The Shape
---------

  Level
    1.0 ┐       ┌──┐
        │      ╱    ╲
    S   │     ╱      ╲__________
        │    ╱                  ╲
    0.0 └───╱────────────────────╲──→ Time
         D   A   H  D    S         R

Ramps are LINEAR in amplitude. Soundfonts describe decay and release in
decibels (which would be exponential in amplitude); a linear ramp over the
same duration reaches silence at the same moment and keeps the per-sample
cost to one add.


Precomputed Ramps
-----------------

At stage entry we snapshot the start level, compute the total samples
(time × sample_rate) and the per-sample step:

    step = (target - start) / total_samples

Each sample:  level += step.  When the count runs out we snap to the exact
target, so rounding never leaves a voice hovering just above zero.

Zero-length stages are skipped at entry, so `delay = attack = hold = 0`
jumps straight to Decay within the same call.


The State Machine
-----------------

    Idle ──note_on──→ Delay → Attack → Hold → Decay → Sustain
                        │        │        │       │        │
                        └────────┴────note_off────┴────────┘
                                          ↓
                                       Release ──level=0──→ Idle

note_off enters Release from ANY stage and ramps from the CURRENT level,
which avoids clicks when a note is released mid-attack.

A sustain level at (or below) the silence floor means the sound has
nothing left to hold: the envelope goes Idle as soon as decay completes.
*/

/// Level below which a voice is considered silent.
pub const SILENCE: f32 = 1.0e-4;

/// Envelope timings in seconds, sustain as a linear level.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    pub delay: f32,
    pub attack: f32,
    pub hold: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl EnvelopeParams {
    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            delay: 0.0,
            attack,
            hold: 0.0,
            decay,
            sustain,
            release,
        }
    }

    /// Clamp to usable ranges: non-negative times, sustain within 0..=1.
    pub fn sanitized(self) -> Self {
        let time = |t: f32| if t.is_finite() { t.max(0.0) } else { 0.0 };
        Self {
            delay: time(self.delay),
            attack: time(self.attack),
            hold: time(self.hold),
            decay: time(self.decay),
            sustain: if self.sustain.is_finite() {
                self.sustain.clamp(0.0, 1.0)
            } else {
                1.0
            },
            release: time(self.release),
        }
    }
}

impl Default for EnvelopeParams {
    /// Soundfont generator defaults: instant segments, full sustain.
    fn default() -> Self {
        Self {
            delay: 0.0,
            attack: 0.001,
            hold: 0.0,
            decay: 0.001,
            sustain: 1.0,
            release: 0.001,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Delay,
    Attack,
    Hold,
    Decay,
    Sustain,
    Release,
}

pub struct Envelope {
    params: EnvelopeParams,
    sample_rate: f32,

    stage: EnvelopeStage,
    level: f32,

    // Current ramp
    target: f32,
    step: f32,
    remaining: u32,
}

impl Envelope {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            params: EnvelopeParams::default(),
            sample_rate,
            stage: EnvelopeStage::Idle,
            level: 0.0,
            target: 0.0,
            step: 0.0,
            remaining: 0,
        }
    }

    /// Gate high: restart from silence with new parameters.
    pub fn note_on(&mut self, params: EnvelopeParams) {
        self.params = params.sanitized();
        self.level = 0.0;
        self.enter(EnvelopeStage::Delay);
    }

    /// Gate low: ramp from the current level to zero over the release time.
    pub fn note_off(&mut self) {
        if matches!(self.stage, EnvelopeStage::Idle | EnvelopeStage::Release) {
            return;
        }
        self.start_release(self.params.release);
    }

    /// Release in at most `seconds`, even if already releasing more slowly.
    pub fn force_release(&mut self, seconds: f32) {
        match self.stage {
            EnvelopeStage::Idle => {}
            EnvelopeStage::Release => {
                let forced = self.samples_for(seconds);
                if forced < self.remaining {
                    self.start_release(seconds);
                }
            }
            _ => self.start_release(self.params.release.min(seconds)),
        }
    }

    /// Advance by one sample and return the new level.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => {
                self.level = 0.0;
            }
            EnvelopeStage::Sustain => {
                self.level = self.params.sustain;
            }
            _ => {
                self.level = (self.level + self.step).clamp(0.0, 1.0);
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.level = self.target;
                    let next = self.next_stage();
                    self.enter(next);
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    /// Render a block of envelope values into the buffer.
    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.stage, EnvelopeStage::Idle)
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
        self.step = 0.0;
        self.remaining = 0;
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    fn start_release(&mut self, seconds: f32) {
        self.stage = EnvelopeStage::Release;
        self.ramp_to(0.0, seconds);
        if self.remaining == 0 {
            self.reset();
        }
    }

    fn next_stage(&self) -> EnvelopeStage {
        match self.stage {
            EnvelopeStage::Delay => EnvelopeStage::Attack,
            EnvelopeStage::Attack => EnvelopeStage::Hold,
            EnvelopeStage::Hold => EnvelopeStage::Decay,
            EnvelopeStage::Decay => EnvelopeStage::Sustain,
            EnvelopeStage::Release | EnvelopeStage::Idle => EnvelopeStage::Idle,
            EnvelopeStage::Sustain => EnvelopeStage::Sustain,
        }
    }

    fn enter(&mut self, stage: EnvelopeStage) {
        let mut stage = stage;
        loop {
            self.stage = stage;
            let (target, seconds) = match stage {
                EnvelopeStage::Delay => (0.0, self.params.delay),
                EnvelopeStage::Attack => (1.0, self.params.attack),
                EnvelopeStage::Hold => (1.0, self.params.hold),
                EnvelopeStage::Decay => (self.params.sustain, self.params.decay),
                EnvelopeStage::Sustain => {
                    if self.params.sustain <= SILENCE {
                        self.reset();
                    } else {
                        self.level = self.params.sustain;
                    }
                    return;
                }
                EnvelopeStage::Idle => {
                    self.reset();
                    return;
                }
                EnvelopeStage::Release => (0.0, self.params.release),
            };

            self.ramp_to(target, seconds);
            if self.remaining > 0 {
                return;
            }

            // Zero-length segment: land on its target and move on.
            self.level = target;
            stage = self.next_stage();
        }
    }

    fn ramp_to(&mut self, target: f32, seconds: f32) {
        self.target = target;
        self.remaining = self.samples_for(seconds);
        self.step = if self.remaining == 0 {
            0.0
        } else {
            (target - self.level) / self.remaining as f32
        };
    }

    fn samples_for(&self, seconds: f32) -> u32 {
        if seconds < MIN_TIME {
            0
        } else {
            (seconds * self.sample_rate).round().max(1.0) as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn render_samples(env: &mut Envelope, samples: usize) {
        for _ in 0..samples {
            env.next_sample();
        }
    }

    #[test]
    fn attack_reaches_full_level() {
        let mut env = Envelope::new(SAMPLE_RATE);
        env.note_on(EnvelopeParams::adsr(0.01, 0.1, 0.7, 0.2));
        render_samples(&mut env, (0.01 * SAMPLE_RATE) as usize);

        assert!(env.level() > 0.99, "expected attack to reach full level");
        assert_eq!(env.stage(), EnvelopeStage::Decay);
    }

    #[test]
    fn delay_stays_silent_before_attack() {
        let mut env = Envelope::new(SAMPLE_RATE);
        env.note_on(EnvelopeParams {
            delay: 0.02,
            ..EnvelopeParams::adsr(0.01, 0.1, 0.7, 0.2)
        });
        render_samples(&mut env, 10);

        assert_eq!(env.stage(), EnvelopeStage::Delay);
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn sustain_holds_target_level() {
        let sustain = 0.6;
        let mut env = Envelope::new(SAMPLE_RATE);
        env.note_on(EnvelopeParams::adsr(0.01, 0.05, sustain, 0.2));
        render_samples(&mut env, ((0.01 + 0.05) * SAMPLE_RATE) as usize + 5);

        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert!((env.level() - sustain).abs() < 1e-6);
    }

    #[test]
    fn release_falls_back_to_idle() {
        let release = 0.03;
        let mut env = Envelope::new(SAMPLE_RATE);
        env.note_on(EnvelopeParams::adsr(0.01, 0.05, 0.5, release));
        render_samples(&mut env, 20);

        env.note_off();
        assert_eq!(env.stage(), EnvelopeStage::Release);
        render_samples(&mut env, (release * SAMPLE_RATE) as usize);

        assert_eq!(env.level(), 0.0);
        assert!(!env.is_active());
    }

    #[test]
    fn release_during_attack_starts_from_current_level() {
        let mut env = Envelope::new(SAMPLE_RATE);
        env.note_on(EnvelopeParams::adsr(0.1, 0.05, 0.5, 0.1));
        render_samples(&mut env, 50);
        let before = env.level();

        env.note_off();
        let after = env.next_sample();

        assert!(after < before && after > before * 0.9, "no jump on release");
    }

    #[test]
    fn zero_length_segments_are_skipped() {
        let mut env = Envelope::new(SAMPLE_RATE);
        env.note_on(EnvelopeParams::adsr(0.0, 0.0, 0.8, 0.0));

        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert_eq!(env.next_sample(), 0.8);

        env.note_off();
        assert!(!env.is_active());
    }

    #[test]
    fn silent_sustain_ends_after_decay() {
        let mut env = Envelope::new(SAMPLE_RATE);
        env.note_on(EnvelopeParams::adsr(0.005, 0.02, 0.0, 1.0));
        render_samples(&mut env, 25);

        assert!(!env.is_active());
    }

    #[test]
    fn forced_release_shortens_a_slow_release() {
        let mut env = Envelope::new(SAMPLE_RATE);
        env.note_on(EnvelopeParams::adsr(0.0, 0.0, 1.0, 5.0));
        env.note_off();
        render_samples(&mut env, 10);
        assert!(env.is_active());

        env.force_release(0.005);
        render_samples(&mut env, 5);

        assert!(!env.is_active());
    }
}
