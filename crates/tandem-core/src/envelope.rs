//! Peak envelope follower for the compressor detector.
//!
//! Tracks the rectified amplitude of a signal with separate attack and
//! release time constants: the envelope chases rising input quickly
//! (attack) and falls back slowly (release), which is what makes gain
//! reduction engage on transients and recover without pumping.

use libm::expf;

use crate::math::flush_denormal;

/// Asymmetric one-pole peak detector.
///
/// # Example
///
/// ```rust
/// use tandem_core::EnvelopeFollower;
///
/// let mut env = EnvelopeFollower::new(48000.0);
/// env.set_attack_ms(50.0);
/// env.set_release_ms(55.0);
///
/// let level = env.process(0.5);
/// assert!(level > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    /// Current envelope level (linear, non-negative)
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
    sample_rate: f32,
    /// Attack time in ms, kept for coefficient recalculation
    attack_ms: f32,
    /// Release time in ms, kept for coefficient recalculation
    release_ms: f32,
}

impl EnvelopeFollower {
    /// Create a follower with 10 ms attack / 100 ms release defaults.
    pub fn new(sample_rate: f32) -> Self {
        let mut follower = Self {
            envelope: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            sample_rate,
            attack_ms: 10.0,
            release_ms: 100.0,
        };
        follower.recalculate_coefficients();
        follower
    }

    /// Set the attack time in milliseconds (floored at 0.01 ms).
    pub fn set_attack_ms(&mut self, attack_ms: f32) {
        self.attack_ms = attack_ms.max(0.01);
        self.recalculate_coefficients();
    }

    /// Current attack time in milliseconds.
    pub fn attack_ms(&self) -> f32 {
        self.attack_ms
    }

    /// Set the release time in milliseconds (floored at 1 ms).
    pub fn set_release_ms(&mut self, release_ms: f32) {
        self.release_ms = release_ms.max(1.0);
        self.recalculate_coefficients();
    }

    /// Current release time in milliseconds.
    pub fn release_ms(&self) -> f32 {
        self.release_ms
    }

    /// Update the sample rate and recompute both coefficients.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coefficients();
    }

    /// Advance the envelope by one sample of input and return its level.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let rectified = input.abs();

        let coeff = if rectified > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };

        // One-pole toward the rectified input:
        //   y[n] = coeff * y[n-1] + (1 - coeff) * |x[n]|
        self.envelope = flush_denormal(coeff * self.envelope + (1.0 - coeff) * rectified);
        self.envelope
    }

    /// Current envelope level without consuming input.
    pub fn level(&self) -> f32 {
        self.envelope
    }

    /// Clear the envelope state. Time constants are untouched.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }

    fn recalculate_coefficients(&mut self) {
        // coeff = exp(-1 / (time_ms · sr / 1000)); the per-sample pole of a
        // one-pole lowpass with the given time constant.
        self.attack_coeff = expf(-1.0 / (self.attack_ms * self.sample_rate / 1000.0));
        self.release_coeff = expf(-1.0 / (self.release_ms * self.sample_rate / 1000.0));
    }
}
