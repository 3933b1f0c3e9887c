//! State Variable Filter used as the chain's low-cut.
//!
//! Implements the Topology-Preserving Transform (TPT) SVF after Zavalishin,
//! "The Art of VA Filter Design" (2012). The TPT discretization preserves
//! the analog prototype's response and stays stable when the cutoff moves,
//! which matters here because the low-cut frequency is host-automatable.
//!
//! The filter carries independent integrator state per channel (up to
//! stereo) while sharing one set of coefficients, so a cutoff change is a
//! single recomputation regardless of channel count. Coefficients are only
//! recomputed when a parameter actually changes — the chain caches the
//! last-applied cutoff and skips redundant updates.
//!
//! # Reference
//!
//! Zavalishin, "The Art of VA Filter Design", rev. 2.1.2 (2018), Chapter 3.

use core::f32::consts::PI;
use libm::tanf;

use crate::math::flush_denormal;

/// Maximum number of channels the filter keeps state for.
pub const MAX_CHANNELS: usize = 2;

/// State Variable Filter output selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SvfOutput {
    /// Low-pass output — passes frequencies below the cutoff.
    Lowpass,
    /// High-pass output — passes frequencies above the cutoff.
    #[default]
    Highpass,
    /// Band-pass output — passes frequencies near the cutoff.
    Bandpass,
    /// Notch (band-reject) output — rejects frequencies near the cutoff.
    Notch,
}

/// Multichannel TPT State Variable Filter (2-pole, 12 dB/oct).
///
/// ## Parameters
///
/// - `cutoff`: Hz, clamped to 20.0..=sr×0.49 (default 20.0)
/// - `resonance`: Q factor, clamped to 0.5..=20.0 (default 0.707)
/// - `output_type`: which response to output (default `Highpass`)
///
/// # Example
///
/// ```rust
/// use tandem_core::{StateVariableFilter, SvfOutput};
///
/// let mut lowcut = StateVariableFilter::new(48000.0);
/// lowcut.set_cutoff(80.0);
///
/// let left = lowcut.process(0, 0.5);
/// let right = lowcut.process(1, 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    // Integrator state, one pair per channel
    ic1eq: [f32; MAX_CHANNELS],
    ic2eq: [f32; MAX_CHANNELS],

    // Coefficients, shared across channels
    g: f32,
    k: f32,

    sample_rate: f32,
    cutoff: f32,
    resonance: f32,
    output_type: SvfOutput,
}

impl Default for StateVariableFilter {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl StateVariableFilter {
    /// Create an SVF with cutoff 20 Hz, Q 0.707 (Butterworth), highpass
    /// output.
    pub fn new(sample_rate: f32) -> Self {
        let mut svf = Self {
            ic1eq: [0.0; MAX_CHANNELS],
            ic2eq: [0.0; MAX_CHANNELS],
            g: 0.0,
            k: 0.0,
            sample_rate,
            cutoff: 20.0,
            resonance: 0.707,
            output_type: SvfOutput::Highpass,
        };
        svf.update_coefficients();
        svf
    }

    /// Set cutoff frequency in Hz, clamped to 20.0..=`sample_rate × 0.49`.
    pub fn set_cutoff(&mut self, freq: f32) {
        self.cutoff = freq.clamp(20.0, self.sample_rate * 0.49);
        self.update_coefficients();
    }

    /// Current cutoff frequency in Hz.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Set resonance (Q), clamped to 0.5..=20.0. Q = 0.707 is maximally
    /// flat.
    pub fn set_resonance(&mut self, q: f32) {
        self.resonance = q.clamp(0.5, 20.0);
        self.update_coefficients();
    }

    /// Current resonance (Q factor).
    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    /// Select the output response.
    pub fn set_output_type(&mut self, output_type: SvfOutput) {
        self.output_type = output_type;
    }

    /// Current output response.
    pub fn output_type(&self) -> SvfOutput {
        self.output_type
    }

    /// Update the sample rate and recompute coefficients.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        // Re-clamp: the cutoff ceiling depends on the rate
        self.cutoff = self.cutoff.clamp(20.0, sample_rate * 0.49);
        self.update_coefficients();
    }

    /// Process one sample on `channel` and return the selected output.
    #[inline]
    pub fn process(&mut self, channel: usize, input: f32) -> f32 {
        debug_assert!(channel < MAX_CHANNELS);
        let ch = channel % MAX_CHANNELS;

        let v3 = input - self.ic2eq[ch];
        let v1 = (self.g * v3 + self.ic1eq[ch]) / (1.0 + self.g * (self.g + self.k));
        let v2 = self.ic2eq[ch] + self.g * v1;

        self.ic1eq[ch] = flush_denormal(2.0 * v1 - self.ic1eq[ch]);
        self.ic2eq[ch] = flush_denormal(2.0 * v2 - self.ic2eq[ch]);

        let lp = v2;
        let bp = v1;
        let hp = input - self.k * v1 - v2;

        match self.output_type {
            SvfOutput::Lowpass => lp,
            SvfOutput::Highpass => hp,
            SvfOutput::Bandpass => bp,
            SvfOutput::Notch => lp + hp,
        }
    }

    /// Clear integrator state on all channels. Coefficients are untouched.
    pub fn reset(&mut self) {
        self.ic1eq = [0.0; MAX_CHANNELS];
        self.ic2eq = [0.0; MAX_CHANNELS];
    }

    fn update_coefficients(&mut self) {
        self.g = tanf(PI * self.cutoff / self.sample_rate);
        self.k = 1.0 / self.resonance;
    }
}
