//! Host-facing macro parameters and their mapping curves.
//!
//! The chain is driven by two musical macros plus two utility controls:
//!
//! | Parameter | Range | Drives |
//! |-------------|------------------|----------------------------------|
//! | control | 0–100 | Stage-A attack, release, threshold |
//! | compression | 0–100 | Input trim, Stage-A ratio |
//! | low cut | 20–1000 Hz | High-pass cutoff |
//! | output gain | −18..+12 dB | Final makeup gain |
//!
//! Each scalar sits behind a 2 ms [`SmoothedParam`] advanced once per
//! block, so host automation never steps audibly. The macro-to-parameter
//! curves live here as free functions; they are part of the product's
//! sound and are reproduced exactly:
//!
//! - input trim dB: linear, compression 0–100 → −3..+12
//! - attack ms: log, control 0–100 → 60..1 (fast control = fast attack)
//! - release ms: linear, control 0–100 → 55..100
//! - threshold dB: linear, control 0–100 → −12..−24
//! - ratio: linear, compression 0–100 → 2..10
//!
//! Macro inputs are clamped to 1..100 before mapping, so the "zero"
//! position lands on the curves' 1% point rather than their exact edge.

use libm::powf;

use tandem_core::{SmoothedParam, db_to_linear, lerp};

/// Macro smoothing ramp in seconds.
const SMOOTHING_SECONDS: f32 = 0.002;

/// Output gain range, dB.
pub const OUTPUT_GAIN_MIN_DB: f32 = -18.0;
/// Output gain range, dB.
pub const OUTPUT_GAIN_MAX_DB: f32 = 12.0;
/// Low-cut cutoff range, Hz.
pub const LOW_CUT_MIN_HZ: f32 = 20.0;
/// Low-cut cutoff range, Hz.
pub const LOW_CUT_MAX_HZ: f32 = 1000.0;
/// Macro range shared by control and compression.
pub const MACRO_MAX: f32 = 100.0;

/// Smoothed host parameters for the chain.
///
/// Setters store new targets (single writer — the thread driving the
/// chain); [`smoothen`](Self::smoothen) advances every smoother one step
/// and publishes the values for the current block in the public fields,
/// mirroring how the processing code consumes them.
#[derive(Debug, Clone)]
pub struct MacroParams {
    output_gain_smoother: SmoothedParam,
    low_cut_smoother: SmoothedParam,
    control_smoother: SmoothedParam,
    compression_smoother: SmoothedParam,

    /// Smoothed output gain for the current block (linear).
    pub output_gain: f32,
    /// Smoothed low-cut cutoff for the current block (Hz).
    pub low_cut: f32,
    /// Smoothed control macro for the current block (0–100).
    pub control: f32,
    /// Smoothed compression macro for the current block (0–100).
    pub compression: f32,
    /// True when the chain is bypassed.
    pub bypassed: bool,
}

impl MacroParams {
    /// Create with host defaults: 0 dB out, 20 Hz low cut, macros at 0.
    pub fn new() -> Self {
        Self {
            output_gain_smoother: SmoothedParam::new(1.0),
            low_cut_smoother: SmoothedParam::new(LOW_CUT_MIN_HZ),
            control_smoother: SmoothedParam::new(0.0),
            compression_smoother: SmoothedParam::new(0.0),
            output_gain: 1.0,
            low_cut: LOW_CUT_MIN_HZ,
            control: 0.0,
            compression: 0.0,
            bypassed: false,
        }
    }

    /// Configure all smoothers for `sample_rate`.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.output_gain_smoother.configure(sample_rate, SMOOTHING_SECONDS);
        self.low_cut_smoother.configure(sample_rate, SMOOTHING_SECONDS);
        self.control_smoother.configure(sample_rate, SMOOTHING_SECONDS);
        self.compression_smoother.configure(sample_rate, SMOOTHING_SECONDS);
    }

    /// Snap every smoother to its target and refresh the published
    /// values. Used at prepare time so playback starts without a ramp.
    pub fn reset(&mut self) {
        self.output_gain_smoother.set_immediate(self.output_gain_smoother.target());
        self.low_cut_smoother.set_immediate(self.low_cut_smoother.target());
        self.control_smoother.set_immediate(self.control_smoother.target());
        self.compression_smoother.set_immediate(self.compression_smoother.target());

        self.output_gain = self.output_gain_smoother.get();
        self.low_cut = self.low_cut_smoother.get();
        self.control = self.control_smoother.get();
        self.compression = self.compression_smoother.get();
    }

    /// Set the output gain target in dB (clamped to −18..+12).
    ///
    /// Smoothing happens in the linear domain — the value multiplied into
    /// the signal ramps linearly, not its dB representation.
    pub fn set_output_gain_db(&mut self, db: f32) {
        let clamped = db.clamp(OUTPUT_GAIN_MIN_DB, OUTPUT_GAIN_MAX_DB);
        self.output_gain_smoother.set_target(db_to_linear(clamped));
    }

    /// Set the low-cut cutoff target in Hz (clamped to 20..1000).
    pub fn set_low_cut_hz(&mut self, hz: f32) {
        self.low_cut_smoother.set_target(hz.clamp(LOW_CUT_MIN_HZ, LOW_CUT_MAX_HZ));
    }

    /// Set the control macro target (clamped to 0..100).
    pub fn set_control(&mut self, value: f32) {
        self.control_smoother.set_target(value.clamp(0.0, MACRO_MAX));
    }

    /// Set the compression macro target (clamped to 0..100).
    pub fn set_compression(&mut self, value: f32) {
        self.compression_smoother.set_target(value.clamp(0.0, MACRO_MAX));
    }

    /// Set the bypass flag.
    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }

    /// Advance every smoother by one step and publish the results.
    /// Called once per processed block.
    pub fn smoothen(&mut self) {
        self.output_gain = self.output_gain_smoother.next();
        self.low_cut = self.low_cut_smoother.next();
        self.control = self.control_smoother.next();
        self.compression = self.compression_smoother.next();
    }
}

impl Default for MacroParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamp a macro value to the 1..100 working range used by the curves.
#[inline]
fn clamp_macro(value: f32) -> f32 {
    value.clamp(1.0, MACRO_MAX)
}

/// Input trim in dB from the compression macro: −3 dB at the bottom of
/// the range up to +12 dB of drive into Stage A.
#[inline]
pub fn map_input_trim_db(compression: f32) -> f32 {
    lerp(-3.0, 12.0, clamp_macro(compression) / MACRO_MAX)
}

/// Stage-A attack in ms from the control macro: log-mapped 60 ms down to
/// 1 ms, so the knob's useful fast-attack region is not crammed into its
/// last few degrees.
#[inline]
pub fn map_attack_ms(control: f32) -> f32 {
    let norm = clamp_macro(control) / MACRO_MAX;
    // 60 · (1/60)^norm: 60 ms at norm 0 down to 1 ms at norm 1
    60.0 * powf(1.0 / 60.0, norm)
}

/// Stage-A release in ms from the control macro: 55..100 ms linear.
#[inline]
pub fn map_release_ms(control: f32) -> f32 {
    lerp(55.0, 100.0, clamp_macro(control) / MACRO_MAX)
}

/// Stage-A threshold in dB from the control macro: −12..−24 linear —
/// more control digs deeper.
#[inline]
pub fn map_threshold_db(control: f32) -> f32 {
    lerp(-12.0, -24.0, clamp_macro(control) / MACRO_MAX)
}

/// Stage-A ratio from the compression macro: 2:1 up to 10:1 linear.
#[inline]
pub fn map_ratio(compression: f32) -> f32 {
    lerp(2.0, 10.0, clamp_macro(compression) / MACRO_MAX)
}
