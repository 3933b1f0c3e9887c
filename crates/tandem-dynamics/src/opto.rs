//! Stage B — opto-style compressor with fixed character.
//!
//! Models the program-dependent squash of an optical attenuator: a
//! block-rate envelope follower in the dB domain with asymmetric
//! attack/release ballistics drives a linear ratio law, and the resulting
//! gain is smoothed through a deliberately slow (100 ms) ramp before it
//! touches the audio. The slow gain ramp — much slower than the envelope
//! itself — is what gives the stage its "opto" lag.
//!
//! # Signal Flow
//!
//! ```text
//! Input block → block RMS (dB) → envelope follower (attack/release α)
//!            → ratio law above threshold → linear gain → 100 ms smoother
//!            → block × gain → Output
//! ```
//!
//! The character parameters (attack 15 ms, release 120 ms, ratio 5:1,
//! threshold −18 dB) are constants, not automation targets: the stage is
//! a fixed-character glue compressor behind the automatable Stage A, the
//! way hardware channel strips pair a tweakable VCA with a fixed opto
//! cell.

use libm::{expf, sqrtf};

use tandem_core::{DB_FLOOR, SmoothedParam, db_to_linear, linear_to_db};

/// Fixed attack time of the envelope follower, in milliseconds.
pub const FIXED_ATTACK_MS: f32 = 15.0;
/// Fixed release time of the envelope follower, in milliseconds.
pub const FIXED_RELEASE_MS: f32 = 120.0;
/// Fixed compression ratio.
pub const FIXED_RATIO: f32 = 5.0;
/// Fixed threshold in dB.
pub const FIXED_THRESHOLD_DB: f32 = -18.0;

/// Gain smoothing ramp in seconds — intentionally slower than the
/// envelope ballistics to suppress block-rate gain stepping.
const GAIN_SMOOTHING_SECONDS: f32 = 0.1;

/// Opto-style compressor unit (Stage B of the chain).
///
/// Lifecycle: construct, [`prepare`](Self::prepare), then
/// [`process`](Self::process) once per block. [`reset`](Self::reset)
/// refloors the envelope and gain without recomputing coefficients.
///
/// # Example
///
/// ```rust
/// use tandem_dynamics::OptoCompressor;
///
/// let mut opto = OptoCompressor::new();
/// opto.prepare(48000.0);
///
/// let mut block = [0.25f32; 128];
/// opto.process(&mut block);
/// ```
#[derive(Debug, Clone)]
pub struct OptoCompressor {
    /// Envelope level in dB, floored at [`DB_FLOOR`]
    envelope_db: f32,
    /// Per-block alpha applied while the level rises
    attack_coeff: f32,
    /// Per-block alpha applied while the level falls
    release_coeff: f32,
    smoothed_gain: SmoothedParam,
    /// Last gain reduction computed from the ratio law, in dB (positive)
    last_gain_reduction_db: f32,
}

impl OptoCompressor {
    /// Create an unprepared unit: envelope at the floor, unity gain.
    pub fn new() -> Self {
        Self {
            envelope_db: DB_FLOOR,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            smoothed_gain: SmoothedParam::new(1.0),
            last_gain_reduction_db: 0.0,
        }
    }

    /// Derive ballistics coefficients for `sample_rate` and reset state.
    ///
    /// Uses the alpha-toward-target one-pole form
    /// `α = 1 − exp(−1 / (sr · t))`, so each update moves the envelope a
    /// fraction α of the remaining distance to the measured level.
    pub fn prepare(&mut self, sample_rate: f32) {
        debug_assert!(sample_rate > 0.0, "sample rate must be positive");
        if sample_rate <= 0.0 {
            return;
        }
        self.attack_coeff = 1.0 - expf(-1.0 / (sample_rate * FIXED_ATTACK_MS / 1000.0));
        self.release_coeff = 1.0 - expf(-1.0 / (sample_rate * FIXED_RELEASE_MS / 1000.0));

        self.envelope_db = DB_FLOOR;
        self.smoothed_gain.configure(sample_rate, GAIN_SMOOTHING_SECONDS);
        self.smoothed_gain.set_immediate(1.0);
        self.last_gain_reduction_db = 0.0;
    }

    /// Refloor the envelope and snap the gain to unity. Coefficients from
    /// the last [`prepare`](Self::prepare) are kept.
    pub fn reset(&mut self) {
        self.envelope_db = DB_FLOOR;
        self.smoothed_gain.set_immediate(1.0);
        self.last_gain_reduction_db = 0.0;
    }

    /// Compress one interleaved block in place.
    ///
    /// Level detection is one scalar per block: the RMS of the whole
    /// block across all channels, in dB. The envelope then takes a single
    /// asymmetric one-pole step toward it, the ratio law computes the
    /// reduction, and one step of the smoothed gain is applied to every
    /// sample — both channels always receive identical gain, so the
    /// stereo image cannot shift.
    pub fn process(&mut self, buffer: &mut [f32]) {
        if buffer.is_empty() {
            return;
        }

        let input_level_db = Self::block_rms_db(buffer);

        // Asymmetric one-pole: fast up, slow down
        let alpha = if input_level_db > self.envelope_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope_db += (input_level_db - self.envelope_db) * alpha;
        self.envelope_db = self.envelope_db.max(DB_FLOOR);

        let gain_reduction_db = gain_reduction_for(self.envelope_db);
        self.last_gain_reduction_db = gain_reduction_db;

        self.smoothed_gain.set_target(db_to_linear(-gain_reduction_db));
        let gain = self.smoothed_gain.next();

        for sample in buffer.iter_mut() {
            *sample *= gain;
        }
    }

    /// Current envelope level in dB.
    pub fn envelope_db(&self) -> f32 {
        self.envelope_db
    }

    /// Last computed gain reduction in dB (positive = reducing, 0 = idle).
    pub fn gain_reduction_db(&self) -> f32 {
        self.last_gain_reduction_db
    }

    /// RMS of the whole block across all channels, in dB with the −100 dB
    /// floor. Empty blocks are handled by the caller.
    fn block_rms_db(buffer: &[f32]) -> f32 {
        let sum_squares: f32 = buffer.iter().map(|s| s * s).sum();
        let rms = sqrtf(sum_squares / buffer.len() as f32);
        linear_to_db(rms)
    }
}

impl Default for OptoCompressor {
    fn default() -> Self {
        Self::new()
    }
}

/// The stage's linear ratio law: gain reduction in dB (positive) for an
/// envelope level in dB. Zero at or below [`FIXED_THRESHOLD_DB`].
#[inline]
pub fn gain_reduction_for(envelope_db: f32) -> f32 {
    let overshoot_db = envelope_db - FIXED_THRESHOLD_DB;
    if overshoot_db > 0.0 {
        overshoot_db * (1.0 - 1.0 / FIXED_RATIO)
    } else {
        0.0
    }
}
