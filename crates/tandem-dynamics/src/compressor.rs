//! Stage A — feed-forward VCA-style compressor.
//!
//! An explicit detector + gain-computer pipeline: a per-channel peak
//! [`EnvelopeFollower`] tracks the signal, a hard-knee gain computer turns
//! the envelope's overshoot above threshold into a gain-reduction amount,
//! and the resulting linear gain is applied sample by sample.
//!
//! # Signal Flow
//!
//! ```text
//! Input → Envelope Follower → Gain Computer → Gain Reduction → Output
//! ```
//!
//! All four control parameters run through [`SmoothedParam`]s with a very
//! short ramp (0.2 ms). The smoothers advance **once per processed
//! block**, not per sample: the reaction time is so short that a ramp
//! completes across a handful of blocks, which is enough to de-zipper
//! automation while keeping the per-sample loop free of parameter work.

use tandem_core::{EnvelopeFollower, SmoothedParam, fast_db_to_linear, fast_linear_to_db};

/// Channels of detector state the unit carries.
pub const MAX_CHANNELS: usize = 2;

/// Parameter smoothing ramp, in seconds. Short enough that a full ramp
/// spans well under a typical block at any common sample rate.
const SMOOTHING_SECONDS: f32 = 0.0002;

/// Default attack in milliseconds.
pub const DEFAULT_ATTACK_MS: f32 = 50.0;
/// Default release in milliseconds.
pub const DEFAULT_RELEASE_MS: f32 = 55.0;
/// Default compression ratio.
pub const DEFAULT_RATIO: f32 = 2.0;
/// Default threshold in dB.
pub const DEFAULT_THRESHOLD_DB: f32 = -12.0;

/// Hard-knee gain computer.
///
/// Maps detector level (dB) to a gain-reduction amount (dB, positive):
/// zero below threshold, `overshoot × (1 − 1/ratio)` above it.
#[derive(Debug, Clone)]
struct GainComputer {
    threshold_db: f32,
    ratio: f32,
}

impl GainComputer {
    fn new() -> Self {
        Self {
            threshold_db: DEFAULT_THRESHOLD_DB,
            ratio: DEFAULT_RATIO,
        }
    }

    #[inline]
    fn gain_reduction_db(&self, level_db: f32) -> f32 {
        let overshoot = level_db - self.threshold_db;
        if overshoot > 0.0 {
            overshoot * (1.0 - 1.0 / self.ratio)
        } else {
            0.0
        }
    }
}

/// Feed-forward compressor unit (Stage A of the chain).
///
/// Lifecycle: construct, [`prepare`](Self::prepare), then call
/// [`process`](Self::process) once per audio block. [`reset`](Self::reset)
/// clears detector state without touching parameter targets.
///
/// # Example
///
/// ```rust
/// use tandem_dynamics::VcaCompressor;
///
/// let mut comp = VcaCompressor::new();
/// comp.prepare(48000.0, 512, 2);
/// comp.update_settings(10.0, 80.0, 4.0, -20.0);
///
/// let mut block = [0.5f32; 128]; // 64 interleaved stereo frames
/// comp.process(&mut block);
/// ```
#[derive(Debug, Clone)]
pub struct VcaCompressor {
    attack_ms: SmoothedParam,
    release_ms: SmoothedParam,
    ratio: SmoothedParam,
    threshold_db: SmoothedParam,
    computer: GainComputer,
    detectors: [EnvelopeFollower; MAX_CHANNELS],
    channels: usize,
    /// Last gain reduction computed, in dB (positive = reducing).
    last_gain_reduction_db: f32,
}

impl VcaCompressor {
    /// Create an unprepared unit holding the default parameter set.
    pub fn new() -> Self {
        Self {
            attack_ms: SmoothedParam::new(DEFAULT_ATTACK_MS),
            release_ms: SmoothedParam::new(DEFAULT_RELEASE_MS),
            ratio: SmoothedParam::new(DEFAULT_RATIO),
            threshold_db: SmoothedParam::new(DEFAULT_THRESHOLD_DB),
            computer: GainComputer::new(),
            detectors: [
                EnvelopeFollower::new(48000.0),
                EnvelopeFollower::new(48000.0),
            ],
            channels: 2,
            last_gain_reduction_db: 0.0,
        }
    }

    /// Configure for a sample rate, maximum block size, and channel count.
    ///
    /// Smoothers are configured with the unit's reaction time and snapped
    /// to the defaults so the first block does not ramp in. `_max_block`
    /// documents the host contract; the unit itself carries no
    /// block-sized state.
    pub fn prepare(&mut self, sample_rate: f32, _max_block: usize, channels: usize) {
        debug_assert!(sample_rate > 0.0, "sample rate must be positive");
        debug_assert!((1..=MAX_CHANNELS).contains(&channels));
        self.channels = channels.clamp(1, MAX_CHANNELS);

        self.attack_ms.configure(sample_rate, SMOOTHING_SECONDS);
        self.release_ms.configure(sample_rate, SMOOTHING_SECONDS);
        self.ratio.configure(sample_rate, SMOOTHING_SECONDS);
        self.threshold_db.configure(sample_rate, SMOOTHING_SECONDS);

        self.attack_ms.set_immediate(DEFAULT_ATTACK_MS);
        self.release_ms.set_immediate(DEFAULT_RELEASE_MS);
        self.ratio.set_immediate(DEFAULT_RATIO);
        self.threshold_db.set_immediate(DEFAULT_THRESHOLD_DB);

        self.computer.threshold_db = DEFAULT_THRESHOLD_DB;
        self.computer.ratio = DEFAULT_RATIO;

        for detector in &mut self.detectors {
            detector.set_sample_rate(sample_rate);
            detector.set_attack_ms(DEFAULT_ATTACK_MS);
            detector.set_release_ms(DEFAULT_RELEASE_MS);
            detector.reset();
        }
        self.last_gain_reduction_db = 0.0;
    }

    /// Clear detector state. Smoother targets and the gain computer are
    /// untouched.
    pub fn reset(&mut self) {
        for detector in &mut self.detectors {
            detector.reset();
        }
        self.last_gain_reduction_db = 0.0;
    }

    /// Push new parameter targets.
    ///
    /// Negative times and ratios below 1:1 are caller bugs: debug builds
    /// assert, release builds clamp. Automation should be range-limited
    /// before it reaches this unit.
    pub fn update_settings(
        &mut self,
        attack_ms: f32,
        release_ms: f32,
        ratio: f32,
        threshold_db: f32,
    ) {
        debug_assert!(attack_ms >= 0.0, "attack must be >= 0 ms");
        debug_assert!(release_ms >= 0.0, "release must be >= 0 ms");
        debug_assert!(ratio >= 1.0, "ratio must be >= 1.0");

        self.attack_ms.set_target(attack_ms.max(0.0));
        self.release_ms.set_target(release_ms.max(0.0));
        self.ratio.set_target(ratio.max(1.0));
        self.threshold_db.set_target(threshold_db);
    }

    /// Compress one interleaved block in place.
    ///
    /// Advances each parameter smoother by a single step, applies the
    /// resulting settings, then runs detector → gain computer → VCA over
    /// every sample. Metering is the chain's job, not this unit's.
    pub fn process(&mut self, buffer: &mut [f32]) {
        let attack = self.attack_ms.next();
        let release = self.release_ms.next();
        self.computer.ratio = self.ratio.next().max(1.0);
        self.computer.threshold_db = self.threshold_db.next();

        for detector in &mut self.detectors[..self.channels] {
            detector.set_attack_ms(attack);
            detector.set_release_ms(release);
        }

        for frame in buffer.chunks_exact_mut(self.channels) {
            for (ch, sample) in frame.iter_mut().enumerate() {
                let envelope = self.detectors[ch].process(*sample);
                let envelope_db = fast_linear_to_db(envelope);
                let gain_reduction_db = self.computer.gain_reduction_db(envelope_db);

                self.last_gain_reduction_db = gain_reduction_db;
                *sample *= fast_db_to_linear(-gain_reduction_db);
            }
        }
    }

    /// Last computed gain reduction in dB (positive = reducing, 0 = idle).
    pub fn gain_reduction_db(&self) -> f32 {
        self.last_gain_reduction_db
    }
}

impl Default for VcaCompressor {
    fn default() -> Self {
        Self::new()
    }
}
