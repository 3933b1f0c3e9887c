//! Chain orchestrator: low cut → Stage A → Stage B → output gain, with
//! metering taps at every boundary.
//!
//! # Signal Flow
//!
//! ```text
//! Host block (interleaved)
//!   → input trim (smoothed, from compression macro)
//!   → [input peak + RMS tap]
//!   → low-cut SVF (highpass, cutoff cached)
//!   → Stage A (VCA compressor, macro-mapped parameters)
//!   → [interstage RMS tap]
//!   → Stage B (opto compressor, fixed character)
//!   → output gain (smoothed)
//!   → [output peak + RMS tap]
//!   → bypass crossfade (dry/wet, 10 ms)
//! ```
//!
//! After the output tap the orchestrator derives gain reduction per
//! channel as `dB(rms_after) − dB(rms_before)` for each stage boundary
//! and for the whole chain (negative values mean reduction), storing each
//! into its own register in [`ChainMeters`] for the GUI to poll.
//!
//! # Real-time contract
//!
//! `process` never blocks, never allocates, and touches cross-thread
//! state only through the atomic registers. The dry scratch buffer for
//! the bypass blend is allocated once in `prepare`.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use tandem_core::{
    AtomicLevel, PeakRegister, RmsRegister, SmoothedParam, StateVariableFilter, SvfOutput,
    db_to_linear, linear_to_db,
};

use crate::compressor::VcaCompressor;
use crate::opto::OptoCompressor;
use crate::params::{
    MacroParams, map_attack_ms, map_input_trim_db, map_ratio, map_release_ms, map_threshold_db,
};

/// Channels the chain processes (mono or stereo).
pub const MAX_CHANNELS: usize = 2;

/// Bypass crossfade length in seconds.
const BYPASS_FADE_SECONDS: f32 = 0.01;

/// Input-trim smoothing ramp in seconds.
const TRIM_SMOOTHING_SECONDS: f32 = 0.002;

/// Lock-free metering block shared between the audio thread (writer) and
/// the GUI timer (reader).
///
/// Indices are channels: `[0]` left, `[1]` right (mono chains only write
/// index 0). Peak registers are reset-on-read; RMS registers hold the
/// value computed for the most recent block; the gain-reduction levels
/// are `dB(after) − dB(before)` per block, negative while reducing.
#[derive(Debug, Default)]
pub struct ChainMeters {
    /// Peak input level per channel (linear), after input trim.
    pub input_peak: [PeakRegister; MAX_CHANNELS],
    /// RMS input level per channel (linear), after input trim.
    pub input_rms: [RmsRegister; MAX_CHANNELS],
    /// RMS between Stage A and Stage B per channel (linear).
    pub interstage_rms: [RmsRegister; MAX_CHANNELS],
    /// Peak output level per channel (linear).
    pub output_peak: [PeakRegister; MAX_CHANNELS],
    /// RMS output level per channel (linear).
    pub output_rms: [RmsRegister; MAX_CHANNELS],
    /// Stage-A gain change per channel in dB (negative = reducing).
    pub stage_a_gain_db: [AtomicLevel; MAX_CHANNELS],
    /// Stage-B gain change per channel in dB (negative = reducing).
    pub stage_b_gain_db: [AtomicLevel; MAX_CHANNELS],
    /// Whole-chain gain change per channel in dB (negative = reducing).
    pub total_gain_db: [AtomicLevel; MAX_CHANNELS],
    /// Cumulative count of missed callback deadlines reported by the
    /// host. Never reset by the chain; the GUI may diff it.
    pub overruns: AtomicU32,
}

impl ChainMeters {
    /// Create a zeroed metering block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every level register. The overrun counter is cumulative and
    /// survives.
    pub fn reset(&self) {
        for ch in 0..MAX_CHANNELS {
            self.input_peak[ch].reset();
            self.input_rms[ch].reset();
            self.interstage_rms[ch].reset();
            self.output_peak[ch].reset();
            self.output_rms[ch].reset();
            self.stage_a_gain_db[ch].set(0.0);
            self.stage_b_gain_db[ch].set(0.0);
            self.total_gain_db[ch].set(0.0);
        }
    }

    /// Current overrun count.
    pub fn overrun_count(&self) -> u32 {
        self.overruns.load(Ordering::Acquire)
    }
}

/// The full dual-stage compressor chain.
///
/// Lifecycle: construct, set parameters, [`prepare`](Self::prepare), then
/// call [`process`](Self::process) once per host block from the audio
/// thread. Parameter setters are single-writer; the only state shared
/// with other threads is the [`ChainMeters`] block behind an `Arc`.
///
/// # Example
///
/// ```rust
/// use tandem_dynamics::CompressorChain;
///
/// let mut chain = CompressorChain::new();
/// chain.set_control(40.0);
/// chain.set_compression(60.0);
/// chain.prepare(48000.0, 512, 2);
///
/// let meters = chain.meters(); // hand to the GUI thread
/// let mut block = [0.0f32; 1024];
/// chain.process(&mut block);
/// let input_peak_left = meters.input_peak[0].read_and_reset();
/// ```
#[derive(Debug)]
pub struct CompressorChain {
    params: MacroParams,
    input_trim: SmoothedParam,
    low_cut: StateVariableFilter,
    stage_a: VcaCompressor,
    stage_b: OptoCompressor,
    meters: Arc<ChainMeters>,
    /// Dry copy of the incoming block for the bypass blend.
    scratch: Vec<f32>,
    /// 0.0 = fully active, 1.0 = fully bypassed.
    bypass_fade: SmoothedParam,
    /// Cutoff last applied to the filter; sentinel forces the first update.
    last_low_cut: f32,
    /// Number of coefficient recomputations since prepare.
    low_cut_updates: u32,
    channels: usize,
    sample_rate: f32,
}

impl CompressorChain {
    /// Create an unprepared chain with default parameters.
    pub fn new() -> Self {
        Self {
            params: MacroParams::new(),
            input_trim: SmoothedParam::new(1.0),
            low_cut: StateVariableFilter::new(48000.0),
            stage_a: VcaCompressor::new(),
            stage_b: OptoCompressor::new(),
            meters: Arc::new(ChainMeters::new()),
            scratch: Vec::new(),
            bypass_fade: SmoothedParam::new(0.0),
            last_low_cut: -1.0,
            low_cut_updates: 0,
            channels: 2,
            sample_rate: 0.0,
        }
    }

    /// Configure the whole chain for a sample rate, maximum block size,
    /// and channel count (1 or 2).
    ///
    /// Allocates the dry scratch buffer — the one allocation the chain
    /// ever makes — and snaps every smoother so playback starts clean.
    /// Invalid arguments are caller bugs: debug builds assert, release
    /// builds clamp.
    pub fn prepare(&mut self, sample_rate: f32, max_block: usize, channels: usize) {
        debug_assert!(sample_rate > 0.0, "sample rate must be positive");
        debug_assert!(max_block > 0, "block size must be positive");
        debug_assert!((1..=MAX_CHANNELS).contains(&channels));

        let sample_rate = if sample_rate > 0.0 { sample_rate } else { 44100.0 };
        let max_block = max_block.max(1);
        self.channels = channels.clamp(1, MAX_CHANNELS);
        self.sample_rate = sample_rate;

        self.params.prepare(sample_rate);
        self.params.reset();

        self.input_trim.configure(sample_rate, TRIM_SMOOTHING_SECONDS);
        self.input_trim
            .set_immediate(db_to_linear(map_input_trim_db(self.params.compression)));

        self.low_cut.set_sample_rate(sample_rate);
        self.low_cut.set_output_type(SvfOutput::Highpass);
        self.low_cut.reset();
        self.last_low_cut = -1.0;
        self.low_cut_updates = 0;

        self.stage_a.prepare(sample_rate, max_block, self.channels);
        self.stage_b.prepare(sample_rate);

        self.bypass_fade.configure(sample_rate, BYPASS_FADE_SECONDS);
        self.bypass_fade
            .set_immediate(if self.params.bypassed { 1.0 } else { 0.0 });

        self.scratch.clear();
        self.scratch.resize(max_block * self.channels, 0.0);

        self.meters.reset();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            sample_rate,
            max_block,
            channels = self.channels,
            "chain prepared"
        );
    }

    /// Clear all signal state — filter, detectors, envelope, meters —
    /// without touching parameter targets.
    pub fn reset(&mut self) {
        self.low_cut.reset();
        self.stage_a.reset();
        self.stage_b.reset();
        self.meters.reset();
    }

    /// Process one interleaved host block in place.
    ///
    /// The block length must be a multiple of the channel count and no
    /// longer than the prepared maximum. Runs entirely on the calling
    /// (audio) thread; cross-thread effects are limited to register
    /// writes in [`ChainMeters`].
    pub fn process(&mut self, buffer: &mut [f32]) {
        if buffer.is_empty() || self.sample_rate <= 0.0 {
            return;
        }
        debug_assert_eq!(buffer.len() % self.channels, 0);
        debug_assert!(buffer.len() <= self.scratch.len());

        self.params.smoothen();
        self.update_low_cut();

        let control = self.params.control;
        let compression = self.params.compression;
        self.input_trim
            .set_target(db_to_linear(map_input_trim_db(compression)));
        self.stage_a.update_settings(
            map_attack_ms(control),
            map_release_ms(control),
            map_ratio(compression),
            map_threshold_db(control),
        );
        self.bypass_fade
            .set_target(if self.params.bypassed { 1.0 } else { 0.0 });

        // Dry copy for the bypass blend. An oversized block trips the
        // debug assert above; release builds keep running without the
        // blend rather than reallocating on the audio thread.
        let blend_dry = buffer.len() <= self.scratch.len();
        if blend_dry {
            self.scratch[..buffer.len()].copy_from_slice(buffer);
        }

        let trim = self.input_trim.next();
        for sample in buffer.iter_mut() {
            *sample *= trim;
        }

        self.tap_peak(buffer, true);
        self.tap_rms(buffer, Tap::Input);
        let input_rms = self.compute_rms(Tap::Input);

        for frame in buffer.chunks_exact_mut(self.channels) {
            for (ch, sample) in frame.iter_mut().enumerate() {
                *sample = self.low_cut.process(ch, *sample);
            }
        }

        self.stage_a.process(buffer);

        self.tap_rms(buffer, Tap::Interstage);
        let interstage_rms = self.compute_rms(Tap::Interstage);

        self.stage_b.process(buffer);

        let output_gain = self.params.output_gain;
        for sample in buffer.iter_mut() {
            *sample *= output_gain;
        }

        self.tap_peak(buffer, false);
        self.tap_rms(buffer, Tap::Output);
        let output_rms = self.compute_rms(Tap::Output);

        for ch in 0..self.channels {
            let input_db = linear_to_db(input_rms[ch]);
            let interstage_db = linear_to_db(interstage_rms[ch]);
            let output_db = linear_to_db(output_rms[ch]);

            self.meters.stage_a_gain_db[ch].set(interstage_db - input_db);
            self.meters.stage_b_gain_db[ch].set(output_db - interstage_db);
            self.meters.total_gain_db[ch].set(output_db - input_db);
        }

        if blend_dry {
            self.blend_bypass(buffer);
        }

        #[cfg(debug_assertions)]
        self.guard_output(buffer);
    }

    /// Shared handle to the metering block for the GUI thread.
    pub fn meters(&self) -> Arc<ChainMeters> {
        Arc::clone(&self.meters)
    }

    /// Set the output gain target in dB (−18..+12).
    pub fn set_output_gain_db(&mut self, db: f32) {
        self.params.set_output_gain_db(db);
    }

    /// Set the low-cut cutoff target in Hz (20..1000).
    pub fn set_low_cut_hz(&mut self, hz: f32) {
        self.params.set_low_cut_hz(hz);
    }

    /// Set the control macro (0..100).
    pub fn set_control(&mut self, value: f32) {
        self.params.set_control(value);
    }

    /// Set the compression macro (0..100).
    pub fn set_compression(&mut self, value: f32) {
        self.params.set_compression(value);
    }

    /// Engage or release the bypass crossfade.
    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.params.set_bypassed(bypassed);
    }

    /// Record a missed callback deadline reported by the host. The count
    /// is observable via [`ChainMeters::overrun_count`].
    pub fn record_overrun(&self) {
        let total = self.meters.overruns.fetch_add(1, Ordering::AcqRel) + 1;
        #[cfg(feature = "tracing")]
        tracing::warn!(total, "audio callback overrun");
        #[cfg(not(feature = "tracing"))]
        let _ = total;
    }

    /// Number of low-cut coefficient recomputations since prepare.
    /// Diagnostic: the cutoff cache keeps this from growing while the
    /// parameter holds still.
    pub fn low_cut_updates(&self) -> u32 {
        self.low_cut_updates
    }

    /// Apply the smoothed low-cut frequency, recomputing filter
    /// coefficients only when the value actually moved.
    fn update_low_cut(&mut self) {
        let cutoff = self.params.low_cut;
        if cutoff != self.last_low_cut {
            self.low_cut.set_cutoff(cutoff);
            self.last_low_cut = cutoff;
            self.low_cut_updates += 1;
        }
    }

    fn tap_peak(&self, buffer: &[f32], input: bool) {
        let registers = if input {
            &self.meters.input_peak
        } else {
            &self.meters.output_peak
        };
        for frame in buffer.chunks_exact(self.channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                registers[ch].update_if_greater(sample.abs());
            }
        }
    }

    fn tap_rms(&self, buffer: &[f32], tap: Tap) {
        let registers = self.rms_registers(tap);
        for frame in buffer.chunks_exact(self.channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                registers[ch].update(sample);
            }
        }
    }

    fn compute_rms(&self, tap: Tap) -> [f32; MAX_CHANNELS] {
        let registers = self.rms_registers(tap);
        let mut values = [0.0; MAX_CHANNELS];
        for ch in 0..self.channels {
            values[ch] = registers[ch].compute();
        }
        values
    }

    fn rms_registers(&self, tap: Tap) -> &[RmsRegister; MAX_CHANNELS] {
        match tap {
            Tap::Input => &self.meters.input_rms,
            Tap::Interstage => &self.meters.interstage_rms,
            Tap::Output => &self.meters.output_rms,
        }
    }

    /// Crossfade the processed block against the dry copy in `scratch`.
    /// The fade advances per frame so engaging bypass mid-block stays
    /// click-free.
    fn blend_bypass(&mut self, buffer: &mut [f32]) {
        if self.bypass_fade.is_settled() {
            // The fade only ever targets 0 or 1
            if self.bypass_fade.get() == 0.0 {
                return;
            }
            buffer.copy_from_slice(&self.scratch[..buffer.len()]);
            return;
        }
        let dry = &self.scratch[..buffer.len()];
        let fade = &mut self.bypass_fade;
        for (frame, dry_frame) in buffer
            .chunks_exact_mut(self.channels)
            .zip(dry.chunks_exact(self.channels))
        {
            let mix = fade.next();
            for (sample, &dry_sample) in frame.iter_mut().zip(dry_frame.iter()) {
                *sample += (dry_sample - *sample) * mix;
            }
        }
    }

    /// Last line of defense for development builds: replace non-finite
    /// samples and clamp anything beyond +6 dBFS so a DSP bug cannot
    /// reach monitors at full scale.
    #[cfg(debug_assertions)]
    fn guard_output(&self, buffer: &mut [f32]) {
        let mut flagged = false;
        for sample in buffer.iter_mut() {
            if !sample.is_finite() {
                *sample = 0.0;
                flagged = true;
            } else if sample.abs() > 2.0 {
                *sample = sample.clamp(-2.0, 2.0);
                flagged = true;
            }
        }
        if flagged {
            #[cfg(feature = "tracing")]
            tracing::warn!("output guard engaged: non-finite or hot samples");
        }
    }
}

impl Default for CompressorChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Metering tap points along the chain.
#[derive(Clone, Copy, Debug)]
enum Tap {
    Input,
    Interstage,
    Output,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared_chain() -> CompressorChain {
        let mut chain = CompressorChain::new();
        chain.prepare(48000.0, 256, 2);
        chain
    }

    /// Fill `block` with a stereo 1 kHz sine (48 samples/cycle at 48 kHz)
    /// continuing from `phase` frames; returns the advanced phase.
    fn fill_sine(block: &mut [f32], amplitude: f32, phase: usize) -> usize {
        for (i, frame) in block.chunks_exact_mut(2).enumerate() {
            let s = amplitude
                * libm::sinf(2.0 * core::f32::consts::PI * (phase + i) as f32 / 48.0);
            frame[0] = s;
            frame[1] = s;
        }
        phase + block.len() / 2
    }

    #[test]
    fn unprepared_chain_is_a_no_op() {
        let mut chain = CompressorChain::new();
        let mut block = [0.5f32; 32];
        chain.process(&mut block);
        assert_eq!(block, [0.5f32; 32]);
    }

    #[test]
    fn silence_in_silence_out() {
        let mut chain = prepared_chain();
        let mut block = [0.0f32; 128];
        chain.process(&mut block);
        assert!(block.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn low_cut_cache_skips_redundant_updates() {
        let mut chain = prepared_chain();
        chain.set_low_cut_hz(200.0);

        let mut block = [0.0f32; 64];
        // 2 ms macro smoothing = 96 steps; run past it
        for _ in 0..200 {
            chain.process(&mut block);
        }
        let settled = chain.low_cut_updates();
        assert!(settled > 0, "Cutoff change must recompute at least once");

        chain.process(&mut block);
        chain.process(&mut block);
        assert_eq!(
            chain.low_cut_updates(),
            settled,
            "Stable cutoff must not recompute"
        );
    }

    #[test]
    fn meters_see_all_three_taps() {
        let mut chain = prepared_chain();
        let meters = chain.meters();

        let mut block = [0.0f32; 256];
        for frame in block.chunks_exact_mut(2) {
            frame[0] = 0.5;
            frame[1] = -0.5;
        }
        chain.process(&mut block);

        for ch in 0..2 {
            assert!(meters.input_peak[ch].value() > 0.0);
            assert!(meters.input_rms[ch].value() > 0.0);
            assert!(meters.interstage_rms[ch].value() > 0.0);
            assert!(meters.output_peak[ch].value() > 0.0);
            assert!(meters.output_rms[ch].value() > 0.0);
        }
    }

    #[test]
    fn output_gain_scales_the_block() {
        let mut chain = prepared_chain();
        chain.set_output_gain_db(-18.0);

        let mut loud = [0.0f32; 128];
        let mut quiet = [0.0f32; 128];
        // Let the 96-step output gain ramp settle in the quiet chain
        let mut reference = prepared_chain();
        let mut phase = 0;
        for _ in 0..200 {
            fill_sine(&mut loud, 0.1, phase);
            reference.process(&mut loud);
            phase = fill_sine(&mut quiet, 0.1, phase);
            chain.process(&mut quiet);
        }
        // Output gain is the only difference between the two chains, so
        // the final blocks differ by exactly that factor
        let rms = |b: &[f32]| {
            libm::sqrtf(b.iter().map(|s| s * s).sum::<f32>() / b.len() as f32)
        };
        let gain = rms(&quiet) / rms(&loud);
        let expected = db_to_linear(-18.0);
        assert!(
            (gain - expected).abs() < expected * 0.05,
            "Expected ~{expected}, got {gain}"
        );
    }

    #[test]
    fn bypass_returns_dry_signal() {
        let mut chain = prepared_chain();
        chain.set_compression(80.0); // heavy processing when active
        chain.set_bypassed(true);

        let mut block = [0.0f32; 128];
        // 10 ms fade at 48 kHz = 480 frames = 8 blocks of 64 frames
        for _ in 0..50 {
            block.fill(0.25);
            chain.process(&mut block);
        }
        assert!(
            block.iter().all(|&s| s == 0.25),
            "Fully bypassed chain must pass the dry block through"
        );
    }

    #[test]
    fn bypass_fade_is_gradual() {
        let mut chain = prepared_chain();
        chain.set_compression(100.0);

        let mut block = [0.0f32; 128];
        for _ in 0..300 {
            block.fill(0.25);
            chain.process(&mut block);
        }
        let wet = block[0];
        assert!(wet != 0.25, "Active chain should alter the signal");

        chain.set_bypassed(true);
        block.fill(0.25);
        chain.process(&mut block);
        let first = block[0];
        let last = block[126];
        assert!(
            (first - wet).abs() < (last - wet).abs(),
            "Fade must move toward dry across the block: first {first}, last {last}"
        );
    }

    #[test]
    fn gain_reduction_registers_are_negative_under_drive() {
        let mut chain = prepared_chain();
        chain.set_compression(100.0);
        chain.set_control(100.0);
        let meters = chain.meters();

        let mut block = [0.0f32; 128];
        let mut phase = 0;
        for _ in 0..2_000 {
            phase = fill_sine(&mut block, 0.5, phase);
            chain.process(&mut block);
        }
        assert!(
            meters.stage_a_gain_db[0].get() < -0.5,
            "Stage A should be reducing: {}",
            meters.stage_a_gain_db[0].get()
        );
        assert!(
            meters.total_gain_db[0].get() < -0.5,
            "Total reduction must show the chain working: {}",
            meters.total_gain_db[0].get()
        );
        let sum = meters.stage_a_gain_db[0].get() + meters.stage_b_gain_db[0].get();
        assert!(
            (meters.total_gain_db[0].get() - sum).abs() < 0.01,
            "Per-stage reductions must add up to the total (unity output gain)"
        );
    }

    #[test]
    fn reset_is_idempotent() {
        let mut chain = prepared_chain();
        let mut block = [0.5f32; 128];
        for _ in 0..10 {
            chain.process(&mut block);
        }

        chain.reset();
        let env_once = chain.stage_b.envelope_db();
        chain.reset();
        assert_eq!(chain.stage_b.envelope_db(), env_once);
        assert_eq!(chain.meters().input_rms[0].value(), 0.0);
    }

    #[test]
    fn overrun_counter_accumulates() {
        let chain = prepared_chain();
        let meters = chain.meters();
        assert_eq!(meters.overrun_count(), 0);
        chain.record_overrun();
        chain.record_overrun();
        assert_eq!(meters.overrun_count(), 2);
    }

    #[test]
    fn mono_chain_leaves_right_registers_untouched() {
        let mut chain = CompressorChain::new();
        chain.prepare(48000.0, 256, 1);
        let meters = chain.meters();

        let mut block = [0.5f32; 64];
        chain.process(&mut block);
        assert!(meters.input_rms[0].value() > 0.0);
        assert_eq!(meters.input_rms[1].value(), 0.0);
    }
}
