//! End-to-end tests for the full compressor chain: steady-state gain
//! reduction against the ratio law, cross-thread metering, and filter
//! behavior through the complete signal path.

use tandem_core::{db_to_linear, linear_to_db};
use tandem_dynamics::CompressorChain;
use tandem_dynamics::opto::gain_reduction_for;

const SAMPLE_RATE: f32 = 48000.0;
/// 48 frames = exactly one cycle of 1 kHz, so every block measures the
/// same RMS and the envelope sees a steady level.
const FRAMES: usize = 48;

fn sine_block(frames: usize, amplitude: f32, phase_offset: usize) -> Vec<f32> {
    let mut block = vec![0.0f32; frames * 2];
    for (i, frame) in block.chunks_exact_mut(2).enumerate() {
        // 48 samples per cycle; reduce the phase before the float math so
        // long runs keep full precision
        let step = ((phase_offset + i) % 48) as f32;
        let s = amplitude * libm::sinf(2.0 * core::f32::consts::PI * step / 48.0);
        frame[0] = s;
        frame[1] = s;
    }
    block
}

/// Feed a 1 kHz sine at −6 dBFS through the chain with default macros
/// until the opto envelope and gain smoother settle, then check the
/// measured whole-chain gain reduction against the Stage-B ratio law.
///
/// With the macros at rest Stage A sits below its threshold, so the law
/// prediction from the measured input level should match the measured
/// input-to-output RMS difference within 0.5 dB.
#[test]
fn steady_sine_settles_to_law_prediction() {
    let mut chain = CompressorChain::new();
    chain.prepare(SAMPLE_RATE, FRAMES, 2);
    let meters = chain.meters();

    let amplitude = db_to_linear(-6.0);
    let mut phase = 0;
    // The 100 ms gain smoother advances one step per block; give it and
    // the envelope follower ample blocks to converge.
    for _ in 0..30_000 {
        let mut block = sine_block(FRAMES, amplitude, phase);
        chain.process(&mut block);
        phase += FRAMES;
    }

    let input_rms = meters.input_rms[0].value();
    let measured_reduction = -meters.total_gain_db[0].get();
    let predicted = gain_reduction_for(linear_to_db(input_rms));

    assert!(
        predicted > 3.0,
        "Test signal must actually drive Stage B, predicted {predicted} dB"
    );
    assert!(
        (measured_reduction - predicted).abs() <= 0.5,
        "Measured {measured_reduction} dB vs law prediction {predicted} dB"
    );
}

/// The audio thread writes meters while a GUI thread polls them: the
/// poller must observe the true peak (no lost updates, no regressions,
/// no torn values) across the whole run.
#[test]
fn gui_thread_observes_peaks_without_loss() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    let mut chain = CompressorChain::new();
    chain.prepare(SAMPLE_RATE, FRAMES, 2);
    let meters = chain.meters();
    let done = Arc::new(AtomicBool::new(false));

    let poller = {
        let meters = Arc::clone(&meters);
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            let mut seen_peak: f32 = 0.0;
            while !done.load(Ordering::Acquire) {
                let value = meters.input_peak[0].read_and_reset();
                assert!(value.is_finite() && value >= 0.0, "Torn read: {value}");
                seen_peak = seen_peak.max(value);
                let rms = meters.input_rms[0].value();
                assert!(rms.is_finite() && rms >= 0.0, "Torn RMS: {rms}");
                std::thread::yield_now();
            }
            seen_peak.max(meters.input_peak[0].read_and_reset())
        })
    };

    let amplitude = db_to_linear(-6.0);
    let mut phase = 0;
    for _ in 0..5_000 {
        let mut block = sine_block(FRAMES, amplitude, phase);
        chain.process(&mut block);
        phase += FRAMES;
    }
    done.store(true, Ordering::Release);
    let seen_peak = poller.join().unwrap();

    // Input peak ≈ amplitude × input trim (−2.85 dB at rest); the sine is
    // sampled at 48 points/cycle so its observed crest sits within 0.1 dB
    // of the true peak.
    let expected = amplitude * db_to_linear(-2.85);
    assert!(
        seen_peak > expected * 0.95 && seen_peak <= expected * 1.01,
        "Poller saw {seen_peak}, expected ~{expected}"
    );
}

/// A sub-bass tone dies through a high low-cut setting but passes when
/// the filter rests at 20 Hz.
#[test]
fn low_cut_removes_rumble_end_to_end() {
    let run = |low_cut_hz: f32| -> f32 {
        let mut chain = CompressorChain::new();
        chain.set_low_cut_hz(low_cut_hz);
        chain.prepare(SAMPLE_RATE, 64, 2);
        let meters = chain.meters();

        let mut out_rms = 0.0;
        for block_index in 0..400 {
            let mut block = vec![0.0f32; 64 * 2];
            for (i, frame) in block.chunks_exact_mut(2).enumerate() {
                let t = (block_index * 64 + i) as f32 / SAMPLE_RATE;
                let s = 0.1 * libm::sinf(2.0 * core::f32::consts::PI * 30.0 * t);
                frame[0] = s;
                frame[1] = s;
            }
            chain.process(&mut block);
            out_rms = meters.output_rms[0].value();
        }
        out_rms
    };

    let open = run(20.0);
    let cut = run(1000.0);
    assert!(
        linear_to_db(cut) < linear_to_db(open) - 20.0,
        "1 kHz low cut must attenuate 30 Hz by far more than the open setting: open {} dB, cut {} dB",
        linear_to_db(open),
        linear_to_db(cut)
    );
}

/// Macro automation mid-stream never produces a non-finite or wildly
/// out-of-range sample (the smoothers absorb the steps).
#[test]
fn automation_sweep_stays_clean() {
    let mut chain = CompressorChain::new();
    chain.prepare(SAMPLE_RATE, 64, 2);

    let mut phase = 0;
    for step in 0..1_000 {
        // Stair-step every knob across its range while audio runs
        let sweep = (step % 100) as f32;
        chain.set_control(sweep);
        chain.set_compression(100.0 - sweep);
        chain.set_low_cut_hz(20.0 + sweep * 9.8);
        chain.set_output_gain_db(-18.0 + sweep * 0.3);

        let mut block = sine_block(64, 0.5, phase);
        chain.process(&mut block);
        phase += 64;

        for &s in &block {
            assert!(s.is_finite(), "Non-finite sample during automation");
            assert!(s.abs() <= 2.0, "Runaway sample during automation: {s}");
        }
    }
}

/// `reset` mid-stream returns the chain to a clean state: meters drop to
/// zero and a second reset changes nothing further.
#[test]
fn reset_restores_clean_state() {
    let mut chain = CompressorChain::new();
    chain.prepare(SAMPLE_RATE, 64, 2);
    let meters = chain.meters();

    let mut phase = 0;
    for _ in 0..100 {
        let mut block = sine_block(64, 0.5, phase);
        chain.process(&mut block);
        phase += 64;
    }
    assert!(meters.input_rms[0].value() > 0.0);

    chain.reset();
    assert_eq!(meters.input_rms[0].value(), 0.0);
    assert_eq!(meters.input_peak[0].value(), 0.0);
    assert_eq!(meters.total_gain_db[0].get(), 0.0);

    chain.reset();
    assert_eq!(meters.input_rms[0].value(), 0.0);

    // Processing silence after reset keeps everything at zero
    let mut block = vec![0.0f32; 128];
    chain.process(&mut block);
    assert!(block.iter().all(|&s| s == 0.0));
}
