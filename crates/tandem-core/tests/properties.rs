//! Property-based tests for tandem-core DSP primitives.
//!
//! Ramp convergence, filter stability, and register semantics over
//! randomized inputs via proptest.

use proptest::prelude::*;
use tandem_core::{PeakRegister, RmsRegister, SmoothedParam, StateVariableFilter, SvfOutput};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// A ramp from any initial value reaches any target exactly within the
    /// configured number of steps, and a monotonic ramp never overshoots.
    #[test]
    fn smoother_converges_without_overshoot(
        initial in -100.0f32..100.0f32,
        target in -100.0f32..100.0f32,
        ramp_ms in 0.1f32..20.0f32,
    ) {
        prop_assume!((target - initial).abs() > 1e-6);

        let sample_rate = 48000.0;
        let mut param = SmoothedParam::new(initial);
        param.configure(sample_rate, ramp_ms / 1000.0);
        param.set_target(target);

        let steps = libm::ceilf(ramp_ms / 1000.0 * sample_rate) as usize;
        let rising = target >= initial;
        for _ in 0..steps {
            let v = param.next();
            if rising {
                prop_assert!(v <= target + 1e-4, "Overshot rising ramp: {v} > {target}");
            } else {
                prop_assert!(v >= target - 1e-4, "Overshot falling ramp: {v} < {target}");
            }
        }
        prop_assert_eq!(param.get(), target, "Must snap to target exactly");
        prop_assert_eq!(param.next(), target, "Must hold target after settling");
    }

    /// For any sequence of retargets with arbitrary advance counts in
    /// between, a full ramp after the last target always lands on it.
    #[test]
    fn smoother_survives_retarget_sequences(
        targets in prop::collection::vec(-10.0f32..10.0f32, 1..8),
        advances in prop::collection::vec(0usize..50, 1..8),
    ) {
        let mut param = SmoothedParam::new(0.0);
        param.configure(1000.0, 0.02); // 20 steps

        for (t, n) in targets.iter().zip(advances.iter().cycle()) {
            param.set_target(*t);
            for _ in 0..*n {
                param.next();
            }
        }

        let last = *targets.last().unwrap();
        param.set_target(last);
        for _ in 0..20 {
            param.next();
        }
        prop_assert_eq!(param.get(), last);
    }

    /// The SVF produces finite output in every mode for any valid cutoff
    /// and resonance over random input.
    #[test]
    fn svf_stability(
        freq in 20.0f32..20000.0f32,
        q in 0.5f32..10.0f32,
        mode in 0usize..4,
        input in prop::array::uniform32(-1.0f32..=1.0f32),
    ) {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_cutoff(freq);
        svf.set_resonance(q);
        svf.set_output_type(match mode {
            0 => SvfOutput::Lowpass,
            1 => SvfOutput::Highpass,
            2 => SvfOutput::Bandpass,
            _ => SvfOutput::Notch,
        });

        for &sample in &input {
            for ch in 0..2 {
                let out = svf.process(ch, sample);
                prop_assert!(
                    out.is_finite(),
                    "SVF (freq={}, q={}, mode={}) produced {} for input {}",
                    freq, q, mode, out, sample
                );
            }
        }
    }

    /// The peak register reports exactly the running maximum of everything
    /// written since the last reset.
    #[test]
    fn peak_register_tracks_maximum(
        samples in prop::collection::vec(0.0f32..2.0f32, 1..256),
    ) {
        let peak = PeakRegister::new();
        let mut expected: f32 = 0.0;
        for &s in &samples {
            peak.update_if_greater(s);
            expected = expected.max(s);
        }
        prop_assert_eq!(peak.read_and_reset(), expected);
        prop_assert_eq!(peak.read_and_reset(), 0.0);
    }

    /// RMS of a block of identical samples equals their magnitude.
    #[test]
    fn rms_of_constant_block(
        amplitude in -1.0f32..=1.0f32,
        count in 1usize..512,
    ) {
        let rms = RmsRegister::new();
        for _ in 0..count {
            rms.update(amplitude);
        }
        let computed = rms.compute();
        prop_assert!(
            (computed - amplitude.abs()).abs() < 1e-4,
            "RMS of {} × {} should be {}, got {}",
            count, amplitude, amplitude.abs(), computed
        );
    }
}
