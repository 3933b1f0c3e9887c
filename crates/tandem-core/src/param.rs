//! Parameter smoothing for zipper-free control changes.
//!
//! Abrupt parameter changes (a threshold knob jumping, host automation
//! stepping) produce audible clicks. [`SmoothedParam`] linearly ramps from
//! its current value to a new target over a fixed number of samples, and a
//! ramp can be re-targeted mid-flight without restarting from the wrong
//! origin: the new ramp always begins at the value the parameter actually
//! holds at the time of the call.
//!
//! ## Usage
//!
//! ```rust
//! use tandem_core::SmoothedParam;
//!
//! let mut threshold = SmoothedParam::new(-12.0);
//! threshold.configure(48000.0, 0.002); // 2 ms ramp
//!
//! threshold.set_target(-18.0);
//! // In the processing loop, advance one step per block (or per sample):
//! let value = threshold.next();
//! ```
//!
//! The smoother is mutated only by its single owner (the audio thread);
//! cross-thread parameter hand-off happens upstream of this type.

/// A control value that ramps linearly toward its target.
///
/// After the configured number of steps the value snaps to the target
/// exactly — no residual drift, no overshoot — and stays there until a new
/// target is set.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    /// Current interpolated value
    current: f32,
    /// Target value the ramp is heading toward
    target: f32,
    /// Per-step increment (sign follows the ramp direction)
    increment: f32,
    /// Steps left until the ramp completes
    steps_remaining: u32,
    /// Full ramp length in steps, derived by [`configure`](Self::configure)
    ramp_steps: u32,
}

impl SmoothedParam {
    /// Create a smoother holding `initial`, with no ramp configured.
    ///
    /// Until [`configure`](Self::configure) is called, every
    /// [`set_target`](Self::set_target) takes effect instantly.
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            increment: 0.0,
            steps_remaining: 0,
            ramp_steps: 0,
        }
    }

    /// Set the ramp length to `ceil(ramp_seconds * sample_rate)` steps.
    ///
    /// Ends any ramp in flight by snapping to the target. A non-positive
    /// sample rate is a caller bug: debug builds assert, release builds
    /// leave the smoother unconfigured (instant changes).
    pub fn configure(&mut self, sample_rate: f32, ramp_seconds: f32) {
        debug_assert!(sample_rate > 0.0, "sample rate must be positive");
        if sample_rate <= 0.0 {
            return;
        }
        self.ramp_steps = libm::ceilf(ramp_seconds.max(0.0) * sample_rate) as u32;
        self.current = self.target;
        self.increment = 0.0;
        self.steps_remaining = 0;
    }

    /// Set current and target to `v` with no ramp.
    ///
    /// Used at prepare time so the first block does not ramp in from a
    /// stale value.
    #[inline]
    pub fn set_immediate(&mut self, v: f32) {
        self.current = v;
        self.target = v;
        self.increment = 0.0;
        self.steps_remaining = 0;
    }

    /// Begin a ramp from the current interpolated value to `v`.
    ///
    /// Re-targeting mid-ramp starts the new ramp at the present value, not
    /// at the old target, so direction changes stay continuous. Setting a
    /// target equal to the one already in effect keeps the existing ramp
    /// running rather than restarting it.
    pub fn set_target(&mut self, v: f32) {
        if (v - self.target).abs() < 1e-9 {
            return;
        }
        self.target = v;
        if self.ramp_steps == 0 {
            self.current = v;
            self.increment = 0.0;
            self.steps_remaining = 0;
        } else {
            self.increment = (v - self.current) / self.ramp_steps as f32;
            self.steps_remaining = self.ramp_steps;
        }
    }

    /// Advance one step and return the new current value.
    ///
    /// Once the ramp is exhausted, returns the target exactly on every
    /// call until the next [`set_target`](Self::set_target).
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.steps_remaining > 0 {
            self.current += self.increment;
            self.steps_remaining -= 1;
            if self.steps_remaining == 0 {
                self.current = self.target;
            }
        }
        self.current
    }

    /// Current value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// True once the ramp has completed.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.steps_remaining == 0
    }
}

impl Default for SmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_changes_are_instant() {
        let mut param = SmoothedParam::new(1.0);
        param.set_target(0.5);
        assert_eq!(param.next(), 0.5);
        assert!(param.is_settled());
    }

    #[test]
    fn ramp_reaches_target_in_exact_step_count() {
        let mut param = SmoothedParam::new(0.0);
        param.configure(48000.0, 0.002); // 96 steps
        param.set_target(1.0);

        for _ in 0..95 {
            let v = param.next();
            assert!(v < 1.0, "Reached target early at {v}");
        }
        assert_eq!(param.next(), 1.0);
        assert!(param.is_settled());
        // Settled value repeats exactly
        assert_eq!(param.next(), 1.0);
    }

    #[test]
    fn retarget_mid_ramp_starts_from_current_value() {
        let mut param = SmoothedParam::new(0.0);
        param.configure(1000.0, 0.01); // 10 steps
        param.set_target(1.0);

        for _ in 0..5 {
            param.next();
        }
        let mid = param.get();
        assert!((mid - 0.5).abs() < 1e-6);

        // Reverse direction: ramp must start at ~0.5, not at 1.0
        param.set_target(0.0);
        let first = param.next();
        assert!(
            first < mid && first > 0.3,
            "Ramp origin wrong after retarget: {first}"
        );

        for _ in 0..9 {
            param.next();
        }
        assert_eq!(param.get(), 0.0);
    }

    #[test]
    fn same_target_does_not_restart_ramp() {
        let mut param = SmoothedParam::new(0.0);
        param.configure(1000.0, 0.01); // 10 steps
        param.set_target(1.0);

        for _ in 0..8 {
            param.next();
        }
        param.set_target(1.0); // no-op
        param.next();
        assert_eq!(param.next(), 1.0, "Ramp should complete in 10 total steps");
    }

    #[test]
    fn set_immediate_clears_ramp() {
        let mut param = SmoothedParam::new(0.0);
        param.configure(1000.0, 0.01);
        param.set_target(1.0);
        param.next();

        param.set_immediate(-3.0);
        assert_eq!(param.get(), -3.0);
        assert_eq!(param.next(), -3.0);
        assert!(param.is_settled());
    }

    #[test]
    fn configure_rejects_bad_sample_rate_in_release() {
        let mut param = SmoothedParam::new(0.5);
        // Would assert in debug; exercise the release-mode path shape only
        // by checking a valid reconfigure afterwards still works.
        param.configure(48000.0, 0.0);
        param.set_target(1.0);
        assert_eq!(param.next(), 1.0, "Zero-length ramp is instant");
    }
}
