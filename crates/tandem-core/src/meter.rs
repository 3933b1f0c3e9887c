//! Lock-free level registers shared between the audio and GUI threads.
//!
//! The audio thread writes these once per sample or once per block; a GUI
//! timer polls them at its own cadence (typically 60 Hz). Every register
//! is a single word (`f32` bit-cast into an `AtomicU32`), so a reader
//! always observes either the fully-updated value or the prior one —
//! never a torn word. No mutexes, no channels: the writers are wait-free
//! stores or CAS loops bounded by the single concurrent reader.
//!
//! - [`PeakRegister`] — monotonic max since the last read, reset-on-read
//! - [`RmsRegister`] — sum-of-squares accumulator drained once per block
//! - [`AtomicLevel`] — plain store/load for derived values (gain
//!   reduction in dB)

use core::sync::atomic::{AtomicU32, Ordering};

use libm::sqrtf;

/// Peak-hold register: keeps the maximum value written since the last
/// [`read_and_reset`](Self::read_and_reset).
///
/// The audio thread calls [`update_if_greater`](Self::update_if_greater)
/// per sample; the stored value never decreases between reads, even if a
/// reader swaps it to zero mid-update — the CAS loop re-examines the
/// fresh value and keeps the larger one.
#[derive(Debug)]
pub struct PeakRegister {
    bits: AtomicU32,
}

impl PeakRegister {
    /// Create a register holding 0.
    pub fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
        }
    }

    /// Clear to 0 (prepare / transport stop).
    pub fn reset(&self) {
        self.bits.store(0, Ordering::Release);
    }

    /// Raise the stored value to `value` if it is greater.
    ///
    /// Compare-and-swap max: the loop runs at most once per concurrent
    /// interference from the reader's exchange, never unbounded.
    #[inline]
    pub fn update_if_greater(&self, value: f32) {
        let mut current = self.bits.load(Ordering::Relaxed);
        while value > f32::from_bits(current) {
            match self.bits.compare_exchange_weak(
                current,
                value.to_bits(),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    /// Consume the held peak: returns the stored value and resets it to 0
    /// in one atomic exchange (GUI thread).
    pub fn read_and_reset(&self) -> f32 {
        f32::from_bits(self.bits.swap(0, Ordering::AcqRel))
    }

    /// Read the held peak without consuming it.
    pub fn value(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }
}

impl Default for PeakRegister {
    fn default() -> Self {
        Self::new()
    }
}

/// Windowed RMS register: accumulates sample² on the audio thread, drains
/// once per block into a stored RMS the GUI reads at leisure.
///
/// [`compute`](Self::compute) atomically exchanges both accumulators to
/// zero, so its result covers exactly the samples accumulated since the
/// previous call. An [`update`](Self::update) racing the drain lands in
/// the next window; it is never lost.
#[derive(Debug)]
pub struct RmsRegister {
    /// Accumulated sum of squared samples (f32 bits)
    sum_squares: AtomicU32,
    /// Count of samples accumulated alongside `sum_squares`
    count: AtomicU32,
    /// Most recently computed RMS (f32 bits)
    last: AtomicU32,
}

impl RmsRegister {
    /// Create an empty register.
    pub fn new() -> Self {
        Self {
            sum_squares: AtomicU32::new(0),
            count: AtomicU32::new(0),
            last: AtomicU32::new(0),
        }
    }

    /// Clear accumulators and the stored RMS.
    pub fn reset(&self) {
        self.sum_squares.store(0, Ordering::Release);
        self.count.store(0, Ordering::Release);
        self.last.store(0, Ordering::Release);
    }

    /// Accumulate one sample (audio thread, per sample).
    #[inline]
    pub fn update(&self, sample: f32) {
        let squared = sample * sample;
        let mut current = self.sum_squares.load(Ordering::Relaxed);
        loop {
            let next = (f32::from_bits(current) + squared).to_bits();
            match self.sum_squares.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Drain the accumulators and store `sqrt(sum / count)` (0 when no
    /// samples were accumulated). Called once per processed block.
    ///
    /// Returns the freshly computed RMS for the caller's own use.
    pub fn compute(&self) -> f32 {
        let sum = f32::from_bits(self.sum_squares.swap(0, Ordering::AcqRel));
        let count = self.count.swap(0, Ordering::AcqRel);
        let rms = if count > 0 {
            sqrtf(sum / count as f32)
        } else {
            0.0
        };
        self.last.store(rms.to_bits(), Ordering::Release);
        rms
    }

    /// Most recently computed RMS (linear, not dB). Plain atomic read.
    pub fn value(&self) -> f32 {
        f32::from_bits(self.last.load(Ordering::Acquire))
    }
}

impl Default for RmsRegister {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain atomic level register for derived per-block values.
///
/// Used for the gain-reduction dB readouts: the audio thread stores once
/// per block, the GUI loads whenever it repaints.
#[derive(Debug)]
pub struct AtomicLevel {
    bits: AtomicU32,
}

impl AtomicLevel {
    /// Create a register holding `initial`.
    pub fn new(initial: f32) -> Self {
        Self {
            bits: AtomicU32::new(initial.to_bits()),
        }
    }

    /// Store a new value (audio thread).
    #[inline]
    pub fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    /// Load the current value (GUI thread).
    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }
}

impl Default for AtomicLevel {
    fn default() -> Self {
        Self::new(0.0)
    }
}
