//! Mathematical utility functions for DSP.
//!
//! Provides the level conversions and small helpers used across the
//! compressor chain. All functions are allocation-free and suitable for
//! `no_std`.
//!
//! # Level Conversions
//!
//! - [`db_to_linear`] / [`linear_to_db`] - Convert between dB and linear gain
//!
//! The dB conversions share a hard floor of [`DB_FLOOR`] (−100 dB): any
//! linear level at or below that floor converts to exactly −100 dB, so
//! silence never produces `-inf` or NaN in metering or gain laws.
//!
//! # Utilities
//!
//! - [`lerp`] - Linear interpolation
//! - [`ms_to_samples`] - Time conversion
//! - [`flush_denormal`] - Subnormal float protection for feedback paths

use libm::{expf, logf};

/// Hard lower bound for level-to-dB conversions, in dB.
///
/// Matches the display floor of the metering layer: levels below
/// `10^(-100/20)` (≈ 1e-5 linear) are clamped to this value.
pub const DB_FLOOR: f32 = -100.0;

/// Convert decibels to linear gain.
///
/// # Examples
/// ```rust
/// use tandem_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels, floored at [`DB_FLOOR`].
///
/// Zero, negative, and subnormal inputs all return exactly [`DB_FLOOR`].
///
/// # Examples
/// ```rust
/// use tandem_core::{DB_FLOOR, linear_to_db};
///
/// assert!((linear_to_db(1.0) - 0.0).abs() < 0.001);
/// assert!((linear_to_db(0.5) - (-6.02)).abs() < 0.01);
/// assert_eq!(linear_to_db(0.0), DB_FLOOR);
/// ```
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    // 20 * log10(linear) = 20 * ln(linear) / ln(10)
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    if linear <= 0.0 {
        return DB_FLOOR;
    }
    (logf(linear) * FACTOR).max(DB_FLOOR)
}

/// Linear interpolation between two values.
///
/// # Arguments
/// * `a` - Start value (t = 0)
/// * `b` - End value (t = 1)
/// * `t` - Interpolation position
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Convert milliseconds to samples.
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms * sample_rate / 1000.0
}

/// Flush subnormal (denormalized) floats to zero.
///
/// Subnormal floats (~1e-38 to 1e-45) cause severe CPU performance
/// degradation on most architectures. This function replaces values below
/// 1e-20 with zero, providing margin before the IEEE 754 subnormal range
/// begins.
///
/// Use this on filter and envelope state that can decay indefinitely
/// toward zero.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}
