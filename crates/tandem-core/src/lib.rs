//! Tandem Core - DSP primitives for the tandem compressor chain
//!
//! This crate provides the foundational building blocks for the dual-stage
//! dynamics chain, designed for real-time audio processing with zero
//! allocation in the audio path.
//!
//! # Core Abstractions
//!
//! ## Parameter Smoothing
//!
//! - [`SmoothedParam`] - Linear ramp toward a target over a fixed number of
//!   samples, re-targetable mid-ramp without discontinuities
//!
//! ## Detection & Filtering
//!
//! - [`EnvelopeFollower`] - Peak envelope detection with asymmetric
//!   attack/release ballistics
//! - [`StateVariableFilter`] - TPT SVF (lowpass, highpass, bandpass, notch)
//!
//! ## Cross-Thread Metering
//!
//! Lock-free single-word registers written by the audio thread and polled
//! by a GUI timer:
//!
//! - [`PeakRegister`] - monotonic max, reset-on-read
//! - [`RmsRegister`] - sum-of-squares accumulator, drained once per block
//! - [`AtomicLevel`] - plain store/load level register
//!
//! ## Utilities
//!
//! - Math functions: [`db_to_linear`], [`linear_to_db`], [`lerp`], etc.
//! - Fast approximations: [`fast_linear_to_db`], [`fast_db_to_linear`]
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature in
//! your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tandem-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: No allocations, locks, or unbounded loops in
//!   audio processing paths
//! - **No dependencies on std**: Pure `no_std` with `libm` for math
//! - **Plain structs**: `prepare`/`reset`/`process` methods, no trait
//!   hierarchies

#![cfg_attr(not(feature = "std"), no_std)]

pub mod envelope;
pub mod fast_math;
pub mod math;
pub mod meter;
pub mod param;
pub mod svf;

// Re-export main types at crate root
pub use envelope::EnvelopeFollower;
pub use fast_math::{fast_db_to_linear, fast_exp2, fast_linear_to_db, fast_log2};
pub use math::{DB_FLOOR, db_to_linear, flush_denormal, lerp, linear_to_db, ms_to_samples};
pub use meter::{AtomicLevel, PeakRegister, RmsRegister};
pub use param::SmoothedParam;
pub use svf::{StateVariableFilter, SvfOutput};
