//! Tandem Dynamics - the dual-stage compressor chain
//!
//! A feed-forward VCA-style compressor ([`VcaCompressor`]) followed by a
//! fixed-character opto-style compressor ([`OptoCompressor`]), sequenced
//! by [`CompressorChain`] together with a low-cut filter, macro-driven
//! parameter mapping ([`MacroParams`]), and lock-free metering
//! ([`ChainMeters`]) for a GUI polling at its own cadence.
//!
//! # Example
//!
//! ```rust
//! use tandem_dynamics::CompressorChain;
//!
//! let mut chain = CompressorChain::new();
//! chain.set_control(35.0);
//! chain.set_compression(50.0);
//! chain.set_low_cut_hz(80.0);
//! chain.prepare(48000.0, 512, 2);
//!
//! // Audio thread, once per host block:
//! let mut block = vec![0.0f32; 512 * 2];
//! chain.process(&mut block);
//!
//! // GUI thread, on a timer:
//! let meters = chain.meters();
//! let peak_left = meters.input_peak[0].read_and_reset();
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: after `prepare`, `process` never allocates,
//!   locks, or loops without bound
//! - **Single writer**: parameter setters and `process` belong to one
//!   thread; only [`ChainMeters`] crosses threads, through atomics
//! - **Plain structs**: every unit is `prepare`/`reset`/`process`, no
//!   trait objects in the audio path

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod chain;
pub mod compressor;
pub mod opto;
pub mod params;

// Re-export main types at crate root
pub use chain::{ChainMeters, CompressorChain};
pub use compressor::VcaCompressor;
pub use opto::OptoCompressor;
pub use params::{
    MacroParams, map_attack_ms, map_input_trim_db, map_ratio, map_release_ms, map_threshold_db,
};
