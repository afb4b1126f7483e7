//! Sinefield Core - block-rate DSP primitives for additive synthesis
//!
//! This crate holds the pieces of the sinefield engine that know nothing
//! about voices or notes: the envelope-rate table every modulator reads,
//! block LFOs, one-pole smoothers, the batched sine kernel, and scalar math.
//! Everything here is allocation-free and runs without `std`.
//!
//! # Core Components
//!
//! ## Block Timing
//!
//! - [`RateTable`] - Exponential envelope-rate lookup for a sample rate
//! - [`BLOCK_SIZE`] - Frames between modulation updates
//!
//! ## Modulators
//!
//! - [`BlockLfo`] - Seven-shape LFO rendered one block at a time
//! - [`OnePoleSmoother`] - Control-signal smoothing
//!
//! ## Oscillator Kernel
//!
//! - [`sine_block`] - Sine of a whole phase vector in 4-wide lanes
//!
//! ## Utilities
//!
//! - Math functions: [`db_to_linear`], [`map_range`], [`reflect_unit`], [`soft_clip`]
//!
//! # no_std Support
//!
//! ```toml
//! [dependencies]
//! sinefield-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use sinefield_core::{BlockLfo, LfoShape, RateTable, BLOCK_SIZE};
//!
//! let rates = RateTable::new(48000.0);
//! let mut lfo = BlockLfo::new(1);
//! lfo.process_block(2.0, 0.0, LfoShape::Triangle, &rates);
//! assert_eq!(lfo.output_block.len(), BLOCK_SIZE);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod fast_math;
pub mod lfo;
pub mod math;
pub mod rate_table;
pub mod smoother;

pub use fast_math::{SINE_LANES, fast_sin, fast_sin_turns, sine_block};
pub use lfo::{BlockLfo, LfoShape};
pub use math::{
    MIDI_0_FREQ, db_to_linear, flush_denormal, lerp, map_range, reflect_unit, soft_clip,
};
pub use rate_table::{BLOCK_SIZE, BLOCK_SIZE_OS, RATE_TABLE_LEN, RateTable};
pub use smoother::{GAIN_SMOOTHING, OnePoleSmoother, PAN_SMOOTHING, one_pole_step};
