//! Sinefield Synth - polyphonic additive synthesis engine
//!
//! Each voice is a bank of up to 64 sine partials whose amplitudes and pans
//! are read from morphable wavetables, whose frequencies follow a stretched
//! or quantized harmonic series, and whose pitch goes through a microtonal
//! keyboard tuning.
//!
//! # Core Components
//!
//! ## Modulation
//!
//! - [`BlockAdsr`] - Log-time ADSR producing one ramp per block
//! - [`BurstGenerator`] - Stochastic retriggered envelope bursts
//! - [`ModMatrix`] - Dense sources × targets depth table
//!
//! ## Tables
//!
//! - [`MorphTable`] - Per-partial values over 16 morph frames
//! - [`SharedSynthesisData`] - Morph presets, lookup curves, tuning
//!
//! ## Tuning
//!
//! - [`Scale`] / [`KeyboardMapping`] - Equal divisions or Scala text
//! - [`Tuning`] - Key-to-frequency table
//!
//! ## Voices
//!
//! - [`Voice`] - Partial bank renderer
//! - [`Synth`] - Voice pool, event handling, block rendering
//! - [`SynthHandle`] - Cross-thread access to the shared tables
//!
//! # Example: Chord in a 19-tone tuning
//!
//! ```rust
//! use sinefield_synth::{Synth, ModSource, ModTarget};
//!
//! let mut synth: Synth<8> = Synth::new();
//! synth.prepare(48000.0, 128);
//! synth.set_edo_parameters(1200.0, 19).unwrap();
//! synth.set_modulation_depth(ModSource::Lfo0, ModTarget::PartialVolumesMorph, 0.3);
//!
//! synth.handle_note_on(0, 0, 60, -1, 0.9);
//! synth.handle_note_on(0, 0, 66, -1, 0.9);
//! synth.handle_note_on(0, 0, 71, -1, 0.9);
//!
//! let mut left = vec![0.0; 128];
//! let mut right = vec![0.0; 128];
//! for _ in 0..16 {
//!     synth.process_block(&mut left, &mut right);
//! }
//! assert_eq!(synth.active_voice_count(), 3);
//! ```

pub mod burst;
pub mod envelope;
pub mod mod_matrix;
pub mod morph;
pub mod params;
pub mod shared;
pub mod synth;
pub mod tuning;
pub mod voice;

pub use burst::{BurstGenerator, BurstParams};
pub use envelope::{BlockAdsr, EnvelopeParams, EnvelopeStage};
pub use mod_matrix::{ModMatrix, ModSource, ModSourceValues, ModTarget, ModTargetValues};
pub use morph::{
    AMPLITUDE_PRESET_COUNT, CUSTOM_AMPLITUDE_PRESET, MAX_PARTIALS, MORPH_FRAMES, MorphPosition,
    MorphTable, PAN_PRESET_COUNT,
};
pub use params::{
    FreqTweakMode, LfoParams, NoteExpression, PitchQuantizeMode, PolyParam, ShapingFilterMode,
    TuningMode,
};
pub use shared::{MAX_PARTIAL_HZ, MIN_PARTIAL_HZ, SharedSynthesisData};
pub use synth::{DEFAULT_VOICES, DefaultSynth, Synth, SynthHandle};
pub use tuning::{KeyboardMapping, Scale, Tuning, TuningError};
pub use voice::{
    MIN_PARTIALS, NoteId, Voice, partial_gain_compensation, quantized_partial_series,
};

// Re-export commonly used types from sinefield-core
pub use sinefield_core::{BLOCK_SIZE, LfoShape, RateTable};
