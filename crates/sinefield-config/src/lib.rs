//! Patch files and factory presets for the sinefield synth.
//!
//! A [`SynthConfig`] captures the whole parameter surface of a
//! [`Synth`](sinefield_synth::Synth): voice levels, envelopes, LFOs, filter,
//! tweak, burst generator, morph presets, modulation routes and tuning. Patches
//! are stored as TOML, validated with [`validate_config`], and pushed into a
//! running synth with [`SynthConfig::apply`].
//!
//! # Example
//!
//! ```rust
//! use sinefield_config::{SynthConfig, get_factory_preset};
//! use sinefield_synth::{ModSource, ModTarget, Synth};
//!
//! let mut synth: Synth<8> = Synth::new();
//! synth.prepare(48000.0, 256);
//!
//! // Start from a factory patch
//! let bells = get_factory_preset("glass_bells").unwrap();
//! bells.apply(&mut synth).unwrap();
//!
//! // Or build one in code and save it as TOML
//! let patch = SynthConfig::new("Wobble")
//!     .with_description("LFO on the amplitude morph")
//!     .with_route(ModSource::Lfo0, ModTarget::PartialVolumesMorph, 0.4);
//! let text = patch.to_toml_string().unwrap();
//! assert_eq!(SynthConfig::from_toml_str(&text).unwrap(), patch);
//! ```

mod error;
mod patch;

/// Patch validation.
pub mod validation;

/// Factory patches bundled with the library.
pub mod factory_presets;

pub use error::ConfigError;
pub use factory_presets::{
    FACTORY_PRESET_NAMES, factory_presets, get_factory_preset, is_factory_preset,
};
pub use patch::{
    ENVELOPE_SLOTS, FilterConfig, LFO_SLOTS, MorphConfig, RouteConfig, SynthConfig, TuningConfig,
    TweakConfig, VoiceConfig,
};
pub use validation::{ValidationError, ValidationResult, validate_config};
