//! Patch file format and application to a synth.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sinefield_synth::{
    BurstParams, EnvelopeParams, FreqTweakMode, LfoParams, MAX_PARTIALS, ModSource, ModTarget,
    PitchQuantizeMode, ShapingFilterMode, Synth, TuningMode,
};
use tracing::debug;

use crate::error::ConfigError;
use crate::validation::{ValidationResult, validate_config};

/// Envelopes per voice.
pub const ENVELOPE_SLOTS: usize = 2;
/// LFO slots per voice.
pub const LFO_SLOTS: usize = 4;

/// A complete synth patch.
///
/// Every section is optional in the file; missing values take the same
/// defaults a freshly constructed synth uses.
///
/// # TOML Format
///
/// ```toml
/// name = "Glass"
/// description = "Bright bell partials"
///
/// [voice]
/// num_partials = 48
/// partials_balance = 0.8
///
/// [[envelopes]]
/// attack = 0.0
/// decay = 0.55
/// sustain = 0.2
/// release = 0.6
///
/// [tuning]
/// mode = "quantized"
/// edo = 19
///
/// [[routes]]
/// source = "lfo0"
/// target = "partial_volumes_morph"
/// depth = 0.25
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthConfig {
    /// Name of the patch.
    pub name: String,

    /// Optional description of the patch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Per-voice levels and positions.
    pub voice: VoiceConfig,

    /// Amplitude envelope, then auxiliary envelope. Missing entries use
    /// the default envelope.
    pub envelopes: Vec<EnvelopeParams>,

    /// LFO slots in order, at most four. Missing entries use the default LFO.
    pub lfos: Vec<LfoParams>,

    /// Shaping filter.
    pub filter: FilterConfig,

    /// Frequency tweak.
    pub tweak: TweakConfig,

    /// Burst generator.
    pub burst: BurstParams,

    /// Morph table presets.
    pub morph: MorphConfig,

    /// Keyboard tuning and partial spacing.
    pub tuning: TuningConfig,

    /// Modulation routes; unlisted pairs have zero depth.
    pub routes: Vec<RouteConfig>,
}

/// Per-voice levels and positions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceConfig {
    /// Partials per voice, `2..=64`.
    pub num_partials: usize,
    /// Voice pan.
    pub pan: f32,
    /// Amplitude morph position.
    pub partials_balance: f32,
    /// Pan morph position.
    pub pan_morph: f32,
    /// Level of velocity 0 in dB.
    pub velocity_response_db: f32,
    /// Transpose in semitones.
    pub key_shift: i32,
    /// Base auxiliary send.
    pub aux_send: f32,
    /// Envelope/burst mix.
    pub burst_mix: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            num_partials: MAX_PARTIALS,
            pan: 0.5,
            partials_balance: 0.5,
            pan_morph: 0.5,
            velocity_response_db: -48.0,
            key_shift: 0,
            aux_send: 0.0,
            burst_mix: 0.0,
        }
    }
}

/// Shaping filter settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    /// Filter curve.
    pub mode: ShapingFilterMode,
    /// Filter morph.
    pub morph: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            mode: ShapingFilterMode::default(),
            morph: 1.0,
        }
    }
}

/// Frequency tweak settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TweakConfig {
    /// Remapping mode.
    pub mode: FreqTweakMode,
    /// Blend toward the remapped frequencies.
    pub mix: f32,
}

/// Morph table preset selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MorphConfig {
    /// Amplitude preset, `0..=9` (9 is the custom table).
    pub volume_preset: usize,
    /// Pan preset, `0..=3`.
    pub pan_preset: usize,
}

/// Keyboard tuning and partial spacing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TuningConfig {
    /// Harmonic or quantized partial spacing.
    pub mode: TuningMode,
    /// Pseudo-octave in cents.
    pub pseudo_octave_cents: f32,
    /// Equal divisions of the pseudo-octave.
    pub edo: u32,
    /// How modulated pitch passes through the tuning.
    pub pitch_quantize: PitchQuantizeMode,
    /// Pitch bend range in keys.
    pub pitch_bend_range: f32,
    /// Scala `.scl` text replacing the equal division.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scala: Option<String>,
    /// Scala `.kbm` text replacing the default keyboard mapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kbm: Option<String>,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            mode: TuningMode::default(),
            pseudo_octave_cents: 1200.0,
            edo: 12,
            pitch_quantize: PitchQuantizeMode::default(),
            pitch_bend_range: 2.0,
            scala: None,
            kbm: None,
        }
    }
}

/// One modulation matrix entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RouteConfig {
    /// Modulation source.
    pub source: ModSource,
    /// Modulation target.
    pub target: ModTarget,
    /// Depth, `-1..=1`.
    pub depth: f32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self::new("Init")
    }
}

impl SynthConfig {
    /// Default patch with a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            voice: VoiceConfig::default(),
            envelopes: Vec::new(),
            lfos: Vec::new(),
            filter: FilterConfig::default(),
            tweak: TweakConfig::default(),
            burst: BurstParams::default(),
            morph: MorphConfig::default(),
            tuning: TuningConfig::default(),
            routes: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a modulation route.
    pub fn with_route(mut self, source: ModSource, target: ModTarget, depth: f32) -> Self {
        self.routes.push(RouteConfig {
            source,
            target,
            depth,
        });
        self
    }

    /// Parse a patch from TOML text.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let patch: Self = toml::from_str(toml_str)?;
        debug!(name = %patch.name, routes = patch.routes.len(), "patch parsed");
        Ok(patch)
    }

    /// Serialize to TOML text.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load a patch from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Save the patch to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Check every value against its range.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_config(self)
    }

    /// Validate, then push every setting into `synth`.
    ///
    /// Shared tables are replaced through the synth's handle: the modulation
    /// matrix is cleared before the routes are written, and the tuning is
    /// rebuilt from the default mapping.
    pub fn apply<const N: usize>(&self, synth: &mut Synth<N>) -> Result<(), ConfigError> {
        self.validate()?;

        let v = &self.voice;
        synth.set_num_partials(v.num_partials);
        synth.set_pan(v.pan);
        synth.set_partials_balance(v.partials_balance);
        synth.set_partials_pan_morph(v.pan_morph);
        synth.set_velocity_response(v.velocity_response_db);
        synth.set_key_shift(v.key_shift);
        synth.set_aux_send(v.aux_send);
        synth.set_burst_mix(v.burst_mix);

        for i in 0..ENVELOPE_SLOTS {
            synth.set_envelope_params(i, self.envelopes.get(i).copied().unwrap_or_default());
        }
        for i in 0..LFO_SLOTS {
            synth.set_lfo_params(i, self.lfos.get(i).copied().unwrap_or_default());
        }
        synth.set_filter_mode(self.filter.mode);
        synth.set_filter_morph(self.filter.morph);
        synth.set_freq_tweak_mode(self.tweak.mode);
        synth.set_freq_tweak_mix(self.tweak.mix);
        synth.set_burst_params(self.burst);

        synth.set_volume_morph_preset(self.morph.volume_preset);
        synth.set_pan_morph_preset(self.morph.pan_preset);
        synth.handle().with(|shared| {
            shared.mod_matrix.clear();
            for route in &self.routes {
                shared.mod_matrix.set_depth(route.source, route.target, route.depth);
            }
        });

        let t = &self.tuning;
        synth.set_tuning_mode(t.mode);
        synth.set_pitch_quantize(t.pitch_quantize);
        synth.set_pitch_bend_range(t.pitch_bend_range);
        synth.reset_tuning();
        synth.set_edo_parameters(t.pseudo_octave_cents, t.edo)?;
        if let Some(scl) = t.scala.as_deref() {
            synth.import_scala_text(scl)?;
        }
        if let Some(kbm) = t.kbm.as_deref() {
            synth.import_kbm_text(kbm)?;
        }

        debug!(name = %self.name, voices = N, "patch applied");
        Ok(())
    }
}
