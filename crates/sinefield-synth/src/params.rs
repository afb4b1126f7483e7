//! Discrete parameter types shared by voices, the synth, and patch files.

use sinefield_core::LfoShape;

/// Per-partial gain curve applied on top of the amplitude morph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ShapingFilterMode {
    /// 12 dB/octave slope above a cutoff that sweeps with the morph.
    #[default]
    Lowpass12,
    /// 24 dB/octave slope above a cutoff that sweeps with the morph.
    Lowpass24,
    /// Sinusoidal comb over log frequency; the morph shifts its phase.
    SineComb,
    /// Sawtooth over octaves; the morph shifts its phase.
    OctaveRamp,
    /// Random per-half-octave gains; the morph scrolls through them.
    Random,
}

impl ShapingFilterMode {
    /// Number of modes.
    pub const COUNT: usize = 5;

    /// Mode for a parameter index; out-of-range indices clamp to the last mode.
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Lowpass12,
            1 => Self::Lowpass24,
            2 => Self::SineComb,
            3 => Self::OctaveRamp,
            _ => Self::Random,
        }
    }
}

/// Per-partial frequency remapping, blended in by the tweak mix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FreqTweakMode {
    /// Lowest partials fold to subharmonics 1/5..1/1, the rest shift down.
    #[default]
    Subharmonic,
    /// Random detune, fixed per voice.
    RandomDetune,
    /// Every partial collapses onto the fundamental.
    Collapse,
    /// Neighbouring odd and even partials swap places.
    OddEvenSwap,
    /// The series is mirrored: partial n plays 65 - n.
    Inversion,
    /// The lowest 16 stay, the rest spread four times wider.
    StretchTop,
}

impl FreqTweakMode {
    /// Number of modes.
    pub const COUNT: usize = 6;

    /// Mode for a parameter index; out-of-range indices clamp to the last mode.
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Subharmonic,
            1 => Self::RandomDetune,
            2 => Self::Collapse,
            3 => Self::OddEvenSwap,
            4 => Self::Inversion,
            _ => Self::StretchTop,
        }
    }

    /// Row in a voice's tweak-ratio table.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// How partial frequencies are spaced above the fundamental.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TuningMode {
    /// Harmonic series stretched by the pseudo-octave.
    #[default]
    Harmonic,
    /// Harmonic series snapped to an equal division of the pseudo-octave,
    /// with duplicates removed.
    Quantized,
}

/// How the modulated pitch passes through the keyboard tuning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PitchQuantizeMode {
    /// Only the played key is tuned; bend and modulation add plain semitones.
    Unquantized,
    /// The whole pitch is tuned, interpolating between keys.
    #[default]
    Continuous,
    /// The whole pitch snaps to the nearest key before tuning.
    NearestKey,
}

/// Settings of one LFO slot.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LfoParams {
    /// Rate in octaves relative to 1 Hz.
    pub rate: f32,
    /// Waveform.
    pub shape: LfoShape,
    /// Shape-specific deformation, `-1..=1`.
    pub deform: f32,
}

impl Default for LfoParams {
    fn default() -> Self {
        Self {
            rate: 1.0,
            shape: LfoShape::Sine,
            deform: 0.0,
        }
    }
}

/// Per-note expression targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteExpression {
    /// Pitch offset in semitones.
    Tuning,
    /// Voice pan, `0..=1`.
    Pan,
    /// Pressure, routed like polyphonic aftertouch.
    Pressure,
}

/// Per-voice parameters that accept polyphonic modulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolyParam {
    /// Shaping filter morph, `0..=1`.
    FilterMorph,
    /// Voice pan, `0..=1`.
    Pan,
}
