//! Dense modulation matrix.
//!
//! Every source is routed to every destination through one scalar depth.
//! Depths are unconstrained and contributions add linearly:
//!
//! ```text
//! destination[t] = Σ_s source[s] * depth[s][t]
//! ```
//!
//! Each voice projects its modulator values through the shared matrix once
//! per frame; destinations then scale the result into their own units (see
//! [`ModTarget`]).

/// Modulation source identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ModSource {
    /// LFO slot 1 (bipolar)
    Lfo0,
    /// LFO slot 2 (bipolar)
    Lfo1,
    /// LFO slot 3 (bipolar)
    Lfo2,
    /// LFO slot 4 (bipolar)
    Lfo3,
    /// Amplitude envelope minus its sustain level
    Eg0,
    /// Auxiliary envelope
    Eg1,
    /// Burst generator
    Burst,
    /// Polyphonic aftertouch, doubled
    PolyAftertouch,
    /// Smoothed CC 41, doubled
    CcA,
    /// Smoothed CC 42, doubled
    CcB,
    /// Smoothed CC 43, doubled
    CcC,
    /// Smoothed CC 44, doubled
    CcD,
}

impl ModSource {
    /// Number of sources.
    pub const COUNT: usize = 12;

    /// All sources in matrix row order.
    pub const ALL: [ModSource; Self::COUNT] = [
        Self::Lfo0,
        Self::Lfo1,
        Self::Lfo2,
        Self::Lfo3,
        Self::Eg0,
        Self::Eg1,
        Self::Burst,
        Self::PolyAftertouch,
        Self::CcA,
        Self::CcB,
        Self::CcC,
        Self::CcD,
    ];

    /// Row index in the matrix.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Source for a row index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// LFO source for slot `slot` (0..4).
    pub fn lfo(slot: usize) -> Option<Self> {
        if slot < 4 { Self::from_index(slot) } else { None }
    }
}

/// Modulation destination identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ModTarget {
    /// Amplitude morph position, half a unit per unit of modulation
    PartialVolumesMorph,
    /// Pan morph position, half a unit per unit of modulation
    PartialPansMorph,
    /// Pitch, 12 semitones per unit
    Pitch,
    /// Volume, 24 dB per unit
    Volume,
    /// Frequency-tweak mix, half a unit per unit
    PartialRemapMorph,
    /// Shaping filter morph, half a unit per unit
    FilterMorph,
    /// Auxiliary send level
    AuxSendA,
}

impl ModTarget {
    /// Number of destinations.
    pub const COUNT: usize = 7;

    /// All destinations in matrix column order.
    pub const ALL: [ModTarget; Self::COUNT] = [
        Self::PartialVolumesMorph,
        Self::PartialPansMorph,
        Self::Pitch,
        Self::Volume,
        Self::PartialRemapMorph,
        Self::FilterMorph,
        Self::AuxSendA,
    ];

    /// Column index in the matrix.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Destination for a column index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Source values for one frame, indexed by [`ModSource::index`].
pub type ModSourceValues = [f32; ModSource::COUNT];
/// Destination deltas for one frame, indexed by [`ModTarget::index`].
pub type ModTargetValues = [f32; ModTarget::COUNT];

/// Sources × destinations depth table.
#[derive(Debug, Clone, PartialEq)]
pub struct ModMatrix {
    depths: [[f32; ModTarget::COUNT]; ModSource::COUNT],
}

impl Default for ModMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl ModMatrix {
    /// Matrix with every depth at zero.
    pub fn new() -> Self {
        Self {
            depths: [[0.0; ModTarget::COUNT]; ModSource::COUNT],
        }
    }

    /// Set the depth of one route.
    pub fn set_depth(&mut self, source: ModSource, target: ModTarget, depth: f32) {
        self.depths[source.index()][target.index()] = depth;
    }

    /// Depth of one route.
    pub fn depth(&self, source: ModSource, target: ModTarget) -> f32 {
        self.depths[source.index()][target.index()]
    }

    /// Zero every route.
    pub fn clear(&mut self) {
        self.depths = [[0.0; ModTarget::COUNT]; ModSource::COUNT];
    }

    /// Iterate over routes with a non-zero depth.
    pub fn active_routes(&self) -> impl Iterator<Item = (ModSource, ModTarget, f32)> + '_ {
        ModSource::ALL.iter().flat_map(move |&s| {
            ModTarget::ALL.iter().filter_map(move |&t| {
                let d = self.depth(s, t);
                (d != 0.0).then_some((s, t, d))
            })
        })
    }

    /// Project source values onto destination deltas.
    #[inline]
    pub fn project(&self, sources: &ModSourceValues) -> ModTargetValues {
        let mut out = [0.0; ModTarget::COUNT];
        for (value, row) in sources.iter().zip(self.depths.iter()) {
            for (acc, depth) in out.iter_mut().zip(row.iter()) {
                *acc += value * depth;
            }
        }
        out
    }
}
