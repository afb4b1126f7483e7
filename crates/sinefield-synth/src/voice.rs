//! One note of the additive engine: a bank of up to 64 sine partials.
//!
//! A [`Voice`] owns everything that differs per note: partial frequencies,
//! phases and smoothing state, two envelopes, four LFOs, a burst generator,
//! CC smoothers and performance state. It reads the shared tables through a
//! `&SharedSynthesisData` passed to each call and never writes them.
//!
//! # Render loop
//!
//! [`Voice::process`] works in blocks of [`BLOCK_SIZE`] frames:
//!
//! 1. On the first frame of a block the envelopes, LFOs and burst generator
//!    advance one block, then the partial frequencies are recomputed by
//!    [`Voice::update_state`].
//! 2. Every frame, modulator values are projected through the modulation
//!    matrix, all partial sines are evaluated in one batched call, and each
//!    partial's morph gain and pan are smoothed and summed into the stereo
//!    output.
//!
//! Output is accumulated (`+=`) so several voices can share a mix buffer.

use core::f32::consts::TAU;

use libm::{exp2f, fmodf, log2f, powf, roundf, sinf};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand_distr::{Distribution, StandardNormal};
use sinefield_core::{
    BLOCK_SIZE, BlockLfo, GAIN_SMOOTHING, MIDI_0_FREQ, OnePoleSmoother, PAN_SMOOTHING,
    db_to_linear, map_range, one_pole_step, reflect_unit, sine_block,
};

use crate::burst::{BurstGenerator, BurstParams};
use crate::envelope::{BlockAdsr, EnvelopeParams};
use crate::mod_matrix::{ModSource, ModSourceValues, ModTarget};
use crate::morph::{MAX_PARTIALS, MorphPosition};
use crate::params::{
    FreqTweakMode, LfoParams, NoteExpression, PitchQuantizeMode, PolyParam, ShapingFilterMode,
    TuningMode,
};
use crate::shared::{MAX_PARTIAL_HZ, MIN_PARTIAL_HZ, SharedSynthesisData, frequency_as_octave};

/// Fewest partials a voice will play.
pub const MIN_PARTIALS: usize = 2;
/// Velocity 0 maps to this many dB below velocity 1 by default.
pub const DEFAULT_VELOCITY_RESPONSE_DB: f32 = -48.0;
/// Voice level before volume modulation.
pub const BASE_VOLUME_DB: f32 = -6.0;
/// Iteration bound of the quantized partial search.
pub const QUANTIZED_SEARCH_CAP: u32 = 1000;
/// Number of LFO slots per voice.
pub const LFO_COUNT: usize = 4;
/// Number of smoothed CC inputs per voice.
pub const CC_INPUTS: usize = 4;

/// Note address. A value of -1 in a query matches anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteId {
    /// Input port.
    pub port: i32,
    /// MIDI channel.
    pub channel: i32,
    /// Key number.
    pub key: i32,
    /// Host note identifier.
    pub note_id: i32,
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new(-1, -1, 60, -1)
    }
}

impl NoteId {
    /// Build an address.
    pub const fn new(port: i32, channel: i32, key: i32, note_id: i32) -> Self {
        Self {
            port,
            channel,
            key,
            note_id,
        }
    }

    /// Address matching every note.
    pub const fn wildcard() -> Self {
        Self::new(-1, -1, -1, -1)
    }

    /// Whether this note is selected by `query`, treating -1 fields of the
    /// query as wildcards.
    pub fn matches(&self, query: &NoteId) -> bool {
        (query.port == -1 || query.port == self.port)
            && (query.channel == -1 || query.channel == self.channel)
            && (query.key == -1 || query.key == self.key)
            && (query.note_id == -1 || query.note_id == self.note_id)
    }
}

/// Level compensation for the partial count, linear in dB from -6 dB at 2
/// partials to -20 dB at 64.
pub fn partial_gain_compensation(num_partials: usize) -> f32 {
    let n = num_partials.clamp(MIN_PARTIALS, MAX_PARTIALS) as f32;
    let db = map_range(n, MIN_PARTIALS as f32, MAX_PARTIALS as f32, -6.0, -20.0).clamp(-20.0, -6.0);
    db_to_linear(db)
}

/// Linear gain for a velocity in `0..=1`, given the level of velocity 0 in dB.
pub fn velocity_gain(velocity: f32, response_db: f32) -> f32 {
    db_to_linear(map_range(velocity.clamp(0.0, 1.0), 0.0, 1.0, response_db, 0.0))
}

/// Fill `out` with a harmonic series over `f0`, stretched so that each
/// doubling of the partial number spans `pseudo_octave_cents`.
pub fn harmonic_partial_series(f0: f32, pseudo_octave_cents: f32, out: &mut [f32]) {
    let ratio = exp2f(pseudo_octave_cents / 1200.0);
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = f0 * powf(ratio, log2f((i + 1) as f32));
    }
}

/// Fill `out` with harmonics of `f0` snapped to `edo` equal steps of the
/// pseudo-octave, skipping values equal to their predecessor.
///
/// Harmonic numbers are tried in order until `out` is full or
/// [`QUANTIZED_SEARCH_CAP`] is reached. Returns how many partials were
/// written; the series is strictly increasing for a positive pseudo-octave.
pub fn quantized_partial_series(
    f0: f32,
    pseudo_octave_cents: f32,
    edo: u32,
    out: &mut [f32],
) -> usize {
    if out.is_empty() {
        return 0;
    }
    let ratio = exp2f(pseudo_octave_cents / 1200.0);
    let steps = edo.max(1) as f32;
    out[0] = f0;
    let mut found = 1;
    let mut harmonic = 1u32;
    while found < out.len() {
        let step = roundf(log2f(harmonic as f32) * steps);
        let hz = f0 * powf(ratio, step / steps);
        if hz != out[found - 1] {
            out[found] = hz;
            found += 1;
        }
        harmonic += 1;
        if harmonic == QUANTIZED_SEARCH_CAP {
            break;
        }
    }
    found
}

/// Frequency ratio tables for every [`FreqTweakMode`], indexed by partial.
///
/// `seed` drives the random detune row.
pub fn freq_tweak_ratios(seed: u64) -> [[f32; MAX_PARTIALS]; FreqTweakMode::COUNT] {
    let mut table = [[1.0; MAX_PARTIALS]; FreqTweakMode::COUNT];
    let mut rng = SmallRng::seed_from_u64(seed);

    for i in 0..MAX_PARTIALS {
        let n = (i + 1) as f32;
        // 1/5, 1/4, 1/3, 1/2, 1, 2, 3 ...
        let sub = if i < 6 { 1.0 / (6 - i) as f32 } else { (i - 4) as f32 };
        table[FreqTweakMode::Subharmonic.index()][i] = sub / n;

        // gaussian detune with a 12 semitone deviation
        let octaves: f32 = StandardNormal.sample(&mut rng);
        table[FreqTweakMode::RandomDetune.index()][i] = exp2f(octaves);

        table[FreqTweakMode::Collapse.index()][i] = 1.0 / n;

        let swapped = if i % 2 == 0 { n + 1.0 } else { n - 1.0 };
        table[FreqTweakMode::OddEvenSwap.index()][i] = swapped / n;

        table[FreqTweakMode::Inversion.index()][i] = (65.0 - n) / n;

        table[FreqTweakMode::StretchTop.index()][i] = if n < 17.0 {
            1.0
        } else {
            (17.0 + (n - 17.0) * 4.0) / n
        };
    }
    table
}

/// Gain of the per-voice shaping filter for one partial.
pub fn shaping_filter_gain(
    mode: ShapingFilterMode,
    morph: f32,
    hz: f32,
    shared: &SharedSynthesisData,
) -> f32 {
    let octave = frequency_as_octave(hz).max(0.0);
    let gain = match mode {
        ShapingFilterMode::Lowpass12 | ShapingFilterMode::Lowpass24 => {
            let cutoff = 11.0 * morph;
            if octave >= cutoff {
                let order = if mode == ShapingFilterMode::Lowpass12 { 2.0 } else { 4.0 };
                exp2f(-(octave - cutoff) * order)
            } else {
                1.0
            }
        }
        ShapingFilterMode::SineComb => 0.5 + 0.5 * sinf(TAU / 11.0 * octave * 8.0 + TAU * morph),
        ShapingFilterMode::OctaveRamp => fmodf(octave + morph, 1.0),
        ShapingFilterMode::Random => {
            shared.random_filter_gain(fmodf(octave * 2.0 + morph * 32.0, 62.0))
        }
    };
    gain.clamp(0.0, 1.0)
}

/// One polyphonic voice.
#[derive(Debug, Clone)]
pub struct Voice {
    id: NoteId,
    start_time: u64,
    serial: u64,
    available: bool,
    gate: bool,
    block_pos: usize,

    // settings
    num_partials: usize,
    active_partials: usize,
    gain_compensation: f32,
    envelope_params: [EnvelopeParams; 2],
    lfo_params: [LfoParams; LFO_COUNT],
    filter_mode: ShapingFilterMode,
    filter_morph: f32,
    tweak_mode: FreqTweakMode,
    tweak_mix: f32,
    tuning_mode: TuningMode,
    pseudo_octave_cents: f32,
    edo: u32,
    pan: f32,
    partials_balance: f32,
    pan_morph: f32,
    velocity_response_db: f32,
    burst_mix: f32,
    aux_send: f32,
    key_shift: i32,

    // modulators and performance state
    envelopes: [BlockAdsr; 2],
    lfos: [BlockLfo; LFO_COUNT],
    burst: BurstGenerator,
    cc_values: [f32; CC_INPUTS],
    cc_smoothers: [OnePoleSmoother; CC_INPUTS],
    pitch_bend: f32,
    pitch_adjust: f32,
    aftertouch: f32,
    velocity_gain: f32,

    // modulated values
    pitch_mod: f32,
    tweak_mix_mod: f32,
    filter_morph_mod: f32,
    amp_morph_vis: f32,
    envelope_vis: f32,
    aux_send_gain: f32,
    fundamental_hz: f32,
    lowest_hz: f32,
    highest_hz: f32,

    // partial bank
    freqs: [f32; MAX_PARTIALS],
    phases: [f32; MAX_PARTIALS],
    phase_incs: [f32; MAX_PARTIALS],
    amplitudes: [f32; MAX_PARTIALS],
    pans: [f32; MAX_PARTIALS],
    safety_gains: [f32; MAX_PARTIALS],
    shaping_gains: [f32; MAX_PARTIALS],
    gain_history: [f32; MAX_PARTIALS],
    pan_history: [f32; MAX_PARTIALS],
    sines: [f32; MAX_PARTIALS],
    tweak_ratios: [[f32; MAX_PARTIALS]; FreqTweakMode::COUNT],
}

impl Default for Voice {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Voice {
    /// Create an idle voice. `seed` decorrelates its random sources from
    /// other voices.
    pub fn new(seed: u64) -> Self {
        let base = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        Self {
            id: NoteId::default(),
            start_time: 0,
            serial: 0,
            available: true,
            gate: false,
            block_pos: 0,
            num_partials: MAX_PARTIALS,
            active_partials: MAX_PARTIALS,
            gain_compensation: partial_gain_compensation(MAX_PARTIALS),
            envelope_params: [EnvelopeParams::default(); 2],
            lfo_params: [LfoParams::default(); LFO_COUNT],
            filter_mode: ShapingFilterMode::default(),
            filter_morph: 1.0,
            tweak_mode: FreqTweakMode::default(),
            tweak_mix: 0.0,
            tuning_mode: TuningMode::default(),
            pseudo_octave_cents: 1200.0,
            edo: 12,
            pan: 0.5,
            partials_balance: 0.5,
            pan_morph: 0.5,
            velocity_response_db: DEFAULT_VELOCITY_RESPONSE_DB,
            burst_mix: 0.0,
            aux_send: 0.0,
            key_shift: 0,
            envelopes: [BlockAdsr::new(), BlockAdsr::new()],
            lfos: core::array::from_fn(|i| BlockLfo::new(base.wrapping_add(i as u64 + 1))),
            burst: BurstGenerator::new(base.wrapping_add(17)),
            cc_values: [0.0; CC_INPUTS],
            cc_smoothers: [OnePoleSmoother::new(PAN_SMOOTHING); CC_INPUTS],
            pitch_bend: 0.0,
            pitch_adjust: 0.0,
            aftertouch: 0.0,
            velocity_gain: 1.0,
            pitch_mod: 0.0,
            tweak_mix_mod: 0.0,
            filter_morph_mod: 1.0,
            amp_morph_vis: 0.5,
            envelope_vis: 0.0,
            aux_send_gain: 0.0,
            fundamental_hz: 440.0,
            lowest_hz: 0.0,
            highest_hz: 0.0,
            freqs: [440.0; MAX_PARTIALS],
            phases: [0.0; MAX_PARTIALS],
            phase_incs: [0.0; MAX_PARTIALS],
            amplitudes: [0.0; MAX_PARTIALS],
            pans: [0.5; MAX_PARTIALS],
            safety_gains: [0.0; MAX_PARTIALS],
            shaping_gains: [0.0; MAX_PARTIALS],
            gain_history: [0.0; MAX_PARTIALS],
            pan_history: [0.5; MAX_PARTIALS],
            sines: [0.0; MAX_PARTIALS],
            tweak_ratios: freq_tweak_ratios(base.wrapping_add(31)),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Start a note. The pool guarantees the voice is idle or being stolen.
    pub fn begin_note(&mut self, id: NoteId, velocity: f32) {
        self.block_pos = 0;
        self.id = id;
        self.velocity_gain = velocity_gain(velocity, self.velocity_response_db);
        self.gate = true;
        self.available = false;
        self.pitch_adjust = 0.0;
        self.aftertouch = 0.0;
        self.burst.begin();
        self.envelopes[0].attack_from(0.0);
        self.envelopes[1].attack_from(0.0);
        self.phases = [0.0; MAX_PARTIALS];
    }

    /// Close the gate; the envelopes enter release.
    pub fn end_note(&mut self) {
        self.gate = false;
    }

    pub(crate) fn stamp(&mut self, start_time: u64, serial: u64) {
        self.start_time = start_time;
        self.serial = serial;
    }

    /// Whether the voice is idle and may be allocated.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Whether the note is still held (or sustained).
    pub fn is_gate_on(&self) -> bool {
        self.gate
    }

    /// Address of the current or last note.
    pub fn note_id(&self) -> NoteId {
        self.id
    }

    /// Sample position at which the current note started.
    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    /// Allocation order of the current note.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    /// Set the partial count, clamped to `MIN_PARTIALS..=MAX_PARTIALS`.
    pub fn set_num_partials(&mut self, n: usize) {
        self.num_partials = n.clamp(MIN_PARTIALS, MAX_PARTIALS);
        self.active_partials = self.active_partials.min(self.num_partials);
        self.gain_compensation = partial_gain_compensation(self.num_partials);
    }

    /// Requested partial count.
    pub fn num_partials(&self) -> usize {
        self.num_partials
    }

    /// Partials actually rendered; lower than the requested count when the
    /// quantized search ran out of distinct frequencies.
    pub fn active_partials(&self) -> usize {
        self.active_partials
    }

    /// Current partial-count level compensation.
    pub fn gain_compensation(&self) -> f32 {
        self.gain_compensation
    }

    /// ADSR settings for envelope 0 (amplitude) or 1 (auxiliary).
    pub fn set_envelope_params(&mut self, which: usize, params: EnvelopeParams) {
        if let Some(slot) = self.envelope_params.get_mut(which) {
            *slot = params;
        }
    }

    /// LFO slot settings.
    pub fn set_lfo_params(&mut self, slot: usize, params: LfoParams) {
        if let Some(p) = self.lfo_params.get_mut(slot) {
            *p = LfoParams {
                deform: params.deform.clamp(-1.0, 1.0),
                ..params
            };
        }
    }

    /// Burst generator settings.
    pub fn set_burst_params(&mut self, params: BurstParams) {
        self.burst.set_params(params);
    }

    /// Blend between the amplitude envelope (0) and the burst generator (1).
    pub fn set_burst_mix(&mut self, mix: f32) {
        self.burst_mix = mix.clamp(0.0, 1.0);
    }

    /// Shaping filter mode.
    pub fn set_filter_mode(&mut self, mode: ShapingFilterMode) {
        self.filter_mode = mode;
    }

    /// Shaping filter morph, `0..=1`.
    pub fn set_filter_morph(&mut self, morph: f32) {
        self.filter_morph = morph.clamp(0.0, 1.0);
    }

    /// Frequency tweak mode.
    pub fn set_freq_tweak_mode(&mut self, mode: FreqTweakMode) {
        self.tweak_mode = mode;
    }

    /// Frequency tweak mix, `0..=1`.
    pub fn set_freq_tweak_mix(&mut self, mix: f32) {
        self.tweak_mix = mix.clamp(0.0, 1.0);
    }

    /// Partial spacing strategy.
    pub fn set_tuning_mode(&mut self, mode: TuningMode) {
        self.tuning_mode = mode;
    }

    /// Pseudo-octave used for partial spacing, in cents (at least 1).
    pub fn set_pseudo_octave(&mut self, cents: f32) {
        self.pseudo_octave_cents = cents.max(1.0);
    }

    /// Divisions of the pseudo-octave for quantized spacing (at least 1).
    pub fn set_edo(&mut self, edo: u32) {
        self.edo = edo.max(1);
    }

    /// Voice pan, `0..=1`.
    pub fn set_pan(&mut self, pan: f32) {
        self.pan = pan.clamp(0.0, 1.0);
    }

    /// Amplitude morph position, `0..=1`.
    pub fn set_partials_balance(&mut self, balance: f32) {
        self.partials_balance = balance.clamp(0.0, 1.0);
    }

    /// Pan morph position, `0..=1`.
    pub fn set_partials_pan_morph(&mut self, morph: f32) {
        self.pan_morph = morph.clamp(0.0, 1.0);
    }

    /// Level of velocity 0 in dB (velocity 1 is always 0 dB).
    pub fn set_velocity_response(&mut self, db: f32) {
        self.velocity_response_db = db.min(0.0);
    }

    /// Base auxiliary send, `0..=1`.
    pub fn set_aux_send(&mut self, level: f32) {
        self.aux_send = level.clamp(0.0, 1.0);
    }

    /// Transpose in semitones applied on top of the played key.
    pub fn set_key_shift(&mut self, semitones: i32) {
        self.key_shift = semitones;
    }

    /// Raw value of CC input `index` (0..4), `0..=1`.
    pub fn set_cc(&mut self, index: usize, value: f32) {
        if let Some(slot) = self.cc_values.get_mut(index) {
            *slot = value.clamp(0.0, 1.0);
        }
    }

    /// Pitch bend in semitones.
    pub fn set_pitch_bend(&mut self, semitones: f32) {
        self.pitch_bend = semitones;
    }

    /// Polyphonic aftertouch, `0..=1`.
    pub fn set_aftertouch(&mut self, amount: f32) {
        self.aftertouch = amount.clamp(0.0, 1.0);
    }

    /// Apply a per-note expression.
    pub fn apply_expression(&mut self, expression: NoteExpression, value: f32) {
        match expression {
            NoteExpression::Tuning => self.pitch_adjust = value,
            NoteExpression::Pan => self.set_pan(value),
            NoteExpression::Pressure => self.set_aftertouch(value),
        }
    }

    /// Apply a polyphonic parameter value.
    pub fn apply_poly_param(&mut self, param: PolyParam, value: f32) {
        match param {
            PolyParam::FilterMorph => self.set_filter_morph(value),
            PolyParam::Pan => self.set_pan(value),
        }
    }

    // ------------------------------------------------------------------
    // Visualization
    // ------------------------------------------------------------------

    /// Frequency of partial `index` in Hz, or `None` past [`MAX_PARTIALS`].
    pub fn partial_frequency(&self, index: usize) -> Option<f32> {
        self.freqs.get(index).copied()
    }

    /// Smoothed gain of partial `index` after the last rendered frame.
    pub fn partial_amplitude(&self, index: usize) -> Option<f32> {
        self.amplitudes.get(index).copied()
    }

    /// Smoothed pan of partial `index` after the last rendered frame.
    pub fn partial_pan(&self, index: usize) -> Option<f32> {
        self.pans.get(index).copied()
    }

    /// Fundamental after tuning and pitch modulation.
    pub fn fundamental_hz(&self) -> f32 {
        self.fundamental_hz
    }

    /// Lowest rendered partial frequency.
    pub fn lowest_frequency(&self) -> f32 {
        self.lowest_hz
    }

    /// Highest rendered partial frequency.
    pub fn highest_frequency(&self) -> f32 {
        self.highest_hz
    }

    /// Envelope-times-volume gain of the last rendered frame.
    pub fn envelope_level(&self) -> f32 {
        self.envelope_vis
    }

    /// Modulated amplitude morph position of the last rendered frame.
    pub fn amp_morph_position(&self) -> f32 {
        self.amp_morph_vis
    }

    /// Linear auxiliary send gain of the last rendered frame.
    pub fn aux_send_gain(&self) -> f32 {
        self.aux_send_gain
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Recompute partial frequencies, phase increments and filter gains.
    pub fn update_state(&mut self, shared: &SharedSynthesisData) {
        let key = (self.id.key + self.key_shift) as f32;
        let pitch = key + self.pitch_bend + self.pitch_mod + self.pitch_adjust;
        let mapped = match shared.pitch_quantize {
            PitchQuantizeMode::Continuous => shared.remap_key(pitch),
            PitchQuantizeMode::NearestKey => shared.remap_key(roundf(pitch)),
            PitchQuantizeMode::Unquantized => {
                shared.remap_key(key + self.pitch_adjust) + self.pitch_bend + self.pitch_mod
            }
        };
        self.fundamental_hz = MIDI_0_FREQ * exp2f(mapped / 12.0);

        let n = self.num_partials;
        self.active_partials = match self.tuning_mode {
            TuningMode::Harmonic => {
                harmonic_partial_series(
                    self.fundamental_hz,
                    self.pseudo_octave_cents,
                    &mut self.freqs[..n],
                );
                n
            }
            TuningMode::Quantized => quantized_partial_series(
                self.fundamental_hz,
                self.pseudo_octave_cents,
                self.edo,
                &mut self.freqs[..n],
            ),
        };

        let sr_inv = shared.rates().sample_rate_inv();
        let tweaks = &self.tweak_ratios[self.tweak_mode.index()];
        let mut lowest = f32::MAX;
        let mut highest = 0.0_f32;
        for i in 0..self.active_partials {
            let ratio = 1.0 + (tweaks[i] - 1.0) * self.tweak_mix_mod;
            let pf = (self.freqs[i] * ratio).clamp(MIN_PARTIAL_HZ, MAX_PARTIAL_HZ);
            let mut inc = TAU * sr_inv * pf;
            if inc >= TAU {
                inc = fmodf(inc, TAU);
            }
            self.freqs[i] = pf;
            self.phase_incs[i] = inc;
            self.safety_gains[i] = shared.safety_filter_coefficient(pf);
            self.shaping_gains[i] =
                shaping_filter_gain(self.filter_mode, self.filter_morph_mod, pf, shared);
            lowest = lowest.min(pf);
            highest = highest.max(pf);
            debug_assert!((0.0..TAU).contains(&self.phase_incs[i]));
        }
        self.lowest_hz = lowest;
        self.highest_hz = highest;
    }

    /// Render and accumulate into `left` and `right`, which must have the
    /// same length. Stops early once the amplitude envelope has finished.
    pub fn process(&mut self, shared: &SharedSynthesisData, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        let rates = shared.rates();

        for (out_l, out_r) in left.iter_mut().zip(right.iter_mut()) {
            let bp = self.block_pos;
            if bp == 0 {
                self.envelopes[0].process_block(&self.envelope_params[0], self.gate, rates);
                self.envelopes[1].process_block(&self.envelope_params[1], self.gate, rates);
                for (lfo, p) in self.lfos.iter_mut().zip(self.lfo_params.iter()) {
                    lfo.process_block(p.rate, p.deform, p.shape, rates);
                }
                self.burst.process_block(rates);
            }

            let env = self.envelopes[0].output_cache[bp];
            let burst = self.burst.output_block()[bp];
            let mut sources: ModSourceValues = [0.0; ModSource::COUNT];
            for (slot, lfo) in sources[..LFO_COUNT].iter_mut().zip(self.lfos.iter()) {
                *slot = lfo.output_block[bp];
            }
            sources[ModSource::Eg0.index()] = env - self.envelope_params[0].sustain;
            sources[ModSource::Eg1.index()] = self.envelopes[1].output_cache[bp];
            sources[ModSource::Burst.index()] = burst;
            sources[ModSource::PolyAftertouch.index()] = self.aftertouch * 2.0;
            for i in 0..CC_INPUTS {
                sources[ModSource::CcA.index() + i] =
                    self.cc_smoothers[i].process(self.cc_values[i]) * 2.0;
            }
            let d = shared.mod_matrix.project(&sources);

            self.pitch_mod = d[ModTarget::Pitch.index()] * 12.0;
            self.tweak_mix_mod =
                (self.tweak_mix + d[ModTarget::PartialRemapMorph.index()] * 0.5).clamp(0.0, 1.0);
            self.filter_morph_mod =
                (self.filter_morph + d[ModTarget::FilterMorph.index()] * 0.5).clamp(0.0, 1.0);
            let volume_db =
                (24.0 * d[ModTarget::Volume.index()] + BASE_VOLUME_DB).clamp(-96.0, 0.0);
            let aux = (self.aux_send + d[ModTarget::AuxSendA.index()]).clamp(0.0, 1.0);
            self.aux_send_gain = db_to_linear(-48.0 + 48.0 * aux);

            if bp == 0 {
                self.update_state(shared);
            }

            let n = self.active_partials;
            sine_block(&self.phases[..n], &mut self.sines[..n]);

            let amp_mix = (self.partials_balance + d[ModTarget::PartialVolumesMorph.index()] * 0.5)
                .clamp(0.0, 1.0);
            self.amp_morph_vis = amp_mix;
            let amp_pos = MorphPosition::new(amp_mix);
            let pan_mix =
                (self.pan_morph + d[ModTarget::PartialPansMorph.index()] * 0.5).clamp(0.0, 1.0);
            let pan_pos = MorphPosition::new(pan_mix);
            let amp_table = shared.amp_morph_table();
            let pan_table = shared.pan_morph_table();

            let mut sum_l = 0.0;
            let mut sum_r = 0.0;
            for i in 0..n {
                let f = self.freqs[i];
                if (MIN_PARTIAL_HZ..MAX_PARTIAL_HZ).contains(&f) {
                    let target = amp_table.interpolate(amp_pos, i)
                        * self.shaping_gains[i]
                        * self.safety_gains[i];
                    let gain = one_pole_step(&mut self.gain_history[i], target, GAIN_SMOOTHING);
                    self.amplitudes[i] = gain;

                    let composed = pan_table.interpolate(pan_pos, i) - 0.5 + self.pan;
                    let pan_target = reflect_unit(composed);
                    let pan = one_pole_step(&mut self.pan_history[i], pan_target, PAN_SMOOTHING);
                    self.pans[i] = pan;

                    let (lg, rg) = shared.pan_gains(pan);
                    let s = self.sines[i] * gain;
                    sum_l += s * lg;
                    sum_r += s * rg;
                } else {
                    self.amplitudes[i] = 0.0;
                }

                let mut phase = self.phases[i] + self.phase_incs[i];
                if phase >= TAU {
                    phase -= TAU;
                }
                self.phases[i] = phase;
            }

            let final_gain =
                ((1.0 - self.burst_mix) * env + self.burst_mix * burst) * db_to_linear(volume_db);
            self.envelope_vis = final_gain;
            let g = self.velocity_gain * final_gain * self.gain_compensation;
            *out_l += sum_l * g;
            *out_r += sum_r * g;

            self.block_pos = (bp + 1) % BLOCK_SIZE;
            if self.envelopes[0].is_finished() {
                self.available = true;
                break;
            }
        }
    }
}
