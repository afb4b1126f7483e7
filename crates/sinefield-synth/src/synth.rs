//! Polyphonic synth: voice pool, event handling and block rendering.
//!
//! [`Synth`] owns a fixed pool of [`Voice`]s and a [`SynthHandle`] to the
//! shared tables. Note and controller events arrive through the `handle_*`
//! methods; audio is produced by [`Synth::process_block`], which locks the
//! shared tables once per block, sums all sounding voices into an internal
//! stereo mix buffer, soft-clips it and writes the destination.
//!
//! # Example
//!
//! ```rust
//! use sinefield_synth::Synth;
//!
//! let mut synth: Synth<8> = Synth::new();
//! synth.prepare(48000.0, 256);
//! synth.handle_note_on(0, 0, 60, -1, 1.0);
//!
//! let mut left = vec![0.0; 256];
//! let mut right = vec![0.0; 256];
//! synth.process_block(&mut left, &mut right);
//! assert!(left.iter().all(|s| s.abs() <= 1.0));
//! ```

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use sinefield_core::soft_clip;
use tracing::{debug, info, warn};

use crate::burst::BurstParams;
use crate::envelope::EnvelopeParams;
use crate::mod_matrix::{ModSource, ModTarget};
use crate::morph::MorphTable;
use crate::params::{
    FreqTweakMode, LfoParams, NoteExpression, PitchQuantizeMode, PolyParam, ShapingFilterMode,
    TuningMode,
};
use crate::shared::SharedSynthesisData;
use crate::tuning::{KeyboardMapping, Scale, Tuning, TuningError};
use crate::voice::{NoteId, Voice};

/// Voice count of [`DefaultSynth`].
pub const DEFAULT_VOICES: usize = 16;
/// Block size the mix buffer holds before [`Synth::prepare`] is called.
pub const DEFAULT_MAX_BLOCK_FRAMES: usize = 512;
/// Pitch bend range in keys before it is changed.
pub const DEFAULT_PITCH_BEND_RANGE: f32 = 2.0;

const SUSTAIN_PEDAL_CC: u8 = 64;
const FIRST_CC_INPUT: u8 = 41;
const LAST_CC_INPUT: u8 = 44;

/// Synth with the default voice count.
pub type DefaultSynth = Synth<DEFAULT_VOICES>;

/// Clonable handle to the shared synthesis tables.
///
/// Control threads use it to swap morph presets, modulation depths and the
/// tuning. The audio thread holds the same lock for one block at a time, so
/// keep critical sections short.
#[derive(Debug, Clone)]
pub struct SynthHandle {
    inner: Arc<Mutex<SharedSynthesisData>>,
}

impl Default for SynthHandle {
    fn default() -> Self {
        Self::new(SharedSynthesisData::new())
    }
}

impl SynthHandle {
    /// Wrap shared data in a handle.
    pub fn new(data: SharedSynthesisData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(data)),
        }
    }

    /// Lock the shared data.
    pub fn lock(&self) -> MutexGuard<'_, SharedSynthesisData> {
        self.inner.lock()
    }

    /// Run `f` with the shared data locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut SharedSynthesisData) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Select an amplitude morph preset (0..9, or 9 for the custom table).
    pub fn set_volume_morph_preset(&self, index: usize) -> bool {
        let changed = self.lock().set_volume_morph_preset(index);
        debug!(index, changed, "amplitude morph preset");
        changed
    }

    /// Select a pan morph preset (0..4).
    pub fn set_pan_morph_preset(&self, index: usize) -> bool {
        let changed = self.lock().set_pan_morph_preset(index);
        debug!(index, changed, "pan morph preset");
        changed
    }

    /// Set one modulation matrix depth.
    pub fn set_modulation_depth(&self, source: ModSource, target: ModTarget, depth: f32) {
        self.lock().mod_matrix.set_depth(source, target, depth);
    }

    /// Set how modulated pitch passes through the tuning.
    pub fn set_pitch_quantize(&self, mode: PitchQuantizeMode) {
        self.lock().pitch_quantize = mode;
    }

    /// Write one cell of the custom amplitude table.
    pub fn set_custom_morph_value(&self, frame: usize, partial: usize, value: f32) {
        self.lock().set_custom_morph_value(frame, partial, value);
    }

    /// Replace the custom amplitude table.
    pub fn set_custom_morph_table(&self, table: MorphTable) {
        self.lock().set_custom_morph_table(table);
    }
}

/// Polyphonic additive synthesizer with `VOICES` voices.
#[derive(Debug)]
pub struct Synth<const VOICES: usize> {
    voices: [Voice; VOICES],
    shared: SynthHandle,
    mix_left: Vec<f32>,
    mix_right: Vec<f32>,
    max_block_frames: usize,
    active_voices: usize,
    sustain: bool,
    pitch_bend: f32,
    pitch_bend_range: f32,
    time: u64,
    serial: u64,
    tuning_error: Option<TuningError>,
}

impl<const VOICES: usize> Default for Synth<VOICES> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const VOICES: usize> Synth<VOICES> {
    /// Create a synth at 48 kHz with [`DEFAULT_MAX_BLOCK_FRAMES`] of mix
    /// buffer. Call [`prepare`](Self::prepare) before rendering.
    pub fn new() -> Self {
        Self {
            voices: core::array::from_fn(|i| Voice::new(i as u64)),
            shared: SynthHandle::default(),
            mix_left: vec![0.0; DEFAULT_MAX_BLOCK_FRAMES],
            mix_right: vec![0.0; DEFAULT_MAX_BLOCK_FRAMES],
            max_block_frames: DEFAULT_MAX_BLOCK_FRAMES,
            active_voices: 0,
            sustain: false,
            pitch_bend: 0.0,
            pitch_bend_range: DEFAULT_PITCH_BEND_RANGE,
            time: 0,
            serial: 0,
            tuning_error: None,
        }
    }

    /// Set the sample rate and size the mix buffer for blocks of up to
    /// `max_block_frames`. Longer blocks are still accepted and rendered in
    /// chunks.
    pub fn prepare(&mut self, sample_rate: f32, max_block_frames: usize) {
        let max_block_frames = max_block_frames.max(1);
        self.shared.lock().set_sample_rate(sample_rate);
        self.mix_left = vec![0.0; max_block_frames];
        self.mix_right = vec![0.0; max_block_frames];
        self.max_block_frames = max_block_frames;
        info!(sample_rate, max_block_frames, voices = VOICES, "synth prepared");
    }

    /// Handle to the shared tables, for use from other threads.
    pub fn handle(&self) -> SynthHandle {
        self.shared.clone()
    }

    /// Sample rate last passed to [`prepare`](Self::prepare).
    pub fn sample_rate(&self) -> f32 {
        self.shared.lock().rates().sample_rate()
    }

    /// Largest block rendered in one pass.
    pub fn max_block_frames(&self) -> usize {
        self.max_block_frames
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Render `left.len()` frames, overwriting both buffers.
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        let frames = left.len().min(right.len());
        if frames == 0 {
            return;
        }
        let shared = self.shared.inner.lock();

        let mut peak_active = 0;
        let mut offset = 0;
        while offset < frames {
            let n = (frames - offset).min(self.max_block_frames);
            let mix_l = &mut self.mix_left[..n];
            let mix_r = &mut self.mix_right[..n];
            mix_l.fill(0.0);
            mix_r.fill(0.0);

            let mut active = 0;
            for voice in self.voices.iter_mut().filter(|v| !v.is_available()) {
                active += 1;
                voice.process(&shared, mix_l, mix_r);
            }
            peak_active = peak_active.max(active);

            for (dst, src) in left[offset..offset + n].iter_mut().zip(mix_l.iter()) {
                *dst = soft_clip(*src);
            }
            for (dst, src) in right[offset..offset + n].iter_mut().zip(mix_r.iter()) {
                *dst = soft_clip(*src);
            }

            offset += n;
            self.time += n as u64;
        }
        self.active_voices = peak_active;
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Start a note. Takes the first idle voice, or steals the voice that
    /// started earliest.
    pub fn handle_note_on(&mut self, port: i32, channel: i32, key: i32, note_id: i32, velocity: f32) {
        if VOICES == 0 {
            return;
        }
        let index = match self.voices.iter().position(Voice::is_available) {
            Some(index) => index,
            None => {
                let index = self.oldest_voice();
                debug!(index, key, stolen_key = self.voices[index].note_id().key, "voice steal");
                index
            }
        };

        self.serial += 1;
        let shared = self.shared.inner.lock();
        let voice = &mut self.voices[index];
        voice.begin_note(NoteId::new(port, channel, key, note_id), velocity);
        voice.set_pitch_bend(self.pitch_bend);
        voice.update_state(&shared);
        voice.stamp(self.time, self.serial);
    }

    /// Release every sounding voice matching the address (-1 matches
    /// anything). Ignored while the sustain pedal is held.
    pub fn handle_note_off(&mut self, port: i32, channel: i32, key: i32, note_id: i32) {
        if self.sustain {
            return;
        }
        let query = NoteId::new(port, channel, key, note_id);
        for voice in self.voices.iter_mut() {
            if !voice.is_available() && voice.note_id().matches(&query) {
                voice.end_note();
                voice.set_aftertouch(0.0);
            }
        }
    }

    /// Controller change. CC 64 is the sustain pedal; CC 41 to 44 feed the
    /// four CC modulation inputs.
    pub fn handle_cc(&mut self, _port: i32, _channel: i32, cc: u8, value: u8) {
        match cc {
            SUSTAIN_PEDAL_CC => {
                let down = value >= 64;
                let released = self.sustain && !down;
                self.sustain = down;
                if released {
                    self.handle_note_off(-1, -1, -1, -1);
                }
            }
            FIRST_CC_INPUT..=LAST_CC_INPUT => {
                let index = usize::from(cc - FIRST_CC_INPUT);
                let v = f32::from(value) / 127.0;
                for voice in self.voices.iter_mut() {
                    voice.set_cc(index, v);
                }
            }
            _ => {}
        }
    }

    /// Pitch bend in `-1..=1`, scaled by the bend range. Applied to every
    /// voice, idle ones included, so a note started later inherits it.
    pub fn handle_pitch_bend(&mut self, _port: i32, _channel: i32, value: f32) {
        self.pitch_bend = value.clamp(-1.0, 1.0) * self.pitch_bend_range;
        let shared = self.shared.inner.lock();
        for voice in self.voices.iter_mut() {
            voice.set_pitch_bend(self.pitch_bend);
            voice.update_state(&shared);
        }
    }

    /// Polyphonic aftertouch in `0..=1` for sounding voices on `key`.
    pub fn handle_poly_aftertouch(&mut self, _port: i32, _channel: i32, key: i32, value: f32) {
        for voice in self.voices.iter_mut() {
            if !voice.is_available() && voice.note_id().key == key {
                voice.set_aftertouch(value);
            }
        }
    }

    /// Per-note expression for every sounding voice matching the address.
    pub fn apply_note_expression(
        &mut self,
        port: i32,
        channel: i32,
        key: i32,
        note_id: i32,
        expression: NoteExpression,
        value: f32,
    ) {
        let query = NoteId::new(port, channel, key, note_id);
        for voice in self.voices.iter_mut() {
            if !voice.is_available() && voice.note_id().matches(&query) {
                voice.apply_expression(expression, value);
            }
        }
    }

    /// Polyphonic parameter value for every sounding voice matching the
    /// address.
    pub fn apply_parameter_modulation(
        &mut self,
        port: i32,
        channel: i32,
        key: i32,
        note_id: i32,
        param: PolyParam,
        value: f32,
    ) {
        let query = NoteId::new(port, channel, key, note_id);
        for voice in self.voices.iter_mut() {
            if !voice.is_available() && voice.note_id().matches(&query) {
                voice.apply_poly_param(param, value);
            }
        }
    }

    fn oldest_voice(&self) -> usize {
        self.voices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| (v.start_time(), v.serial()))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Tuning
    // ------------------------------------------------------------------

    /// Retune the keyboard to `edo` equal steps of `pseudo_octave_cents`
    /// and use the same values for partial spacing. On failure the previous
    /// tuning stays and the error is kept until the next successful update.
    pub fn set_edo_parameters(&mut self, pseudo_octave_cents: f32, edo: u32) -> Result<(), TuningError> {
        let mapping = self.shared.lock().tuning().keyboard_mapping().clone();
        let result = Tuning::equal_division(f64::from(pseudo_octave_cents), edo, mapping);
        let applied = self.install_tuning(result, "equal division");
        if applied.is_ok() {
            for voice in self.voices.iter_mut() {
                voice.set_pseudo_octave(pseudo_octave_cents);
                voice.set_edo(edo);
            }
        }
        applied
    }

    /// Load a scale from Scala `.scl` text, keeping the current keyboard
    /// mapping.
    pub fn import_scala_text(&mut self, text: &str) -> Result<(), TuningError> {
        let mapping = self.shared.lock().tuning().keyboard_mapping().clone();
        let result = Scale::parse_scala(text).and_then(|scale| Tuning::new(scale, mapping));
        self.install_tuning(result, "scala scale")
    }

    /// Load a keyboard mapping from Scala `.kbm` text, keeping the current
    /// scale.
    pub fn import_kbm_text(&mut self, text: &str) -> Result<(), TuningError> {
        let scale = self.shared.lock().tuning().scale().clone();
        let result = KeyboardMapping::parse_kbm(text).and_then(|mapping| Tuning::new(scale, mapping));
        self.install_tuning(result, "keyboard mapping")
    }

    /// Restore 12-tone equal temperament on the default mapping.
    pub fn reset_tuning(&mut self) {
        self.shared.lock().set_tuning(Tuning::default());
        self.tuning_error = None;
        debug!("tuning reset to 12-TET");
    }

    fn install_tuning(
        &mut self,
        result: Result<Tuning, TuningError>,
        source: &str,
    ) -> Result<(), TuningError> {
        match result {
            Ok(tuning) => {
                debug!(source, degrees = tuning.scale().count(), "tuning installed");
                self.shared.lock().set_tuning(tuning);
                self.tuning_error = None;
                Ok(())
            }
            Err(err) => {
                warn!(source, error = %err, "tuning update rejected, keeping previous tuning");
                self.tuning_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Whether the last tuning update failed.
    pub fn has_tuning_error(&self) -> bool {
        self.tuning_error.is_some()
    }

    /// Error of the last failed tuning update, cleared by a successful one.
    pub fn tuning_error(&self) -> Option<&TuningError> {
        self.tuning_error.as_ref()
    }

    /// Message of the last failed tuning update.
    pub fn tuning_error_message(&self) -> Option<String> {
        self.tuning_error.as_ref().map(ToString::to_string)
    }

    // ------------------------------------------------------------------
    // Shared tables
    // ------------------------------------------------------------------

    /// Select an amplitude morph preset. Returns false for unknown indices.
    pub fn set_volume_morph_preset(&mut self, index: usize) -> bool {
        self.shared.set_volume_morph_preset(index)
    }

    /// Select a pan morph preset. Returns false for unknown indices.
    pub fn set_pan_morph_preset(&mut self, index: usize) -> bool {
        self.shared.set_pan_morph_preset(index)
    }

    /// Set one modulation matrix depth.
    pub fn set_modulation_depth(&mut self, source: ModSource, target: ModTarget, depth: f32) {
        self.shared.set_modulation_depth(source, target, depth);
    }

    /// Set how modulated pitch passes through the tuning.
    pub fn set_pitch_quantize(&mut self, mode: PitchQuantizeMode) {
        self.shared.set_pitch_quantize(mode);
    }

    // ------------------------------------------------------------------
    // Voice parameters
    // ------------------------------------------------------------------

    fn for_each_voice(&mut self, mut f: impl FnMut(&mut Voice)) {
        for voice in self.voices.iter_mut() {
            f(voice);
        }
    }

    /// Partial count for every voice, `2..=64`.
    pub fn set_num_partials(&mut self, n: usize) {
        self.for_each_voice(|v| v.set_num_partials(n));
    }

    /// ADSR settings of envelope 0 (amplitude) or 1 (auxiliary).
    pub fn set_envelope_params(&mut self, which: usize, params: EnvelopeParams) {
        self.for_each_voice(|v| v.set_envelope_params(which, params));
    }

    /// Settings of LFO slot `slot` (0..4).
    pub fn set_lfo_params(&mut self, slot: usize, params: LfoParams) {
        self.for_each_voice(|v| v.set_lfo_params(slot, params));
    }

    /// Shaping filter mode.
    pub fn set_filter_mode(&mut self, mode: ShapingFilterMode) {
        self.for_each_voice(|v| v.set_filter_mode(mode));
    }

    /// Shaping filter morph.
    pub fn set_filter_morph(&mut self, morph: f32) {
        self.for_each_voice(|v| v.set_filter_morph(morph));
    }

    /// Voice pan.
    pub fn set_pan(&mut self, pan: f32) {
        self.for_each_voice(|v| v.set_pan(pan));
    }

    /// Amplitude morph position.
    pub fn set_partials_balance(&mut self, balance: f32) {
        self.for_each_voice(|v| v.set_partials_balance(balance));
    }

    /// Pan morph position.
    pub fn set_partials_pan_morph(&mut self, morph: f32) {
        self.for_each_voice(|v| v.set_partials_pan_morph(morph));
    }

    /// Frequency tweak mode.
    pub fn set_freq_tweak_mode(&mut self, mode: FreqTweakMode) {
        self.for_each_voice(|v| v.set_freq_tweak_mode(mode));
    }

    /// Frequency tweak mix.
    pub fn set_freq_tweak_mix(&mut self, mix: f32) {
        self.for_each_voice(|v| v.set_freq_tweak_mix(mix));
    }

    /// Harmonic or quantized partial spacing.
    pub fn set_tuning_mode(&mut self, mode: TuningMode) {
        self.for_each_voice(|v| v.set_tuning_mode(mode));
    }

    /// Velocity 0 level in dB.
    pub fn set_velocity_response(&mut self, db: f32) {
        self.for_each_voice(|v| v.set_velocity_response(db));
    }

    /// Burst generator settings.
    pub fn set_burst_params(&mut self, params: BurstParams) {
        self.for_each_voice(|v| v.set_burst_params(params));
    }

    /// Envelope/burst mix.
    pub fn set_burst_mix(&mut self, mix: f32) {
        self.for_each_voice(|v| v.set_burst_mix(mix));
    }

    /// Base auxiliary send.
    pub fn set_aux_send(&mut self, level: f32) {
        self.for_each_voice(|v| v.set_aux_send(level));
    }

    /// Transpose in semitones.
    pub fn set_key_shift(&mut self, semitones: i32) {
        self.for_each_voice(|v| v.set_key_shift(semitones));
    }

    /// Pitch bend range in keys. Takes effect on the next bend message.
    pub fn set_pitch_bend_range(&mut self, keys: f32) {
        self.pitch_bend_range = keys.max(0.0);
    }

    /// Pitch bend range in keys.
    pub fn pitch_bend_range(&self) -> f32 {
        self.pitch_bend_range
    }

    /// Current pitch bend in keys.
    pub fn pitch_bend(&self) -> f32 {
        self.pitch_bend
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    /// Most voices sounding at once during the last rendered block, across
    /// all of its internal chunks.
    pub fn active_voice_count(&self) -> usize {
        self.active_voices
    }

    /// Voices currently not idle.
    pub fn sounding_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_available()).count()
    }

    /// Whether the sustain pedal is down.
    pub fn is_sustain_held(&self) -> bool {
        self.sustain
    }

    /// Frames rendered since construction.
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Every voice.
    pub fn voices(&self) -> &[Voice; VOICES] {
        &self.voices
    }

    /// One voice.
    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }
}
