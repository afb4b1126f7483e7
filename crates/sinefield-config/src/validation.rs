//! Patch validation.
//!
//! [`validate_config`] checks every numeric field of a [`SynthConfig`] against
//! its allowed range and parses any embedded Scala text, collecting all
//! problems instead of stopping at the first one.

use sinefield_synth::{
    KeyboardMapping, MAX_PARTIALS, MIN_PARTIALS, Scale, Tuning, TuningError,
};
use thiserror::Error;

use crate::patch::{ENVELOPE_SLOTS, LFO_SLOTS, SynthConfig};

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Parameter value out of range.
    #[error("parameter '{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted path of the parameter.
        param: String,
        /// The value that was out of range.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Invalid parameter format.
    #[error("invalid format for parameter '{param}': {reason}")]
    InvalidFormat {
        /// Dotted path of the parameter.
        param: String,
        /// Description of the format error.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[derive(Default)]
struct Collector {
    errors: Vec<ValidationError>,
}

impl Collector {
    fn range(&mut self, param: impl Into<String>, value: f64, min: f64, max: f64) {
        if !(value >= min && value <= max) {
            self.errors.push(ValidationError::OutOfRange {
                param: param.into(),
                value,
                min,
                max,
            });
        }
    }

    fn unit(&mut self, param: impl Into<String>, value: f32) {
        self.range(param, f64::from(value), 0.0, 1.0);
    }

    fn count(&mut self, param: &str, len: usize, max: usize) {
        if len > max {
            self.errors.push(ValidationError::InvalidFormat {
                param: param.to_string(),
                reason: format!("at most {max} entries, found {len}"),
            });
        }
    }

    fn tuning(&mut self, param: &str, result: Result<(), TuningError>) {
        if let Err(err) = result {
            self.errors.push(ValidationError::InvalidFormat {
                param: param.to_string(),
                reason: err.to_string(),
            });
        }
    }

    fn finish(mut self) -> ValidationResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(ValidationError::Multiple(self.errors)),
        }
    }
}

/// Check every field of a patch.
pub fn validate_config(patch: &SynthConfig) -> ValidationResult<()> {
    let mut c = Collector::default();

    let v = &patch.voice;
    c.range(
        "voice.num_partials",
        v.num_partials as f64,
        MIN_PARTIALS as f64,
        MAX_PARTIALS as f64,
    );
    c.unit("voice.pan", v.pan);
    c.unit("voice.partials_balance", v.partials_balance);
    c.unit("voice.pan_morph", v.pan_morph);
    c.range("voice.velocity_response_db", f64::from(v.velocity_response_db), -96.0, 0.0);
    c.range("voice.key_shift", f64::from(v.key_shift), -48.0, 48.0);
    c.unit("voice.aux_send", v.aux_send);
    c.unit("voice.burst_mix", v.burst_mix);

    c.count("envelopes", patch.envelopes.len(), ENVELOPE_SLOTS);
    c.count("lfos", patch.lfos.len(), LFO_SLOTS);

    for (i, env) in patch.envelopes.iter().enumerate() {
        c.unit(format!("envelopes[{i}].attack"), env.attack);
        c.unit(format!("envelopes[{i}].decay"), env.decay);
        c.unit(format!("envelopes[{i}].sustain"), env.sustain);
        c.unit(format!("envelopes[{i}].release"), env.release);
    }

    for (i, lfo) in patch.lfos.iter().enumerate() {
        c.range(format!("lfos[{i}].rate"), f64::from(lfo.rate), -8.0, 8.0);
        c.range(format!("lfos[{i}].deform"), f64::from(lfo.deform), -1.0, 1.0);
    }

    c.unit("filter.morph", patch.filter.morph);
    c.unit("tweak.mix", patch.tweak.mix);

    let b = &patch.burst;
    c.range("burst.duration", f64::from(b.duration), 0.01, 60.0);
    c.range("burst.count", f64::from(b.count), 1.0, 64.0);
    c.unit("burst.probability", b.probability);
    c.unit("burst.distribution", b.distribution);

    c.range(
        "morph.volume_preset",
        patch.morph.volume_preset as f64,
        0.0,
        sinefield_synth::CUSTOM_AMPLITUDE_PRESET as f64,
    );
    c.range(
        "morph.pan_preset",
        patch.morph.pan_preset as f64,
        0.0,
        (sinefield_synth::PAN_PRESET_COUNT - 1) as f64,
    );

    for (i, route) in patch.routes.iter().enumerate() {
        c.range(format!("routes[{i}].depth"), f64::from(route.depth), -1.0, 1.0);
    }

    let t = &patch.tuning;
    c.range("tuning.pseudo_octave_cents", f64::from(t.pseudo_octave_cents), 1.0, 4800.0);
    c.range("tuning.edo", f64::from(t.edo), 1.0, 128.0);
    c.range("tuning.pitch_bend_range", f64::from(t.pitch_bend_range), 0.0, 48.0);

    let scale = match t.scala.as_deref() {
        Some(text) => match Scale::parse_scala(text) {
            Ok(scale) => Some(scale),
            Err(err) => {
                c.tuning("tuning.scala", Err(err));
                None
            }
        },
        None => Scale::even_division_of_cents(f64::from(t.pseudo_octave_cents), t.edo).ok(),
    };
    let mapping = match t.kbm.as_deref() {
        Some(text) => match KeyboardMapping::parse_kbm(text) {
            Ok(mapping) => Some(mapping),
            Err(err) => {
                c.tuning("tuning.kbm", Err(err));
                None
            }
        },
        None => Some(KeyboardMapping::default()),
    };
    if let (Some(scale), Some(mapping)) = (scale, mapping) {
        c.tuning("tuning", Tuning::new(scale, mapping).map(|_| ()));
    }

    c.finish()
}
