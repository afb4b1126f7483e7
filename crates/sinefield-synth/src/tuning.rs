//! Microtonal tuning: scales, keyboard mappings, and the note-to-frequency table.
//!
//! A [`Scale`] lists the pitch of each degree above the root in cents; its
//! last degree is the period (the "pseudo-octave"). A [`KeyboardMapping`]
//! says which key sits on the scale root, which key is pinned to a reference
//! frequency, and optionally which scale degree each key plays. [`Tuning`]
//! combines the two into a 512-entry table covering keys -256..=255.
//!
//! Scales can come from an equal division of any number of cents or from
//! Scala `.scl` text; mappings from the defaults or Scala `.kbm` text. Both
//! parsers take text, not paths.
//!
//! # Example
//!
//! ```rust
//! use sinefield_synth::tuning::{KeyboardMapping, Scale, Tuning};
//!
//! let scale = Scale::even_division_of_cents(1200.0, 19).unwrap();
//! let tuning = Tuning::new(scale, KeyboardMapping::default()).unwrap();
//! assert!((tuning.frequency_for_midi_note(60) - 261.6255653).abs() < 1e-6);
//! ```

use libm::{exp2, log2};
use thiserror::Error;

/// Frequency of MIDI note 0 in Hz, at full precision.
pub const MIDI_0_FREQ_F64: f64 = 8.175_798_915_643_707;
/// Frequency of middle C in twelve-tone equal temperament with A4 = 440 Hz.
pub const MIDDLE_C_FREQ: f64 = 261.625_565_3;
/// Entries in the tuning table.
pub const TUNING_TABLE_LEN: usize = 512;
/// Key number of table entry 0 is `-TUNING_TABLE_OFFSET`.
pub const TUNING_TABLE_OFFSET: i32 = 256;
/// Most degrees a scale may have, including the period.
pub const MAX_SCALE_DEGREES: usize = 1024;
/// Most entries a keyboard mapping may list.
pub const MAX_MAP_SIZE: usize = 1024;

/// Errors raised while building a tuning.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TuningError {
    /// An equal division needs between 1 and [`MAX_SCALE_DEGREES`] steps.
    #[error("equal division needs 1 to 1024 steps, got {0}")]
    InvalidDivision(u32),

    /// The period must be a positive, finite number of cents.
    #[error("period must be positive and finite, got {0} cents")]
    InvalidPeriod(f64),

    /// Scala scale text could not be parsed.
    #[error("scale line {line}: {message}")]
    Scala {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// Scala keyboard mapping text could not be parsed.
    #[error("keyboard mapping line {line}: {message}")]
    KeyboardMapping {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// The reference key of the mapping plays no scale degree.
    #[error("tuning note {0} is not mapped to a scale degree")]
    UnmappedTuningNote(i32),

    /// The tuning produced an unusable frequency.
    #[error("note {0} has a non-finite or non-positive frequency")]
    InvalidFrequency(i32),
}

impl TuningError {
    fn scala(line: usize, message: impl Into<String>) -> Self {
        Self::Scala {
            line,
            message: message.into(),
        }
    }

    fn kbm(line: usize, message: impl Into<String>) -> Self {
        Self::KeyboardMapping {
            line,
            message: message.into(),
        }
    }
}

/// How a scale degree was written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToneKind {
    /// Written in cents.
    Cents,
    /// Written as a frequency ratio.
    Ratio {
        /// Numerator.
        numerator: u64,
        /// Denominator.
        denominator: u64,
    },
}

/// One scale degree.
#[derive(Debug, Clone, PartialEq)]
pub struct Tone {
    /// Pitch above the root, in cents.
    pub cents: f64,
    /// Source notation.
    pub kind: ToneKind,
}

impl Tone {
    /// Degree written in cents.
    pub fn from_cents(cents: f64) -> Self {
        Self {
            cents,
            kind: ToneKind::Cents,
        }
    }

    /// Degree written as a ratio. Both terms must be non-zero.
    pub fn from_ratio(numerator: u64, denominator: u64) -> Self {
        debug_assert!(numerator > 0 && denominator > 0);
        Self {
            cents: 1200.0 * log2(numerator as f64 / denominator as f64),
            kind: ToneKind::Ratio {
                numerator,
                denominator,
            },
        }
    }
}

/// Pitches of the degrees above a root; the last degree is the period.
#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    /// Free-form description (first line of a `.scl` file).
    pub description: String,
    tones: Vec<Tone>,
}

impl Scale {
    /// Divide `cents` into `steps` equal parts.
    pub fn even_division_of_cents(cents: f64, steps: u32) -> Result<Self, TuningError> {
        if steps == 0 || steps as usize > MAX_SCALE_DEGREES {
            return Err(TuningError::InvalidDivision(steps));
        }
        if !(cents.is_finite() && cents > 0.0) {
            return Err(TuningError::InvalidPeriod(cents));
        }
        Ok(Self::equal_unchecked(cents, steps))
    }

    /// Twelve-tone equal temperament.
    pub fn twelve_tone_equal() -> Self {
        Self::equal_unchecked(1200.0, 12)
    }

    fn equal_unchecked(cents: f64, steps: u32) -> Self {
        let tones = (1..=steps)
            .map(|i| Tone::from_cents(cents * f64::from(i) / f64::from(steps)))
            .collect();
        Self {
            description: format!("{steps} equal divisions of {cents} cents"),
            tones,
        }
    }

    /// Parse Scala `.scl` text.
    ///
    /// Lines starting with `!` are comments. The first remaining line is the
    /// description, the second the degree count, then one degree per line:
    /// a number containing `.` is cents, `a/b` or a bare integer is a ratio.
    /// Anything after the first token on a degree line is ignored.
    pub fn parse_scala(text: &str) -> Result<Self, TuningError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.starts_with('!'));

        let (_, description) = lines
            .next()
            .ok_or_else(|| TuningError::scala(1, "missing description line"))?;

        let (count_line, count_text) = lines
            .next()
            .ok_or_else(|| TuningError::scala(1, "missing note count"))?;
        let count: usize = count_text
            .split_whitespace()
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| TuningError::scala(count_line, "note count is not an integer"))?;
        if count == 0 {
            return Err(TuningError::scala(count_line, "scale has no notes"));
        }
        if count > MAX_SCALE_DEGREES {
            return Err(TuningError::scala(
                count_line,
                format!("{count} notes exceeds the limit of {MAX_SCALE_DEGREES}"),
            ));
        }

        let mut tones = Vec::new();
        let mut last_line = count_line;
        for (line, content) in lines {
            if tones.len() == count {
                break;
            }
            last_line = line;
            if content.is_empty() {
                continue;
            }
            let token = content.split_whitespace().next().unwrap_or_default();
            tones.push(parse_tone(token).map_err(|m| TuningError::scala(line, m))?);
        }
        if tones.len() < count {
            return Err(TuningError::scala(
                last_line,
                format!("expected {count} notes, found {}", tones.len()),
            ));
        }

        Ok(Self {
            description: description.to_string(),
            tones,
        })
    }

    /// Number of degrees, including the period.
    pub fn count(&self) -> usize {
        self.tones.len()
    }

    /// Degrees in ascending index order.
    pub fn tones(&self) -> &[Tone] {
        &self.tones
    }

    /// Size of the period in cents.
    pub fn period_cents(&self) -> f64 {
        self.tones.last().map_or(1200.0, |t| t.cents)
    }

    /// Cents above the root for any degree, wrapping through the period.
    pub fn degree_cents(&self, degree: i64) -> f64 {
        let n = self.tones.len() as i64;
        let octave = degree.div_euclid(n);
        let index = degree.rem_euclid(n) as usize;
        let within = if index == 0 {
            0.0
        } else {
            self.tones[index - 1].cents
        };
        octave as f64 * self.period_cents() + within
    }
}

fn parse_tone(token: &str) -> Result<Tone, String> {
    if token.contains('.') {
        let cents: f64 = token
            .parse()
            .map_err(|_| format!("'{token}' is not a cents value"))?;
        if !cents.is_finite() {
            return Err(format!("'{token}' is not finite"));
        }
        return Ok(Tone::from_cents(cents));
    }
    let (num, den) = match token.split_once('/') {
        Some((n, d)) => (n, d),
        None => (token, "1"),
    };
    let numerator: u64 = num
        .parse()
        .map_err(|_| format!("'{token}' is not a ratio"))?;
    let denominator: u64 = den
        .parse()
        .map_err(|_| format!("'{token}' is not a ratio"))?;
    if numerator == 0 || denominator == 0 {
        return Err(format!("ratio '{token}' has a zero term"));
    }
    Ok(Tone::from_ratio(numerator, denominator))
}

/// Placement of the scale on the keyboard.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyboardMapping {
    /// Scale degree played by each key of the repeating pattern, `None`
    /// for silent keys. Empty means every key plays the next degree.
    pub keys: Vec<Option<i32>>,
    /// First key the mapping covers.
    pub first_midi: i32,
    /// Last key the mapping covers.
    pub last_midi: i32,
    /// Key that plays the scale root.
    pub middle_note: i32,
    /// Key pinned to [`tuning_frequency`](Self::tuning_frequency).
    pub tuning_constant_note: i32,
    /// Frequency of the pinned key, in Hz.
    pub tuning_frequency: f64,
    /// Degree reached after one repetition of `keys`; 0 uses the scale size.
    pub octave_degrees: i32,
}

impl Default for KeyboardMapping {
    fn default() -> Self {
        Self::start_scale_on_and_tune_note_to(60, 60, MIDDLE_C_FREQ)
    }
}

impl KeyboardMapping {
    /// Linear mapping with the root on `scale_start` and `tuning_note`
    /// sounding at `frequency` Hz.
    pub fn start_scale_on_and_tune_note_to(
        scale_start: i32,
        tuning_note: i32,
        frequency: f64,
    ) -> Self {
        Self {
            keys: Vec::new(),
            first_midi: 0,
            last_midi: 127,
            middle_note: scale_start,
            tuning_constant_note: tuning_note,
            tuning_frequency: frequency,
            octave_degrees: 0,
        }
    }

    /// Parse Scala `.kbm` text.
    ///
    /// After `!` comments are dropped the fields are: map size, first key,
    /// last key, middle key, reference key, reference frequency, formal
    /// octave degree, then `map size` entries (a degree or `x` for silent).
    pub fn parse_kbm(text: &str) -> Result<Self, TuningError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty() && !l.starts_with('!'));

        let mut header = [0.0_f64; 7];
        const FIELDS: [&str; 7] = [
            "map size",
            "first key",
            "last key",
            "middle key",
            "reference key",
            "reference frequency",
            "octave degree",
        ];
        let mut last_line = 1;
        for (slot, name) in header.iter_mut().zip(FIELDS) {
            let (line, content) = lines
                .next()
                .ok_or_else(|| TuningError::kbm(last_line, format!("missing {name}")))?;
            last_line = line;
            let token = content.split_whitespace().next().unwrap_or_default();
            *slot = token
                .parse()
                .map_err(|_| TuningError::kbm(line, format!("{name} '{token}' is not a number")))?;
        }

        let map_size = header[0];
        if !(0.0..=MAX_MAP_SIZE as f64).contains(&map_size) {
            return Err(TuningError::kbm(
                last_line,
                format!("map size {map_size} is outside 0..={MAX_MAP_SIZE}"),
            ));
        }
        let map_size = map_size as usize;
        let tuning_frequency = header[5];
        if !(tuning_frequency.is_finite() && tuning_frequency > 0.0) {
            return Err(TuningError::kbm(
                last_line,
                "reference frequency must be positive",
            ));
        }

        let mut keys = Vec::new();
        for (line, content) in lines.by_ref().take(map_size) {
            let token = content.split_whitespace().next().unwrap_or_default();
            if token.eq_ignore_ascii_case("x") {
                keys.push(None);
            } else {
                let degree: i32 = token.parse().map_err(|_| {
                    TuningError::kbm(line, format!("key entry '{token}' is not a degree"))
                })?;
                keys.push(Some(degree));
            }
        }
        // trailing entries may be omitted and read as silent keys
        keys.resize(map_size, None);

        Ok(Self {
            keys,
            first_midi: header[1] as i32,
            last_midi: header[2] as i32,
            middle_note: header[3] as i32,
            tuning_constant_note: header[4] as i32,
            tuning_frequency,
            octave_degrees: header[6] as i32,
        })
    }

    /// Scale degree played by `note`, or `None` for a silent key.
    pub fn degree_for_note(&self, note: i32, scale_count: usize) -> Option<i64> {
        let rel = i64::from(note) - i64::from(self.middle_note);
        if self.keys.is_empty() {
            return Some(rel);
        }
        let size = self.keys.len() as i64;
        let repeat = rel.div_euclid(size);
        let index = rel.rem_euclid(size) as usize;
        let octave_degrees = if self.octave_degrees > 0 {
            i64::from(self.octave_degrees)
        } else {
            scale_count as i64
        };
        self.keys[index].map(|d| i64::from(d) + repeat * octave_degrees)
    }
}

/// A scale placed on the keyboard.
#[derive(Debug, Clone)]
pub struct Tuning {
    scale: Scale,
    mapping: KeyboardMapping,
    log_scaled: Box<[f64; TUNING_TABLE_LEN]>,
    mapped: Box<[bool; TUNING_TABLE_LEN]>,
}

impl Default for Tuning {
    /// Twelve-tone equal temperament with middle C at 261.63 Hz.
    fn default() -> Self {
        let scale = Scale::twelve_tone_equal();
        let mapping = KeyboardMapping::default();
        let (log_scaled, mapped) = compute_table(&scale, &mapping, 0.0);
        Self {
            scale,
            mapping,
            log_scaled,
            mapped,
        }
    }
}

impl Tuning {
    /// Combine a scale and a mapping.
    ///
    /// Fails when the reference key is silent or any mapped key ends up with
    /// an unusable frequency. Silent keys borrow their pitch from the nearest
    /// mapped keys by log-frequency interpolation.
    pub fn new(scale: Scale, mapping: KeyboardMapping) -> Result<Self, TuningError> {
        if !(mapping.tuning_frequency.is_finite() && mapping.tuning_frequency > 0.0) {
            return Err(TuningError::InvalidFrequency(mapping.tuning_constant_note));
        }
        let reference_degree = mapping
            .degree_for_note(mapping.tuning_constant_note, scale.count())
            .ok_or(TuningError::UnmappedTuningNote(mapping.tuning_constant_note))?;
        let reference_cents = scale.degree_cents(reference_degree);
        let (log_scaled, mapped) = compute_table(&scale, &mapping, reference_cents);
        if let Some(i) = log_scaled.iter().position(|v| !v.is_finite()) {
            return Err(TuningError::InvalidFrequency(i as i32 - TUNING_TABLE_OFFSET));
        }
        Ok(Self {
            scale,
            mapping,
            log_scaled,
            mapped,
        })
    }

    /// Equal division of `cents` into `steps`, on an existing mapping.
    pub fn equal_division(
        cents: f64,
        steps: u32,
        mapping: KeyboardMapping,
    ) -> Result<Self, TuningError> {
        Self::new(Scale::even_division_of_cents(cents, steps)?, mapping)
    }

    /// The scale.
    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    /// The keyboard mapping.
    pub fn keyboard_mapping(&self) -> &KeyboardMapping {
        &self.mapping
    }

    fn table_index(note: i32) -> usize {
        (note + TUNING_TABLE_OFFSET).clamp(0, TUNING_TABLE_LEN as i32 - 1) as usize
    }

    /// `log2(frequency / MIDI note 0)`, so 12-TET gives `note / 12`.
    /// Keys outside -256..=255 clamp to the table ends.
    pub fn log_scaled_frequency_for_midi_note(&self, note: i32) -> f64 {
        self.log_scaled[Self::table_index(note)]
    }

    /// Frequency of `note` in Hz.
    pub fn frequency_for_midi_note(&self, note: i32) -> f64 {
        MIDI_0_FREQ_F64 * exp2(self.log_scaled_frequency_for_midi_note(note))
    }

    /// Whether `note` plays a scale degree rather than an interpolated pitch.
    pub fn is_midi_note_mapped(&self, note: i32) -> bool {
        self.mapped[Self::table_index(note)]
    }
}

type TuningTable = (Box<[f64; TUNING_TABLE_LEN]>, Box<[bool; TUNING_TABLE_LEN]>);

fn compute_table(scale: &Scale, mapping: &KeyboardMapping, reference_cents: f64) -> TuningTable {
    let mut log_scaled = Box::new([f64::NAN; TUNING_TABLE_LEN]);
    let mut mapped = Box::new([false; TUNING_TABLE_LEN]);
    let base = log2(mapping.tuning_frequency / MIDI_0_FREQ_F64);

    for i in 0..TUNING_TABLE_LEN {
        let note = i as i32 - TUNING_TABLE_OFFSET;
        if let Some(degree) = mapping.degree_for_note(note, scale.count()) {
            log_scaled[i] = base + (scale.degree_cents(degree) - reference_cents) / 1200.0;
            mapped[i] = true;
        }
    }

    fill_silent_keys(&mut log_scaled, &mapped);
    (log_scaled, mapped)
}

fn fill_silent_keys(log_scaled: &mut [f64; TUNING_TABLE_LEN], mapped: &[bool; TUNING_TABLE_LEN]) {
    let mut previous: Option<usize> = None;
    let mut i = 0;
    while i < TUNING_TABLE_LEN {
        if mapped[i] {
            previous = Some(i);
            i += 1;
            continue;
        }
        let next = (i..TUNING_TABLE_LEN).find(|&k| mapped[k]);
        let gap_end = next.unwrap_or(TUNING_TABLE_LEN);
        for k in i..gap_end {
            log_scaled[k] = match (previous, next) {
                (Some(a), Some(b)) => {
                    let t = (k - a) as f64 / (b - a) as f64;
                    log_scaled[a] + (log_scaled[b] - log_scaled[a]) * t
                }
                (Some(a), None) => log_scaled[a],
                (None, Some(b)) => log_scaled[b],
                // no key mapped at all: leave NaN so validation rejects it
                (None, None) => f64::NAN,
            };
        }
        i = gap_end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_twelve_tet() {
        let t = Tuning::default();
        assert!((t.frequency_for_midi_note(69) - 440.0).abs() < 1e-4);
        assert!((t.log_scaled_frequency_for_midi_note(60) - 5.0).abs() < 1e-6);
        assert!((t.log_scaled_frequency_for_midi_note(0)).abs() < 1e-6);
    }

    #[test]
    fn test_edo_steps() {
        let t = Tuning::equal_division(1200.0, 31, KeyboardMapping::default()).unwrap();
        let step = t.log_scaled_frequency_for_midi_note(61) - t.log_scaled_frequency_for_midi_note(60);
        assert!((step - 1.0 / 31.0).abs() < 1e-9);
        let period = t.log_scaled_frequency_for_midi_note(91) - t.log_scaled_frequency_for_midi_note(60);
        assert!((period - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pseudo_octave_period() {
        let t = Tuning::equal_division(1900.0, 13, KeyboardMapping::default()).unwrap();
        let ratio = t.frequency_for_midi_note(73) / t.frequency_for_midi_note(60);
        assert!((ratio - exp2(1900.0 / 1200.0)).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_edo() {
        assert_eq!(
            Scale::even_division_of_cents(1200.0, 0),
            Err(TuningError::InvalidDivision(0))
        );
        assert!(matches!(
            Scale::even_division_of_cents(-5.0, 12),
            Err(TuningError::InvalidPeriod(_))
        ));
        assert!(Scale::even_division_of_cents(f64::NAN, 12).is_err());
    }

    #[test]
    fn test_parse_scala_mixed_notation() {
        let text = "! meantone.scl\n!\nQuarter-comma meantone fragment\n 4\n!\n 193.157\n 5/4\n 3/2 perfect fifth\n 2\n";
        let scale = Scale::parse_scala(text).unwrap();
        assert_eq!(scale.description, "Quarter-comma meantone fragment");
        assert_eq!(scale.count(), 4);
        assert!((scale.tones()[0].cents - 193.157).abs() < 1e-9);
        assert!((scale.tones()[1].cents - 386.3137).abs() < 1e-3);
        assert_eq!(
            scale.tones()[2].kind,
            ToneKind::Ratio {
                numerator: 3,
                denominator: 2
            }
        );
        assert!((scale.period_cents() - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_scala_errors() {
        let short = "desc\n3\n100.0\n200.0\n";
        assert!(matches!(
            Scale::parse_scala(short),
            Err(TuningError::Scala { .. })
        ));
        let bad = "desc\n1\nhello\n";
        match Scale::parse_scala(bad) {
            Err(TuningError::Scala { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected {other:?}"),
        }
        assert!(Scale::parse_scala("desc\nzero\n").is_err());
        assert!(Scale::parse_scala("").is_err());
        assert!(Scale::parse_scala("desc\n1\n0/3\n").is_err());
    }

    #[test]
    fn test_degree_cents_wraps_both_ways() {
        let scale = Scale::even_division_of_cents(1200.0, 12).unwrap();
        assert!((scale.degree_cents(13) - 1300.0).abs() < 1e-9);
        assert!((scale.degree_cents(-1) + 100.0).abs() < 1e-9);
        assert_eq!(scale.degree_cents(0), 0.0);
    }

    #[test]
    fn test_parse_kbm_and_silent_keys() {
        // white keys only: 7 degrees over 12 keys
        let text = "! white.kbm\n12\n0\n127\n60\n69\n440.0\n7\n0\nx\n1\nx\n2\n3\nx\n4\nx\n5\nx\n6\n";
        let kbm = KeyboardMapping::parse_kbm(text).unwrap();
        assert_eq!(kbm.keys.len(), 12);
        assert_eq!(kbm.keys[1], None);
        assert_eq!(kbm.tuning_constant_note, 69);

        let scale = Scale::parse_scala("diatonic\n7\n9/8\n5/4\n4/3\n3/2\n5/3\n15/8\n2/1\n").unwrap();
        let t = Tuning::new(scale, kbm).unwrap();
        assert!((t.frequency_for_midi_note(69) - 440.0).abs() < 1e-9);
        assert!(t.is_midi_note_mapped(60));
        assert!(!t.is_midi_note_mapped(61));
        // silent key sits between its neighbours
        let a = t.log_scaled_frequency_for_midi_note(60);
        let b = t.log_scaled_frequency_for_midi_note(61);
        let c = t.log_scaled_frequency_for_midi_note(62);
        assert!(a < b && b < c);
        // one repetition up is one period up
        let octave = t.frequency_for_midi_note(72) / t.frequency_for_midi_note(60);
        assert!((octave - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_unmapped_reference_rejected() {
        let text = "2\n0\n127\n60\n61\n440\n0\n0\nx\n";
        let kbm = KeyboardMapping::parse_kbm(text).unwrap();
        let err = Tuning::new(Scale::twelve_tone_equal(), kbm).unwrap_err();
        assert_eq!(err, TuningError::UnmappedTuningNote(61));
    }

    #[test]
    fn test_parse_kbm_errors() {
        assert!(matches!(
            KeyboardMapping::parse_kbm("12\n0\n"),
            Err(TuningError::KeyboardMapping { .. })
        ));
        assert!(KeyboardMapping::parse_kbm("0\n0\n127\n60\n69\n-1\n0\n").is_err());
        assert!(KeyboardMapping::parse_kbm("1\n0\n127\n60\n60\n440\n0\nq\n").is_err());
    }

    #[test]
    fn test_counts_above_limit_rejected() {
        match Scale::parse_scala("d\n100000000000000\n100.0\n") {
            Err(TuningError::Scala { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {other:?}"),
        }
        match KeyboardMapping::parse_kbm("100000000000000\n0\n127\n60\n60\n440\n0\n") {
            Err(TuningError::KeyboardMapping { line, .. }) => assert_eq!(line, 7),
            other => panic!("unexpected {other:?}"),
        }
        assert!(KeyboardMapping::parse_kbm("nan\n0\n127\n60\n60\n440\n0\n").is_err());
        assert_eq!(
            Scale::even_division_of_cents(1200.0, 1025),
            Err(TuningError::InvalidDivision(1025))
        );
    }

    #[test]
    fn test_counts_at_limit_accepted() {
        let scale = Scale::even_division_of_cents(1200.0, MAX_SCALE_DEGREES as u32).unwrap();
        assert_eq!(scale.count(), MAX_SCALE_DEGREES);

        let kbm = format!("{MAX_MAP_SIZE}\n0\n127\n60\n60\n440\n0\n0\n");
        let kbm = KeyboardMapping::parse_kbm(&kbm).unwrap();
        assert_eq!(kbm.keys.len(), MAX_MAP_SIZE);
        assert_eq!(kbm.keys[0], Some(0));
        assert_eq!(kbm.keys[1], None);
    }

    #[test]
    fn test_error_display() {
        let err = TuningError::UnmappedTuningNote(61);
        assert_eq!(err.to_string(), "tuning note 61 is not mapped to a scale degree");
        let err = TuningError::scala(4, "bad");
        assert_eq!(err.to_string(), "scale line 4: bad");
    }

    #[test]
    fn test_table_is_monotonic_for_edos() {
        for edo in 1..=48 {
            let t = Tuning::equal_division(1200.0, edo, KeyboardMapping::default()).unwrap();
            for n in -255..256 {
                assert!(
                    t.log_scaled_frequency_for_midi_note(n)
                        > t.log_scaled_frequency_for_midi_note(n - 1)
                );
            }
        }
    }
}
