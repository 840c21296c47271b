use serde::{Deserialize, Serialize};

use crate::error::{PitchError, Result};

use super::note::{Note, PitchClass, ReferencePitch};

/// Values this close to a whole semitone are treated as that semitone
/// before rounding, so exact note frequencies survive floating point error.
const SEMITONE_SNAP: f64 = 1e-6;

/// How a fractional semitone distance is turned into a note.
///
/// The two policies are NOT interchangeable. For a frequency a little above
/// a note (less than half a semitone), `Nearest` returns that note and
/// `Ceiling` returns the next one up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RoundingPolicy {
    /// Closest semitone. Exact midpoints go up.
    #[default]
    Nearest,
    /// Always the semitone at or above the frequency.
    Ceiling,
}

impl RoundingPolicy {
    fn apply(self, semitones: f64) -> f64 {
        let snapped = semitones.round();
        if (semitones - snapped).abs() < SEMITONE_SNAP {
            return snapped;
        }
        match self {
            RoundingPolicy::Nearest => (semitones + 0.5).floor(),
            RoundingPolicy::Ceiling => semitones.ceil(),
        }
    }
}

/// Frequency in Hz of a note, scaled exponentially from the reference.
///
/// f = f_ref * 2^((octave - octave_ref) + (index - index_ref) / 12)
///
/// Each octave doubles the frequency; each semitone multiplies it by 2^(1/12).
/// Fails with `InvalidFrequency` when the note is so far from the reference
/// that the result is not a positive finite f64.
pub fn frequency_from_note(note: Note, reference: &ReferencePitch) -> Result<f64> {
    let ref_note = reference.note();
    let octaves = (i64::from(note.octave) - i64::from(ref_note.octave)) as f64;
    let semitones = (note.pitch_class.index() - ref_note.pitch_class.index()) as f64;
    let hz = reference.frequency_hz() * 2f64.powf(octaves + semitones / 12.0);

    if !hz.is_finite() || hz <= 0.0 {
        return Err(PitchError::InvalidFrequency(format!(
            "{note} is outside the representable frequency range"
        )));
    }
    Ok(hz)
}

/// Same as `frequency_from_note`, for an unvalidated letter-class.
///
/// Fails with `InvalidNote` when `letter` is not one of the 12 chromatic
/// symbols.
pub fn frequency_from_name(letter: &str, octave: i32, reference: &ReferencePitch) -> Result<f64> {
    let pitch_class: PitchClass = letter.parse()?;
    frequency_from_note(Note::new(pitch_class, octave), reference)
}

/// Distance from the reference in (fractional) semitones.
fn semitones_from_reference(frequency_hz: f64, reference: &ReferencePitch) -> Result<f64> {
    if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
        return Err(PitchError::InvalidFrequency(format!(
            "cannot map {frequency_hz} Hz to a note"
        )));
    }
    Ok(12.0 * (frequency_hz / reference.frequency_hz()).log2())
}

/// The note a frequency belongs to under the given rounding policy.
///
/// Fails with `InvalidFrequency` for zero, negative, or non-finite input
/// since log2 is undefined there.
pub fn note_from_frequency(
    frequency_hz: f64,
    reference: &ReferencePitch,
    rounding: RoundingPolicy,
) -> Result<Note> {
    let semitones = semitones_from_reference(frequency_hz, reference)?;
    // Bounded by the f64 exponent range, so the cast cannot saturate.
    let offset = rounding.apply(semitones) as i64;
    reference
        .note()
        .absolute_semitone()
        .checked_add(offset)
        .and_then(Note::from_absolute_semitone)
        .ok_or_else(|| {
            PitchError::InvalidFrequency(format!(
                "{frequency_hz} Hz is outside the representable note range"
            ))
        })
}

/// Signed distance in cents (1/100 semitone) from `note` to `frequency_hz`.
/// Positive means the frequency is sharp of the note.
pub fn cents_offset(frequency_hz: f64, note: Note, reference: &ReferencePitch) -> Result<f64> {
    let target = frequency_from_note(note, reference)?;
    if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
        return Err(PitchError::InvalidFrequency(format!(
            "cannot compare {frequency_hz} Hz to {note}"
        )));
    }
    Ok(1200.0 * (frequency_hz / target).log2())
}
