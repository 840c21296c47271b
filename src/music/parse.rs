use crate::error::{PitchError, Result};

/// Split a combined note string such as `C#4` or `A-1` into its letter-class
/// and octave.
///
/// The octave is the trailing run of ASCII digits, plus a `-` directly in
/// front of it. Whatever precedes that is returned as the letter-class
/// without validation; `PitchClass::from_str` decides whether it is a real
/// note. A `#` can never be mistaken for part of the number because only
/// digits and a single minus sign are consumed.
pub fn parse_note_name(combined: &str) -> Result<(String, i32)> {
    let trimmed = combined.trim();
    let without_digits = trimmed.trim_end_matches(|c: char| c.is_ascii_digit());

    if without_digits.len() == trimmed.len() {
        return Err(PitchError::MalformedNoteString(combined.to_string()));
    }

    let letter = without_digits.strip_suffix('-').unwrap_or(without_digits);
    let number = &trimmed[letter.len()..];

    let octave = number
        .parse::<i32>()
        .map_err(|_| PitchError::MalformedNoteString(combined.to_string()))?;

    Ok((letter.to_string(), octave))
}

/// Parse user-entered frequency text into Hz.
///
/// Only positive, finite numbers are accepted since every consumer takes a
/// logarithm of the result.
pub fn parse_frequency(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_suffix("Hz")
        .or_else(|| trimmed.strip_suffix("hz"))
        .unwrap_or(trimmed)
        .trim();

    let hz: f64 = trimmed
        .parse()
        .map_err(|_| PitchError::InvalidFrequency(format!("{text:?} is not a number")))?;

    if !hz.is_finite() || hz <= 0.0 {
        return Err(PitchError::InvalidFrequency(format!(
            "frequency must be positive, got {text}"
        )));
    }

    Ok(hz)
}
