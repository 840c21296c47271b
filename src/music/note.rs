use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PitchError, Result};

use super::parse;

/// The 12 pitch classes of the chromatic scale, in ascending order from C.
///
/// Only sharps are used: there is exactly one spelling per pitch class,
/// which keeps parsing and display symmetric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

/// Chromatic scale ordering used for every index computation.
pub const CHROMATIC_SCALE: [PitchClass; 12] = [
    PitchClass::C,
    PitchClass::CSharp,
    PitchClass::D,
    PitchClass::DSharp,
    PitchClass::E,
    PitchClass::F,
    PitchClass::FSharp,
    PitchClass::G,
    PitchClass::GSharp,
    PitchClass::A,
    PitchClass::ASharp,
    PitchClass::B,
];

impl PitchClass {
    /// Position in the chromatic scale, 0 (C) to 11 (B).
    pub fn index(self) -> i32 {
        self as i32
    }

    /// Pitch class for a semitone number. Negative numbers wrap downwards,
    /// so -1 is B.
    pub fn from_semitone(semitone: i64) -> Self {
        CHROMATIC_SCALE[semitone.rem_euclid(12) as usize]
    }

    pub fn symbol(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for PitchClass {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self> {
        CHROMATIC_SCALE
            .iter()
            .copied()
            .find(|pc| pc.symbol() == s)
            .ok_or_else(|| PitchError::InvalidNote(s.to_string()))
    }
}

/// A pitch class in a specific octave, e.g. C#4 or A-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    pub pitch_class: PitchClass,
    pub octave: i32,
}

impl Note {
    pub fn new(pitch_class: PitchClass, octave: i32) -> Self {
        Self {
            pitch_class,
            octave,
        }
    }

    /// Semitones above C0. C-1 is -12, A4 is 57.
    ///
    /// Widened to i64 so every i32 octave has a semitone number.
    pub fn absolute_semitone(self) -> i64 {
        i64::from(self.octave) * 12 + i64::from(self.pitch_class.index())
    }

    /// Inverse of `absolute_semitone`, using floored division so negative
    /// semitone numbers land in negative octaves with a valid pitch class.
    /// `None` when the octave does not fit in an i32.
    pub fn from_absolute_semitone(semitone: i64) -> Option<Self> {
        let octave = i32::try_from(semitone.div_euclid(12)).ok()?;
        Some(Self {
            pitch_class: PitchClass::from_semitone(semitone),
            octave,
        })
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class, self.octave)
    }
}

impl FromStr for Note {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self> {
        let (letter, octave) = parse::parse_note_name(s)?;
        Ok(Note::new(letter.parse()?, octave))
    }
}

// Notes travel through JSON output and config files as their text form.
impl Serialize for Note {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Note {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The anchor every conversion scales from: conventionally A4 = 440 Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePitch {
    note: Note,
    frequency_hz: f64,
}

impl ReferencePitch {
    /// Build a reference. The frequency must be positive and finite.
    pub fn new(note: Note, frequency_hz: f64) -> Result<Self> {
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(PitchError::InvalidFrequency(format!(
                "reference frequency must be positive, got {frequency_hz}"
            )));
        }
        Ok(Self { note, frequency_hz })
    }

    /// A4 tuned to the given frequency.
    pub fn a4(frequency_hz: f64) -> Result<Self> {
        Self::new(Note::new(PitchClass::A, 4), frequency_hz)
    }

    pub fn note(&self) -> Note {
        self.note
    }

    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }
}

impl Default for ReferencePitch {
    fn default() -> Self {
        Self {
            note: Note::new(PitchClass::A, 4),
            frequency_hz: 440.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chromatic_indices_are_ordered() {
        for (i, pc) in CHROMATIC_SCALE.iter().enumerate() {
            assert_eq!(pc.index(), i as i32);
        }
    }

    #[test]
    fn pitch_class_from_str() {
        assert_eq!("C#".parse::<PitchClass>().unwrap(), PitchClass::CSharp);
        assert_eq!("A".parse::<PitchClass>().unwrap(), PitchClass::A);
    }

    #[test]
    fn pitch_class_rejects_unknown_symbols() {
        for bad in ["H", "Db", "c", "E#", "", "A##"] {
            assert_eq!(
                bad.parse::<PitchClass>(),
                Err(PitchError::InvalidNote(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn negative_semitones_wrap() {
        assert_eq!(PitchClass::from_semitone(-1), PitchClass::B);
        assert_eq!(Note::from_absolute_semitone(-1), Some(Note::new(PitchClass::B, -1)));
        assert_eq!(Note::from_absolute_semitone(-12), Some(Note::new(PitchClass::C, -1)));
    }

    #[test]
    fn extreme_octaves_have_semitone_numbers() {
        let lowest = Note::new(PitchClass::C, i32::MIN);
        let highest = Note::new(PitchClass::B, i32::MAX);
        assert_eq!(Note::from_absolute_semitone(lowest.absolute_semitone()), Some(lowest));
        assert_eq!(Note::from_absolute_semitone(highest.absolute_semitone()), Some(highest));
        assert_eq!(Note::from_absolute_semitone(highest.absolute_semitone() + 1), None);
        assert_eq!(Note::from_absolute_semitone(lowest.absolute_semitone() - 1), None);
    }

    #[test]
    fn note_display_and_parse() {
        let note: Note = "A-1".parse().unwrap();
        assert_eq!(note, Note::new(PitchClass::A, -1));
        assert_eq!(note.to_string(), "A-1");
        assert_eq!(Note::new(PitchClass::FSharp, 3).to_string(), "F#3");
    }

    #[test]
    fn note_json_is_text() {
        let json = serde_json::to_string(&Note::new(PitchClass::GSharp, 2)).unwrap();
        assert_eq!(json, "\"G#2\"");
        let back: Note = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Note::new(PitchClass::GSharp, 2));
    }

    #[test]
    fn reference_rejects_non_positive_frequency() {
        assert!(ReferencePitch::a4(0.0).is_err());
        assert!(ReferencePitch::a4(-440.0).is_err());
        assert!(ReferencePitch::a4(f64::NAN).is_err());
        assert_eq!(ReferencePitch::a4(440.0).unwrap(), ReferencePitch::default());
    }
}
