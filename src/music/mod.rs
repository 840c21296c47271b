pub mod convert;
pub mod note;
pub mod parse;

pub use convert::{cents_offset, frequency_from_name, frequency_from_note, note_from_frequency, RoundingPolicy};
pub use note::{Note, PitchClass, ReferencePitch};
pub use parse::{parse_frequency, parse_note_name};
