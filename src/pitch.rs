//! # Pitches
//!
//! Pitches are spelled with the fixed-do names `DO RE MI FA SOL LA SI`, an optional
//! accidental and a scientific octave number (middle C is `DO4`), or given directly
//! as a MIDI pitch number.
//!
//! ```text
//! pitch = 12 * (octave + 1) + semitone(name) + semitone(accidental)
//! ```
//!
//! The playable range is `DO-1` (0) through `SOL9` (127).

use std::fmt;

use crate::error::{PartituraError, Result};

/// The octave used when a note does not name one.
pub const DEFAULT_OCTAVE: i32 = 4;

/// Frequency of `LA4`, the tuning reference.
pub const A4_FREQUENCY: f64 = 440.0;

const A4_PITCH: f64 = 69.0;

/// Diatonic note names (fixed-do)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NoteName {
    #[default]
    Do,
    Re,
    Mi,
    Fa,
    Sol,
    La,
    Si,
}

impl NoteName {
    pub const ALL: [NoteName; 7] = [
        NoteName::Do,
        NoteName::Re,
        NoteName::Mi,
        NoteName::Fa,
        NoteName::Sol,
        NoteName::La,
        NoteName::Si,
    ];

    /// Distance in semitones from the start of the octave
    pub const fn semitone(self) -> i32 {
        match self {
            NoteName::Do => 0,
            NoteName::Re => 2,
            NoteName::Mi => 4,
            NoteName::Fa => 5,
            NoteName::Sol => 7,
            NoteName::La => 9,
            NoteName::Si => 11,
        }
    }

    /// The name as written in notation text
    pub fn as_str(self) -> &'static str {
        match self {
            NoteName::Do => "DO",
            NoteName::Re => "RE",
            NoteName::Mi => "MI",
            NoteName::Fa => "FA",
            NoteName::Sol => "SOL",
            NoteName::La => "LA",
            NoteName::Si => "SI",
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accidentals: flat, natural (no sign) or sharp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accidental {
    Flat,
    #[default]
    Natural,
    Sharp,
}

impl Accidental {
    pub fn semitones(self) -> i32 {
        match self {
            Accidental::Flat => -1,
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
        }
    }

    /// Canonical glyph; natural is written as nothing
    pub fn glyph(self) -> &'static str {
        match self {
            Accidental::Flat => "♭",
            Accidental::Natural => "",
            Accidental::Sharp => "♯",
        }
    }
}

/// A MIDI pitch number, always in `0..=127`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pitch(u8);

impl Pitch {
    pub const MIN: Pitch = Pitch(0);
    pub const MAX: Pitch = Pitch(127);
    pub const MIDDLE_C: Pitch = Pitch(60);

    /// Create a pitch from its MIDI number.
    ///
    /// # Errors
    /// `RangeError` if `number` is outside `0..=127`.
    pub fn new(number: i64) -> Result<Self> {
        if !(0..=127).contains(&number) {
            return Err(PartituraError::RangeError(format!(
                "pitch {} is outside 0..=127",
                number
            )));
        }
        Ok(Pitch(number as u8))
    }

    /// A pitch from a key in a constant table. Out-of-range keys are rejected at
    /// compile time when used in a `const` context.
    pub(crate) const fn from_key(key: u8) -> Self {
        assert!(key <= 127, "MIDI key outside 0..=127");
        Pitch(key)
    }

    /// The natural `name` in the default octave.
    pub const fn natural(name: NoteName) -> Self {
        Pitch::from_key((12 * (DEFAULT_OCTAVE + 1) + name.semitone()) as u8)
    }

    /// Create a pitch from a spelled name, accidental and octave.
    ///
    /// ```
    /// use partitura::{Accidental, NoteName, Pitch};
    ///
    /// assert_eq!(Pitch::from_spelling(NoteName::Do, Accidental::Natural, 4)?.number(), 60);
    /// assert_eq!(Pitch::from_spelling(NoteName::Sol, Accidental::Natural, 9)?.number(), 127);
    /// assert!(Pitch::from_spelling(NoteName::Sol, Accidental::Sharp, 9).is_err());
    /// # Ok::<(), partitura::PartituraError>(())
    /// ```
    pub fn from_spelling(name: NoteName, accidental: Accidental, octave: i32) -> Result<Self> {
        let number = 12 * (octave as i64 + 1)
            + name.semitone() as i64
            + accidental.semitones() as i64;
        Pitch::new(number).map_err(|_| {
            PartituraError::RangeError(format!(
                "{}{}{} (pitch {}) is outside DO-1..=SOL9",
                name,
                accidental.glyph(),
                octave,
                number
            ))
        })
    }

    /// The equal-tempered pitch nearest to `hz`, with `LA4` = 440 Hz.
    pub fn from_frequency(hz: f64) -> Result<Self> {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(PartituraError::InvalidArgument(format!(
                "{} Hz is not a playable frequency",
                hz
            )));
        }
        let number = (A4_PITCH + 12.0 * (hz / A4_FREQUENCY).log2()).round();
        if !(0.0..=127.0).contains(&number) {
            return Err(PartituraError::RangeError(format!(
                "{} Hz is outside the MIDI pitch range",
                hz
            )));
        }
        Ok(Pitch(number as u8))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Frequency in Hz (A4 = 440 Hz)
    pub fn frequency(self) -> f64 {
        A4_FREQUENCY * 2.0_f64.powf((self.0 as f64 - A4_PITCH) / 12.0)
    }

    /// Spell this pitch with sharps: `(name, accidental, octave)`.
    pub fn spelling(self) -> (NoteName, Accidental, i32) {
        let octave = self.0 as i32 / 12 - 1;
        let (name, accidental) = match self.0 % 12 {
            0 => (NoteName::Do, Accidental::Natural),
            1 => (NoteName::Do, Accidental::Sharp),
            2 => (NoteName::Re, Accidental::Natural),
            3 => (NoteName::Re, Accidental::Sharp),
            4 => (NoteName::Mi, Accidental::Natural),
            5 => (NoteName::Fa, Accidental::Natural),
            6 => (NoteName::Fa, Accidental::Sharp),
            7 => (NoteName::Sol, Accidental::Natural),
            8 => (NoteName::Sol, Accidental::Sharp),
            9 => (NoteName::La, Accidental::Natural),
            10 => (NoteName::La, Accidental::Sharp),
            _ => (NoteName::Si, Accidental::Natural),
        };
        (name, accidental, octave)
    }

    /// Move this pitch by a signed number of semitones.
    pub fn transpose(self, semitones: i32) -> Result<Pitch> {
        Pitch::new(self.0 as i64 + semitones as i64)
    }
}

impl TryFrom<i64> for Pitch {
    type Error = PartituraError;

    fn try_from(number: i64) -> Result<Self> {
        Pitch::new(number)
    }
}

impl From<Pitch> for u8 {
    fn from(pitch: Pitch) -> Self {
        pitch.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_c() {
        let pitch = Pitch::from_spelling(NoteName::Do, Accidental::Natural, DEFAULT_OCTAVE).unwrap();
        assert_eq!(pitch, Pitch::MIDDLE_C);
    }

    #[test]
    fn test_range_boundaries() {
        assert_eq!(Pitch::from_spelling(NoteName::Do, Accidental::Natural, -1).unwrap().number(), 0);
        assert_eq!(Pitch::from_spelling(NoteName::Sol, Accidental::Natural, 9).unwrap().number(), 127);
        assert!(matches!(
            Pitch::from_spelling(NoteName::Sol, Accidental::Sharp, 9),
            Err(PartituraError::RangeError(_))
        ));
        assert!(matches!(
            Pitch::from_spelling(NoteName::Do, Accidental::Flat, -1),
            Err(PartituraError::RangeError(_))
        ));
        assert!(Pitch::new(128).is_err());
        assert!(Pitch::new(-1).is_err());
    }

    #[test]
    fn test_accidentals_shift_by_a_semitone() {
        let natural = Pitch::from_spelling(NoteName::Re, Accidental::Natural, 4).unwrap();
        let flat = Pitch::from_spelling(NoteName::Re, Accidental::Flat, 4).unwrap();
        let sharp = Pitch::from_spelling(NoteName::Re, Accidental::Sharp, 4).unwrap();
        assert_eq!(flat.number() + 1, natural.number());
        assert_eq!(natural.number() + 1, sharp.number());
    }

    #[test]
    fn test_a4_frequency() {
        let la = Pitch::from_spelling(NoteName::La, Accidental::Natural, 4).unwrap();
        assert!((la.frequency() - 440.0).abs() < 1e-9);
        assert_eq!(Pitch::from_frequency(440.0).unwrap(), la);
    }

    #[test]
    fn test_frequency_round_trip_for_diatonic_names() {
        for name in NoteName::ALL {
            let pitch = Pitch::from_spelling(name, Accidental::Natural, DEFAULT_OCTAVE).unwrap();
            assert_eq!(Pitch::from_frequency(pitch.frequency()).unwrap(), pitch, "{}", name);
        }
    }

    #[test]
    fn test_frequency_snaps_to_nearest() {
        // a few cents sharp of A4 still reads as A4
        assert_eq!(Pitch::from_frequency(442.0).unwrap().number(), 69);
        assert_eq!(Pitch::from_frequency(261.63).unwrap().number(), 60);
        assert!(Pitch::from_frequency(0.0).is_err());
        assert!(Pitch::from_frequency(f64::NAN).is_err());
        assert!(matches!(Pitch::from_frequency(50_000.0), Err(PartituraError::RangeError(_))));
    }

    #[test]
    fn test_spelling_uses_sharps() {
        assert_eq!(Pitch::MIDDLE_C.spelling(), (NoteName::Do, Accidental::Natural, 4));
        assert_eq!(Pitch::new(61).unwrap().spelling(), (NoteName::Do, Accidental::Sharp, 4));
        assert_eq!(Pitch::MIN.spelling(), (NoteName::Do, Accidental::Natural, -1));
        assert_eq!(Pitch::MAX.spelling(), (NoteName::Sol, Accidental::Natural, 9));
    }

    #[test]
    fn test_natural_in_default_octave() {
        const LA: Pitch = Pitch::natural(NoteName::La);
        assert_eq!(LA.number(), 69);
        for name in NoteName::ALL {
            assert_eq!(
                Pitch::natural(name),
                Pitch::from_spelling(name, Accidental::Natural, DEFAULT_OCTAVE).unwrap()
            );
        }
    }

    #[test]
    fn test_transpose() {
        assert_eq!(Pitch::MIDDLE_C.transpose(12).unwrap().number(), 72);
        assert_eq!(Pitch::MIDDLE_C.transpose(-60).unwrap(), Pitch::MIN);
        assert!(Pitch::MAX.transpose(1).is_err());
    }
}
