//! # Notation Symbols
//!
//! This module defines the symbols a part is written with.
//!
//! ## Type Hierarchy
//! ```text
//! Symbol (enum)
//!   ├── Note
//!   │     ├── name: NoteName (DO..SI)
//!   │     ├── accidental: Accidental (♭, natural, ♯)
//!   │     ├── octave: i32 (default 4)
//!   │     ├── duration: Duration (default 1/4)
//!   │     └── velocity: u8 (default 64)
//!   └── Rest
//!         └── duration: Duration (default 1/4)
//! ```
//!
//! Every symbol is immutable. Notes are put together with a [`NoteBuilder`], which
//! checks the pitch and velocity ranges once, in `build()`.
//!
//! ## Text Form
//! `Display` writes the canonical text of a symbol, leaving out every field that
//! holds its default value:
//!
//! ```rust
//! use partitura::{Duration, Note, NoteName, Accidental};
//!
//! let note = Note::builder()
//!     .name(NoteName::Do)
//!     .accidental(Accidental::Flat)
//!     .octave(5)
//!     .duration(Duration::THIRTY_SECOND)
//!     .velocity(90)
//!     .build()?;
//! assert_eq!(note.to_string(), "DO♭5:1/32:90");
//! assert_eq!("DO♭5:1/32:90".parse::<Note>()?, note);
//! # Ok::<(), partitura::PartituraError>(())
//! ```
//!
//! When only the velocity differs from its default the duration is still written,
//! since the velocity is always the second `:` field (`DO:1/4:90`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::duration::Duration;
use crate::error::{PartituraError, Result};
use crate::parser;
use crate::pitch::{Accidental, NoteName, Pitch, DEFAULT_OCTAVE};

/// Velocity used when a note does not give one.
pub const DEFAULT_VELOCITY: u8 = 64;

/// Highest MIDI velocity.
pub const MAX_VELOCITY: u8 = 127;

pub(crate) fn check_velocity(velocity: u8) -> Result<u8> {
    if velocity > MAX_VELOCITY {
        return Err(PartituraError::RangeError(format!(
            "intensity {} is outside 0..=127",
            velocity
        )));
    }
    Ok(velocity)
}

/// A pitched note with a duration and a velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Note {
    name: NoteName,
    accidental: Accidental,
    octave: i32,
    pitch: Pitch,
    duration: Duration,
    velocity: u8,
}

impl Note {
    pub fn builder() -> NoteBuilder {
        NoteBuilder::default()
    }

    /// A quarter note of the given name in the default octave.
    pub fn new(name: NoteName) -> Self {
        Note {
            name,
            accidental: Accidental::Natural,
            octave: DEFAULT_OCTAVE,
            pitch: Pitch::natural(name),
            duration: Duration::QUARTER,
            velocity: DEFAULT_VELOCITY,
        }
    }

    /// A quarter note at `pitch`, spelled with sharps.
    pub fn from_pitch(pitch: Pitch) -> Self {
        let (name, accidental, octave) = pitch.spelling();
        Note {
            name,
            accidental,
            octave,
            pitch,
            duration: Duration::QUARTER,
            velocity: DEFAULT_VELOCITY,
        }
    }

    pub fn name(&self) -> NoteName {
        self.name
    }

    pub fn accidental(&self) -> Accidental {
        self.accidental
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    pub fn pitch(&self) -> Pitch {
        self.pitch
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// The same note lasting `duration`.
    pub fn with_duration(&self, duration: Duration) -> Note {
        Note { duration, ..*self }
    }

    /// This note moved by `semitones`, respelled with sharps.
    pub fn transpose(&self, semitones: i32) -> Result<Note> {
        let pitch = self.pitch.transpose(semitones)?;
        NoteBuilder::default().from_note(self).pitch(pitch).build()
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.accidental.glyph())?;
        if self.octave != DEFAULT_OCTAVE {
            write!(f, "{}", self.octave)?;
        }
        let write_velocity = self.velocity != DEFAULT_VELOCITY;
        if self.duration != Duration::QUARTER || write_velocity {
            write!(f, ":{}", self.duration)?;
        }
        if write_velocity {
            write!(f, ":{}", self.velocity)?;
        }
        Ok(())
    }
}

impl FromStr for Note {
    type Err = PartituraError;

    fn from_str(s: &str) -> Result<Self> {
        parser::parse_note(s)
    }
}

/// Step-by-step construction of a [`Note`].
///
/// Each setter returns a new builder, so a half-configured builder can be kept
/// and reused as a template.
///
/// ```
/// use partitura::{Duration, Note, NoteName};
///
/// let long = Note::builder().duration(Duration::HALF);
/// let mi = long.name(NoteName::Mi).build()?;
/// let sol = long.name(NoteName::Sol).octave(3).build()?;
/// assert_eq!(mi.to_string(), "MI:1/2");
/// assert_eq!(sol.to_string(), "SOL3:1/2");
/// # Ok::<(), partitura::PartituraError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteBuilder {
    name: NoteName,
    accidental: Accidental,
    octave: i32,
    duration: Duration,
    velocity: u8,
}

impl Default for NoteBuilder {
    fn default() -> Self {
        NoteBuilder {
            name: NoteName::Do,
            accidental: Accidental::Natural,
            octave: DEFAULT_OCTAVE,
            duration: Duration::QUARTER,
            velocity: DEFAULT_VELOCITY,
        }
    }
}

impl NoteBuilder {
    pub fn name(self, name: NoteName) -> Self {
        NoteBuilder { name, ..self }
    }

    pub fn accidental(self, accidental: Accidental) -> Self {
        NoteBuilder { accidental, ..self }
    }

    pub fn octave(self, octave: i32) -> Self {
        NoteBuilder { octave, ..self }
    }

    /// Set name, accidental and octave from a pitch number (sharps spelling).
    pub fn pitch(self, pitch: Pitch) -> Self {
        let (name, accidental, octave) = pitch.spelling();
        NoteBuilder {
            name,
            accidental,
            octave,
            ..self
        }
    }

    pub fn duration(self, duration: Duration) -> Self {
        NoteBuilder { duration, ..self }
    }

    pub fn velocity(self, velocity: u8) -> Self {
        NoteBuilder { velocity, ..self }
    }

    /// Copy every field of an existing note.
    pub fn from_note(self, note: &Note) -> Self {
        NoteBuilder {
            name: note.name,
            accidental: note.accidental,
            octave: note.octave,
            duration: note.duration,
            velocity: note.velocity,
        }
    }

    /// Validate the configuration and produce the note.
    ///
    /// # Errors
    /// `RangeError` if the pitch falls outside `DO-1..=SOL9` or the velocity exceeds 127.
    pub fn build(self) -> Result<Note> {
        let pitch = Pitch::from_spelling(self.name, self.accidental, self.octave)?;
        let velocity = check_velocity(self.velocity)?;
        Ok(Note {
            name: self.name,
            accidental: self.accidental,
            octave: self.octave,
            pitch,
            duration: self.duration,
            velocity,
        })
    }
}

/// Silence for a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rest {
    duration: Duration,
}

impl Rest {
    pub fn new(duration: Duration) -> Self {
        Rest { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for Rest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("_")?;
        if self.duration != Duration::QUARTER {
            write!(f, ":{}", self.duration)?;
        }
        Ok(())
    }
}

impl FromStr for Rest {
    type Err = PartituraError;

    fn from_str(s: &str) -> Result<Self> {
        parser::parse_rest(s)
    }
}

/// Either a note or a rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Symbol {
    Note(Note),
    Rest(Rest),
}

impl Symbol {
    pub fn duration(&self) -> Duration {
        match self {
            Symbol::Note(note) => note.duration(),
            Symbol::Rest(rest) => rest.duration(),
        }
    }

    pub fn as_note(&self) -> Option<&Note> {
        match self {
            Symbol::Note(note) => Some(note),
            Symbol::Rest(_) => None,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, Symbol::Rest(_))
    }

    /// Parse a comma-separated list such as `DO,RE,MI:1/8,_:1/2`.
    pub fn parse_sequence(text: &str) -> Result<Vec<Symbol>> {
        parser::parse_symbols(text)
    }
}

impl From<Note> for Symbol {
    fn from(note: Note) -> Self {
        Symbol::Note(note)
    }
}

impl From<Rest> for Symbol {
    fn from(rest: Rest) -> Self {
        Symbol::Rest(rest)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Note(note) => note.fmt(f),
            Symbol::Rest(rest) => rest.fmt(f),
        }
    }
}

impl FromStr for Symbol {
    type Err = PartituraError;

    fn from_str(s: &str) -> Result<Self> {
        parser::parse_symbol(s)
    }
}

macro_rules! text_conversions {
    ($($ty:ty),*) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = PartituraError;

                fn try_from(value: String) -> Result<Self> {
                    value.parse()
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> Self {
                    value.to_string()
                }
            }
        )*
    };
}

text_conversions!(Note, Rest, Symbol);
