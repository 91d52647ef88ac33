//! Text parser for notes, rests and symbol sequences.
//!
//! ```text
//! note     = name [accidental] [octave] [":" duration [":" intensity]]
//! name     = "DO" | "RE" | "MI" | "FA" | "SOL" | "LA" | "SI"
//! accidental = "♭" | "♯" | "#"
//! octave   = ["-"] digit+
//! duration = digit+ "/" digit+
//! rest     = "_" [":" duration]
//! sequence = symbol ("," symbol)*
//! ```
//!
//! Names are case-sensitive. Tokens of a sequence may be surrounded by whitespace.

use crate::duration::Duration;
use crate::error::{PartituraError, Result};
use crate::pitch::{Accidental, NoteName, DEFAULT_OCTAVE};
use crate::symbol::{Note, NoteBuilder, Rest, Symbol};

const REST_MARK: &str = "_";

/// Parse a single note such as `SOL#3:1/8:100`.
pub fn parse_note(input: &str) -> Result<Note> {
    let mut fields = input.split(':');
    let head = fields.next().unwrap_or_default();
    let duration = fields.next();
    let intensity = fields.next();
    if fields.next().is_some() {
        return Err(PartituraError::parse(input, "too many ':' fields"));
    }

    let (name, rest) = parse_name(input, head)?;
    let (accidental, rest) = parse_accidental(rest);
    let octave = parse_octave(input, rest)?;

    let mut builder = NoteBuilder::default()
        .name(name)
        .accidental(accidental)
        .octave(octave);
    if let Some(text) = duration {
        builder = builder.duration(parse_duration_field(input, text)?);
    }
    if let Some(text) = intensity {
        builder = builder.velocity(parse_intensity(input, text)?);
    }
    builder.build()
}

/// Parse a rest: `_` or `_:N/D`.
pub fn parse_rest(input: &str) -> Result<Rest> {
    let tail = input
        .strip_prefix(REST_MARK)
        .ok_or_else(|| PartituraError::parse(input, "a rest starts with '_'"))?;
    if tail.is_empty() {
        return Ok(Rest::default());
    }
    let text = tail
        .strip_prefix(':')
        .ok_or_else(|| PartituraError::parse(input, format!("unexpected '{}' after '_'", tail)))?;
    Ok(Rest::new(parse_duration_field(input, text)?))
}

/// Parse one symbol, choosing the rest grammar when the text starts with `_`.
pub fn parse_symbol(input: &str) -> Result<Symbol> {
    if input.starts_with(REST_MARK) {
        parse_rest(input).map(Symbol::Rest)
    } else {
        parse_note(input).map(Symbol::Note)
    }
}

/// Parse a comma-separated symbol sequence.
///
/// ```
/// use partitura::parse_symbols;
///
/// let symbols = parse_symbols("DO, RE, MI:1/8, _:1/2")?;
/// assert_eq!(symbols.len(), 4);
/// assert_eq!(symbols[3].to_string(), "_:1/2");
/// # Ok::<(), partitura::PartituraError>(())
/// ```
pub fn parse_symbols(input: &str) -> Result<Vec<Symbol>> {
    input
        .split(',')
        .map(|token| {
            let token = token.trim();
            if token.is_empty() {
                return Err(PartituraError::parse(input, "empty symbol in sequence"));
            }
            parse_symbol(token)
        })
        .collect()
}

fn parse_name<'a>(input: &str, head: &'a str) -> Result<(NoteName, &'a str)> {
    NoteName::ALL
        .iter()
        .find_map(|name| head.strip_prefix(name.as_str()).map(|rest| (*name, rest)))
        .ok_or_else(|| PartituraError::parse(input, "expected one of DO RE MI FA SOL LA SI"))
}

fn parse_accidental(text: &str) -> (Accidental, &str) {
    if let Some(rest) = text.strip_prefix('♭') {
        (Accidental::Flat, rest)
    } else if let Some(rest) = text.strip_prefix('♯').or_else(|| text.strip_prefix('#')) {
        (Accidental::Sharp, rest)
    } else {
        (Accidental::Natural, text)
    }
}

fn parse_octave(input: &str, text: &str) -> Result<i32> {
    if text.is_empty() {
        return Ok(DEFAULT_OCTAVE);
    }
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(PartituraError::parse(input, format!("invalid octave '{}'", text)));
    }
    text.parse::<i32>()
        .map_err(|_| PartituraError::RangeError(format!("octave {} is out of range", text)))
}

fn parse_duration_field(input: &str, text: &str) -> Result<Duration> {
    if text.is_empty() {
        return Err(PartituraError::parse(input, "empty duration field"));
    }
    text.parse::<Duration>().map_err(|e| match e {
        PartituraError::ParseError { message, .. } => PartituraError::parse(input, message),
        other => other,
    })
}

fn parse_intensity(input: &str, text: &str) -> Result<u8> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(PartituraError::parse(input, format!("invalid intensity '{}'", text)));
    }
    match text.parse::<i64>() {
        Ok(value) if (0..=127).contains(&value) => Ok(value as u8),
        _ => Err(PartituraError::RangeError(format!(
            "intensity {} is outside 0..=127",
            text
        ))),
    }
}
