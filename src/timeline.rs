//! # Timeline Building
//!
//! A [`Part`] turns symbols into timed note events for a single channel.
//!
//! ## Time Model
//! Positions are measured in ticks. A quarter note lasts `resolution` ticks, so a
//! duration `n/d` lasts `n * 4 * resolution / d` ticks. Each part keeps a write
//! cursor that starts at tick 0 and only moves forward:
//!
//! ```text
//! append_note(DO)        on@0    off@960    cursor 960
//! append_rest(_:1/2)                        cursor 2880
//! append_chord(MI,SOL)   on@2880 ×2 ...     cursor + longest
//! ```
//!
//! ## Chords
//! All notes of a chord start together at the cursor and each one ends after its
//! own duration. The note-ons are stored first, then the note-offs ordered by
//! ascending duration, and the cursor advances by the longest duration.
//!
//! ## Failures
//! Every append validates before touching the part, so a failed append leaves
//! the event list and the cursor unchanged.

use std::collections::HashSet;
use std::fmt;

use log::debug;
use serde::Serialize;

use crate::duration::Duration;
use crate::error::{PartituraError, Result};
use crate::parser::parse_symbols;
use crate::pitch::Pitch;
use crate::symbol::{check_velocity, Note, Rest, Symbol};

/// A MIDI channel number, `0..=15`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Channel(u8);

impl Channel {
    pub const COUNT: u8 = 16;
    /// General MIDI percussion (channel 10 counting from one)
    pub const PERCUSSION: Channel = Channel(9);

    pub fn new(number: u8) -> Result<Self> {
        if number >= Self::COUNT {
            return Err(PartituraError::RangeError(format!(
                "channel {} is outside 0..=15",
                number
            )));
        }
        Ok(Channel(number))
    }

    pub(crate) fn from_nibble(number: u8) -> Self {
        Channel(number & 0x0F)
    }

    pub fn number(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EventKind {
    NoteOn { pitch: u8, velocity: u8 },
    NoteOff { pitch: u8 },
}

impl EventKind {
    pub fn pitch(&self) -> u8 {
        match self {
            EventKind::NoteOn { pitch, .. } | EventKind::NoteOff { pitch } => *pitch,
        }
    }

    pub fn is_note_off(&self) -> bool {
        matches!(self, EventKind::NoteOff { .. })
    }
}

/// One note event at an absolute tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelineEvent {
    pub tick: u64,
    pub channel: Channel,
    pub kind: EventKind,
}

impl TimelineEvent {
    pub fn note_on(tick: u64, channel: Channel, pitch: Pitch, velocity: u8) -> Self {
        TimelineEvent {
            tick,
            channel,
            kind: EventKind::NoteOn {
                pitch: pitch.number(),
                velocity,
            },
        }
    }

    pub fn note_off(tick: u64, channel: Channel, pitch: Pitch) -> Self {
        TimelineEvent {
            tick,
            channel,
            kind: EventKind::NoteOff {
                pitch: pitch.number(),
            },
        }
    }
}

/// Stable sort by tick. At a shared tick, note-offs that end earlier notes come
/// first, then note-ons, then the note-offs of notes that started on that same
/// tick, so a note shorter than one tick is still released after it sounds.
pub(crate) fn sort_events(events: &mut Vec<TimelineEvent>) {
    let mut started = HashSet::new();
    let mut ranked: Vec<(u8, TimelineEvent)> = events
        .drain(..)
        .map(|event| {
            let key = (event.tick, event.channel, event.kind.pitch());
            let rank = match event.kind {
                EventKind::NoteOn { .. } => {
                    started.insert(key);
                    1
                }
                EventKind::NoteOff { .. } if started.remove(&key) => 2,
                EventKind::NoteOff { .. } => 0,
            };
            (rank, event)
        })
        .collect();
    ranked.sort_by_key(|(rank, event)| (event.tick, *rank));
    events.extend(ranked.into_iter().map(|(_, event)| event));
}

/// An append-only event list bound to one instrument channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    channel: Channel,
    instrument: String,
    resolution: u32,
    events: Vec<TimelineEvent>,
    cursor: u64,
}

impl Part {
    pub fn new(channel: Channel, instrument: impl Into<String>, resolution: u32) -> Self {
        Part {
            channel,
            instrument: instrument.into(),
            resolution,
            events: Vec::new(),
            cursor: 0,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Events in insertion order.
    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// The tick at which the next symbol will start.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// The later of the cursor and the last stored event.
    pub fn end_tick(&self) -> u64 {
        self.events
            .iter()
            .map(|event| event.tick)
            .max()
            .unwrap_or(0)
            .max(self.cursor)
    }

    fn ticks(&self, duration: Duration) -> u64 {
        duration.to_ticks(self.resolution)
    }

    pub fn append_note(&mut self, note: &Note) -> &mut Self {
        self.push_note(note, note.velocity());
        self
    }

    /// Append a note played with `intensity` instead of its own velocity.
    pub fn append_note_with(&mut self, note: &Note, intensity: u8) -> Result<&mut Self> {
        let velocity = check_velocity(intensity)?;
        self.push_note(note, velocity);
        Ok(self)
    }

    fn push_note(&mut self, note: &Note, velocity: u8) {
        let length = self.ticks(note.duration());
        self.events
            .push(TimelineEvent::note_on(self.cursor, self.channel, note.pitch(), velocity));
        self.events.push(TimelineEvent::note_off(
            self.cursor + length,
            self.channel,
            note.pitch(),
        ));
        self.cursor += length;
    }

    pub fn append_rest(&mut self, rest: &Rest) -> &mut Self {
        self.cursor += self.ticks(rest.duration());
        self
    }

    pub fn append(&mut self, symbol: &Symbol) -> &mut Self {
        match symbol {
            Symbol::Note(note) => self.append_note(note),
            Symbol::Rest(rest) => self.append_rest(rest),
        }
    }

    pub fn append_all<'a, I>(&mut self, symbols: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a Symbol>,
    {
        for symbol in symbols {
            self.append(symbol);
        }
        self
    }

    /// Parse a whole sequence such as `"DO,RE,MI,DO"` and append it.
    ///
    /// Nothing is appended unless every token parses.
    pub fn append_str(&mut self, text: &str) -> Result<&mut Self> {
        let symbols = parse_symbols(text)?;
        Ok(self.append_all(&symbols))
    }

    /// Append notes that sound together, each with its own velocity.
    pub fn append_chord(&mut self, notes: &[Note]) -> Result<&mut Self> {
        self.push_chord(notes.iter().map(|n| (Some(n), n.duration(), n.velocity())))?;
        Ok(self)
    }

    /// Append notes that sound together, all played with `intensity`.
    pub fn append_chord_with(&mut self, notes: &[Note], intensity: u8) -> Result<&mut Self> {
        let velocity = check_velocity(intensity)?;
        self.push_chord(notes.iter().map(|n| (Some(n), n.duration(), velocity)))?;
        Ok(self)
    }

    /// Append a chord written as symbols; rests sound nothing but still count
    /// toward the chord's length.
    pub fn append_chord_symbols(&mut self, symbols: &[Symbol]) -> Result<&mut Self> {
        self.push_chord(
            symbols
                .iter()
                .map(|s| (s.as_note(), s.duration(), s.as_note().map_or(0, |n| n.velocity()))),
        )?;
        Ok(self)
    }

    fn push_chord<'a, I>(&mut self, members: I) -> Result<()>
    where
        I: Iterator<Item = (Option<&'a Note>, Duration, u8)>,
    {
        let mut members: Vec<_> = members.collect();
        if members.is_empty() {
            return Err(PartituraError::InvalidArgument(
                "a chord needs at least one note".to_string(),
            ));
        }
        members.sort_by_key(|(_, duration, _)| *duration);

        let start = self.cursor;
        let mut longest = 0;
        for (note, _, velocity) in &members {
            if let Some(note) = note {
                self.events
                    .push(TimelineEvent::note_on(start, self.channel, note.pitch(), *velocity));
            }
        }
        for (note, duration, _) in &members {
            let length = self.ticks(*duration);
            longest = longest.max(length);
            if let Some(note) = note {
                self.events
                    .push(TimelineEvent::note_off(start + length, self.channel, note.pitch()));
            }
        }
        self.cursor = start + longest;
        debug!(
            "{}: chord of {} at tick {}, cursor now {}",
            self.instrument,
            members.len(),
            start,
            self.cursor
        );
        Ok(())
    }

    /// Replace the content with already-timed events, e.g. decoded from a file.
    pub(crate) fn restore(&mut self, events: Vec<TimelineEvent>, cursor: u64) {
        self.events = events;
        self.cursor = cursor.max(self.end_tick());
    }

    /// Move every stored event later by `duration`. The cursor does not move.
    pub fn shift(&mut self, duration: Duration) -> &mut Self {
        let offset = self.ticks(duration);
        for event in &mut self.events {
            event.tick += offset;
        }
        debug!(
            "{}: shifted {} events by {} ticks",
            self.instrument,
            self.events.len(),
            offset
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piano() -> Part {
        Part::new(Channel::new(0).unwrap(), "Acoustic Grand Piano", 960)
    }

    fn note(text: &str) -> Note {
        text.parse().unwrap()
    }

    fn ticks_of(part: &Part, on: bool) -> Vec<u64> {
        part.events()
            .iter()
            .filter(|e| e.kind.is_note_off() != on)
            .map(|e| e.tick)
            .collect()
    }

    #[test]
    fn test_channel_range() {
        assert_eq!(Channel::new(15).unwrap().number(), 15);
        assert!(matches!(Channel::new(16), Err(PartituraError::RangeError(_))));
    }

    #[test]
    fn test_append_note_advances_cursor() {
        let mut part = piano();
        part.append_note(&note("DO")).append_note(&note("RE:1/8"));
        assert_eq!(part.cursor(), 960 + 480);
        assert_eq!(
            part.events(),
            &[
                TimelineEvent::note_on(0, part.channel(), Pitch::MIDDLE_C, 64),
                TimelineEvent::note_off(960, part.channel(), Pitch::MIDDLE_C),
                TimelineEvent::note_on(960, part.channel(), Pitch::new(62).unwrap(), 64),
                TimelineEvent::note_off(1440, part.channel(), Pitch::new(62).unwrap()),
            ]
        );
    }

    #[test]
    fn test_append_note_with_intensity() {
        let mut part = piano();
        part.append_note_with(&note("DO"), 100).unwrap();
        assert_eq!(
            part.events()[0].kind,
            EventKind::NoteOn {
                pitch: 60,
                velocity: 100
            }
        );
        assert!(matches!(
            part.append_note_with(&note("DO"), 128),
            Err(PartituraError::RangeError(_))
        ));
        assert_eq!(part.events().len(), 2);
        assert_eq!(part.cursor(), 960);
    }

    #[test]
    fn test_rest_moves_cursor_only() {
        let mut part = piano();
        part.append_rest(&Rest::new(Duration::HALF));
        assert!(part.events().is_empty());
        assert_eq!(part.cursor(), 1920);
        assert_eq!(part.end_tick(), 1920);
    }

    #[test]
    fn test_chord_timing() {
        let mut part = piano();
        part.append_chord(&[note("MI"), note("DO:1/2"), note("SOL")]).unwrap();
        assert_eq!(ticks_of(&part, true), vec![0, 0, 0]);
        assert_eq!(ticks_of(&part, false), vec![960, 960, 1920]);
        assert_eq!(part.cursor(), 1920);
        part.append_note(&note("RE"));
        assert_eq!(part.events().last().map(|e| e.tick), Some(2880));
    }

    #[test]
    fn test_chord_note_offs_sorted_by_duration_stably() {
        let mut part = piano();
        part.append_chord(&[note("SOL:1/2"), note("MI"), note("DO")]).unwrap();
        let offs: Vec<u8> = part
            .events()
            .iter()
            .filter(|e| e.kind.is_note_off())
            .map(|e| e.kind.pitch())
            .collect();
        assert_eq!(offs, vec![64, 60, 67]);
    }

    #[test]
    fn test_empty_chord_is_rejected() {
        let mut part = piano();
        assert!(matches!(part.append_chord(&[]), Err(PartituraError::InvalidArgument(_))));
        assert!(matches!(
            part.append_chord_symbols(&[]),
            Err(PartituraError::InvalidArgument(_))
        ));
        assert_eq!(part.cursor(), 0);
    }

    #[test]
    fn test_chord_with_intensity() {
        let mut part = piano();
        part.append_chord_with(&[note("DO"), note("MI:1/4:10")], 99).unwrap();
        for event in part.events().iter().filter(|e| !e.kind.is_note_off()) {
            assert!(matches!(event.kind, EventKind::NoteOn { velocity: 99, .. }));
        }
        assert!(part.append_chord_with(&[note("DO")], 200).is_err());
        assert_eq!(part.events().len(), 4);
    }

    #[test]
    fn test_chord_symbols_count_rests() {
        let mut part = piano();
        let symbols = parse_symbols("DO,_:1/1").unwrap();
        part.append_chord_symbols(&symbols).unwrap();
        assert_eq!(part.events().len(), 2);
        assert_eq!(part.cursor(), 3840);
    }

    #[test]
    fn test_append_str_is_all_or_nothing() {
        let mut part = piano();
        assert!(part.append_str("DO,RE,XX,MI").is_err());
        assert!(part.events().is_empty());
        part.append_str("DO,RE,_,MI").unwrap();
        assert_eq!(part.events().len(), 6);
        assert_eq!(part.cursor(), 4 * 960);
    }

    #[test]
    fn test_shift_equals_building_later() {
        let mut shifted = piano();
        shifted.append_str("DO,RE:1/8,MI").unwrap();
        shifted.shift(Duration::HALF);

        let mut later = piano();
        later.append_rest(&Rest::new(Duration::HALF));
        later.append_str("DO,RE:1/8,MI").unwrap();

        assert_eq!(shifted.events(), later.events());
        assert_eq!(shifted.cursor(), later.cursor() - 1920);
        assert_eq!(shifted.end_tick(), later.end_tick());
    }

    #[test]
    fn test_event_serialization() {
        let event = TimelineEvent::note_on(0, Channel::new(2).unwrap(), Pitch::MIDDLE_C, 64);
        let yaml = serde_yaml::to_string(&event).unwrap();
        assert!(yaml.contains("type: note-on"));
        assert!(yaml.contains("channel: 2"));
    }
}
