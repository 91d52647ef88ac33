//! # Arrangements
//!
//! An [`Arrangement`] groups parts that share a resolution and a tempo, and
//! compiles them into a single [`Timeline`] for playback or persistence.
//!
//! ## Lifecycle
//! 1. Create the arrangement (resolution is fixed from here on)
//! 2. Add parts, binding each one to an instrument channel
//! 3. Append content to the parts
//! 4. Compile with [`Arrangement::timeline`]
//!
//! Parts may keep growing after a compilation; only later timelines see the new
//! events.
//!
//! ## Example
//! ```rust
//! use partitura::Arrangement;
//! use partitura::device::ChannelTable;
//!
//! let mut channels = ChannelTable::new();
//! let mut song = Arrangement::new();
//! song.add_part(&mut channels, "Piano")?.append_str("DO,RE,MI,DO")?;
//!
//! let timeline = song.timeline();
//! assert_eq!(timeline.events().len(), 8);
//! assert_eq!(timeline.length(), 4 * 960);
//! # Ok::<(), partitura::PartituraError>(())
//! ```

use log::debug;
use serde::Serialize;

use crate::config::{PlaybackConfig, DEFAULT_RESOLUTION, DEFAULT_TEMPO, MAX_TEMPO, MIN_TEMPO};
use crate::device::ChannelAllocator;
use crate::error::{PartituraError, Result};
use crate::timeline::{sort_events, Channel, Part, TimelineEvent};

/// The instrument a channel plays in a compiled timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub channel: Channel,
    pub instrument: String,
}

/// All events of an arrangement ordered by tick.
///
/// At equal ticks note-offs come before note-ons, except that a note lasting
/// less than one tick is released after it starts. Otherwise events keep the
/// order of their parts and of insertion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    resolution: u32,
    bpm: u32,
    length: u64,
    bindings: Vec<Binding>,
    events: Vec<TimelineEvent>,
}

impl Timeline {
    pub fn new(
        resolution: u32,
        bpm: u32,
        bindings: Vec<Binding>,
        mut events: Vec<TimelineEvent>,
        length: u64,
    ) -> Self {
        sort_events(&mut events);
        let last = events.last().map_or(0, |event| event.tick);
        Timeline {
            resolution,
            bpm,
            length: length.max(last),
            bindings,
            events,
        }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Tick at which the timeline ends, trailing rests included.
    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arrangement {
    resolution: u32,
    bpm: u32,
    parts: Vec<Part>,
}

impl Default for Arrangement {
    fn default() -> Self {
        Arrangement {
            resolution: DEFAULT_RESOLUTION,
            bpm: DEFAULT_TEMPO,
            parts: Vec::new(),
        }
    }
}

impl Arrangement {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty arrangement with `resolution` ticks per quarter note.
    pub fn with_resolution(resolution: u32) -> Result<Self> {
        if resolution == 0 {
            return Err(PartituraError::InvalidArgument(
                "resolution must be positive".to_string(),
            ));
        }
        Ok(Arrangement {
            resolution,
            ..Self::default()
        })
    }

    pub fn from_config(config: &PlaybackConfig) -> Result<Self> {
        config.validate()?;
        let mut arrangement = Self::with_resolution(config.resolution)?;
        arrangement.set_bpm(config.tempo)?;
        Ok(arrangement)
    }

    /// Add a part playing `instrument` on a channel obtained from `allocator`.
    pub fn add_part<A>(&mut self, allocator: &mut A, instrument: &str) -> Result<&mut Part>
    where
        A: ChannelAllocator + ?Sized,
    {
        let channel = allocator.allocate(instrument)?;
        Ok(self.add_part_on(channel, instrument))
    }

    /// Add a part on a channel that is already set up, such as the percussion channel.
    pub fn add_part_on(&mut self, channel: Channel, instrument: &str) -> &mut Part {
        debug!("part {} added: {} on {}", self.parts.len(), instrument, channel);
        self.parts.push(Part::new(channel, instrument, self.resolution));
        let index = self.parts.len() - 1;
        &mut self.parts[index]
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn part(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    pub fn part_mut(&mut self, index: usize) -> Option<&mut Part> {
        self.parts.get_mut(index)
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// # Errors
    /// `RangeError` unless `1 <= bpm <= 960`.
    pub fn set_bpm(&mut self, bpm: u32) -> Result<()> {
        if !(MIN_TEMPO..=MAX_TEMPO).contains(&bpm) {
            return Err(PartituraError::RangeError(format!(
                "tempo {} bpm is outside {}..={}",
                bpm, MIN_TEMPO, MAX_TEMPO
            )));
        }
        self.bpm = bpm;
        Ok(())
    }

    /// Merge every part into one ordered timeline.
    pub fn timeline(&self) -> Timeline {
        let bindings = self
            .parts
            .iter()
            .map(|part| Binding {
                channel: part.channel(),
                instrument: part.instrument().to_string(),
            })
            .collect();
        let events = self
            .parts
            .iter()
            .flat_map(|part| part.events().iter().copied())
            .collect();
        let length = self.parts.iter().map(Part::end_tick).max().unwrap_or(0);
        let timeline = Timeline::new(self.resolution, self.bpm, bindings, events, length);
        debug!(
            "compiled {} parts into {} events over {} ticks",
            self.parts.len(),
            timeline.events.len(),
            timeline.length
        );
        timeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ChannelTable, DrumPiece, PERCUSSION_CHANNEL};
    use crate::duration::Duration;
    use crate::timeline::EventKind;

    #[test]
    fn test_defaults() {
        let arrangement = Arrangement::new();
        assert_eq!(arrangement.resolution(), 960);
        assert_eq!(arrangement.bpm(), 120);
        assert!(arrangement.parts().is_empty());
        assert!(arrangement.timeline().is_empty());
    }

    #[test]
    fn test_zero_resolution() {
        assert!(matches!(
            Arrangement::with_resolution(0),
            Err(PartituraError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_bpm_range() {
        let mut arrangement = Arrangement::new();
        assert!(matches!(arrangement.set_bpm(0), Err(PartituraError::RangeError(_))));
        assert!(matches!(arrangement.set_bpm(961), Err(PartituraError::RangeError(_))));
        arrangement.set_bpm(960).unwrap();
        arrangement.set_bpm(1).unwrap();
        assert_eq!(arrangement.bpm(), 1);
    }

    #[test]
    fn test_from_config() {
        let config = PlaybackConfig::from_yaml("resolution: 480\ntempo: 90").unwrap();
        let arrangement = Arrangement::from_config(&config).unwrap();
        assert_eq!(arrangement.resolution(), 480);
        assert_eq!(arrangement.bpm(), 90);
    }

    #[test]
    fn test_allocation_errors_propagate() {
        let mut table = ChannelTable::with_capacity(2);
        let mut arrangement = Arrangement::new();
        assert!(matches!(
            arrangement.add_part(&mut table, "kazoo"),
            Err(PartituraError::NoSuchInstrument(_))
        ));
        arrangement.add_part(&mut table, "Flute").unwrap();
        assert!(matches!(
            arrangement.add_part(&mut table, "Flute"),
            Err(PartituraError::CapacityExceeded { .. })
        ));
        assert_eq!(arrangement.parts().len(), 1);
    }

    #[test]
    fn test_timeline_orders_note_off_before_note_on() {
        let mut table = ChannelTable::new();
        let mut arrangement = Arrangement::new();
        arrangement.add_part(&mut table, "Piano").unwrap().append_str("DO,RE").unwrap();
        arrangement.add_part(&mut table, "Violin").unwrap().append_str("MI:1/2").unwrap();

        let timeline = arrangement.timeline();
        let summary: Vec<(u64, u8, bool)> = timeline
            .events()
            .iter()
            .map(|e| (e.tick, e.kind.pitch(), e.kind.is_note_off()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, 60, false),
                (0, 64, false),
                (960, 60, true),
                (960, 62, false),
                (1920, 62, true),
                (1920, 64, true),
            ]
        );
        assert_eq!(timeline.bindings().len(), 2);
        assert_eq!(timeline.bindings()[1].instrument, "Violin");
    }

    #[test]
    fn test_note_shorter_than_a_tick_is_released_after_it_starts() {
        let mut arrangement = Arrangement::with_resolution(1).unwrap();
        arrangement
            .add_part_on(Channel::new(0).unwrap(), "Piano")
            .append_str("DO:1/8,RE,RE")
            .unwrap();

        let kinds: Vec<(u64, EventKind)> = arrangement
            .timeline()
            .events()
            .iter()
            .map(|e| (e.tick, e.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (0, EventKind::NoteOn { pitch: 60, velocity: 64 }),
                (0, EventKind::NoteOn { pitch: 62, velocity: 64 }),
                (0, EventKind::NoteOff { pitch: 60 }),
                (1, EventKind::NoteOff { pitch: 62 }),
                (1, EventKind::NoteOn { pitch: 62, velocity: 64 }),
                (2, EventKind::NoteOff { pitch: 62 }),
            ]
        );
    }

    #[test]
    fn test_timeline_length_counts_trailing_rests() {
        let mut arrangement = Arrangement::new();
        arrangement.add_part_on(Channel::new(0).unwrap(), "Piano").append_str("DO,_:1/1").unwrap();
        assert_eq!(arrangement.timeline().length(), 960 + 3840);
    }

    #[test]
    fn test_percussion_part() {
        let mut arrangement = Arrangement::new();
        let drums = arrangement.add_part_on(PERCUSSION_CHANNEL, "Drumkit");
        drums.append_note(&DrumPiece::Kick.note(Duration::QUARTER));
        drums.append_note(&DrumPiece::Snare.note(Duration::QUARTER));
        let timeline = arrangement.timeline();
        assert!(timeline.events().iter().all(|e| e.channel == PERCUSSION_CHANNEL));
        assert_eq!(
            timeline.events()[0].kind,
            EventKind::NoteOn {
                pitch: 35,
                velocity: 64
            }
        );
    }

    #[test]
    fn test_later_appends_only_affect_later_timelines() {
        let mut arrangement = Arrangement::new();
        arrangement.add_part_on(Channel::new(0).unwrap(), "Piano").append_str("DO").unwrap();
        let before = arrangement.timeline();
        arrangement.part_mut(0).unwrap().append_str("RE").unwrap();
        assert_eq!(before.events().len(), 2);
        assert_eq!(arrangement.timeline().events().len(), 4);
    }
}
