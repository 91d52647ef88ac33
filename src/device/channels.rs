//! General MIDI channel table.
//!
//! Channel 0 always plays the piano. Further instruments take the next free
//! channel, skipping channel 9 which General MIDI reserves for percussion.

use log::debug;

use super::drums::PERCUSSION_CHANNEL;
use super::ChannelAllocator;
use crate::config::{PlaybackConfig, MAX_CHANNELS};
use crate::error::{PartituraError, Result};
use crate::timeline::Channel;

/// The General MIDI level 1 program names, indexed by program number.
pub const GENERAL_MIDI: [&str; 128] = [
    // Piano
    "Acoustic Grand Piano",
    "Bright Acoustic Piano",
    "Electric Grand Piano",
    "Honky-tonk Piano",
    "Electric Piano 1",
    "Electric Piano 2",
    "Harpsichord",
    "Clavinet",
    // Chromatic percussion
    "Celesta",
    "Glockenspiel",
    "Music Box",
    "Vibraphone",
    "Marimba",
    "Xylophone",
    "Tubular Bells",
    "Dulcimer",
    // Organ
    "Drawbar Organ",
    "Percussive Organ",
    "Rock Organ",
    "Church Organ",
    "Reed Organ",
    "Accordion",
    "Harmonica",
    "Tango Accordion",
    // Guitar
    "Acoustic Guitar (nylon)",
    "Acoustic Guitar (steel)",
    "Electric Guitar (jazz)",
    "Electric Guitar (clean)",
    "Electric Guitar (muted)",
    "Overdriven Guitar",
    "Distortion Guitar",
    "Guitar Harmonics",
    // Bass
    "Acoustic Bass",
    "Electric Bass (finger)",
    "Electric Bass (pick)",
    "Fretless Bass",
    "Slap Bass 1",
    "Slap Bass 2",
    "Synth Bass 1",
    "Synth Bass 2",
    // Strings
    "Violin",
    "Viola",
    "Cello",
    "Contrabass",
    "Tremolo Strings",
    "Pizzicato Strings",
    "Orchestral Harp",
    "Timpani",
    // Ensemble
    "String Ensemble 1",
    "String Ensemble 2",
    "Synth Strings 1",
    "Synth Strings 2",
    "Choir Aahs",
    "Voice Oohs",
    "Synth Voice",
    "Orchestra Hit",
    // Brass
    "Trumpet",
    "Trombone",
    "Tuba",
    "Muted Trumpet",
    "French Horn",
    "Brass Section",
    "Synth Brass 1",
    "Synth Brass 2",
    // Reed
    "Soprano Sax",
    "Alto Sax",
    "Tenor Sax",
    "Baritone Sax",
    "Oboe",
    "English Horn",
    "Bassoon",
    "Clarinet",
    // Pipe
    "Piccolo",
    "Flute",
    "Recorder",
    "Pan Flute",
    "Blown Bottle",
    "Shakuhachi",
    "Whistle",
    "Ocarina",
    // Synth lead
    "Lead 1 (square)",
    "Lead 2 (sawtooth)",
    "Lead 3 (calliope)",
    "Lead 4 (chiff)",
    "Lead 5 (charang)",
    "Lead 6 (voice)",
    "Lead 7 (fifths)",
    "Lead 8 (bass + lead)",
    // Synth pad
    "Pad 1 (new age)",
    "Pad 2 (warm)",
    "Pad 3 (polysynth)",
    "Pad 4 (choir)",
    "Pad 5 (bowed)",
    "Pad 6 (metallic)",
    "Pad 7 (halo)",
    "Pad 8 (sweep)",
    // Synth effects
    "FX 1 (rain)",
    "FX 2 (soundtrack)",
    "FX 3 (crystal)",
    "FX 4 (atmosphere)",
    "FX 5 (brightness)",
    "FX 6 (goblins)",
    "FX 7 (echoes)",
    "FX 8 (sci-fi)",
    // Ethnic
    "Sitar",
    "Banjo",
    "Shamisen",
    "Koto",
    "Kalimba",
    "Bagpipe",
    "Fiddle",
    "Shanai",
    // Percussive
    "Tinkle Bell",
    "Agogo",
    "Steel Drums",
    "Woodblock",
    "Taiko Drum",
    "Melodic Tom",
    "Synth Drum",
    "Reverse Cymbal",
    // Sound effects
    "Guitar Fret Noise",
    "Breath Noise",
    "Seashore",
    "Bird Tweet",
    "Telephone Ring",
    "Helicopter",
    "Applause",
    "Gunshot",
];

/// Channel allocator over the General MIDI program bank.
///
/// ```
/// use partitura::device::{ChannelAllocator, ChannelTable};
///
/// let mut table = ChannelTable::new();
/// let flute = table.allocate("flute")?;
/// assert_eq!(flute.number(), 1);
/// assert_eq!(table.program(flute), Some(73));
/// # Ok::<(), partitura::PartituraError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTable {
    programs: Vec<Option<u8>>,
    next: usize,
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::with_capacity(MAX_CHANNELS)
    }
}

impl ChannelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table with `capacity` channels, clamped to `1..=16`.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut programs = vec![None; capacity.clamp(1, MAX_CHANNELS)];
        programs[0] = Some(0);
        ChannelTable { programs, next: 1 }
    }

    pub fn from_config(config: &PlaybackConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_capacity(config.channels))
    }

    /// Names of every instrument the table can allocate.
    pub fn instruments(&self) -> &'static [&'static str] {
        &GENERAL_MIDI
    }

    /// The program assigned to `channel`, if any.
    pub fn program(&self, channel: Channel) -> Option<u8> {
        self.programs.get(channel.number() as usize).copied().flatten()
    }

    /// Number of channels in use, the piano included.
    pub fn assigned(&self) -> usize {
        self.programs.iter().filter(|p| p.is_some()).count()
    }

    pub fn capacity(&self) -> usize {
        self.programs.len()
    }

    fn find_program(name: &str) -> Option<u8> {
        let wanted = name.to_lowercase();
        GENERAL_MIDI
            .iter()
            .position(|candidate| candidate.to_lowercase().contains(&wanted))
            .map(|index| index as u8)
    }
}

impl ChannelAllocator for ChannelTable {
    fn allocate(&mut self, instrument: &str) -> Result<Channel> {
        let mut next = self.next;
        if next == PERCUSSION_CHANNEL.number() as usize {
            next += 1;
        }
        if next >= self.programs.len() {
            return Err(PartituraError::CapacityExceeded {
                capacity: self.programs.len(),
            });
        }
        let program = Self::find_program(instrument)
            .ok_or_else(|| PartituraError::NoSuchInstrument(instrument.to_string()))?;

        let channel = Channel::new(next as u8)?;
        self.programs[next] = Some(program);
        self.next = next + 1;
        debug!(
            "assigned {} (program {}) to {}",
            GENERAL_MIDI[program as usize], program, channel
        );
        Ok(channel)
    }
}
