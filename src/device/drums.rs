//! General MIDI percussion keys.
//!
//! On the percussion channel every key selects a different drum instead of a
//! pitch. Parts written for the kit are bound with
//! [`Arrangement::add_part_on`](crate::Arrangement::add_part_on).

use crate::duration::Duration;
use crate::pitch::Pitch;
use crate::symbol::Note;
use crate::timeline::Channel;

pub const PERCUSSION_CHANNEL: Channel = Channel::PERCUSSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrumPiece {
    Kick,
    Kick2,
    SideStick,
    Snare,
    Clap,
    Snare2,
    ClosedHiHat,
    LowTom,
    PedalHiHat,
    OpenHiHat,
    MidTom,
    Crash,
    HighTom,
    ChineseCymbal,
    Ride,
    SplashCymbal,
    Cowbell,
    Crash2,
    Claves,
}

impl DrumPiece {
    pub const ALL: [DrumPiece; 19] = [
        DrumPiece::Kick,
        DrumPiece::Kick2,
        DrumPiece::SideStick,
        DrumPiece::Snare,
        DrumPiece::Clap,
        DrumPiece::Snare2,
        DrumPiece::ClosedHiHat,
        DrumPiece::LowTom,
        DrumPiece::PedalHiHat,
        DrumPiece::OpenHiHat,
        DrumPiece::MidTom,
        DrumPiece::Crash,
        DrumPiece::HighTom,
        DrumPiece::ChineseCymbal,
        DrumPiece::Ride,
        DrumPiece::SplashCymbal,
        DrumPiece::Cowbell,
        DrumPiece::Crash2,
        DrumPiece::Claves,
    ];

    /// The MIDI key that triggers this piece.
    pub const fn key(self) -> u8 {
        match self {
            DrumPiece::Kick => 35,
            DrumPiece::Kick2 => 36,
            DrumPiece::SideStick => 37,
            DrumPiece::Snare => 38,
            DrumPiece::Clap => 39,
            DrumPiece::Snare2 => 40,
            DrumPiece::ClosedHiHat => 42,
            DrumPiece::LowTom => 43,
            DrumPiece::PedalHiHat => 44,
            DrumPiece::OpenHiHat => 46,
            DrumPiece::MidTom => 47,
            DrumPiece::Crash => 49,
            DrumPiece::HighTom => 50,
            DrumPiece::ChineseCymbal => 52,
            DrumPiece::Ride => 53,
            DrumPiece::SplashCymbal => 55,
            DrumPiece::Cowbell => 56,
            DrumPiece::Crash2 => 57,
            DrumPiece::Claves => 75,
        }
    }

    pub const fn pitch(self) -> Pitch {
        Pitch::from_key(self.key())
    }

    /// A hit on this piece lasting `duration`.
    pub fn note(self, duration: Duration) -> Note {
        Note::from_pitch(self.pitch()).with_duration(duration)
    }
}
