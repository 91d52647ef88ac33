//! # Device Interfaces
//!
//! The seams between the notation side of the crate and whatever actually makes
//! sound.
//!
//! ## Traits
//! - [`ChannelAllocator`] - binds instrument names to MIDI channels
//! - [`Player`] - loads a [`Timeline`] and plays it, reporting the end of every pass
//!
//! ## Sub-modules
//! - `channels` - [`ChannelTable`], a General MIDI channel allocator
//! - `drums` - [`DrumPiece`], the percussion keys of channel 10
//! - `sequencer` - [`Sequencer`], a software player that feeds an [`EventSink`]
//!
//! ## End-of-stream
//! A player emits one end-of-stream notification each time it reaches the end of
//! the loaded timeline. Callbacks are invoked from the player's own thread, so
//! they must be `Send + Sync`.

mod channels;
mod drums;
mod sequencer;

use std::num::NonZeroU32;

use crate::arrangement::Timeline;
use crate::error::Result;
use crate::timeline::Channel;

pub use channels::{ChannelTable, GENERAL_MIDI};
pub use drums::{DrumPiece, PERCUSSION_CHANNEL};
pub use sequencer::{Clock, EventSink, LogSink, RecordingSink, Sequencer};

/// Assigns a channel to an instrument name.
pub trait ChannelAllocator {
    /// # Errors
    /// `NoSuchInstrument` if no instrument matches `instrument`,
    /// `CapacityExceeded` if no channel is left.
    fn allocate(&mut self, instrument: &str) -> Result<Channel>;
}

/// Handle returned by [`Player::subscribe_end_of_stream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

pub type EndOfStreamCallback = Box<dyn Fn() + Send + Sync>;

/// How many times a timeline is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCount {
    Finite(NonZeroU32),
    Infinite,
}

impl LoopCount {
    pub const ONCE: LoopCount = LoopCount::Finite(NonZeroU32::MIN);

    /// `n` passes; zero or negative means forever.
    pub fn from_repeats(n: i64) -> Self {
        match u32::try_from(n).ok().and_then(NonZeroU32::new) {
            Some(passes) => LoopCount::Finite(passes),
            None if n > 0 => LoopCount::Finite(NonZeroU32::MAX),
            None => LoopCount::Infinite,
        }
    }

    /// True once `completed` passes satisfy this count.
    pub fn is_satisfied_by(self, completed: u32) -> bool {
        match self {
            LoopCount::Finite(passes) => completed >= passes.get(),
            LoopCount::Infinite => false,
        }
    }
}

impl Default for LoopCount {
    fn default() -> Self {
        LoopCount::ONCE
    }
}

/// A device able to play a compiled timeline.
///
/// Every fallible operation reports `DeviceUnavailable` once the device has been
/// closed or could not be acquired.
pub trait Player: Send {
    fn load(&mut self, timeline: &Timeline) -> Result<()>;

    fn set_tempo(&mut self, bpm: u32) -> Result<()>;

    /// Advisory; repetition is driven by the caller restarting the player.
    fn set_loop_count(&mut self, count: LoopCount) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn set_position(&mut self, tick: u64) -> Result<()>;

    fn subscribe_end_of_stream(&mut self, callback: EndOfStreamCallback) -> Result<SubscriptionId>;

    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_count_from_repeats() {
        assert_eq!(LoopCount::from_repeats(1), LoopCount::ONCE);
        assert_eq!(
            LoopCount::from_repeats(3),
            LoopCount::Finite(NonZeroU32::new(3).unwrap())
        );
        assert_eq!(LoopCount::from_repeats(0), LoopCount::Infinite);
        assert_eq!(LoopCount::from_repeats(-2), LoopCount::Infinite);
        assert_eq!(LoopCount::from_repeats(i64::MAX), LoopCount::Finite(NonZeroU32::MAX));
    }

    #[test]
    fn test_loop_count_satisfaction() {
        let twice = LoopCount::from_repeats(2);
        assert!(!twice.is_satisfied_by(1));
        assert!(twice.is_satisfied_by(2));
        assert!(!LoopCount::Infinite.is_satisfied_by(u32::MAX));
    }
}
