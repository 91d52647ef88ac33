pub mod arrangement;
pub mod config;
pub mod device;
pub mod duration;
pub mod error;
pub mod midi_file;
pub mod parser;
pub mod pitch;
pub mod playback;
pub mod symbol;
pub mod timeline;

pub use arrangement::{Arrangement, Binding, Timeline};
pub use config::PlaybackConfig;
pub use device::{ChannelAllocator, LoopCount, Player};
pub use duration::Duration;
pub use error::*;
pub use parser::parse_symbols;
pub use pitch::{Accidental, NoteName, Pitch};
pub use playback::{CancelHandle, PlaybackDriver, PlaybackOutcome, PlaybackState};
pub use symbol::{Note, NoteBuilder, Rest, Symbol};
pub use timeline::{Channel, EventKind, Part, TimelineEvent};

/// Compile a single-voice sequence such as `"DO,RE,MI,DO"` for `instrument`.
/// The part is placed on `allocator`'s channel in a new arrangement.
pub fn compile<A>(allocator: &mut A, instrument: &str, source: &str) -> Result<Arrangement>
where
    A: ChannelAllocator + ?Sized,
{
    let mut arrangement = Arrangement::new();
    arrangement.add_part(allocator, instrument)?.append_str(source)?;
    Ok(arrangement)
}
