//! Blocking playback sessions over a [`Player`].

use std::sync::Arc;

use log::{info, warn};
use parking_lot::Mutex;

use super::latch::Latch;
use crate::arrangement::{Arrangement, Timeline};
use crate::device::{LoopCount, Player, SubscriptionId};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
    Completed,
    Cancelled,
}

/// What a finished session did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackOutcome {
    /// Passes that reached the end of the timeline
    pub passes: u32,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    EndOfStream,
    Cancelled,
}

#[derive(Default)]
struct CancelState {
    requested: bool,
    armed: Option<Arc<Latch<Signal>>>,
}

/// Interrupts a running session from any thread.
#[derive(Clone, Default)]
pub struct CancelHandle {
    state: Arc<Mutex<CancelState>>,
}

impl CancelHandle {
    /// Ask the running session to stop. The session returns normally with
    /// `cancelled` set.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.requested = true;
        if let Some(latch) = &state.armed {
            latch.fire(Signal::Cancelled);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().requested
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        state.requested = false;
        state.armed = None;
    }

    fn arm(&self, latch: &Arc<Latch<Signal>>) {
        let mut state = self.state.lock();
        if state.requested {
            latch.fire(Signal::Cancelled);
        }
        state.armed = Some(Arc::clone(latch));
    }

    fn disarm(&self) {
        self.state.lock().armed = None;
    }
}

/// Plays arrangements on a player, blocking the caller until playback ends.
///
/// ```
/// use partitura::{Arrangement, PlaybackDriver};
/// use partitura::device::{ChannelTable, Clock, RecordingSink, Sequencer};
///
/// let mut channels = ChannelTable::new();
/// let mut song = Arrangement::new();
/// song.add_part(&mut channels, "Piano")?.append_str("DO,MI,SOL")?;
///
/// let sink = RecordingSink::new();
/// let mut driver = PlaybackDriver::new(Sequencer::new(sink.clone(), Clock::Immediate));
/// let outcome = driver.play(&song)?;
/// assert_eq!(outcome.passes, 1);
/// assert_eq!(sink.events().len(), 6);
/// # Ok::<(), partitura::PartituraError>(())
/// ```
pub struct PlaybackDriver<P: Player> {
    player: P,
    state: PlaybackState,
    cancel: CancelHandle,
}

impl<P: Player> PlaybackDriver<P> {
    pub fn new(player: P) -> Self {
        PlaybackDriver {
            player,
            state: PlaybackState::Idle,
            cancel: CancelHandle::default(),
        }
    }

    /// A handle that cancels whatever session is running on this driver.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn into_player(self) -> P {
        self.player
    }

    /// Play `arrangement` once.
    pub fn play(&mut self, arrangement: &Arrangement) -> Result<PlaybackOutcome> {
        self.play_looped(arrangement, LoopCount::ONCE)
    }

    /// Play `arrangement` `count` times, or until cancelled.
    pub fn play_looped(
        &mut self,
        arrangement: &Arrangement,
        count: LoopCount,
    ) -> Result<PlaybackOutcome> {
        self.cancel.reset();
        self.state = PlaybackState::Loading;
        let timeline = arrangement.timeline();
        info!(
            "playback starting: {} events, {} bpm, {:?}",
            timeline.events().len(),
            arrangement.bpm(),
            count
        );
        if let Err(e) = self.load(&timeline, arrangement.bpm(), count) {
            self.abort(None);
            return Err(e);
        }

        let mut passes = 0;
        loop {
            match self.run_pass()? {
                Signal::EndOfStream => {
                    passes += 1;
                    info!("playback pass {} completed", passes);
                    if count.is_satisfied_by(passes) {
                        self.stop_player();
                        self.state = PlaybackState::Completed;
                        info!("playback completed after {} passes", passes);
                        return Ok(PlaybackOutcome {
                            passes,
                            cancelled: false,
                        });
                    }
                }
                Signal::Cancelled => {
                    self.stop_player();
                    self.state = PlaybackState::Cancelled;
                    info!("playback cancelled after {} passes", passes);
                    return Ok(PlaybackOutcome {
                        passes,
                        cancelled: true,
                    });
                }
            }
        }
    }

    fn load(&mut self, timeline: &Timeline, bpm: u32, count: LoopCount) -> Result<()> {
        self.player.load(timeline)?;
        self.player.set_loop_count(count)?;
        self.player.set_tempo(bpm)
    }

    /// One pass from tick 0, blocking until the player ends it or a cancel arrives.
    fn run_pass(&mut self) -> Result<Signal> {
        let latch = Arc::new(Latch::new());
        let firing = Arc::clone(&latch);
        let subscription = match self
            .player
            .subscribe_end_of_stream(Box::new(move || firing.fire(Signal::EndOfStream)))
        {
            Ok(id) => id,
            Err(e) => {
                self.abort(None);
                return Err(e);
            }
        };
        self.cancel.arm(&latch);
        self.state = PlaybackState::Playing;

        let started = self.player.set_position(0).and_then(|_| self.player.start());
        if let Err(e) = started {
            self.abort(Some(subscription));
            return Err(e);
        }

        let signal = latch.wait();
        self.cancel.disarm();
        self.unsubscribe(subscription);
        Ok(signal)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        if let Err(e) = self.player.unsubscribe(id) {
            warn!("failed to unsubscribe from end of stream: {}", e);
        }
    }

    fn stop_player(&mut self) {
        if let Err(e) = self.player.stop() {
            warn!("failed to stop player: {}", e);
        }
    }

    fn abort(&mut self, subscription: Option<SubscriptionId>) {
        self.cancel.disarm();
        if let Some(id) = subscription {
            self.unsubscribe(id);
        }
        self.stop_player();
        self.state = PlaybackState::Idle;
    }
}
