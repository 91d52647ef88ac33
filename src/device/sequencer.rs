//! Software sequencer
//!
//! Plays a loaded [`Timeline`] on a worker thread and hands every event to an
//! [`EventSink`]. With [`Clock::Realtime`] events are paced by the wall clock
//! at the current tempo; with [`Clock::Immediate`] they are delivered as fast as
//! the sink accepts them.
//!
//! A pass ends when the worker reaches the end of the timeline, trailing rests
//! included. Each subscriber is then called once, from the worker thread.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{info, trace, warn};
use parking_lot::{Condvar, Mutex};

use super::{EndOfStreamCallback, LoopCount, Player, SubscriptionId};
use crate::arrangement::Timeline;
use crate::config::{PlaybackConfig, MAX_TEMPO, MIN_TEMPO};
use crate::error::{PartituraError, Result};
use crate::symbol::{check_velocity, Symbol};
use crate::timeline::{Channel, EventKind, TimelineEvent};

/// Receives the events a [`Sequencer`] plays.
pub trait EventSink: Send + 'static {
    fn send(&mut self, event: &TimelineEvent) -> Result<()>;
}

/// Keeps every event it receives; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<TimelineEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<TimelineEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn send(&mut self, event: &TimelineEvent) -> Result<()> {
        self.events.lock().push(*event);
        Ok(())
    }
}

/// Writes every event to the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn send(&mut self, event: &TimelineEvent) -> Result<()> {
        match event.kind {
            EventKind::NoteOn { pitch, velocity } => {
                info!("{} tick {}: note on {} vel {}", event.channel, event.tick, pitch, velocity)
            }
            EventKind::NoteOff { pitch } => {
                info!("{} tick {}: note off {}", event.channel, event.tick, pitch)
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    #[default]
    Realtime,
    Immediate,
}

type Subscribers = Mutex<Vec<(SubscriptionId, Arc<dyn Fn() + Send + Sync>)>>;

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    fn request(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }

    /// Sleep until `deadline`; false if a stop arrived first.
    fn sleep_until(&self, deadline: Instant) -> bool {
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.wake.wait_until(&mut stopped, deadline).timed_out() {
                return !*stopped;
            }
        }
        false
    }

    fn is_requested(&self) -> bool {
        *self.stopped.lock()
    }
}

struct Run {
    stop: Arc<StopSignal>,
    handle: JoinHandle<()>,
}

/// A [`Player`] that runs in software.
pub struct Sequencer<S: EventSink> {
    sink: Arc<Mutex<S>>,
    subscribers: Arc<Subscribers>,
    clock: Clock,
    timeline: Option<Arc<Timeline>>,
    bpm: u32,
    position: u64,
    loop_count: LoopCount,
    next_subscription: u64,
    run: Option<Run>,
    closed: bool,
}

impl<S: EventSink> Sequencer<S> {
    pub fn new(sink: S, clock: Clock) -> Self {
        Sequencer {
            sink: Arc::new(Mutex::new(sink)),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            clock,
            timeline: None,
            bpm: crate::config::DEFAULT_TEMPO,
            position: 0,
            loop_count: LoopCount::default(),
            next_subscription: 0,
            run: None,
            closed: false,
        }
    }

    pub fn from_config(sink: S, config: &PlaybackConfig) -> Result<Self> {
        config.validate()?;
        let clock = if config.realtime {
            Clock::Realtime
        } else {
            Clock::Immediate
        };
        let mut sequencer = Self::new(sink, clock);
        sequencer.bpm = config.tempo;
        Ok(sequencer)
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn loop_count(&self) -> LoopCount {
        self.loop_count
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the device; every later operation fails with `DeviceUnavailable`.
    pub fn close(&mut self) {
        self.halt();
        self.subscribers.lock().clear();
        self.timeline = None;
        self.closed = true;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(PartituraError::DeviceUnavailable(
                "the sequencer has been closed".to_string(),
            ));
        }
        Ok(())
    }

    fn halt(&mut self) {
        if let Some(run) = self.run.take() {
            run.stop.request();
            if run.handle.join().is_err() {
                warn!("sequencer worker panicked");
            }
        }
    }

    /// Play a single symbol right away on `channel`, blocking for its duration.
    pub fn play_now(&mut self, channel: Channel, symbol: &Symbol) -> Result<()> {
        let velocity = symbol.as_note().map_or(0, |note| note.velocity());
        self.sound(channel, symbol, velocity)
    }

    /// Like [`play_now`](Self::play_now), but notes sound at `intensity`
    /// instead of their own velocity.
    pub fn play_now_with(&mut self, channel: Channel, symbol: &Symbol, intensity: u8) -> Result<()> {
        let velocity = check_velocity(intensity)?;
        self.sound(channel, symbol, velocity)
    }

    fn sound(&mut self, channel: Channel, symbol: &Symbol, velocity: u8) -> Result<()> {
        self.ensure_open()?;
        let millis = symbol.duration().to_millis(self.bpm)?;
        let pitch = symbol.as_note().map(|note| note.pitch());
        if let Some(pitch) = pitch {
            self.sink
                .lock()
                .send(&TimelineEvent::note_on(self.position, channel, pitch, velocity))?;
        }
        if self.clock == Clock::Realtime {
            thread::sleep(std::time::Duration::from_millis(millis));
        }
        if let Some(pitch) = pitch {
            self.sink
                .lock()
                .send(&TimelineEvent::note_off(self.position, channel, pitch))?;
        }
        Ok(())
    }
}

impl<S: EventSink> Player for Sequencer<S> {
    fn load(&mut self, timeline: &Timeline) -> Result<()> {
        self.ensure_open()?;
        self.halt();
        self.timeline = Some(Arc::new(timeline.clone()));
        self.bpm = timeline.bpm();
        self.position = 0;
        Ok(())
    }

    fn set_tempo(&mut self, bpm: u32) -> Result<()> {
        self.ensure_open()?;
        if !(MIN_TEMPO..=MAX_TEMPO).contains(&bpm) {
            return Err(PartituraError::RangeError(format!(
                "tempo {} bpm is outside {}..={}",
                bpm, MIN_TEMPO, MAX_TEMPO
            )));
        }
        self.bpm = bpm;
        Ok(())
    }

    fn set_loop_count(&mut self, count: LoopCount) -> Result<()> {
        self.ensure_open()?;
        self.loop_count = count;
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.ensure_open()?;
        let timeline = self.timeline.clone().ok_or_else(|| {
            PartituraError::InvalidArgument("no timeline has been loaded".to_string())
        })?;
        self.halt();

        let stop = Arc::new(StopSignal::default());
        let worker = Worker {
            timeline,
            from: self.position,
            micros_per_tick: 0.0,
            clock: self.clock,
            sink: Arc::clone(&self.sink),
            subscribers: Arc::clone(&self.subscribers),
            stop: Arc::clone(&stop),
        }
        .with_tempo(self.bpm);
        let handle = thread::Builder::new()
            .name("partitura-sequencer".to_string())
            .spawn(move || worker.run())?;
        self.run = Some(Run { stop, handle });
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.halt();
        Ok(())
    }

    fn set_position(&mut self, tick: u64) -> Result<()> {
        self.ensure_open()?;
        self.position = tick;
        Ok(())
    }

    fn subscribe_end_of_stream(&mut self, callback: EndOfStreamCallback) -> Result<SubscriptionId> {
        self.ensure_open()?;
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.lock().push((id, Arc::from(callback)));
        Ok(id)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<()> {
        self.ensure_open()?;
        self.subscribers.lock().retain(|(existing, _)| *existing != id);
        Ok(())
    }
}

impl<S: EventSink> Drop for Sequencer<S> {
    fn drop(&mut self) {
        self.halt();
    }
}

struct Worker<S: EventSink> {
    timeline: Arc<Timeline>,
    from: u64,
    micros_per_tick: f64,
    clock: Clock,
    sink: Arc<Mutex<S>>,
    subscribers: Arc<Subscribers>,
    stop: Arc<StopSignal>,
}

impl<S: EventSink> Worker<S> {
    fn with_tempo(mut self, bpm: u32) -> Self {
        let ticks_per_minute = bpm as f64 * self.timeline.resolution() as f64;
        self.micros_per_tick = 60_000_000.0 / ticks_per_minute;
        self
    }

    /// Wait until `tick`; false if stopped meanwhile.
    fn reach(&self, started: Instant, tick: u64) -> bool {
        match self.clock {
            Clock::Immediate => !self.stop.is_requested(),
            Clock::Realtime => {
                let elapsed = tick.saturating_sub(self.from) as f64 * self.micros_per_tick;
                let deadline = started + std::time::Duration::from_micros(elapsed as u64);
                self.stop.sleep_until(deadline)
            }
        }
    }

    fn deliver(&self, event: &TimelineEvent) {
        trace!("{} tick {}: {:?}", event.channel, event.tick, event.kind);
        if let Err(e) = self.sink.lock().send(event) {
            warn!("event sink rejected {:?}: {}", event, e);
        }
    }

    fn run(self) {
        let started = Instant::now();
        let mut sounding: HashSet<(Channel, u8)> = HashSet::new();

        for event in self.timeline.events().iter().filter(|e| e.tick >= self.from) {
            if !self.reach(started, event.tick) {
                self.silence(&sounding, event.tick);
                return;
            }
            match event.kind {
                EventKind::NoteOn { pitch, .. } => {
                    sounding.insert((event.channel, pitch));
                }
                EventKind::NoteOff { pitch } => {
                    sounding.remove(&(event.channel, pitch));
                }
            }
            self.deliver(event);
        }
        if !self.reach(started, self.timeline.length()) {
            return;
        }

        let callbacks: Vec<_> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    fn silence(&self, sounding: &HashSet<(Channel, u8)>, tick: u64) {
        for &(channel, pitch) in sounding {
            self.deliver(&TimelineEvent {
                tick,
                channel,
                kind: EventKind::NoteOff { pitch },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration as WallDuration;

    use crate::arrangement::Arrangement;

    fn scale() -> Timeline {
        let mut arrangement = Arrangement::new();
        arrangement
            .add_part_on(Channel::new(0).unwrap(), "Piano")
            .append_str("DO,RE,MI,FA,SOL")
            .unwrap();
        arrangement.timeline()
    }

    fn end_signal(sequencer: &mut Sequencer<RecordingSink>) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        sequencer
            .subscribe_end_of_stream(Box::new(move || {
                let _ = tx.lock().send(());
            }))
            .unwrap();
        rx
    }

    #[test]
    fn test_immediate_pass_delivers_every_event() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink.clone(), Clock::Immediate);
        let done = end_signal(&mut sequencer);
        let timeline = scale();

        sequencer.load(&timeline).unwrap();
        sequencer.start().unwrap();
        done.recv_timeout(WallDuration::from_secs(5)).unwrap();

        assert_eq!(sink.events(), timeline.events());
        assert!(done.try_recv().is_err());
    }

    #[test]
    fn test_one_end_of_stream_per_pass() {
        let mut sequencer = Sequencer::new(RecordingSink::new(), Clock::Immediate);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let done = end_signal(&mut sequencer);
        sequencer
            .subscribe_end_of_stream(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        sequencer.load(&scale()).unwrap();
        for _ in 0..3 {
            sequencer.set_position(0).unwrap();
            sequencer.start().unwrap();
            done.recv_timeout(WallDuration::from_secs(5)).unwrap();
        }
        sequencer.stop().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_start_from_position() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink.clone(), Clock::Immediate);
        let done = end_signal(&mut sequencer);
        sequencer.load(&scale()).unwrap();
        sequencer.set_position(3 * 960).unwrap();
        sequencer.start().unwrap();
        done.recv_timeout(WallDuration::from_secs(5)).unwrap();
        let pitches: Vec<u8> = sink.events().iter().map(|e| e.kind.pitch()).collect();
        assert_eq!(pitches, vec![64, 65, 65, 67, 67]);
    }

    #[test]
    fn test_stop_silences_sounding_notes() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink.clone(), Clock::Realtime);
        let mut arrangement = Arrangement::new();
        arrangement.set_bpm(60).unwrap();
        arrangement
            .add_part_on(Channel::new(0).unwrap(), "Piano")
            .append_str("DO:1/1")
            .unwrap();
        sequencer.load(&arrangement.timeline()).unwrap();
        sequencer.start().unwrap();
        thread::sleep(WallDuration::from_millis(50));
        sequencer.stop().unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(!events[0].kind.is_note_off());
        assert_eq!(events[1].kind, EventKind::NoteOff { pitch: 60 });
    }

    #[test]
    fn test_closed_sequencer_is_unavailable() {
        let mut sequencer = Sequencer::new(LogSink, Clock::Immediate);
        sequencer.close();
        assert!(sequencer.is_closed());
        assert!(matches!(
            sequencer.load(&scale()),
            Err(PartituraError::DeviceUnavailable(_))
        ));
        assert!(matches!(sequencer.start(), Err(PartituraError::DeviceUnavailable(_))));
        assert!(matches!(
            sequencer.subscribe_end_of_stream(Box::new(|| {})),
            Err(PartituraError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn test_start_requires_a_timeline() {
        let mut sequencer = Sequencer::new(LogSink, Clock::Immediate);
        assert!(matches!(sequencer.start(), Err(PartituraError::InvalidArgument(_))));
    }

    #[test]
    fn test_tempo_range() {
        let mut sequencer = Sequencer::new(LogSink, Clock::Immediate);
        assert!(matches!(sequencer.set_tempo(0), Err(PartituraError::RangeError(_))));
        sequencer.set_tempo(200).unwrap();
        assert_eq!(sequencer.bpm(), 200);
    }

    #[test]
    fn test_unsubscribed_callback_is_not_called() {
        let mut sequencer = Sequencer::new(RecordingSink::new(), Clock::Immediate);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let id = sequencer
            .subscribe_end_of_stream(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        let done = end_signal(&mut sequencer);
        sequencer.unsubscribe(id).unwrap();
        sequencer.load(&scale()).unwrap();
        sequencer.start().unwrap();
        done.recv_timeout(WallDuration::from_secs(5)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_play_now() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink.clone(), Clock::Immediate);
        let channel = Channel::new(1).unwrap();
        sequencer.play_now(channel, &"LA:1/8:100".parse().unwrap()).unwrap();
        sequencer.play_now(channel, &"_".parse().unwrap()).unwrap();
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::NoteOn { pitch: 69, velocity: 100 });
        assert_eq!(events[1].kind, EventKind::NoteOff { pitch: 69 });
    }

    #[test]
    fn test_play_now_with_overrides_intensity() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink.clone(), Clock::Immediate);
        let channel = Channel::new(2).unwrap();
        sequencer
            .play_now_with(channel, &"DO:1/8:100".parse().unwrap(), 30)
            .unwrap();
        assert_eq!(sink.events()[0].kind, EventKind::NoteOn { pitch: 60, velocity: 30 });
        assert!(matches!(
            sequencer.play_now_with(channel, &"DO".parse().unwrap(), 128),
            Err(PartituraError::RangeError(_))
        ));
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn test_from_config_selects_clock() {
        let config = PlaybackConfig::from_yaml("realtime: false\ntempo: 100").unwrap();
        let sequencer = Sequencer::from_config(LogSink, &config).unwrap();
        assert_eq!(sequencer.clock(), Clock::Immediate);
        assert_eq!(sequencer.bpm(), 100);
    }
}
