//! # Standard MIDI File Persistence
//!
//! Arrangements are stored as format 1 (parallel tracks) files with metrical
//! timing equal to the arrangement's resolution.
//!
//! ## Layout
//! - Track 0: tempo
//! - Track 1..: one per part, named after the part's instrument, holding its
//!   note events on the part's channel
//!
//! Every track ends at the part's end tick, so trailing rests survive a round
//! trip.
//!
//! ## Reading
//! Files written by other tools are accepted as long as they use metrical timing.
//! Only note events are kept. Each channel that carries notes within a track
//! becomes its own part, so a format 0 file with a drum line yields a part on the
//! percussion channel. Parts split out of one track are named `"<track> chN"`.
//! A note-on with velocity 0 is read as a note-off.

use std::fs;
use std::path::Path;

use log::debug;
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};

use crate::arrangement::Arrangement;
use crate::error::{PartituraError, Result};
use crate::timeline::{sort_events, Channel, EventKind, Part, TimelineEvent};

const MAX_RESOLUTION: u32 = 0x7FFF;
const MAX_TICK: u64 = 0x0FFF_FFFF;
const MICROS_PER_MINUTE: u32 = 60_000_000;

/// Encode `arrangement` as a Standard MIDI File.
pub fn to_bytes(arrangement: &Arrangement) -> Result<Vec<u8>> {
    if arrangement.resolution() > MAX_RESOLUTION {
        return Err(PartituraError::MidiFile(format!(
            "resolution {} does not fit a MIDI header",
            arrangement.resolution()
        )));
    }

    let mut tracks = vec![build_tempo_track(arrangement.bpm())];
    for part in arrangement.parts() {
        tracks.push(build_part_track(part)?);
    }

    let smf = Smf {
        header: Header {
            format: Format::Parallel,
            timing: Timing::Metrical((arrangement.resolution() as u16).into()),
        },
        tracks,
    };
    let mut out = Vec::new();
    smf.write(&mut out)
        .map_err(|e| PartituraError::MidiFile(format!("failed to encode: {}", e)))?;
    Ok(out)
}

/// Write `arrangement` to a `.mid` file at `path`.
pub fn write(arrangement: &Arrangement, path: impl AsRef<Path>) -> Result<()> {
    let bytes = to_bytes(arrangement)?;
    fs::write(path.as_ref(), bytes)?;
    debug!(
        "wrote {} parts to {}",
        arrangement.parts().len(),
        path.as_ref().display()
    );
    Ok(())
}

/// Decode an arrangement from Standard MIDI File bytes.
pub fn from_bytes(bytes: &[u8]) -> Result<Arrangement> {
    let smf = Smf::parse(bytes).map_err(|e| PartituraError::MidiFile(e.to_string()))?;
    let resolution = match smf.header.timing {
        Timing::Metrical(ticks) => ticks.as_int() as u32,
        Timing::Timecode(..) => {
            return Err(PartituraError::MidiFile(
                "timecode (SMPTE) timing is not supported".to_string(),
            ))
        }
    };
    let mut arrangement = Arrangement::with_resolution(resolution)
        .map_err(|_| PartituraError::MidiFile("resolution is zero".to_string()))?;

    for (index, track) in smf.tracks.iter().enumerate() {
        let decoded = decode_track(track);
        if let Some(micros) = decoded.tempo {
            let bpm = (MICROS_PER_MINUTE as f64 / micros.max(1) as f64).round() as u32;
            arrangement
                .set_bpm(bpm)
                .map_err(|e| PartituraError::MidiFile(e.to_string()))?;
        }
        let name = decoded
            .name
            .unwrap_or_else(|| format!("Track {}", index));
        let split = decoded.voices.len() > 1;
        for (channel, events) in decoded.voices {
            let part_name = if split {
                format!("{} {}", name, channel)
            } else {
                name.clone()
            };
            arrangement
                .add_part_on(channel, &part_name)
                .restore(events, decoded.end);
        }
    }
    Ok(arrangement)
}

/// Read an arrangement from the file at `path`.
pub fn read(path: impl AsRef<Path>) -> Result<Arrangement> {
    let bytes = fs::read(path.as_ref())?;
    from_bytes(&bytes)
}

fn build_tempo_track<'a>(bpm: u32) -> Track<'a> {
    let micros_per_quarter = MICROS_PER_MINUTE / bpm.max(1);
    vec![
        TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(micros_per_quarter.into())),
        },
        TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ]
}

fn build_part_track(part: &Part) -> Result<Track<'_>> {
    let end = part.end_tick();
    if end > MAX_TICK {
        return Err(PartituraError::MidiFile(format!(
            "{} ends at tick {}, beyond what a MIDI file can address",
            part.instrument(),
            end
        )));
    }

    let mut timed = part.events().to_vec();
    sort_events(&mut timed);

    let mut events = vec![TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(part.instrument().as_bytes())),
    }];
    let mut previous = 0u64;
    for event in &timed {
        let message = match event.kind {
            EventKind::NoteOn { pitch, velocity } => MidiMessage::NoteOn {
                key: pitch.into(),
                vel: velocity.into(),
            },
            EventKind::NoteOff { pitch } => MidiMessage::NoteOff {
                key: pitch.into(),
                vel: 0.into(),
            },
        };
        events.push(TrackEvent {
            delta: ((event.tick - previous) as u32).into(),
            kind: TrackEventKind::Midi {
                channel: event.channel.number().into(),
                message,
            },
        });
        previous = event.tick;
    }
    events.push(TrackEvent {
        delta: ((end - previous) as u32).into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    Ok(events)
}

#[derive(Default)]
struct DecodedTrack {
    name: Option<String>,
    tempo: Option<u32>,
    /// Note events per channel, in order of first appearance
    voices: Vec<(Channel, Vec<TimelineEvent>)>,
    end: u64,
}

impl DecodedTrack {
    fn voice(&mut self, channel: Channel) -> &mut Vec<TimelineEvent> {
        let index = match self.voices.iter().position(|(c, _)| *c == channel) {
            Some(index) => index,
            None => {
                self.voices.push((channel, Vec::new()));
                self.voices.len() - 1
            }
        };
        &mut self.voices[index].1
    }
}

fn decode_track(track: &Track) -> DecodedTrack {
    let mut decoded = DecodedTrack::default();
    let mut tick = 0u64;
    for event in track {
        tick += event.delta.as_int() as u64;
        match event.kind {
            TrackEventKind::Meta(MetaMessage::TrackName(name)) if decoded.name.is_none() => {
                decoded.name = Some(String::from_utf8_lossy(name).into_owned());
            }
            TrackEventKind::Meta(MetaMessage::Tempo(micros)) if decoded.tempo.is_none() => {
                decoded.tempo = Some(micros.as_int());
            }
            TrackEventKind::Midi { channel, message } => {
                let channel = Channel::from_nibble(channel.as_int());
                let kind = match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => EventKind::NoteOn {
                        pitch: key.as_int(),
                        velocity: vel.as_int(),
                    },
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        EventKind::NoteOff { pitch: key.as_int() }
                    }
                    _ => continue,
                };
                decoded.voice(channel).push(TimelineEvent {
                    tick,
                    channel,
                    kind,
                });
            }
            _ => {}
        }
    }
    decoded.end = tick;
    decoded
}
