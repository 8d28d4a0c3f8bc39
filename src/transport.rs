/*!
The playback clock and the host-engine contract.

The transport advances a monotonic position and turns every note
boundary it passes into exactly one event for the host audio engine. It
never reads the wall clock, never mutates any sequence, and only borrows
the mixer for the duration of one call, so a host can drive it from any
frame loop.

A ledger of currently sounding notes makes the contract airtight: a note
whose track goes silent mid-playback (mute, solo elsewhere, removal),
whose id disappears, or which is cut short by a seek, a stop or a loop
wrap always gets its note-off. The host is never left holding a stuck
voice.
 */

use log::{debug, warn};

use crate::mixer::{Mixer, TrackId};
use crate::model::NoteId;

/// Boundary crossings emitted towards the host audio engine. Per-track
/// gain and pan ride along so the host needs no model access.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransportEvent {
    NoteOn {
        track: TrackId,
        pitch: u8,
        velocity: f64,
        gain: f64,
        pan: f64,
    },
    NoteOff {
        track: TrackId,
        pitch: u8,
    },
}

/// The capability the host audio engine hands to the transport. Injected
/// rather than ambient, so tests run against a recording double and no
/// audio hardware is ever touched here.
pub trait AudioHost {
    fn note_on(&mut self, track: TrackId, pitch: u8, velocity: f64, gain: f64, pan: f64);
    fn note_off(&mut self, track: TrackId, pitch: u8);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
}

/// Catch-up bound: one tick wraps a loop at most this many times before
/// giving up on replaying the backlog.
const MAX_LOOP_WRAPS: u32 = 64;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Sounding {
    track: TrackId,
    note: NoteId,
    pitch: u8,
}

/// Event with its boundary time and an off-before-on order key. Times
/// are only comparable within one segment, so each segment sorts and
/// drains before the next begins (a loop wrap resets the clock).
type Timed = (f64, u8, TransportEvent);

const OFF: u8 = 0;
const ON: u8 = 1;

#[derive(Clone, Debug, Default)]
pub struct Transport {
    state: TransportState,
    position: f64,
    loop_region: Option<(f64, f64)>,
    sounding: Vec<Sounding>,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Current position in seconds.
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn loop_region(&self) -> Option<(f64, f64)> {
        self.loop_region
    }

    /// Arms or disarms looping. Degenerate regions (end not after start)
    /// disarm.
    pub fn set_loop(&mut self, region: Option<(f64, f64)>) {
        self.loop_region = region.and_then(|(start, end)| {
            let start = start.max(0.0);
            (end > start).then_some((start, end))
        });
    }

    pub fn start(&mut self) {
        if self.state != TransportState::Playing {
            debug!("transport playing from {:.3}s", self.position);
            self.state = TransportState::Playing;
        }
    }

    /// Stops the clock where it is. Anything still ringing is released;
    /// the returned note-offs must reach the host.
    pub fn stop(&mut self) -> Vec<TransportEvent> {
        if self.state == TransportState::Playing {
            debug!("transport stopped at {:.3}s", self.position);
        }
        self.state = TransportState::Stopped;
        self.drain_sounding()
    }

    /// Jumps to `seconds` without changing the playing/stopped state.
    /// Notes ringing at the old position are released.
    pub fn seek(&mut self, seconds: f64) -> Vec<TransportEvent> {
        self.position = seconds.max(0.0);
        self.drain_sounding()
    }

    /// Advances the clock by `delta` seconds and returns every boundary
    /// crossing in the elapsed interval, in time order, note-offs ahead
    /// of note-ons at equal times.
    ///
    /// The interval is synthesized exactly: one call with a large delta
    /// (catch-up after a stall) emits the same ordered events as many
    /// small calls covering the same span. When there is nothing left to
    /// play and no loop is armed, the transport stops itself.
    pub fn tick(&mut self, mixer: &Mixer, delta: f64) -> Vec<TransportEvent> {
        if self.state != TransportState::Playing || !(delta > 0.0) {
            return Vec::new();
        }

        let mut out = Vec::new();
        let mut segment: Vec<Timed> = Vec::new();
        let mut remaining = delta;
        let mut wraps = 0;

        loop {
            let t0 = self.position;
            let seg_end = match self.loop_region {
                Some((_, end)) if t0 < end => (t0 + remaining).min(end),
                _ => t0 + remaining,
            };

            self.collect_segment(mixer, t0, seg_end, &mut segment);
            remaining -= seg_end - t0;
            self.position = seg_end;

            let mut wrapped = false;
            if let Some((start, end)) = self.loop_region {
                // Reaching the edge wraps even with nothing left to
                // play, so the next tick starts inside the region.
                if seg_end >= end && t0 < end {
                    self.flush_sounding(end, &mut segment);
                    self.position = start;
                    wrapped = true;
                }
            }

            segment.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            out.extend(segment.drain(..).map(|(_, _, event)| event));

            if !wrapped || remaining <= 0.0 {
                break;
            }
            wraps += 1;
            if wraps >= MAX_LOOP_WRAPS {
                warn!("dropping {remaining:.3}s of loop catch-up after {MAX_LOOP_WRAPS} wraps");
                break;
            }
        }

        if self.loop_region.is_none() {
            let end = mixer.end_time();
            if self.position >= end {
                // Boundary events all precede the flush time, so a plain
                // append keeps order.
                self.flush_sounding(self.position.max(end), &mut segment);
                self.position = end;
                self.state = TransportState::Stopped;
                debug!("transport reached end of timeline at {:.3}s", end);
                out.extend(segment.drain(..).map(|(_, _, event)| event));
            }
        }

        out
    }

    /// One [`tick`](Self::tick), forwarded to the host capability.
    pub fn pump(&mut self, mixer: &Mixer, delta: f64, host: &mut dyn AudioHost) {
        for event in self.tick(mixer, delta) {
            dispatch(event, host);
        }
    }

    /// Boundary crossings within `[t0, t1)`, plus ledger reconciliation
    /// for notes that can no longer sound.
    fn collect_segment(&mut self, mixer: &Mixer, t0: f64, t1: f64, out: &mut Vec<Timed>) {
        // Release anything in the ledger whose note or audibility is gone:
        // deleted notes, removed tracks, mute/solo changes since last tick.
        self.sounding.retain(|entry| {
            let intact = mixer.effective_gain(entry.track) > 0.0
                && mixer
                    .track(entry.track)
                    .and_then(|track| track.sequence.get(entry.note))
                    .is_some();
            if !intact {
                out.push((
                    t0,
                    OFF,
                    TransportEvent::NoteOff {
                        track: entry.track,
                        pitch: entry.pitch,
                    },
                ));
            }
            intact
        });

        for (track_id, track) in mixer.iter() {
            let gain = mixer.effective_gain(track_id);
            if gain <= 0.0 {
                continue;
            }
            let pan = track.pan();

            for (note_id, note) in track.sequence.iter() {
                let ringing = self
                    .sounding
                    .iter()
                    .position(|entry| entry.track == track_id && entry.note == note_id);

                if let Some(index) = ringing {
                    // Already on: only its release can fall in this segment.
                    if note.end() < t1 {
                        let at = note.end().max(t0);
                        out.push((
                            at,
                            OFF,
                            TransportEvent::NoteOff {
                                track: track_id,
                                pitch: note.pitch(),
                            },
                        ));
                        self.sounding.swap_remove(index);
                    }
                } else if note.start() >= t0 && note.start() < t1 {
                    out.push((
                        note.start(),
                        ON,
                        TransportEvent::NoteOn {
                            track: track_id,
                            pitch: note.pitch(),
                            velocity: note.velocity(),
                            gain,
                            pan,
                        },
                    ));
                    if note.end() < t1 {
                        out.push((
                            note.end(),
                            OFF,
                            TransportEvent::NoteOff {
                                track: track_id,
                                pitch: note.pitch(),
                            },
                        ));
                    } else {
                        self.sounding.push(Sounding {
                            track: track_id,
                            note: note_id,
                            pitch: note.pitch(),
                        });
                    }
                }
            }
        }
    }

    fn flush_sounding(&mut self, at: f64, out: &mut Vec<Timed>) {
        for entry in self.sounding.drain(..) {
            out.push((
                at,
                OFF,
                TransportEvent::NoteOff {
                    track: entry.track,
                    pitch: entry.pitch,
                },
            ));
        }
    }

    fn drain_sounding(&mut self) -> Vec<TransportEvent> {
        self.sounding
            .drain(..)
            .map(|entry| TransportEvent::NoteOff {
                track: entry.track,
                pitch: entry.pitch,
            })
            .collect()
    }
}

/// Hands one event to the host capability. Hosts that consume
/// [`Transport::stop`] or [`Transport::seek`] results route them here.
pub fn dispatch(event: TransportEvent, host: &mut dyn AudioHost) {
    match event {
        TransportEvent::NoteOn {
            track,
            pitch,
            velocity,
            gain,
            pan,
        } => host.note_on(track, pitch, velocity, gain, pan),
        TransportEvent::NoteOff { track, pitch } => host.note_off(track, pitch),
    }
}
