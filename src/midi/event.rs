//! Wire-level event shapes, decided once at parse time.

/// The events the codec understands, as a tagged union rather than loose
/// status/data tuples.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackEvent {
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    NoteOff { channel: u8, pitch: u8, velocity: u8 },
    /// Tempo meta event, microseconds per quarter note.
    Tempo(u32),
    TrackName(String),
    EndOfTrack,
}

/// An event at an absolute tick position within its track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimedEvent {
    pub tick: u64,
    pub event: TrackEvent,
}
