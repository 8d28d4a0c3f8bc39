/*!
Standard MIDI File codec.

Bidirectional conversion between the binary SMF wire format and the
in-memory note model: [`parse`] turns a byte buffer into sequences,
[`serialize`] turns sequences back into a byte buffer. The codec covers
the subset of MIDI this product needs (note on/off, tempo, track names);
everything else is skipped over length-aware, never an error.

Both directions are pure computations over in-memory buffers. Reading the
bytes from disk and writing them back out is the caller's job.
 */

use thiserror::Error;

pub mod event;
mod parse;
mod write;

pub use parse::parse;
pub use write::serialize;

/// Tick resolution written on export.
pub const TICKS_PER_QUARTER: u16 = 480;

/// Default tempo in microseconds per quarter note (120 BPM), used until a
/// tempo meta event says otherwise and always used on export.
pub const DEFAULT_TEMPO: u32 = 500_000;

/// Seconds per tick under `tempo` microseconds per quarter note.
pub(crate) fn tick_len(tempo: u32, division: u16) -> f64 {
    tempo as f64 / 1_000_000.0 / division as f64
}

/// Recoverable decode failures, surfaced to the caller for user-facing
/// messaging. Parsing never panics.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing or malformed MThd header chunk")]
    MalformedHeader,
    #[error("unsupported MIDI feature: {0}")]
    UnsupportedFormat(String),
    #[error("truncated MIDI data while reading {0}")]
    TruncatedData(&'static str),
    #[error("invalid event data: {0}")]
    InvalidEventData(String),
}

/// What to do with a note-on that never sees a matching note-off.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DanglingNote {
    /// Close the note at the track's end time.
    #[default]
    ClampToTrackEnd,
    /// Drop the note.
    Discard,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub dangling: DanglingNote,
}
