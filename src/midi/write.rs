/*!
SMF encoding: sequences to bytes.

One format-1 file, one track chunk per sequence, 480 ticks per quarter at
a fixed 120 BPM. Events within a track are sorted by absolute tick with
note-offs ahead of note-ons at the same tick, so re-triggering a voice at
a boundary never overlaps itself.
 */

use log::debug;

use super::{tick_len, DEFAULT_TEMPO, TICKS_PER_QUARTER};
use crate::model::Sequence;

/// Encodes the sequences as a Standard MIDI File byte buffer.
///
/// Serialization cannot fail: every representable [`Sequence`] encodes.
/// Two quantizations are inherent to the wire format and documented here
/// rather than hidden: times land on the 480-per-quarter tick grid
/// (about a millisecond at 120 BPM), and velocity lands on the 127-step
/// MIDI grid, with zero written as 1 because a zero byte on the wire
/// would read back as a note-off.
pub fn serialize(sequences: &[Sequence]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"MThd");
    out.extend_from_slice(&6u32.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&(sequences.len() as u16).to_be_bytes());
    out.extend_from_slice(&TICKS_PER_QUARTER.to_be_bytes());

    for (index, sequence) in sequences.iter().enumerate() {
        let chunk = track_chunk(sequence, index == 0);
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(chunk.len() as u32).to_be_bytes());
        out.extend_from_slice(&chunk);
    }

    debug!("serialized {} track(s), {} bytes", sequences.len(), out.len());
    out
}

fn seconds_to_ticks(seconds: f64) -> u64 {
    (seconds / tick_len(DEFAULT_TEMPO, TICKS_PER_QUARTER)).round() as u64
}

fn wire_velocity(velocity: f64) -> u8 {
    ((velocity * 127.0).round() as u8).clamp(1, 127)
}

fn track_chunk(sequence: &Sequence, conductor: bool) -> Vec<u8> {
    // (tick, off-before-on order key, pitch, velocity).
    let mut events: Vec<(u64, u8, u8, u8)> = Vec::with_capacity(sequence.len() * 2);
    for (_, note) in sequence.iter() {
        let on = seconds_to_ticks(note.start());
        // A note shorter than the grid still occupies one tick.
        let off = seconds_to_ticks(note.end()).max(on + 1);
        events.push((on, 1, note.pitch(), wire_velocity(note.velocity())));
        events.push((off, 0, note.pitch(), 0));
    }
    // Stable, so simultaneous events keep insertion order.
    events.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let mut chunk = Vec::new();
    if conductor {
        chunk.push(0x00);
        chunk.extend_from_slice(&[0xFF, 0x51, 0x03]);
        chunk.extend_from_slice(&DEFAULT_TEMPO.to_be_bytes()[1..]);
    }
    if !sequence.name.is_empty() {
        let name = sequence.name.as_bytes();
        chunk.push(0x00);
        chunk.extend_from_slice(&[0xFF, 0x03]);
        write_vlq(&mut chunk, name.len() as u32);
        chunk.extend_from_slice(name);
    }

    let mut last_tick = 0u64;
    for (tick, order, pitch, velocity) in events {
        write_vlq(&mut chunk, (tick - last_tick) as u32);
        chunk.push(if order == 1 { 0x90 } else { 0x80 });
        chunk.push(pitch);
        chunk.push(velocity);
        last_tick = tick;
    }

    let end_tick = seconds_to_ticks(sequence.end_time()).max(last_tick);
    write_vlq(&mut chunk, (end_tick - last_tick) as u32);
    chunk.extend_from_slice(&[0xFF, 0x2F, 0x00]);
    chunk
}

/// MIDI variable-length quantity: 7 bits per byte, high bit continues.
fn write_vlq(buf: &mut Vec<u8>, mut value: u32) {
    let mut bytes = [0u8; 4];
    let mut i = 3;
    bytes[i] = (value & 0x7F) as u8;
    value >>= 7;
    while value > 0 {
        i -= 1;
        bytes[i] = ((value & 0x7F) | 0x80) as u8;
        value >>= 7;
    }
    buf.extend_from_slice(&bytes[i..]);
}
