/*!
SMF decoding: bytes to sequences.

Chunks are walked with explicit bounds checks, channel events support
running status, and ticks are converted to seconds through a tempo map
assembled from every track (format 1 keeps tempo in the conductor track,
but it governs the whole file).
 */

use std::collections::HashMap;

use log::{debug, warn};

use super::event::{TimedEvent, TrackEvent};
use super::{tick_len, DanglingNote, ParseError, ParseOptions, DEFAULT_TEMPO};
use crate::model::{Note, Sequence};

/// Decodes a Standard MIDI File into one sequence per track chunk.
pub fn parse(bytes: &[u8], options: &ParseOptions) -> Result<Vec<Sequence>, ParseError> {
    let mut reader = Reader::new(bytes);
    let header = read_header(&mut reader)?;

    let mut raw_tracks = Vec::with_capacity(header.track_count as usize);
    for _ in 0..header.track_count {
        let kind = reader.take(4, "chunk type")?;
        if kind != b"MTrk" {
            return Err(ParseError::UnsupportedFormat(format!(
                "chunk type {}",
                String::from_utf8_lossy(kind)
            )));
        }
        let length = reader.u32("chunk length")? as usize;
        let data = reader.take(length, "track chunk")?;
        raw_tracks.push(read_track(data)?);
    }

    let tempo_map = TempoMap::build(&raw_tracks, header.division);
    let sequences: Vec<Sequence> = raw_tracks
        .iter()
        .enumerate()
        .map(|(index, track)| pair_notes(index, track, &tempo_map, options))
        .collect();

    debug!(
        "parsed {} track(s), {} note(s)",
        sequences.len(),
        sequences.iter().map(Sequence::len).sum::<usize>()
    );
    Ok(sequences)
}

struct Header {
    track_count: u16,
    division: u16,
}

fn read_header(reader: &mut Reader<'_>) -> Result<Header, ParseError> {
    let magic = reader.take(4, "header").map_err(|_| ParseError::MalformedHeader)?;
    if magic != b"MThd" {
        return Err(ParseError::MalformedHeader);
    }
    let length = reader.u32("header").map_err(|_| ParseError::MalformedHeader)?;
    if length < 6 {
        return Err(ParseError::MalformedHeader);
    }
    let format = reader.u16("header")?;
    let track_count = reader.u16("header")?;
    let division = reader.u16("header")?;
    // A header is allowed to be longer than the six bytes we understand.
    reader.take(length as usize - 6, "header extension")?;

    if format > 1 {
        return Err(ParseError::UnsupportedFormat(format!("SMF format {format}")));
    }
    if division & 0x8000 != 0 {
        return Err(ParseError::UnsupportedFormat("SMPTE time division".into()));
    }
    if division == 0 {
        return Err(ParseError::MalformedHeader);
    }

    Ok(Header {
        track_count,
        division,
    })
}

struct RawTrack {
    events: Vec<TimedEvent>,
    end_tick: u64,
}

fn read_track(data: &[u8]) -> Result<RawTrack, ParseError> {
    let mut reader = Reader::new(data);
    let mut events = Vec::new();
    let mut tick: u64 = 0;
    let mut running: Option<u8> = None;

    while reader.remaining() > 0 {
        tick += reader.vlq("delta time")? as u64;
        let first = reader.u8("event status")?;

        if first == 0xFF {
            // Meta event: type, length, payload.
            let kind = reader.u8("meta type")?;
            let length = reader.vlq("meta length")? as usize;
            let payload = reader.take(length, "meta payload")?;
            running = None;
            match kind {
                0x51 => {
                    if length != 3 {
                        return Err(ParseError::InvalidEventData(format!(
                            "tempo meta event of length {length}"
                        )));
                    }
                    let tempo =
                        u32::from(payload[0]) << 16 | u32::from(payload[1]) << 8 | u32::from(payload[2]);
                    events.push(TimedEvent {
                        tick,
                        event: TrackEvent::Tempo(tempo),
                    });
                }
                0x03 => {
                    events.push(TimedEvent {
                        tick,
                        event: TrackEvent::TrackName(
                            String::from_utf8_lossy(payload).into_owned(),
                        ),
                    });
                }
                0x2F => {
                    events.push(TimedEvent {
                        tick,
                        event: TrackEvent::EndOfTrack,
                    });
                    break;
                }
                _ => {}
            }
        } else if first == 0xF0 || first == 0xF7 {
            // SysEx: length-prefixed, skipped whole.
            let length = reader.vlq("sysex length")? as usize;
            reader.take(length, "sysex payload")?;
            running = None;
        } else if first >= 0xF1 {
            // System Common and Real-Time: fixed data lengths, nothing
            // for the note model. Common cancels running status,
            // Real-Time does not.
            let data_len = match first {
                0xF1 | 0xF3 => 1,
                0xF2 => 2,
                _ => 0,
            };
            reader.take(data_len, "system event data")?;
            if first < 0xF8 {
                running = None;
            }
        } else {
            // Channel event, possibly under running status.
            let (status, carried) = if first & 0x80 != 0 {
                (first, None)
            } else {
                match running {
                    Some(status) => (status, Some(first)),
                    None => {
                        return Err(ParseError::InvalidEventData(
                            "data byte with no running status".into(),
                        ))
                    }
                }
            };
            running = Some(status);

            let channel = status & 0x0F;
            let data1 = match carried {
                Some(byte) => byte,
                None => reader.u8("event data")?,
            };
            match status & 0xF0 {
                0x90 | 0x80 => {
                    let data2 = reader.u8("event data")?;
                    if data1 > 127 || data2 > 127 {
                        return Err(ParseError::InvalidEventData(format!(
                            "note data bytes {data1:#04x} {data2:#04x}"
                        )));
                    }
                    let event = if status & 0xF0 == 0x80 || data2 == 0 {
                        // Note-on with velocity zero is a note-off.
                        TrackEvent::NoteOff {
                            channel,
                            pitch: data1,
                            velocity: data2,
                        }
                    } else {
                        TrackEvent::NoteOn {
                            channel,
                            pitch: data1,
                            velocity: data2,
                        }
                    };
                    events.push(TimedEvent { tick, event });
                }
                // Aftertouch, controller, pitch bend: one more data byte.
                0xA0 | 0xB0 | 0xE0 => {
                    reader.u8("event data")?;
                }
                // Program change, channel pressure: single data byte.
                0xC0 | 0xD0 => {}
                _ => {
                    return Err(ParseError::InvalidEventData(format!(
                        "status byte {status:#04x}"
                    )))
                }
            }
        }
    }

    Ok(RawTrack {
        end_tick: tick,
        events,
    })
}

/// Tick-to-seconds conversion under every tempo change in the file.
struct TempoMap {
    division: u16,
    /// (tick, µs/quarter from that tick on, seconds elapsed at that tick).
    changes: Vec<(u64, u32, f64)>,
}

impl TempoMap {
    fn build(tracks: &[RawTrack], division: u16) -> Self {
        let mut raw: Vec<(u64, u32)> = tracks
            .iter()
            .flat_map(|track| track.events.iter())
            .filter_map(|ev| match ev.event {
                TrackEvent::Tempo(tempo) => Some((ev.tick, tempo)),
                _ => None,
            })
            .collect();
        raw.sort_by_key(|(tick, _)| *tick);

        let mut changes = Vec::with_capacity(raw.len());
        let mut seconds = 0.0;
        let mut prev_tick = 0u64;
        let mut tempo = DEFAULT_TEMPO;
        for (tick, next_tempo) in raw {
            seconds += (tick - prev_tick) as f64 * tick_len(tempo, division);
            changes.push((tick, next_tempo, seconds));
            prev_tick = tick;
            tempo = next_tempo;
        }

        Self { division, changes }
    }

    fn seconds_at(&self, tick: u64) -> f64 {
        let idx = self.changes.partition_point(|(t, _, _)| *t <= tick);
        let (base_tick, tempo, base_seconds) = match idx {
            0 => (0, DEFAULT_TEMPO, 0.0),
            _ => self.changes[idx - 1],
        };
        base_seconds + (tick - base_tick) as f64 * tick_len(tempo, self.division)
    }

    /// Length of one tick at the tempo in effect at `tick`.
    fn tick_len_at(&self, tick: u64) -> f64 {
        let idx = self.changes.partition_point(|(t, _, _)| *t <= tick);
        let tempo = match idx {
            0 => DEFAULT_TEMPO,
            _ => self.changes[idx - 1].1,
        };
        tick_len(tempo, self.division)
    }
}

fn pair_notes(
    index: usize,
    track: &RawTrack,
    tempo_map: &TempoMap,
    options: &ParseOptions,
) -> Sequence {
    let name = track
        .events
        .iter()
        .find_map(|ev| match &ev.event {
            TrackEvent::TrackName(name) => Some(name.clone()),
            _ => None,
        })
        .unwrap_or_else(|| format!("Track {}", index + 1));
    let mut sequence = Sequence::new(name);

    // (channel, pitch) -> (onset seconds, onset tick, wire velocity)
    let mut active: HashMap<(u8, u8), (f64, u64, u8)> = HashMap::new();
    let mut push = |sequence: &mut Sequence, pitch: u8, start: f64, duration: f64, velocity: u8| {
        match Note::new(pitch, start, duration, f64::from(velocity) / 127.0) {
            Ok(note) => {
                sequence.insert(note);
            }
            Err(err) => warn!("skipping unrepresentable note from import: {err}"),
        }
    };

    for ev in &track.events {
        match ev.event {
            TrackEvent::NoteOn {
                channel,
                pitch,
                velocity,
            } => {
                let t = tempo_map.seconds_at(ev.tick);
                if let Some((start, on_tick, vel)) = active.insert((channel, pitch), (t, ev.tick, velocity))
                {
                    // A second onset for a key that never released: close
                    // the first one here so it is not lost.
                    warn!("note-on for already sounding pitch {pitch} on channel {channel}");
                    let duration = (t - start).max(tempo_map.tick_len_at(on_tick));
                    push(&mut sequence, pitch, start, duration, vel);
                }
            }
            TrackEvent::NoteOff { channel, pitch, .. } => {
                let t = tempo_map.seconds_at(ev.tick);
                match active.remove(&(channel, pitch)) {
                    Some((start, on_tick, vel)) => {
                        let duration = (t - start).max(tempo_map.tick_len_at(on_tick));
                        push(&mut sequence, pitch, start, duration, vel);
                    }
                    None => warn!("orphan note-off for pitch {pitch} on channel {channel}"),
                }
            }
            _ => {}
        }
    }

    // Whatever is still sounding at end-of-track never saw a note-off.
    let end = tempo_map.seconds_at(track.end_tick);
    let mut dangling: Vec<_> = active.into_iter().collect();
    dangling.sort_by(|((ch_a, p_a), (s_a, ..)), ((ch_b, p_b), (s_b, ..))| {
        s_a.total_cmp(s_b).then(p_a.cmp(p_b)).then(ch_a.cmp(ch_b))
    });
    for ((_, pitch), (start, on_tick, vel)) in dangling {
        match options.dangling {
            DanglingNote::ClampToTrackEnd => {
                warn!("note-on for pitch {pitch} never released, closing at track end");
                let duration = (end - start).max(tempo_map.tick_len_at(on_tick));
                push(&mut sequence, pitch, start, duration, vel);
            }
            DanglingNote::Discard => {
                warn!("note-on for pitch {pitch} never released, discarding");
            }
        }
    }

    sequence.set_len_hint(end);
    sequence
}

/// Bounds-checked cursor over the input buffer.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], ParseError> {
        if self.remaining() < n {
            return Err(ParseError::TruncatedData(what));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, ParseError> {
        Ok(self.take(1, what)?[0])
    }

    fn u16(&mut self, what: &'static str) -> Result<u16, ParseError> {
        let b = self.take(2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, ParseError> {
        let b = self.take(4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// MIDI variable-length quantity: 7 bits per byte, high bit continues,
    /// at most four bytes.
    fn vlq(&mut self, what: &'static str) -> Result<u32, ParseError> {
        let mut value: u32 = 0;
        for _ in 0..4 {
            let byte = self.u8(what)?;
            value = value << 7 | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ParseError::InvalidEventData(
            "variable-length quantity longer than four bytes".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn vlq_reader(bytes: &[u8]) -> Result<u32, ParseError> {
        Reader::new(bytes).vlq("test")
    }

    #[test]
    fn test_vlq_decode_vectors() {
        assert_eq!(vlq_reader(&[0x00]).unwrap(), 0);
        assert_eq!(vlq_reader(&[0x7F]).unwrap(), 0x7F);
        assert_eq!(vlq_reader(&[0x81, 0x00]).unwrap(), 0x80);
        assert_eq!(vlq_reader(&[0xFF, 0x7F]).unwrap(), 0x3FFF);
        assert_eq!(vlq_reader(&[0xFF, 0xFF, 0x7F]).unwrap(), 0x1F_FFFF);
        assert!(matches!(
            vlq_reader(&[0xFF, 0xFF, 0xFF, 0xFF, 0x7F]),
            Err(ParseError::InvalidEventData(_))
        ));
        assert_eq!(vlq_reader(&[0x80]), Err(ParseError::TruncatedData("test")));
    }

    /// Header for `tracks` format-1 tracks at 480 ticks per quarter.
    fn header(tracks: u16) -> Vec<u8> {
        let mut bytes = b"MThd".to_vec();
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&tracks.to_be_bytes());
        bytes.extend_from_slice(&480u16.to_be_bytes());
        bytes
    }

    fn with_track(mut file: Vec<u8>, track: &[u8]) -> Vec<u8> {
        file.extend_from_slice(b"MTrk");
        file.extend_from_slice(&(track.len() as u32).to_be_bytes());
        file.extend_from_slice(track);
        file
    }

    const END_OF_TRACK: [u8; 4] = [0x00, 0xFF, 0x2F, 0x00];

    #[test]
    fn test_import_scenario_middle_c_quarter_note() {
        // Middle C, on at 0, off 480 ticks later, velocity 100, 120 BPM.
        let mut track = vec![0x00, 0x90, 60, 100];
        track.extend_from_slice(&[0x83, 0x60, 0x80, 60, 0]); // delta 480
        track.extend_from_slice(&END_OF_TRACK);
        let file = with_track(header(1), &track);

        let sequences = parse(&file, &ParseOptions::default()).unwrap();
        assert_eq!(sequences.len(), 1);
        let notes: Vec<_> = sequences[0].iter().map(|(_, n)| *n).collect();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].pitch(), 60);
        assert_abs_diff_eq!(notes[0].start(), 0.0);
        assert_abs_diff_eq!(notes[0].duration(), 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(notes[0].velocity(), 100.0 / 127.0, epsilon = 1e-9);
    }

    #[test]
    fn test_running_status_and_vel_zero_note_off() {
        // Two notes written with running status; note-offs are note-ons
        // with velocity zero.
        let mut track = vec![0x00, 0x90, 60, 100];
        track.extend_from_slice(&[0x60, 60, 0]); // delta 96, running status off
        track.extend_from_slice(&[0x00, 62, 90]); // on
        track.extend_from_slice(&[0x60, 62, 0]); // off
        track.extend_from_slice(&END_OF_TRACK);
        let file = with_track(header(1), &track);

        let sequences = parse(&file, &ParseOptions::default()).unwrap();
        let notes: Vec<_> = sequences[0].iter().map(|(_, n)| *n).collect();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].pitch(), 60);
        assert_eq!(notes[1].pitch(), 62);
        assert_abs_diff_eq!(notes[0].duration(), 0.1, epsilon = 1e-9);
        assert_abs_diff_eq!(notes[1].start(), 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_tempo_change_rescales_later_deltas() {
        // Tempo doubles to 240 BPM at tick 480: a 480-tick delta before
        // the change is 0.5 s, after it 0.25 s.
        let mut track = vec![0x00, 0x90, 60, 100];
        track.extend_from_slice(&[0x83, 0x60, 0xFF, 0x51, 0x03, 0x03, 0xD0, 0x90]); // tempo 250000
        track.extend_from_slice(&[0x00, 0x90, 62, 100]);
        track.extend_from_slice(&[0x83, 0x60, 0x80, 62, 0]);
        track.extend_from_slice(&[0x00, 0x80, 60, 0]);
        track.extend_from_slice(&END_OF_TRACK);
        let file = with_track(header(1), &track);

        let sequences = parse(&file, &ParseOptions::default()).unwrap();
        let notes = sequences[0].ordered();
        let c = notes.iter().find(|(_, n)| n.pitch() == 60).unwrap().1;
        let d = notes.iter().find(|(_, n)| n.pitch() == 62).unwrap().1;
        assert_abs_diff_eq!(c.duration(), 0.75, epsilon = 1e-9);
        assert_abs_diff_eq!(d.start(), 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(d.duration(), 0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_conductor_track_tempo_governs_other_tracks() {
        // Format 1: tempo lives in the first track, notes in the second.
        let mut conductor = vec![0x00, 0xFF, 0x51, 0x03, 0x03, 0xD0, 0x90]; // 240 BPM
        conductor.extend_from_slice(&END_OF_TRACK);
        let mut notes_track = vec![0x00, 0x90, 60, 100];
        notes_track.extend_from_slice(&[0x83, 0x60, 0x80, 60, 0]);
        notes_track.extend_from_slice(&END_OF_TRACK);
        let file = with_track(with_track(header(2), &conductor), &notes_track);

        let sequences = parse(&file, &ParseOptions::default()).unwrap();
        let (_, note) = sequences[1].iter().next().unwrap();
        assert_abs_diff_eq!(note.duration(), 0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_track_name_meta() {
        let mut track = vec![0x00, 0xFF, 0x03, 0x04];
        track.extend_from_slice(b"lead");
        track.extend_from_slice(&END_OF_TRACK);
        let file = with_track(header(1), &track);

        let sequences = parse(&file, &ParseOptions::default()).unwrap();
        assert_eq!(sequences[0].name, "lead");
    }

    #[test]
    fn test_unknown_events_are_skipped() {
        let mut track = vec![
            0x00, 0xC0, 5, // program change
            0x00, 0xB0, 7, 100, // controller
            0x00, 0xE0, 0x00, 0x40, // pitch bend
            0x00, 0xF0, 0x02, 0x01, 0xF7, // sysex
            0x00, 0xFF, 0x01, 0x02, b'h', b'i', // text meta
        ];
        track.extend_from_slice(&[0x00, 0x90, 60, 100, 0x60, 0x80, 60, 0]);
        track.extend_from_slice(&END_OF_TRACK);
        let file = with_track(header(1), &track);

        let sequences = parse(&file, &ParseOptions::default()).unwrap();
        assert_eq!(sequences[0].len(), 1);
    }

    #[test]
    fn test_system_common_events_are_skipped() {
        let mut track = vec![
            0x00, 0xF1, 0x30, // MTC quarter frame
            0x00, 0xF2, 0x10, 0x20, // song position pointer
            0x00, 0xF3, 0x05, // song select
            0x00, 0xF6, // tune request
            0x00, 0xF8, // timing clock
        ];
        track.extend_from_slice(&[0x00, 0x90, 60, 100, 0x60, 0x80, 60, 0]);
        track.extend_from_slice(&END_OF_TRACK);
        let file = with_track(header(1), &track);

        let sequences = parse(&file, &ParseOptions::default()).unwrap();
        assert_eq!(sequences[0].len(), 1);
    }

    #[test]
    fn test_dangling_note_policies() {
        // Note-on at tick 0, never released, track ends at tick 960.
        let mut track = vec![0x00, 0x90, 60, 100];
        track.extend_from_slice(&[0x87, 0x40, 0xFF, 0x2F, 0x00]); // delta 960 EOT
        let file = with_track(header(1), &track);

        let clamped = parse(&file, &ParseOptions::default()).unwrap();
        let (_, note) = clamped[0].iter().next().unwrap();
        assert_abs_diff_eq!(note.duration(), 1.0, epsilon = 1e-9);

        let dropped = parse(
            &file,
            &ParseOptions {
                dangling: DanglingNote::Discard,
            },
        )
        .unwrap();
        assert!(dropped[0].is_empty());
        // Either way the declared track length survives.
        assert_abs_diff_eq!(dropped[0].len_hint(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_orphan_note_off_is_ignored() {
        let mut track = vec![0x00, 0x80, 60, 0];
        track.extend_from_slice(&[0x00, 0x90, 62, 80, 0x60, 0x80, 62, 0]);
        track.extend_from_slice(&END_OF_TRACK);
        let file = with_track(header(1), &track);

        let sequences = parse(&file, &ParseOptions::default()).unwrap();
        assert_eq!(sequences[0].len(), 1);
    }

    #[test]
    fn test_malformed_header() {
        assert_eq!(
            parse(b"", &ParseOptions::default()),
            Err(ParseError::MalformedHeader)
        );
        assert_eq!(
            parse(b"RIFFxxxxxxxxxxxxxx", &ParseOptions::default()),
            Err(ParseError::MalformedHeader)
        );
        // Header length below six is not a valid MThd.
        let mut file = b"MThd".to_vec();
        file.extend_from_slice(&4u32.to_be_bytes());
        file.extend_from_slice(&[0, 1, 0, 1]);
        assert_eq!(
            parse(&file, &ParseOptions::default()),
            Err(ParseError::MalformedHeader)
        );
    }

    #[test]
    fn test_unsupported_formats() {
        let mut format2 = b"MThd".to_vec();
        format2.extend_from_slice(&6u32.to_be_bytes());
        format2.extend_from_slice(&2u16.to_be_bytes());
        format2.extend_from_slice(&1u16.to_be_bytes());
        format2.extend_from_slice(&480u16.to_be_bytes());
        assert!(matches!(
            parse(&format2, &ParseOptions::default()),
            Err(ParseError::UnsupportedFormat(_))
        ));

        let mut smpte = b"MThd".to_vec();
        smpte.extend_from_slice(&6u32.to_be_bytes());
        smpte.extend_from_slice(&0u16.to_be_bytes());
        smpte.extend_from_slice(&1u16.to_be_bytes());
        smpte.extend_from_slice(&0xE728u16.to_be_bytes());
        assert!(matches!(
            parse(&smpte, &ParseOptions::default()),
            Err(ParseError::UnsupportedFormat(_))
        ));

        let mut alien = with_track(header(1), &END_OF_TRACK);
        alien[14..18].copy_from_slice(b"XFIH");
        assert!(matches!(
            parse(&alien, &ParseOptions::default()),
            Err(ParseError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_truncation_is_detected_at_every_boundary() {
        let mut track = vec![0x00, 0x90, 60, 100];
        track.extend_from_slice(&[0x83, 0x60, 0x80, 60, 0]);
        track.extend_from_slice(&END_OF_TRACK);
        let file = with_track(header(1), &track);

        // Any prefix that cuts into the header is malformed; any that cuts
        // a declared chunk or event short is truncated.
        for cut in 1..file.len() {
            let result = parse(&file[..cut], &ParseOptions::default());
            assert!(
                matches!(
                    result,
                    Err(ParseError::MalformedHeader) | Err(ParseError::TruncatedData(_))
                ),
                "cut at {cut} gave {result:?}"
            );
        }
    }

    #[test]
    fn test_chunk_length_beyond_buffer_is_truncated() {
        let mut file = header(1);
        file.extend_from_slice(b"MTrk");
        file.extend_from_slice(&100u32.to_be_bytes());
        file.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
        assert_eq!(
            parse(&file, &ParseOptions::default()),
            Err(ParseError::TruncatedData("track chunk"))
        );
    }

    #[test]
    fn test_overlapping_same_pitch_onsets_both_survive() {
        let mut track = vec![0x00, 0x90, 60, 100]; // first onset
        track.extend_from_slice(&[0x60, 0x90, 60, 90]); // second onset, same key
        track.extend_from_slice(&[0x60, 0x80, 60, 0]);
        track.extend_from_slice(&END_OF_TRACK);
        let file = with_track(header(1), &track);

        let sequences = parse(&file, &ParseOptions::default()).unwrap();
        assert_eq!(sequences[0].len(), 2);
    }
}
