/*!
Plain data at the persistence boundary.

The arenas inside [`Mixer`] and [`Sequence`] are runtime storage, not
wire shapes. These mirrors are what gets handed to an external
persistence layer: plain serde structs with no ids, no tombstones and no
behavior. Restoring goes back through the validating constructors, so a
tampered or stale snapshot can degrade (a bad note is dropped, an
out-of-range volume is clamped) but can never plant an invalid value in
the model.
 */

use log::warn;
use serde::{Deserialize, Serialize};

use crate::mixer::Mixer;
use crate::model::{Note, Sequence};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteData {
    pub pitch: u8,
    pub start: f64,
    pub duration: f64,
    pub velocity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceData {
    pub name: String,
    pub notes: Vec<NoteData>,
    pub len_hint: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackData {
    pub name: String,
    pub sequence: SequenceData,
    pub volume_db: f64,
    pub pan: f64,
    pub muted: bool,
    pub solo: bool,
}

/// One whole mixer, flattened. `active` is an index into `tracks`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectData {
    pub tracks: Vec<TrackData>,
    pub master_db: f64,
    pub active: Option<usize>,
}

impl SequenceData {
    fn capture(sequence: &Sequence) -> Self {
        Self {
            name: sequence.name.clone(),
            notes: sequence
                .iter()
                .map(|(_, note)| NoteData {
                    pitch: note.pitch(),
                    start: note.start(),
                    duration: note.duration(),
                    velocity: note.velocity(),
                })
                .collect(),
            len_hint: sequence.len_hint(),
        }
    }

    fn restore(&self) -> Sequence {
        let mut sequence = Sequence::new(self.name.clone());
        for data in &self.notes {
            match Note::new(data.pitch, data.start, data.duration, data.velocity) {
                Ok(note) => {
                    sequence.insert(note);
                }
                Err(err) => warn!("dropping invalid note from snapshot: {err}"),
            }
        }
        sequence.set_len_hint(self.len_hint);
        sequence
    }
}

impl ProjectData {
    /// Flattens the live mixer into plain data.
    pub fn capture(mixer: &Mixer) -> Self {
        let mut active = None;
        let tracks = mixer
            .iter()
            .enumerate()
            .map(|(index, (id, track))| {
                if mixer.active() == Some(id) {
                    active = Some(index);
                }
                TrackData {
                    name: track.name.clone(),
                    sequence: SequenceData::capture(&track.sequence),
                    volume_db: track.volume_db(),
                    pan: track.pan(),
                    muted: track.is_muted(),
                    solo: track.is_solo(),
                }
            })
            .collect();

        Self {
            tracks,
            master_db: mixer.master_db(),
            active,
        }
    }

    /// Rebuilds a mixer, re-validating every note and re-clamping every
    /// mix parameter on the way in.
    pub fn restore(&self) -> Mixer {
        let mut mixer = Mixer::new();
        mixer.set_master(self.master_db);

        let mut ids = Vec::with_capacity(self.tracks.len());
        for data in &self.tracks {
            let id = mixer.add_track();
            mixer.set_volume(id, data.volume_db);
            mixer.set_pan(id, data.pan);
            mixer.set_mute(id, data.muted);
            mixer.set_solo(id, data.solo);
            if let Some(track) = mixer.track_mut(id) {
                track.name = data.name.clone();
                track.sequence = data.sequence.restore();
            }
            ids.push(id);
        }

        if let Some(&id) = self.active.and_then(|index| ids.get(index)) {
            mixer.set_active_track(id);
        }
        mixer
    }
}
