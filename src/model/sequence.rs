/*!
The note collection owned by a track.

Notes live in an arena and are addressed by [`NoteId`]. A removed note
leaves a tombstoned slot behind, so ids stay stable across edits: a stale
id simply resolves to `None` instead of pointing at a shifted neighbour.
Iteration follows allocation order, which is insertion order.
 */

use id_arena::{Arena, Id};

use super::note::Note;

/// An arena slot; `None` marks a deleted note.
pub type NoteSlot = Option<Note>;

/// Stable handle to a note within one [`Sequence`].
pub type NoteId = Id<NoteSlot>;

/**
The ordered set of notes belonging to one track.

`len_hint` is a declared total length in seconds; the effective length of
the sequence is whichever is larger, the hint or the last note's end.
**/
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sequence {
    pub name: String,
    notes: Arena<NoteSlot>,
    live: usize,
    len_hint: f64,
}

impl Sequence {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notes: Arena::new(),
            live: 0,
            len_hint: 0.0,
        }
    }

    /// Adds a note, returning its stable id.
    pub fn insert(&mut self, note: Note) -> NoteId {
        self.live += 1;
        self.notes.alloc(Some(note))
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(id).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.get_mut(id).and_then(|slot| slot.as_mut())
    }

    /// Removes a note. Stale ids are a no-op returning `None`.
    pub fn remove(&mut self, id: NoteId) -> Option<Note> {
        let taken = self.notes.get_mut(id).and_then(|slot| slot.take());
        if taken.is_some() {
            self.live -= 1;
        }
        taken
    }

    /// Number of live notes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live notes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NoteId, &Note)> {
        self.notes
            .iter()
            .filter_map(|(id, slot)| slot.as_ref().map(|note| (id, note)))
    }

    /// A time-ordered view of the live notes.
    ///
    /// The sort is stable, so simultaneous notes keep insertion order.
    pub fn ordered(&self) -> Vec<(NoteId, &Note)> {
        let mut notes: Vec<_> = self.iter().collect();
        notes.sort_by(|(_, a), (_, b)| a.start().total_cmp(&b.start()));
        notes
    }

    pub fn len_hint(&self) -> f64 {
        self.len_hint
    }

    pub fn set_len_hint(&mut self, seconds: f64) {
        self.len_hint = seconds.max(0.0);
    }

    /// Effective length in seconds: the later of the declared length and
    /// the last note's end.
    pub fn end_time(&self) -> f64 {
        self.iter()
            .map(|(_, note)| note.end())
            .fold(self.len_hint, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(pitch: u8, start: f64) -> Note {
        Note::new(pitch, start, 0.5, 0.8).unwrap()
    }

    #[test]
    fn test_insert_get_remove() {
        let mut seq = Sequence::new("lead");
        let id = seq.insert(note(60, 0.0));
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.get(id).unwrap().pitch(), 60);

        let removed = seq.remove(id).unwrap();
        assert_eq!(removed.pitch(), 60);
        assert_eq!(seq.len(), 0);
        assert!(seq.get(id).is_none());
        // Removing again is a no-op.
        assert!(seq.remove(id).is_none());
    }

    #[test]
    fn test_ids_stay_stable_across_removal() {
        let mut seq = Sequence::new("lead");
        let a = seq.insert(note(60, 0.0));
        let b = seq.insert(note(62, 1.0));
        let c = seq.insert(note(64, 2.0));

        seq.remove(b);
        assert_eq!(seq.get(a).unwrap().pitch(), 60);
        assert_eq!(seq.get(c).unwrap().pitch(), 64);
    }

    #[test]
    fn test_iteration_is_insertion_order() {
        let mut seq = Sequence::new("lead");
        seq.insert(note(64, 2.0));
        seq.insert(note(60, 0.0));
        seq.insert(note(62, 1.0));

        let pitches: Vec<u8> = seq.iter().map(|(_, n)| n.pitch()).collect();
        assert_eq!(pitches, vec![64, 60, 62]);
    }

    #[test]
    fn test_ordered_view_sorts_by_start() {
        let mut seq = Sequence::new("lead");
        seq.insert(note(64, 2.0));
        seq.insert(note(60, 0.0));
        seq.insert(note(62, 1.0));

        let pitches: Vec<u8> = seq.ordered().iter().map(|(_, n)| n.pitch()).collect();
        assert_eq!(pitches, vec![60, 62, 64]);
    }

    #[test]
    fn test_end_time_prefers_later_of_hint_and_notes() {
        let mut seq = Sequence::new("lead");
        assert_eq!(seq.end_time(), 0.0);

        seq.insert(note(60, 3.0)); // ends at 3.5
        assert_eq!(seq.end_time(), 3.5);

        seq.set_len_hint(8.0);
        assert_eq!(seq.end_time(), 8.0);
    }
}
