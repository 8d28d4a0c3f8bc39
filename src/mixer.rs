/*!
Track ownership and mix state.

The mixer is the authoritative owner of every track and its sequence.
Mutating entry points never fail: stale ids are no-ops and numeric inputs
are clamped to their documented ranges, so an interactive caller cannot
drive the model into an invalid state.
 */

use id_arena::{Arena, Id};
use log::debug;

use crate::model::Sequence;

/// Track volume bounds, in dBFS.
pub const VOLUME_DB_MIN: f64 = -60.0;
pub const VOLUME_DB_MAX: f64 = 6.0;

/// An arena slot; `None` marks a removed track.
pub type TrackSlot = Option<Track>;

/// Stable handle to a track within one [`Mixer`].
pub type TrackId = Id<TrackSlot>;

/// A mixer channel: one owned sequence plus gain, pan, mute and solo.
#[derive(Clone, Debug)]
pub struct Track {
    pub name: String,
    pub sequence: Sequence,
    volume_db: f64,
    pan: f64,
    muted: bool,
    solo: bool,
}

impl Track {
    fn new(name: impl Into<String>, sequence: Sequence) -> Self {
        Self {
            name: name.into(),
            sequence,
            volume_db: 0.0,
            pan: 0.0,
            muted: false,
            solo: false,
        }
    }

    /// Volume in dB, within [-60, +6].
    pub fn volume_db(&self) -> f64 {
        self.volume_db
    }

    /// Stereo position in [-1, +1], -1 being full left.
    pub fn pan(&self) -> f64 {
        self.pan
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_solo(&self) -> bool {
        self.solo
    }
}

/// dB to linear amplitude. Monotonic, with 0 dB mapping to exactly 1.0.
pub fn db_to_gain(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/**
Owner of the track list and the master bus.

`active` is a weak reference: it names a track the editor is focused on,
and removal of that track resets it to `None`.
**/
#[derive(Clone, Debug, Default)]
pub struct Mixer {
    tracks: Arena<TrackSlot>,
    master_db: f64,
    active: Option<TrackId>,
    created: usize,
}

impl Mixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a track with an empty sequence and neutral mix state:
    /// 0 dB, centered, unmuted, not solo.
    pub fn add_track(&mut self) -> TrackId {
        self.created += 1;
        let name = format!("Track {}", self.created);
        let sequence = Sequence::new(name.clone());
        let id = self.tracks.alloc(Some(Track::new(name, sequence)));
        debug!("added track {:?}", id);
        id
    }

    /// Appends one track per sequence, as after a MIDI import.
    pub fn import(&mut self, sequences: Vec<Sequence>) -> Vec<TrackId> {
        sequences
            .into_iter()
            .map(|sequence| {
                self.created += 1;
                let name = if sequence.name.is_empty() {
                    format!("Track {}", self.created)
                } else {
                    sequence.name.clone()
                };
                self.tracks.alloc(Some(Track::new(name, sequence)))
            })
            .collect()
    }

    /// Removes a track and its sequence. Stale ids are a no-op. If the
    /// removed track was active, the active reference is cleared.
    pub fn remove_track(&mut self, id: TrackId) {
        let Some(slot) = self.tracks.get_mut(id) else {
            return;
        };
        if slot.take().is_some() {
            debug!("removed track {:?}", id);
            if self.active == Some(id) {
                self.active = None;
            }
        }
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(id).and_then(|slot| slot.as_ref())
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.get_mut(id).and_then(|slot| slot.as_mut())
    }

    /// Live tracks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (TrackId, &Track)> {
        self.tracks
            .iter()
            .filter_map(|(id, slot)| slot.as_ref().map(|track| (id, track)))
    }

    /// Number of live tracks.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn set_volume(&mut self, id: TrackId, db: f64) {
        if let Some(track) = self.track_mut(id) {
            track.volume_db = clamp_db(db);
        }
    }

    pub fn set_pan(&mut self, id: TrackId, pan: f64) {
        if let Some(track) = self.track_mut(id) {
            track.pan = clamp_or(pan, -1.0, 1.0, 0.0);
        }
    }

    pub fn set_mute(&mut self, id: TrackId, muted: bool) {
        if let Some(track) = self.track_mut(id) {
            track.muted = muted;
        }
    }

    pub fn set_solo(&mut self, id: TrackId, solo: bool) {
        if let Some(track) = self.track_mut(id) {
            track.solo = solo;
        }
    }

    pub fn master_db(&self) -> f64 {
        self.master_db
    }

    pub fn set_master(&mut self, db: f64) {
        self.master_db = clamp_db(db);
    }

    pub fn active(&self) -> Option<TrackId> {
        self.active
    }

    /// Focuses a track. Stale ids are a no-op.
    pub fn set_active_track(&mut self, id: TrackId) {
        if self.track(id).is_some() {
            self.active = Some(id);
        }
    }

    pub fn active_track(&self) -> Option<&Track> {
        self.active.and_then(|id| self.track(id))
    }

    pub fn active_track_mut(&mut self) -> Option<&mut Track> {
        let id = self.active?;
        self.track_mut(id)
    }

    /// True if any live track holds solo.
    pub fn any_solo(&self) -> bool {
        self.iter().any(|(_, track)| track.is_solo())
    }

    /// The final linear gain for a track under the current mute/solo and
    /// master state. Recomputed on every call, never cached.
    ///
    /// Solo wins over everything except the track's own mute: a muted
    /// track is silent even while soloed, and any solo anywhere silences
    /// every non-solo track without touching its stored mute flag.
    pub fn effective_gain(&self, id: TrackId) -> f64 {
        let Some(track) = self.track(id) else {
            return 0.0;
        };
        if track.is_muted() {
            return 0.0;
        }
        if self.any_solo() && !track.is_solo() {
            return 0.0;
        }
        db_to_gain(track.volume_db() + self.master_db)
    }

    /// Latest instant any track's sequence still has content, in seconds.
    pub fn end_time(&self) -> f64 {
        self.iter()
            .map(|(_, track)| track.sequence.end_time())
            .fold(0.0, f64::max)
    }
}

fn clamp_db(db: f64) -> f64 {
    clamp_or(db, VOLUME_DB_MIN, VOLUME_DB_MAX, 0.0)
}

/// Clamps into `[lo, hi]`; NaN falls back to `default`.
fn clamp_or(value: f64, lo: f64, hi: f64, default: f64) -> f64 {
    if value.is_nan() {
        default
    } else {
        value.clamp(lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_add_track_defaults() {
        let mut mixer = Mixer::new();
        let id = mixer.add_track();
        let track = mixer.track(id).unwrap();
        assert_eq!(track.volume_db(), 0.0);
        assert_eq!(track.pan(), 0.0);
        assert!(!track.is_muted());
        assert!(!track.is_solo());
        assert!(track.sequence.is_empty());
        assert_eq!(track.name, "Track 1");
    }

    #[test]
    fn test_setters_clamp_to_documented_ranges() {
        let mut mixer = Mixer::new();
        let id = mixer.add_track();

        mixer.set_volume(id, 40.0);
        assert_eq!(mixer.track(id).unwrap().volume_db(), VOLUME_DB_MAX);
        mixer.set_volume(id, -500.0);
        assert_eq!(mixer.track(id).unwrap().volume_db(), VOLUME_DB_MIN);

        mixer.set_pan(id, -7.0);
        assert_eq!(mixer.track(id).unwrap().pan(), -1.0);
        mixer.set_pan(id, 2.0);
        assert_eq!(mixer.track(id).unwrap().pan(), 1.0);

        mixer.set_master(100.0);
        assert_eq!(mixer.master_db(), VOLUME_DB_MAX);
    }

    #[test]
    fn test_remove_track_clears_active() {
        let mut mixer = Mixer::new();
        let a = mixer.add_track();
        let b = mixer.add_track();
        mixer.set_active_track(b);

        mixer.remove_track(b);
        assert_eq!(mixer.active(), None);
        assert_eq!(mixer.len(), 1);
        assert!(mixer.track(a).is_some());

        // Stale operations are no-ops.
        mixer.remove_track(b);
        mixer.set_volume(b, -10.0);
        mixer.set_active_track(b);
        assert_eq!(mixer.active(), None);
    }

    #[test]
    fn test_unit_gain_at_zero_db() {
        let mut mixer = Mixer::new();
        let id = mixer.add_track();
        assert_abs_diff_eq!(mixer.effective_gain(id), 1.0);
    }

    #[test]
    fn test_gain_is_monotonic_in_db() {
        let mut mixer = Mixer::new();
        let id = mixer.add_track();
        let mut last = 0.0;
        for db in [-60.0, -24.0, -6.0, 0.0, 3.0, 6.0] {
            mixer.set_volume(id, db);
            let gain = mixer.effective_gain(id);
            assert!(gain > last, "gain must grow with dB");
            last = gain;
        }
    }

    #[test]
    fn test_master_volume_applies() {
        let mut mixer = Mixer::new();
        let id = mixer.add_track();
        mixer.set_volume(id, -6.0);
        mixer.set_master(-6.0);
        assert_abs_diff_eq!(mixer.effective_gain(id), db_to_gain(-12.0));
    }

    #[test]
    fn test_solo_precedence() {
        let mut mixer = Mixer::new();
        let a = mixer.add_track();
        let b = mixer.add_track();
        let c = mixer.add_track();

        mixer.set_solo(b, true);
        assert_eq!(mixer.effective_gain(a), 0.0);
        assert!(mixer.effective_gain(b) > 0.0);
        assert_eq!(mixer.effective_gain(c), 0.0);

        // Mute flags of the silenced tracks are untouched.
        assert!(!mixer.track(a).unwrap().is_muted());
        assert!(!mixer.track(c).unwrap().is_muted());

        // Regardless of individual mute flags.
        mixer.set_mute(a, true);
        assert_eq!(mixer.effective_gain(a), 0.0);

        // A muted track stays silent even while soloed.
        mixer.set_mute(b, true);
        assert_eq!(mixer.effective_gain(b), 0.0);
    }

    #[test]
    fn test_solo_state_is_not_cached() {
        let mut mixer = Mixer::new();
        let a = mixer.add_track();
        let b = mixer.add_track();

        mixer.set_solo(b, true);
        assert_eq!(mixer.effective_gain(a), 0.0);

        // Removing the soloed track must immediately unsilence the rest.
        mixer.remove_track(b);
        assert!(mixer.effective_gain(a) > 0.0);
    }

    #[test]
    fn test_effective_gain_of_stale_id_is_silence() {
        let mut mixer = Mixer::new();
        let id = mixer.add_track();
        mixer.remove_track(id);
        assert_eq!(mixer.effective_gain(id), 0.0);
    }
}
