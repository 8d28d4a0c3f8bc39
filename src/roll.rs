/*!
Piano-roll interaction: screen space to note edits.

The engine is headless. A [`Viewport`] does the algebra between screen
pixels and (time, pitch-row) domain coordinates, and a [`RollEditor`]
runs the gesture state machine against one borrowed sequence at a time.

A drag never touches the sequence while in flight: the pointer offset
lives in the editor as a preview, and the note is mutated exactly once,
on release. Renderers that want the dragged note to follow the pointer
read [`RollEditor::preview_start`]. Cancelling a gesture therefore needs
no rollback at all.
 */

use log::debug;

use crate::model::{Note, NoteId, Sequence};

/// Zoom bounds in pixels per second.
pub const MIN_ZOOM: f64 = 50.0;
pub const MAX_ZOOM: f64 = 200.0;

/// Height of one pitch row in pixels.
pub const ROW_HEIGHT: f64 = 14.0;

/// Length and velocity of a note created by clicking empty canvas.
pub const DEFAULT_NOTE_LEN: f64 = 0.25;
pub const DEFAULT_VELOCITY: f64 = 0.8;

/// Seconds per grid cell for a musical subdivision at the given tempo,
/// e.g. `grid_unit(120.0, 16)` is the length of a sixteenth note.
pub fn grid_unit(bpm: f64, subdivision: u32) -> f64 {
    60.0 / bpm * 4.0 / subdivision as f64
}

/// Rounds a time to the nearest multiple of the grid unit.
pub fn snap_time(seconds: f64, unit: f64) -> f64 {
    if unit > 0.0 {
        (seconds / unit).round() * unit
    } else {
        seconds
    }
}

/// The scroll/zoom projection between the canvas and the domain.
///
/// `time = (x + scroll_x) / zoom` and `row = floor((y + scroll_y) / ROW_HEIGHT)`;
/// the screen mappings are the exact algebraic inverses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    zoom: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 100.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

impl Viewport {
    /// Pixels per second.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Sets the zoom, clamped to [`MIN_ZOOM`]..=[`MAX_ZOOM`].
    pub fn set_zoom(&mut self, pixels_per_second: f64) {
        self.zoom = if pixels_per_second.is_nan() {
            self.zoom
        } else {
            pixels_per_second.clamp(MIN_ZOOM, MAX_ZOOM)
        };
    }

    pub fn zoom_by(&mut self, factor: f64) {
        self.set_zoom(self.zoom * factor);
    }

    pub fn time_at(&self, x: f64) -> f64 {
        (x + self.scroll_x) / self.zoom
    }

    pub fn row_at(&self, y: f64) -> i32 {
        ((y + self.scroll_y) / ROW_HEIGHT).floor() as i32
    }

    pub fn x_at(&self, time: f64) -> f64 {
        time * self.zoom - self.scroll_x
    }

    pub fn y_at(&self, row: i32) -> f64 {
        row as f64 * ROW_HEIGHT - self.scroll_y
    }

    pub fn screen_to_domain(&self, x: f64, y: f64) -> (f64, i32) {
        (self.time_at(x), self.row_at(y))
    }

    pub fn domain_to_screen(&self, time: f64, row: i32) -> (f64, f64) {
        (self.x_at(time), self.y_at(row))
    }
}

/// Finds the note under a screen point, or `None` over empty canvas.
///
/// Where notes overlap, the most recently inserted one wins, so repeated
/// queries over unchanged state always resolve identically.
pub fn hit_test(sequence: &Sequence, view: &Viewport, x: f64, y: f64) -> Option<NoteId> {
    let (time, row) = view.screen_to_domain(x, y);
    let mut hit = None;
    for (id, note) in sequence.iter() {
        if i32::from(note.pitch()) == row && note.sounds_at(time) {
            hit = Some(id);
        }
    }
    hit
}

/// An in-flight pointer gesture.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum Gesture {
    #[default]
    Idle,
    /// Horizontal note drag: the sequence still holds the pre-drag start;
    /// `dx` is the accumulated pointer movement in pixels. Until the
    /// pointer actually moves, the gesture is selection only.
    Drag {
        id: NoteId,
        origin: f64,
        dx: f64,
        moved: bool,
    },
}

/// Mediates all note edits against the active sequence.
#[derive(Clone, Debug, Default)]
pub struct RollEditor {
    pub view: Viewport,
    pub selected: Option<NoteId>,
    /// Grid unit in seconds; `None` disables snapping.
    pub snap: Option<f64>,
    gesture: Gesture,
}

impl RollEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer press on the canvas. Over a note this selects it and arms
    /// a drag; over empty canvas it creates a note at the mapped time and
    /// pitch (snapped when snapping is on) and arms a drag on that.
    ///
    /// Returns the affected note, or `None` when the press lands outside
    /// the 0..=127 pitch range.
    pub fn press(&mut self, sequence: &mut Sequence, x: f64, y: f64) -> Option<NoteId> {
        let id = match hit_test(sequence, &self.view, x, y) {
            Some(id) => id,
            None => {
                let (time, row) = self.view.screen_to_domain(x, y);
                let pitch = u8::try_from(row).ok().filter(|p| *p <= 127)?;
                let start = self.quantized(time.max(0.0));
                let note = Note::new(pitch, start, DEFAULT_NOTE_LEN, DEFAULT_VELOCITY).ok()?;
                let id = sequence.insert(note);
                debug!("created note {:?} at {:.3}s pitch {}", id, start, pitch);
                id
            }
        };

        self.selected = Some(id);
        // Stale ids cannot reach here: the id was just found or created.
        if let Some(note) = sequence.get(id) {
            self.gesture = Gesture::Drag {
                id,
                origin: note.start(),
                dx: 0.0,
                moved: false,
            };
        }
        Some(id)
    }

    /// Accumulates pointer movement into the drag preview. The sequence
    /// is not consulted or modified.
    pub fn drag_by(&mut self, dx_px: f64) {
        if let Gesture::Drag { dx, moved, .. } = &mut self.gesture {
            *dx += dx_px;
            *moved |= dx_px != 0.0;
        }
    }

    /// Where the note would land if the gesture were released now.
    ///
    /// Read-only projection for live-preview rendering: `None` unless `id`
    /// is the note currently being dragged.
    pub fn preview_start(&self, id: NoteId) -> Option<f64> {
        match self.gesture {
            Gesture::Drag {
                id: dragging,
                origin,
                dx,
                moved,
            } if dragging == id => Some(if moved {
                self.committed_start(origin, dx)
            } else {
                origin
            }),
            _ => None,
        }
    }

    /// Pointer release: commits the drag to the sequence, once, by id.
    ///
    /// A press the pointer never moved from is selection only; nothing
    /// is committed, so clicking an off-grid note does not snap it.
    pub fn release(&mut self, sequence: &mut Sequence) {
        if let Gesture::Drag {
            id,
            origin,
            dx,
            moved: true,
        } = self.gesture
        {
            let start = self.committed_start(origin, dx);
            // The note may have been deleted mid-gesture; a stale id is
            // simply nothing to commit.
            if let Some(note) = sequence.get_mut(id) {
                note.set_start(start);
                debug!("moved note {:?} to {:.3}s", id, start);
            }
        }
        self.gesture = Gesture::Idle;
    }

    /// Abandons the gesture. Nothing was mutated, so nothing reverts.
    pub fn cancel(&mut self) {
        self.gesture = Gesture::Idle;
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Drag { .. })
    }

    /// Removes the selected note and clears the selection.
    pub fn delete_selected(&mut self, sequence: &mut Sequence) -> bool {
        let Some(id) = self.selected.take() else {
            return false;
        };
        if let Gesture::Drag { id: dragging, .. } = self.gesture {
            if dragging == id {
                self.gesture = Gesture::Idle;
            }
        }
        sequence.remove(id).is_some()
    }

    fn committed_start(&self, origin: f64, dx: f64) -> f64 {
        let moved = (origin + dx / self.view.zoom()).max(0.0);
        self.quantized(moved)
    }

    fn quantized(&self, seconds: f64) -> f64 {
        match self.snap {
            Some(unit) => snap_time(seconds, unit).max(0.0),
            None => seconds,
        }
    }
}
