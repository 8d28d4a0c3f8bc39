//! The piano-roll canvas: paints the active sequence and feeds pointer
//! input to the roll editor.

use eframe::egui::{self, Align2, Color32, FontId, PointerButton, Pos2, Sense, Stroke};

use cantilena::model::Sequence;
use cantilena::roll::{RollEditor, ROW_HEIGHT};

/// Pitch classes drawn shaded, mirroring a keyboard's black keys.
const BLACK_KEYS: [bool; 12] = [
    false, true, false, true, false, false, true, false, true, false, true, false,
];

/// Paints the roll and runs one frame of the gesture machine. Returns a
/// seek target when the canvas is clicked with the secondary button.
pub fn show(
    ui: &mut egui::Ui,
    editor: &mut RollEditor,
    sequence: &mut Sequence,
    playhead: f64,
) -> Option<f64> {
    let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());

    if response.hovered() {
        let (scroll, zoom) = ui.input(|i| (i.scroll_delta, i.zoom_delta()));
        if zoom != 1.0 {
            editor.view.zoom_by(f64::from(zoom));
        }
        let max_y = (128.0 * ROW_HEIGHT - f64::from(rect.height())).max(0.0);
        editor.view.scroll_x = (editor.view.scroll_x - f64::from(scroll.x)).max(0.0);
        editor.view.scroll_y = (editor.view.scroll_y - f64::from(scroll.y)).clamp(0.0, max_y);
    }

    if response.hovered() && ui.input(|i| i.pointer.primary_pressed()) {
        if let Some(pos) = response.interact_pointer_pos() {
            editor.press(
                sequence,
                f64::from(pos.x - rect.min.x),
                f64::from(pos.y - rect.min.y),
            );
        }
    }
    if response.dragged_by(PointerButton::Primary) {
        editor.drag_by(f64::from(response.drag_delta().x));
    }
    // A release with no gesture armed is a no-op in the editor.
    if ui.input(|i| i.pointer.primary_released()) {
        editor.release(sequence);
    }

    let mut seek = None;
    if response.secondary_clicked() {
        if let Some(pos) = response.interact_pointer_pos() {
            seek = Some(editor.view.time_at(f64::from(pos.x - rect.min.x)).max(0.0));
        }
    }

    paint(ui, rect, editor, sequence, playhead);
    seek
}

fn paint(
    ui: &egui::Ui,
    rect: egui::Rect,
    editor: &RollEditor,
    sequence: &Sequence,
    playhead: f64,
) {
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, Color32::from_gray(24));

    let view = &editor.view;
    let width = f64::from(rect.width());
    let height = f64::from(rect.height());

    let first_row = view.row_at(0.0).max(0);
    let last_row = view.row_at(height).min(127);
    for row in first_row..=last_row {
        let y = view.y_at(row) as f32 + rect.min.y;
        if BLACK_KEYS[(row % 12) as usize] {
            let row_rect = egui::Rect::from_min_size(
                Pos2::new(rect.min.x, y),
                egui::vec2(rect.width(), ROW_HEIGHT as f32),
            );
            painter.rect_filled(row_rect, 0.0, Color32::from_gray(30));
        }
        painter.line_segment(
            [Pos2::new(rect.min.x, y), Pos2::new(rect.max.x, y)],
            Stroke::new(0.5, Color32::from_gray(40)),
        );
    }

    // Vertical grid at the snap unit, heavier every fourth cell.
    let step = editor.snap.unwrap_or(0.25);
    let mut t = (view.time_at(0.0).max(0.0) / step).floor() * step;
    while view.x_at(t) < width {
        let x = view.x_at(t);
        if x >= 0.0 {
            let heavy = (t / step).round() as i64 % 4 == 0;
            let x = x as f32 + rect.min.x;
            painter.line_segment(
                [Pos2::new(x, rect.min.y), Pos2::new(x, rect.max.y)],
                Stroke::new(
                    if heavy { 1.0 } else { 0.5 },
                    Color32::from_gray(if heavy { 56 } else { 40 }),
                ),
            );
        }
        t += step;
    }

    // Notes, the dragged one at its previewed position.
    for (id, note) in sequence.iter() {
        let start = editor.preview_start(id).unwrap_or(note.start());
        let x = view.x_at(start);
        let w = note.duration() * view.zoom();
        let y = view.y_at(i32::from(note.pitch()));
        if x + w < 0.0 || x > width || y + ROW_HEIGHT < 0.0 || y > height {
            continue;
        }
        let note_rect = egui::Rect::from_min_size(
            Pos2::new(x as f32 + rect.min.x, y as f32 + rect.min.y),
            egui::vec2(w as f32, ROW_HEIGHT as f32),
        );
        let level = 120 + (note.velocity() * 100.0) as u8;
        painter.rect_filled(note_rect.shrink(1.0), 2.0, Color32::from_rgb(60, level, 190));
        if editor.selected == Some(id) {
            painter.rect_stroke(note_rect, 2.0, Stroke::new(1.5, Color32::WHITE));
        }
    }

    let x = view.x_at(playhead);
    if (0.0..width).contains(&x) {
        let x = x as f32 + rect.min.x;
        painter.line_segment(
            [Pos2::new(x, rect.min.y), Pos2::new(x, rect.max.y)],
            Stroke::new(1.5, Color32::from_rgb(230, 90, 70)),
        );
    }

    painter.text(
        rect.min + egui::vec2(6.0, 4.0),
        Align2::LEFT_TOP,
        format!("{} note(s)", sequence.len()),
        FontId::monospace(10.0),
        Color32::from_gray(120),
    );
}
