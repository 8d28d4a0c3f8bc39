//! Mixer strips: one row of controls per track plus the master bus.

use eframe::egui::{self, Slider};

use cantilena::mixer::{Mixer, TrackId, VOLUME_DB_MAX, VOLUME_DB_MIN};

pub fn show(ui: &mut egui::Ui, mixer: &mut Mixer) {
    ui.heading("Mixer");

    let mut master = mixer.master_db();
    if ui
        .add(Slider::new(&mut master, VOLUME_DB_MIN..=VOLUME_DB_MAX).text("master dB"))
        .changed()
    {
        mixer.set_master(master);
    }
    ui.separator();

    let ids: Vec<TrackId> = mixer.iter().map(|(id, _)| id).collect();
    egui::ScrollArea::vertical().show(ui, |ui| {
        for id in ids {
            strip(ui, mixer, id);
            ui.separator();
        }
        if ui.button("Add track").clicked() {
            let id = mixer.add_track();
            if mixer.active().is_none() {
                mixer.set_active_track(id);
            }
        }
    });
}

fn strip(ui: &mut egui::Ui, mixer: &mut Mixer, id: TrackId) {
    let Some(track) = mixer.track(id) else { return };
    let name = track.name.clone();
    let mut volume = track.volume_db();
    let mut pan = track.pan();
    let mut muted = track.is_muted();
    let mut solo = track.is_solo();

    ui.horizontal(|ui| {
        if ui
            .selectable_label(mixer.active() == Some(id), &name)
            .clicked()
        {
            mixer.set_active_track(id);
        }
        if ui.toggle_value(&mut muted, "M").changed() {
            mixer.set_mute(id, muted);
        }
        if ui.toggle_value(&mut solo, "S").changed() {
            mixer.set_solo(id, solo);
        }
        if ui.small_button("x").clicked() {
            mixer.remove_track(id);
        }
    });
    if mixer.track(id).is_none() {
        // Removed just now; its sliders have nothing to bind to.
        return;
    }

    if ui
        .add(Slider::new(&mut volume, VOLUME_DB_MIN..=VOLUME_DB_MAX).text("dB"))
        .changed()
    {
        mixer.set_volume(id, volume);
    }
    if ui.add(Slider::new(&mut pan, -1.0..=1.0).text("pan")).changed() {
        mixer.set_pan(id, pan);
    }
}
