//! The application shell: transport bar, mixer panel, piano-roll canvas,
//! MIDI import via dropped files and export to a file next to the binary.

use eframe::egui;
use log::{debug, info, warn};

use cantilena::midi::{self, ParseOptions};
use cantilena::mixer::{Mixer, TrackId};
use cantilena::model::Sequence;
use cantilena::roll::{grid_unit, RollEditor, ROW_HEIGHT};
use cantilena::transport::{dispatch, AudioHost, Transport, TransportEvent};

use super::{canvas, strips};

const EXPORT_PATH: &str = "cantilena-export.mid";

/// Stand-in host engine: logs every event it is handed. A real synth
/// backend implements the same trait and is passed to [`CantilenaApp::new`].
pub struct LogHost;

impl AudioHost for LogHost {
    fn note_on(&mut self, track: TrackId, pitch: u8, velocity: f64, gain: f64, pan: f64) {
        debug!("note on  {track:?} pitch {pitch} vel {velocity:.2} gain {gain:.3} pan {pan:+.2}");
    }

    fn note_off(&mut self, track: TrackId, pitch: u8) {
        debug!("note off {track:?} pitch {pitch}");
    }
}

pub struct CantilenaApp {
    mixer: Mixer,
    editor: RollEditor,
    transport: Transport,
    host: Box<dyn AudioHost>,
    loop_on: bool,
    snap_on: bool,
}

impl Default for CantilenaApp {
    fn default() -> Self {
        Self::new(Box::new(LogHost))
    }
}

impl CantilenaApp {
    pub fn new(host: Box<dyn AudioHost>) -> Self {
        let mut mixer = Mixer::new();
        let first = mixer.add_track();
        mixer.set_active_track(first);

        let mut editor = RollEditor::new();
        // Start scrolled to the octaves around middle C.
        editor.view.scroll_y = 48.0 * ROW_HEIGHT;
        editor.snap = Some(grid_unit(120.0, 16));

        Self {
            mixer,
            editor,
            transport: Transport::new(),
            host,
            loop_on: false,
            snap_on: true,
        }
    }

    fn flush(&mut self, events: Vec<TransportEvent>) {
        for event in events {
            dispatch(event, self.host.as_mut());
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let (delete, escape, space) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Delete),
                i.key_pressed(egui::Key::Escape),
                i.key_pressed(egui::Key::Space),
            )
        });

        if escape {
            self.editor.cancel();
        }
        if delete {
            if let Some(track) = self.mixer.active_track_mut() {
                self.editor.delete_selected(&mut track.sequence);
            }
        }
        if space {
            if self.transport.is_playing() {
                let events = self.transport.stop();
                self.flush(events);
            } else {
                self.transport.start();
            }
        }
    }

    fn import_dropped(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            let label = file
                .path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| file.name.clone());
            let bytes = match (&file.bytes, &file.path) {
                (Some(bytes), _) => Some(bytes.to_vec()),
                (None, Some(path)) => match std::fs::read(path) {
                    Ok(bytes) => Some(bytes),
                    Err(err) => {
                        warn!("could not read {label}: {err}");
                        None
                    }
                },
                _ => None,
            };
            let Some(bytes) = bytes else { continue };

            match midi::parse(&bytes, &ParseOptions::default()) {
                Ok(sequences) => {
                    let ids = self.mixer.import(sequences);
                    info!("imported {} track(s) from {label}", ids.len());
                    if self.mixer.active().is_none() {
                        if let Some(&id) = ids.first() {
                            self.mixer.set_active_track(id);
                        }
                    }
                }
                Err(err) => warn!("could not import {label}: {err}"),
            }
        }
    }

    fn export(&self) {
        let sequences: Vec<Sequence> = self
            .mixer
            .iter()
            .map(|(_, track)| track.sequence.clone())
            .collect();
        let bytes = midi::serialize(&sequences);
        match std::fs::write(EXPORT_PATH, &bytes) {
            Ok(()) => info!("wrote {} bytes to {EXPORT_PATH}", bytes.len()),
            Err(err) => warn!("could not write {EXPORT_PATH}: {err}"),
        }
    }

    fn ui_transport(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Play").clicked() {
                self.transport.start();
            }
            if ui.button("Stop").clicked() {
                let events = self.transport.stop();
                self.flush(events);
            }
            if ui.button("Rewind").clicked() {
                let events = self.transport.seek(0.0);
                self.flush(events);
            }
            ui.label(
                egui::RichText::new(format!("{:7.2} s", self.transport.position())).monospace(),
            );
            ui.separator();

            if ui.checkbox(&mut self.loop_on, "Loop").changed() {
                let region = self
                    .loop_on
                    .then(|| (0.0, self.mixer.end_time().max(1.0)));
                self.transport.set_loop(region);
            }
            if ui.checkbox(&mut self.snap_on, "Snap 1/16").changed() {
                self.editor.snap = self.snap_on.then(|| grid_unit(120.0, 16));
            }
            ui.separator();

            if ui.button("-").clicked() {
                self.editor.view.zoom_by(0.8);
            }
            if ui.button("+").clicked() {
                self.editor.view.zoom_by(1.25);
            }
            ui.label(format!("{:.0} px/s", self.editor.view.zoom()));
            ui.separator();

            if ui.button("Export MIDI").clicked() {
                self.export();
            }
            ui.label("(drop a .mid file to import)");
        });
    }
}

impl eframe::App for CantilenaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.import_dropped(ctx);
        self.handle_keys(ctx);

        if self.transport.is_playing() {
            // Real elapsed time, so a stalled frame is caught up rather
            // than dropped.
            let dt = f64::from(ctx.input(|i| i.unstable_dt));
            self.transport.pump(&self.mixer, dt, self.host.as_mut());
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("transport").show(ctx, |ui| self.ui_transport(ui));
        egui::SidePanel::right("mixer")
            .default_width(240.0)
            .show(ctx, |ui| strips::show(ui, &mut self.mixer));
        egui::CentralPanel::default().show(ctx, |ui| {
            let playhead = self.transport.position();
            let target = match self.mixer.active_track_mut() {
                Some(track) => canvas::show(ui, &mut self.editor, &mut track.sequence, playhead),
                None => {
                    ui.centered_and_justified(|ui| {
                        ui.label("Select or add a track to edit");
                    });
                    None
                }
            };
            if let Some(target) = target {
                let events = self.transport.seek(target);
                self.flush(events);
            }
        });
    }
}
