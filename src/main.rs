// Credit to the egui project for the original template code which was adapted for Cantilena.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

mod app;

use crate::app::top::CantilenaApp;
use eframe::egui;

fn main() -> Result<(), eframe::Error> {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).
    let options = eframe::NativeOptions {
        initial_window_size: Some(egui::vec2(1100.0, 640.0)),
        ..Default::default()
    };
    eframe::run_native(
        "Cantilena",
        options,
        Box::new(|_| Box::<CantilenaApp>::default()),
    )
}
