//! The eframe host around the sequencing core. Deliberately thin: all
//! editing semantics live in the library, this module only paints state
//! and routes input into it.

mod canvas;
mod strips;
pub mod top;
