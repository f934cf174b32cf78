//! MIDI Score WASM Module
//!
//! Imports Standard MIDI Files into a notated score: parts, measures, notes,
//! rests, ties and voices aligned to a rhythmic grid. Usable as a Rust
//! library or from JavaScript through the `api` bindings.

pub mod api;
pub mod diagnostics;
pub mod ir;
pub mod midi_import;

// Re-export commonly used types
pub use diagnostics::{Diagnostics, ImportWarning};
pub use ir::{Measure, MeasureElement, Note, Part, Score};
pub use midi_import::{import_midi, ImportError, ImportOutcome, ImportSettings, MidiImporter};

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    if let Err(e) = console_log::init_with_level(log::Level::Debug) {
        crate::wasm_warn!("Logger already initialized: {}", e);
    }

    log::info!("MIDI score WASM module initialized");
}
