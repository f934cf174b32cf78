//! MIDI Import WASM API
//!
//! JavaScript-facing functions for importing MIDI files into scores.
//!
//! # Module Structure
//!
//! - `helpers`: Console logging, serialization and error conversion
//! - `import`: `importMidi`, `importMidiToJson`, `defaultImportSettings`

pub mod helpers;
pub mod import;

pub use import::{default_import_settings, import_midi, import_midi_to_json};
