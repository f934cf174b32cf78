//! Import operations for the WASM API
//!
//! - `importMidi`: Standard MIDI File bytes → `{ score, warnings }` object
//! - `importMidiToJson`: same, as a pretty-printed JSON string
//! - `defaultImportSettings`: the settings object used when none is given

use wasm_bindgen::prelude::*;

use crate::api::helpers::{deserialize_or_default, import_error, serialize};
use crate::midi_import::{ImportOutcome, ImportSettings, MidiImporter};
use crate::{wasm_error, wasm_info, wasm_log, wasm_warn};

fn run_import(bytes: &js_sys::Uint8Array, settings: JsValue) -> Result<ImportOutcome, JsValue> {
    let settings: ImportSettings = deserialize_or_default(settings, "Invalid import settings")?;
    wasm_log!("  Settings: {:?}", settings);

    let data = bytes.to_vec();
    wasm_log!("  Input: {} bytes", data.len());

    let outcome = MidiImporter::new(settings)
        .import_with_warnings(&data)
        .map_err(|e| import_error("MIDI import error", e))?;

    for warning in &outcome.warnings {
        wasm_warn!("  {}", warning.message);
    }
    wasm_info!(
        "  Imported {} parts with {} warnings",
        outcome.score.parts.len(),
        outcome.warnings.len()
    );
    Ok(outcome)
}

// ============================================================================
// MIDI Import
// ============================================================================

/// Import a Standard MIDI File
///
/// # Parameters
/// * `bytes` - SMF file contents
/// * `settings` - Optional `ImportSettings` object (missing fields use defaults)
///
/// # Returns
/// `{ score, warnings }`
#[wasm_bindgen(js_name = importMidi)]
pub fn import_midi(bytes: &js_sys::Uint8Array, settings: JsValue) -> Result<JsValue, JsValue> {
    wasm_info!("importMidi called");
    let outcome = run_import(bytes, settings)?;
    let result = serialize(&outcome, "Score serialization error")?;
    wasm_info!("importMidi completed successfully");
    Ok(result)
}

/// Import a Standard MIDI File and return `{ score, warnings }` as JSON
#[wasm_bindgen(js_name = importMidiToJson)]
pub fn import_midi_to_json(bytes: &js_sys::Uint8Array, settings: JsValue) -> Result<String, JsValue> {
    wasm_info!("importMidiToJson called");
    let outcome = run_import(bytes, settings)?;
    let json = serde_json::to_string_pretty(&outcome).map_err(|e| {
        wasm_error!("JSON serialization error: {}", e);
        JsValue::from_str(&format!("JSON serialization error: {}", e))
    })?;
    wasm_info!("importMidiToJson completed: {} bytes", json.len());
    Ok(json)
}

/// Default import settings as a JS object
#[wasm_bindgen(js_name = defaultImportSettings)]
pub fn default_import_settings() -> Result<JsValue, JsValue> {
    serialize(&ImportSettings::default(), "Settings serialization error")
}
