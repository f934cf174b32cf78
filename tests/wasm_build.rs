//! WASM build test
//!
//! Checks that the JavaScript-facing import functions work in a browser.
#![cfg(target_arch = "wasm32")]

use midi_score_wasm::api::{default_import_settings, import_midi, import_midi_to_json};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

/// Format 0, 480 ticks per quarter, one middle C quarter note
fn single_note_file() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"MThd");
    data.extend_from_slice(&6u32.to_be_bytes());
    data.extend_from_slice(&[0, 0, 0, 1, 0x01, 0xE0]);
    let track = [
        0x00, 0x90, 60, 100, // note on
        0x83, 0x60, 0x80, 60, 0, // note off after 480 ticks
        0x00, 0xFF, 0x2F, 0x00,
    ];
    data.extend_from_slice(b"MTrk");
    data.extend_from_slice(&(track.len() as u32).to_be_bytes());
    data.extend_from_slice(&track);
    data
}

#[wasm_bindgen_test]
fn test_import_midi_to_json() {
    let bytes = js_sys::Uint8Array::from(single_note_file().as_slice());
    let json = import_midi_to_json(&bytes, JsValue::UNDEFINED).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["score"]["parts"].as_array().unwrap().len(), 1);
    assert_eq!(value["score"]["parts"][0]["measures"][0]["elements"][0]["value"], 4);
    assert!(value["warnings"].as_array().unwrap().is_empty());
}

#[wasm_bindgen_test]
fn test_import_midi_returns_object() {
    let bytes = js_sys::Uint8Array::from(single_note_file().as_slice());
    let result = import_midi(&bytes, JsValue::NULL).unwrap();
    assert!(result.is_object());
}

#[wasm_bindgen_test]
fn test_import_error_is_reported() {
    let bytes = js_sys::Uint8Array::from(&b"not a midi file"[..]);
    let err = import_midi(&bytes, JsValue::UNDEFINED).unwrap_err();
    assert!(err.as_string().unwrap().starts_with("MIDI import error"));
}

#[wasm_bindgen_test]
fn test_default_import_settings() {
    let settings = default_import_settings().unwrap();
    assert!(settings.is_object());
}
