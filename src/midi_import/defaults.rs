//! Default values for MIDI import
//!
//! Fallbacks used when the file leaves something unspecified.

use crate::ir::NoteValue;

use super::events::PERCUSSION_CHANNEL;

/// Tempo assumed until the first tempo event (quarter notes per minute)
pub const DEFAULT_TEMPO_BPM: f64 = 120.0;

/// Velocity below which percussion hits become ghost notes
pub const DEFAULT_GHOST_NOTE_THRESHOLD: u8 = 40;

/// Shortest note value on the quantization grid
pub const DEFAULT_RESOLUTION: NoteValue = NoteValue::Sixteenth;

/// Mean key number below which a pitched part gets a bass clef
pub const BASS_CLEF_THRESHOLD: f64 = 55.0;

/// Display name for a group without track name or program
pub fn fallback_group_name(channel: u8) -> String {
    if channel == PERCUSSION_CHANNEL {
        "Drums".to_string()
    } else {
        format!("Channel {}", channel + 1)
    }
}

/// Software tag written into the score metadata
pub fn software_tag() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
