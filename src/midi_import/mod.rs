//! MIDI Import Module
//!
//! Converts Standard MIDI Files (format 0 and 1) into the notated score IR.
//!
//! # Pipeline
//!
//! ```text
//! bytes ─▶ parser ─▶ ParsedFile ─┬─▶ attributes (tempo / time / key timelines)
//!                                └─▶ tracks (channel groups)
//!                                      │
//!                                      ▼
//!                          notes (pairing, quantization, voices)
//!                                      │
//!                                      ▼
//!                      ir::measurization (bars, ties, rests)
//!                                      │
//!                                      ▼
//!                                    Score
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use midi_score_wasm::midi_import::{ImportSettings, MidiImporter};
//!
//! let mut importer = MidiImporter::new(ImportSettings::default());
//! let score = importer.import_file("song.mid")?;
//! for warning in importer.warnings() {
//!     println!("{}", warning.message);
//! }
//! ```

pub mod attributes;
pub mod defaults;
pub mod errors;
pub mod events;
pub mod importer;
pub mod instruments;
pub mod notes;
pub mod parser;
pub mod percussion;
pub mod quantize;
pub mod reader;
pub mod tracks;
pub mod types;

pub use attributes::{AttributesMap, Timeline};
pub use errors::{ImportError, Result};
pub use events::{ParsedFile, PERCUSSION_CHANNEL};
pub use importer::MidiImporter;
pub use notes::{pair_notes, NoteMapper, NoteSource, NoteSpan};
pub use parser::parse_midi;
pub use percussion::{PercussionEntry, PercussionMap, StemDirection};
pub use quantize::TickQuantizer;
pub use tracks::{ChannelGroup, TrackMapper};
pub use types::{ImportOutcome, ImportSettings};

/// Import a MIDI file held in memory with the given settings
pub fn import_midi(data: &[u8], settings: ImportSettings) -> Result<ImportOutcome> {
    MidiImporter::new(settings).import_with_warnings(data)
}
