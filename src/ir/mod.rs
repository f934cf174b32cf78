//! Intermediate Representation (IR) Module
//!
//! The notated score produced by the MIDI import pipeline, plus the layer
//! that slices a tick timeline into measures.
//!
//! # Architecture
//!
//! ```text
//! MIDI import (quantized notes on a tick timeline)
//!     ↓
//! Measurization (bars, ties, rests, voices)
//!     ↓
//! IR Types (Score → Part → Measure → Note)
//!     ↓
//! Downstream consumers (MusicXML emitters, renderers, JSON)
//! ```
//!
//! # Modules
//!
//! - **types**: Score, part, measure and note definitions
//! - **measurization**: Tick timeline → measures

pub mod measurization;
pub mod types;

pub use measurization::{measure_bounds, measurize_parts, MeasureBounds, PartNotes};

pub use types::{
    // Score structure
    Score,
    ScoreMetadata,
    Part,
    MidiInstrument,
    PercussionKit,
    Measure,
    MeasureElement,
    MeasureAttributes,
    TempoDirection,
    // Notes
    Note,
    NoteContent,
    NoteDuration,
    NoteValue,
    Notehead,
    NoteheadShape,
    Pitch,
    Step,
    Unpitched,
    TieType,
    QuantizedNote,
    // Attributes
    Clef,
    KeyMode,
    KeySignature,
    TimeSignature,
};
