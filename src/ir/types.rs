//! Score Representation for MIDI Import
//!
//! This module defines the notation types produced by the MIDI import pipeline
//! and handed to downstream collaborators (MusicXML emitters, renderers, playback).
//!
//! # Design Principles
//!
//! 1. **Format-agnostic**: types capture musical semantics, not MusicXML element layout
//! 2. **Two duration forms**: every note carries a note value + dots *and* an
//!    arithmetic duration (divisions per quarter, plus an exact fraction of a whole)
//! 3. **Measure-level attributes only when they change**: measure 1 carries the full
//!    block, later measures only the time/key signature that differs
//!
//! # Layout
//!
//! ```text
//! Score
//! ├── metadata (software, title, copyright)
//! └── parts
//!     └── Part
//!         ├── name, instruments, percussion kit
//!         └── measures
//!             └── Measure
//!                 ├── attributes (divisions / key / time / clef)
//!                 ├── directions (tempo marks)
//!                 └── elements
//!                     ├── Note (pitched, unpitched or rest)
//!                     └── Backup (rewind to the measure start for voice 2)
//! ```

use num_rational::Rational32;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Note value (the notated "type" of a note), serialized as its denominator
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize_repr, Deserialize_repr,
)]
#[repr(u8)]
pub enum NoteValue {
    Whole = 1,
    Half = 2,
    Quarter = 4,
    Eighth = 8,
    Sixteenth = 16,
    ThirtySecond = 32,
    SixtyFourth = 64,
}

impl NoteValue {
    /// All note values, longest first
    pub const ALL: [NoteValue; 7] = [
        NoteValue::Whole,
        NoteValue::Half,
        NoteValue::Quarter,
        NoteValue::Eighth,
        NoteValue::Sixteenth,
        NoteValue::ThirtySecond,
        NoteValue::SixtyFourth,
    ];

    /// Denominator of the value as a fraction of a whole note (quarter → 4)
    pub fn denominator(self) -> u32 {
        self as u32
    }

    /// MusicXML `<type>` name
    pub fn type_name(self) -> &'static str {
        match self {
            NoteValue::Whole => "whole",
            NoteValue::Half => "half",
            NoteValue::Quarter => "quarter",
            NoteValue::Eighth => "eighth",
            NoteValue::Sixteenth => "16th",
            NoteValue::ThirtySecond => "32nd",
            NoteValue::SixtyFourth => "64th",
        }
    }

    /// Values from a whole note down to (and including) `floor`
    pub fn down_to(floor: NoteValue) -> impl Iterator<Item = NoteValue> {
        NoteValue::ALL.into_iter().filter(move |v| *v <= floor)
    }
}

/// Duration of a note or rest in both notated and arithmetic form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDuration {
    /// Notated value (quarter, eighth, ...)
    pub value: NoteValue,
    /// Number of augmentation dots (0-2)
    pub dots: u8,
    /// Duration in divisions (see `MeasureAttributes::divisions`)
    pub divisions: u32,
    /// Exact duration as a fraction of a whole note (dotted quarter → 3/8)
    pub fraction: Rational32,
}

/// Diatonic step name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

/// Sounding pitch of a pitched note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pitch {
    pub step: Step,
    /// Chromatic alteration (-1 = flat, 0 = natural, +1 = sharp)
    pub alter: i8,
    /// Octave number (4 = middle C octave)
    pub octave: i8,
}

const SHARP_SPELLINGS: [(Step, i8); 12] = [
    (Step::C, 0),
    (Step::C, 1),
    (Step::D, 0),
    (Step::D, 1),
    (Step::E, 0),
    (Step::F, 0),
    (Step::F, 1),
    (Step::G, 0),
    (Step::G, 1),
    (Step::A, 0),
    (Step::A, 1),
    (Step::B, 0),
];

const FLAT_SPELLINGS: [(Step, i8); 12] = [
    (Step::C, 0),
    (Step::D, -1),
    (Step::D, 0),
    (Step::E, -1),
    (Step::E, 0),
    (Step::F, 0),
    (Step::G, -1),
    (Step::G, 0),
    (Step::A, -1),
    (Step::A, 0),
    (Step::B, -1),
    (Step::B, 0),
];

impl Pitch {
    /// Spell a MIDI key number (60 = C4) in the context of a key signature.
    ///
    /// Sharp keys (and C major) spell black keys with sharps, flat keys with flats.
    pub fn from_midi_key(key: u8, fifths: i8) -> Self {
        let table = if fifths < 0 { &FLAT_SPELLINGS } else { &SHARP_SPELLINGS };
        let (step, alter) = table[(key % 12) as usize];
        Pitch {
            step,
            alter,
            octave: (key / 12) as i8 - 1,
        }
    }

    /// MIDI key number of this pitch
    pub fn midi_key(&self) -> i32 {
        let base = match self.step {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        };
        base + self.alter as i32 + (self.octave as i32 + 1) * 12
    }
}

/// Staff position of an unpitched (percussion) note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unpitched {
    pub display_step: Step,
    pub display_octave: i8,
    /// MIDI key of the percussion instrument this note plays
    pub instrument: u8,
}

/// What a note sounds like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NoteContent {
    Rest,
    Pitched(Pitch),
    Unpitched(Unpitched),
}

/// Notehead shapes used by the percussion kits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoteheadShape {
    Normal,
    X,
    CircleX,
    Triangle,
    Diamond,
}

/// Notehead override for a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notehead {
    pub shape: NoteheadShape,
    /// Parenthesized (ghost note)
    pub parentheses: bool,
}

/// Tie information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieType {
    Start,
    /// Fragment that both ends one tie and starts the next
    Continue,
    Stop,
}

/// A note, chord tone or rest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub content: NoteContent,
    #[serde(flatten)]
    pub duration: NoteDuration,
    /// Voice number (1 or 2)
    pub voice: u8,
    /// Staff number within the part (always 1)
    pub staff: u8,
    /// Chord tone sounding with the preceding note
    pub chord: bool,
    pub tie: Option<TieType>,
    pub notehead: Option<Notehead>,
    /// Original MIDI velocity (None for rests)
    pub velocity: Option<u8>,
}

impl Note {
    /// Create a rest
    pub fn rest(duration: NoteDuration, voice: u8) -> Self {
        Note {
            content: NoteContent::Rest,
            duration,
            voice,
            staff: 1,
            chord: false,
            tie: None,
            notehead: None,
            velocity: None,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self.content, NoteContent::Rest)
    }
}

/// Clef
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clef {
    Treble,
    Bass,
    Percussion,
}

impl Clef {
    /// MusicXML clef sign ("G", "F", "percussion")
    pub fn sign(self) -> &'static str {
        match self {
            Clef::Treble => "G",
            Clef::Bass => "F",
            Clef::Percussion => "percussion",
        }
    }

    /// Staff line the clef sits on (2 for treble, 4 for bass)
    pub fn line(self) -> u8 {
        match self {
            Clef::Treble => 2,
            Clef::Bass => 4,
            Clef::Percussion => 3,
        }
    }
}

/// Major or minor mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    #[default]
    Major,
    Minor,
}

/// Key signature as a circle-of-fifths position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeySignature {
    /// -7 (seven flats) to +7 (seven sharps)
    pub fifths: i8,
    pub mode: KeyMode,
}

/// Time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature {
            numerator: 4,
            denominator: 4,
        }
    }
}

/// Attributes block attached to a measure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeasureAttributes {
    /// Divisions per quarter note
    pub divisions: Option<u32>,
    pub key: Option<KeySignature>,
    pub time: Option<TimeSignature>,
    pub clef: Option<Clef>,
}

/// Metronome mark generated from a tempo change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoDirection {
    /// Position within the measure, in divisions
    pub offset: u32,
    /// Quarter notes per minute
    pub bpm: f64,
}

/// Element of a measure's content, in emission order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MeasureElement {
    Note(Note),
    /// Move the insertion point back by `duration` divisions
    Backup { duration: u32 },
}

/// A single measure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// 1-based measure number
    pub number: u32,
    pub attributes: Option<MeasureAttributes>,
    pub directions: Vec<TempoDirection>,
    pub elements: Vec<MeasureElement>,
}

impl Measure {
    pub fn new(number: u32) -> Self {
        Measure {
            number,
            attributes: None,
            directions: Vec::new(),
            elements: Vec::new(),
        }
    }

    /// Iterate over notes and rests, skipping backup markers
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.elements.iter().filter_map(|e| match e {
            MeasureElement::Note(note) => Some(note),
            MeasureElement::Backup { .. } => None,
        })
    }

    /// Total duration of one voice in divisions (chord tones excluded)
    pub fn voice_duration(&self, voice: u8) -> u32 {
        self.notes()
            .filter(|n| n.voice == voice && !n.chord)
            .map(|n| n.duration.divisions)
            .sum()
    }
}

/// Drum kit layout selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PercussionKit {
    /// General MIDI core kit
    #[default]
    Standard,
    /// Core kit plus auxiliary and latin percussion
    Extended,
}

/// MIDI playback descriptor of a part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiInstrument {
    /// Instrument id (e.g., "P1-I1")
    pub id: String,
    /// 1-based MIDI channel (10 = drums)
    pub channel: u8,
    /// General MIDI program number (0-127; 0 for drums)
    pub program: u8,
    pub name: String,
}

/// One part (instrument) of the score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Part id (e.g., "P1", "P2")
    pub id: String,
    pub name: String,
    pub is_percussion: bool,
    pub instruments: Vec<MidiInstrument>,
    pub percussion_map: Option<PercussionKit>,
    pub measures: Vec<Measure>,
}

/// Score-level metadata
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreMetadata {
    /// Software tag ("<name> <version>")
    pub software: String,
    pub title: Option<String>,
    pub copyright: Option<String>,
}

/// The imported score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub metadata: ScoreMetadata,
    pub parts: Vec<Part>,
}

/// A mapped note positioned on the tick timeline, before measure slicing
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedNote {
    /// Quantized onset tick
    pub start: u64,
    /// Length in ticks (on-grid for mapped notes, exact for tie fragments)
    pub ticks: u64,
    pub note: Note,
}

impl QuantizedNote {
    pub fn end(&self) -> u64 {
        self.start + self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quarter() -> NoteDuration {
        NoteDuration {
            value: NoteValue::Quarter,
            dots: 0,
            divisions: 16,
            fraction: Rational32::new(1, 4),
        }
    }

    #[test]
    fn test_note_value_down_to() {
        let values: Vec<_> = NoteValue::down_to(NoteValue::Eighth).collect();
        assert_eq!(
            values,
            vec![NoteValue::Whole, NoteValue::Half, NoteValue::Quarter, NoteValue::Eighth]
        );
    }

    #[test]
    fn test_note_value_serializes_as_denominator() {
        let json = serde_json::to_string(&NoteValue::Sixteenth).unwrap();
        assert_eq!(json, "16");
        assert_eq!(NoteValue::Sixteenth.type_name(), "16th");
    }

    #[test]
    fn test_pitch_spelling_follows_key() {
        assert_eq!(
            Pitch::from_midi_key(61, 0),
            Pitch { step: Step::C, alter: 1, octave: 4 }
        );
        assert_eq!(
            Pitch::from_midi_key(61, -3),
            Pitch { step: Step::D, alter: -1, octave: 4 }
        );
        assert_eq!(Pitch::from_midi_key(60, 0).midi_key(), 60);
        assert_eq!(Pitch::from_midi_key(0, 0).octave, -1);
    }

    #[test]
    fn test_measure_voice_duration() {
        let mut measure = Measure::new(1);
        measure.elements.push(MeasureElement::Note(Note::rest(quarter(), 1)));
        let mut chord_tone = Note::rest(quarter(), 1);
        chord_tone.chord = true;
        measure.elements.push(MeasureElement::Note(chord_tone));
        measure.elements.push(MeasureElement::Backup { duration: 64 });
        measure.elements.push(MeasureElement::Note(Note::rest(quarter(), 2)));

        assert_eq!(measure.voice_duration(1), 16);
        assert_eq!(measure.voice_duration(2), 16);
        assert_eq!(measure.notes().count(), 3);
    }

    #[test]
    fn test_clef_sign_and_line() {
        assert_eq!(Clef::Treble.sign(), "G");
        assert_eq!(Clef::Bass.line(), 4);
        assert_eq!(Clef::Percussion.sign(), "percussion");
    }
}
