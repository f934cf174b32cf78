//! Percussion maps: MIDI drum key → staff position, notehead and stem
//!
//! Staff positions follow common drum-set notation on a five-line
//! percussion staff: kick in the bottom space, snare on the third space,
//! cymbals above the staff.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::ir::{NoteheadShape, PercussionKit, Step};

use NoteheadShape::{CircleX, Diamond, Normal, Triangle, X};
use StemDirection::{Down, Up};

/// Stem direction of a drum voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StemDirection {
    Up,
    Down,
}

/// Notation of one drum key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercussionEntry {
    pub key: u8,
    pub name: &'static str,
    pub display_step: Step,
    pub display_octave: i8,
    pub notehead: NoteheadShape,
    pub stem: StemDirection,
}

impl PercussionEntry {
    const fn new(
        key: u8,
        name: &'static str,
        display_step: Step,
        display_octave: i8,
        notehead: NoteheadShape,
        stem: StemDirection,
    ) -> Self {
        PercussionEntry {
            key,
            name,
            display_step,
            display_octave,
            notehead,
            stem,
        }
    }

    /// Voice the entry is written in (stems down → voice 2)
    pub fn voice(&self) -> u8 {
        match self.stem {
            StemDirection::Up => 1,
            StemDirection::Down => 2,
        }
    }
}

/// Entry used for keys missing from the active kit
pub const SNARE: PercussionEntry = PercussionEntry::new(38, "Acoustic Snare", Step::C, 5, Normal, Up);

/// General MIDI core kit (keys 35-57)
const CORE_KIT: &[PercussionEntry] = &[
    PercussionEntry::new(35, "Acoustic Bass Drum", Step::E, 4, Normal, Down),
    PercussionEntry::new(36, "Bass Drum 1", Step::F, 4, Normal, Down),
    PercussionEntry::new(37, "Side Stick", Step::C, 5, CircleX, Up),
    SNARE,
    PercussionEntry::new(39, "Hand Clap", Step::C, 5, X, Up),
    PercussionEntry::new(40, "Electric Snare", Step::C, 5, Normal, Up),
    PercussionEntry::new(41, "Low Floor Tom", Step::G, 4, Normal, Up),
    PercussionEntry::new(42, "Closed Hi-Hat", Step::G, 5, X, Up),
    PercussionEntry::new(43, "High Floor Tom", Step::A, 4, Normal, Up),
    PercussionEntry::new(44, "Pedal Hi-Hat", Step::D, 4, X, Down),
    PercussionEntry::new(45, "Low Tom", Step::B, 4, Normal, Up),
    PercussionEntry::new(46, "Open Hi-Hat", Step::G, 5, CircleX, Up),
    PercussionEntry::new(47, "Low-Mid Tom", Step::D, 5, Normal, Up),
    PercussionEntry::new(48, "Hi-Mid Tom", Step::E, 5, Normal, Up),
    PercussionEntry::new(49, "Crash Cymbal 1", Step::A, 5, X, Up),
    PercussionEntry::new(50, "High Tom", Step::F, 5, Normal, Up),
    PercussionEntry::new(51, "Ride Cymbal 1", Step::F, 5, X, Up),
    PercussionEntry::new(52, "Chinese Cymbal", Step::B, 5, X, Up),
    PercussionEntry::new(53, "Ride Bell", Step::F, 5, Diamond, Up),
    PercussionEntry::new(54, "Tambourine", Step::E, 5, Triangle, Up),
    PercussionEntry::new(55, "Splash Cymbal", Step::B, 5, X, Up),
    PercussionEntry::new(56, "Cowbell", Step::E, 5, Triangle, Up),
    PercussionEntry::new(57, "Crash Cymbal 2", Step::B, 5, X, Up),
];

/// Auxiliary and latin percussion added by the extended kit (keys 58-81)
const AUXILIARY_KIT: &[PercussionEntry] = &[
    PercussionEntry::new(58, "Vibraslap", Step::D, 5, X, Up),
    PercussionEntry::new(59, "Ride Cymbal 2", Step::E, 5, X, Up),
    PercussionEntry::new(60, "Hi Bongo", Step::E, 5, Normal, Up),
    PercussionEntry::new(61, "Low Bongo", Step::D, 5, Normal, Up),
    PercussionEntry::new(62, "Mute Hi Conga", Step::C, 5, X, Up),
    PercussionEntry::new(63, "Open Hi Conga", Step::C, 5, Normal, Up),
    PercussionEntry::new(64, "Low Conga", Step::A, 4, Normal, Up),
    PercussionEntry::new(65, "High Timbale", Step::E, 5, Normal, Up),
    PercussionEntry::new(66, "Low Timbale", Step::D, 5, Normal, Up),
    PercussionEntry::new(67, "High Agogo", Step::G, 5, Triangle, Up),
    PercussionEntry::new(68, "Low Agogo", Step::F, 5, Triangle, Up),
    PercussionEntry::new(69, "Cabasa", Step::G, 5, X, Up),
    PercussionEntry::new(70, "Maracas", Step::A, 5, X, Up),
    PercussionEntry::new(71, "Short Whistle", Step::B, 5, Normal, Up),
    PercussionEntry::new(72, "Long Whistle", Step::B, 5, Normal, Up),
    PercussionEntry::new(73, "Short Guiro", Step::G, 5, X, Up),
    PercussionEntry::new(74, "Long Guiro", Step::G, 5, X, Up),
    PercussionEntry::new(75, "Claves", Step::F, 5, Triangle, Up),
    PercussionEntry::new(76, "Hi Wood Block", Step::F, 5, Triangle, Up),
    PercussionEntry::new(77, "Low Wood Block", Step::E, 5, Triangle, Up),
    PercussionEntry::new(78, "Mute Cuica", Step::D, 5, X, Up),
    PercussionEntry::new(79, "Open Cuica", Step::D, 5, Normal, Up),
    PercussionEntry::new(80, "Mute Triangle", Step::A, 5, Triangle, Up),
    PercussionEntry::new(81, "Open Triangle", Step::A, 5, Triangle, Up),
];

/// Lookup table for one drum kit
#[derive(Debug, Clone)]
pub struct PercussionMap {
    entries: BTreeMap<u8, PercussionEntry>,
}

impl PercussionMap {
    fn from_tables(tables: &[&[PercussionEntry]]) -> Self {
        let entries = tables
            .iter()
            .flat_map(|table| table.iter())
            .map(|entry| (entry.key, *entry))
            .collect();
        PercussionMap { entries }
    }

    pub fn lookup(&self, key: u8) -> Option<&PercussionEntry> {
        self.entries.get(&key)
    }

    /// Entry for `key`, or the snare entry when the key is unmapped
    pub fn lookup_or_snare(&self, key: u8) -> &PercussionEntry {
        self.lookup(key).unwrap_or(&SNARE)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static STANDARD_MAP: Lazy<PercussionMap> = Lazy::new(|| PercussionMap::from_tables(&[CORE_KIT]));

static EXTENDED_MAP: Lazy<PercussionMap> =
    Lazy::new(|| PercussionMap::from_tables(&[CORE_KIT, AUXILIARY_KIT]));

impl PercussionKit {
    /// Lookup table of this kit
    pub fn map(self) -> &'static PercussionMap {
        match self {
            PercussionKit::Standard => &STANDARD_MAP,
            PercussionKit::Extended => &EXTENDED_MAP,
        }
    }
}
