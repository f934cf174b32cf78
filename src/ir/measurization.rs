//! Measurization Layer
//!
//! Slices the continuous, quantized note timeline of every part into
//! measures. All parts get identical measure counts.
//!
//! # Architecture
//!
//! ```text
//! QuantizedNotes (tick timeline) → MEASURIZATION → Vec<Measure> per part
//! ```
//!
//! # Key Features
//!
//! - Measure boundaries follow the time signature active at each measure start
//! - Slicing works in divisions, so every voice adds up to its measure length
//! - Lengths with no single note value become tie chains
//! - Notes crossing a barline are split into tied fragments; the tail is
//!   carried into the next measure as plain data
//! - Gaps are filled with rests, independently per voice
//! - Voice 2 follows voice 1 after a backup to the measure start
//! - Attributes on measure 1 and whenever time or key changes

use crate::ir::{
    Clef, Measure, MeasureAttributes, MeasureElement, Note, QuantizedNote, TempoDirection,
    TieType, TimeSignature,
};
use crate::midi_import::{AttributesMap, TickQuantizer};

/// Highest voice number written into a measure
const MAX_VOICES: u8 = 2;

/// Tick and division range of one measure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureBounds {
    /// 1-based measure number
    pub number: u32,
    pub start: u64,
    pub end: u64,
    /// Division position of the measure start
    pub offset: u64,
    /// Measure length in divisions
    pub divisions: u32,
    pub time: TimeSignature,
}

impl MeasureBounds {
    pub fn ticks(&self) -> u64 {
        self.end - self.start
    }

    /// Division position of the barline closing this measure
    pub fn end_offset(&self) -> u64 {
        self.offset + u64::from(self.divisions)
    }
}

/// Notes of one part, ready to be sliced
#[derive(Debug, Clone)]
pub struct PartNotes {
    pub clef: Clef,
    /// Voice-1 and voice-2 notes, each chord primary before its chord tones
    pub notes: Vec<QuantizedNote>,
}

/// Measure ranges covering `total_ticks` (at least one measure)
pub fn measure_bounds(
    total_ticks: u64,
    quantizer: &TickQuantizer,
    attributes: &AttributesMap,
) -> Vec<MeasureBounds> {
    let mut bounds = Vec::new();
    let mut start = 0;
    let mut offset = 0;
    loop {
        let time = attributes.time_signature_at(start);
        let ticks = (quantizer.whole_ticks() * u64::from(time.numerator)
            / u64::from(time.denominator))
        .max(1);
        let divisions = measure_divisions(quantizer, time);
        bounds.push(MeasureBounds {
            number: bounds.len() as u32 + 1,
            start,
            end: start + ticks,
            offset,
            divisions,
            time,
        });
        start += ticks;
        offset += u64::from(divisions);
        if start >= total_ticks {
            break;
        }
    }
    bounds
}

/// Length of a measure in divisions
fn measure_divisions(quantizer: &TickQuantizer, time: TimeSignature) -> u32 {
    (quantizer.divisions_per_quarter() * 4 * u32::from(time.numerator) / u32::from(time.denominator))
        .max(1)
}

/// Split every part into measures.
///
/// Measures are generated until the latest note end of any part is covered.
/// Tempo directions (when `include_tempo` is set) go on the first part only.
pub fn measurize_parts(
    parts: &[PartNotes],
    quantizer: &TickQuantizer,
    attributes: &AttributesMap,
    include_tempo: bool,
) -> Vec<Vec<Measure>> {
    let total_ticks = parts
        .iter()
        .flat_map(|part| part.notes.iter())
        .map(QuantizedNote::end)
        .max()
        .unwrap_or(0);
    let bounds = measure_bounds(total_ticks, quantizer, attributes);
    log::debug!(
        "Measurizing {} parts over {} ticks into {} measures",
        parts.len(),
        total_ticks,
        bounds.len()
    );

    parts
        .iter()
        .enumerate()
        .map(|(index, part)| {
            let mut measures = measurize_part(part, &bounds, quantizer, attributes);
            if include_tempo && index == 0 {
                add_tempo_directions(&mut measures, &bounds, quantizer, attributes);
            }
            measures
        })
        .collect()
}

fn measurize_part(
    part: &PartNotes,
    bounds: &[MeasureBounds],
    quantizer: &TickQuantizer,
    attributes: &AttributesMap,
) -> Vec<Measure> {
    let voices: Vec<Vec<Vec<Note>>> = (1..=MAX_VOICES)
        .map(|voice| {
            let mut notes: Vec<QuantizedNote> = part
                .notes
                .iter()
                .filter(|n| n.note.voice.clamp(1, MAX_VOICES) == voice)
                .cloned()
                .collect();
            // Stable, so chord tones stay behind their primary
            notes.sort_by_key(|n| n.start);
            slice_voice(place_chords(notes, quantizer), voice, bounds, quantizer)
        })
        .collect();

    bounds
        .iter()
        .enumerate()
        .map(|(index, measure_bounds)| {
            let mut measure = Measure::new(measure_bounds.number);
            measure.attributes = measure_attributes(part.clef, index, bounds, quantizer, attributes);

            for (voice_index, voice) in voices.iter().enumerate() {
                let notes = &voice[index];
                if notes.is_empty() {
                    continue;
                }
                if voice_index > 0 {
                    measure.elements.push(MeasureElement::Backup {
                        duration: measure_bounds.divisions,
                    });
                }
                measure
                    .elements
                    .extend(notes.iter().cloned().map(MeasureElement::Note));
            }
            measure
        })
        .collect()
}

/// A note or chord on the division timeline
#[derive(Debug, Clone)]
struct Placed {
    start: u64,
    length: u64,
    /// Tied from a fragment in an earlier measure
    tied_in: bool,
    /// Primary note first, then its chord tones
    notes: Vec<Note>,
}

impl Placed {
    fn end(&self) -> u64 {
        self.start + self.length
    }
}

/// Convert a voice to division positions, grouping chord tones with the
/// primary note before them.
fn place_chords(notes: Vec<QuantizedNote>, quantizer: &TickQuantizer) -> Vec<Placed> {
    let floor = quantizer.grid_divisions(quantizer.floor_ticks()).max(1);
    let mut placed: Vec<Placed> = Vec::new();
    for item in notes {
        if item.note.chord {
            match placed.last_mut() {
                Some(group) if group.start == quantizer.grid_divisions(item.start) => {
                    group.notes.push(item.note)
                }
                _ => log::debug!("Dropping chord tone at tick {} without a primary note", item.start),
            }
            continue;
        }
        placed.push(Placed {
            start: quantizer.grid_divisions(item.start),
            length: quantizer.grid_divisions(item.ticks).max(floor),
            tied_in: false,
            notes: vec![item.note],
        });
    }
    placed
}

/// Slice one voice into per-measure note lists.
///
/// Voice 1 is always rest-filled; voice 2 only in measures where it plays.
fn slice_voice(
    notes: Vec<Placed>,
    voice: u8,
    bounds: &[MeasureBounds],
    quantizer: &TickQuantizer,
) -> Vec<Vec<Note>> {
    let mut pending = notes.into_iter().peekable();
    let mut carried: Vec<Placed> = Vec::new();
    let mut result = Vec::with_capacity(bounds.len());

    for measure in bounds {
        let barline = measure.end_offset();
        let mut items = std::mem::take(&mut carried);
        while let Some(group) = pending.next_if(|g| g.start < barline) {
            items.push(group);
        }

        if items.is_empty() && voice > 1 {
            result.push(Vec::new());
            continue;
        }

        let mut out = Vec::new();
        let mut cursor = measure.offset;
        for item in items {
            let start = item.start.max(cursor);
            if item.end() <= start {
                log::debug!("Dropping note at division {} overlapped in voice {}", item.start, voice);
                continue;
            }
            if start >= barline {
                // Pushed past the barline by the note before it
                carried.push(Placed { start, length: item.end() - start, ..item });
                continue;
            }
            if start > cursor {
                fill_rests(&mut out, start - cursor, voice, quantizer);
            }

            let item = Placed {
                start,
                length: item.end() - start,
                ..item
            };
            cursor = item.end().min(barline);
            carried.extend(write_fragment(item, barline, quantizer, &mut out));
        }

        if cursor < barline {
            fill_rests(&mut out, barline - cursor, voice, quantizer);
        }
        result.push(out);
    }

    result
}

/// Write the part of `item` before `barline` into `out` and return the
/// fragment carried into the next measure, if any.
///
/// The written length is split into note values joined by ties; chord
/// tones repeat every piece of the primary note.
fn write_fragment(
    item: Placed,
    barline: u64,
    quantizer: &TickQuantizer,
    out: &mut Vec<Note>,
) -> Option<Placed> {
    let crosses = item.end() > barline;
    let head = if crosses { barline - item.start } else { item.length };

    let pieces = quantizer.split_divisions(head);
    let last = pieces.len().saturating_sub(1);
    for (index, duration) in pieces.into_iter().enumerate() {
        let tie = tie_for(item.tied_in || index > 0, crosses || index < last);
        out.extend(item.notes.iter().map(|note| Note {
            duration,
            tie,
            ..note.clone()
        }));
    }

    crosses.then(|| Placed {
        start: barline,
        length: item.end() - barline,
        tied_in: true,
        notes: item.notes,
    })
}

fn tie_for(tied_in: bool, tied_out: bool) -> Option<TieType> {
    match (tied_in, tied_out) {
        (false, false) => None,
        (false, true) => Some(TieType::Start),
        (true, true) => Some(TieType::Continue),
        (true, false) => Some(TieType::Stop),
    }
}

/// Fill a gap of `divisions` with rests, longest values first
fn fill_rests(out: &mut Vec<Note>, divisions: u64, voice: u8, quantizer: &TickQuantizer) {
    out.extend(
        quantizer
            .split_divisions(divisions)
            .into_iter()
            .map(|duration| Note::rest(duration, voice)),
    );
}

fn measure_attributes(
    clef: Clef,
    index: usize,
    bounds: &[MeasureBounds],
    quantizer: &TickQuantizer,
    attributes: &AttributesMap,
) -> Option<MeasureAttributes> {
    let start = bounds[index].start;
    if index == 0 {
        return Some(MeasureAttributes {
            divisions: Some(quantizer.divisions_per_quarter()),
            key: Some(attributes.key_signature_at(start)),
            time: Some(bounds[index].time),
            clef: Some(clef),
        });
    }

    let previous = bounds[index - 1].start;
    let time = (bounds[index - 1].time != bounds[index].time).then_some(bounds[index].time);
    let key = attributes
        .key_signature_changed(previous, start)
        .then(|| attributes.key_signature_at(start));
    if time.is_none() && key.is_none() {
        return None;
    }
    Some(MeasureAttributes {
        divisions: None,
        key,
        time,
        clef: None,
    })
}

fn add_tempo_directions(
    measures: &mut [Measure],
    bounds: &[MeasureBounds],
    quantizer: &TickQuantizer,
    attributes: &AttributesMap,
) {
    for (tick, bpm) in attributes.tempo.explicit_entries() {
        let Some(index) = bounds.iter().position(|b| *tick >= b.start && *tick < b.end) else {
            log::debug!("Tempo change at tick {} lies after the last measure", tick);
            continue;
        };
        measures[index].directions.push(TempoDirection {
            offset: quantizer.ticks_to_divisions(tick - bounds[index].start),
            bpm: *bpm,
        });
    }
}
