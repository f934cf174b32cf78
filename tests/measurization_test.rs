// Test measure slicing over the note mapping pipeline
//
// Spans are built by hand and pushed through NoteMapper and measurize_parts,
// so these tests cover the hand-off between the import stages without
// going through the binary parser.

use midi_score_wasm::ir::{
    measure_bounds, measurize_parts, Clef, Measure, MeasureElement, NoteValue, PartNotes,
    TieType, TimeSignature,
};
use midi_score_wasm::midi_import::events::{
    Division, EventKind, MetaEvent, MidiFormat, ParsedFile, Track, TrackEvent,
};
use midi_score_wasm::midi_import::{AttributesMap, NoteMapper, NoteSource, NoteSpan, TickQuantizer};
use midi_score_wasm::Diagnostics;

const TPQ: u64 = 480;

/// Attribute timelines from a list of meta events
fn attributes(meta: Vec<(u64, MetaEvent)>) -> AttributesMap {
    let events = meta
        .into_iter()
        .map(|(tick, meta)| TrackEvent {
            tick,
            kind: EventKind::Meta(meta),
        })
        .collect();
    let file = ParsedFile {
        format: MidiFormat::SingleTrack,
        declared_tracks: 1,
        division: Division::TicksPerQuarter(TPQ as u16),
        tracks: vec![Track { events }],
    };
    AttributesMap::build(&file, &mut Diagnostics::new())
}

fn time_signature(numerator: u8, denominator_power: u8) -> MetaEvent {
    MetaEvent::TimeSignature {
        numerator,
        denominator_power,
        clocks_per_click: 24,
        thirty_seconds_per_quarter: 8,
    }
}

fn span(start: u64, ticks: u64, key: u8, channel: u8) -> NoteSpan {
    NoteSpan {
        start,
        end: start + ticks,
        key,
        velocity: 90,
        channel,
    }
}

/// Map spans and slice them into measures (one part per span list)
fn slice(parts: Vec<(Vec<NoteSpan>, bool)>, attributes: &AttributesMap) -> Vec<Vec<Measure>> {
    let quantizer = TickQuantizer::new(TPQ as u16, NoteValue::Sixteenth);
    let kit = midi_score_wasm::ir::PercussionKit::Standard.map();
    let mut diagnostics = Diagnostics::new();
    let part_notes: Vec<PartNotes> = parts
        .into_iter()
        .map(|(spans, percussion)| {
            let source = if percussion {
                NoteSource::Percussion {
                    map: kit,
                    ghost_threshold: 40,
                }
            } else {
                NoteSource::Pitched
            };
            PartNotes {
                clef: if percussion { Clef::Percussion } else { Clef::Treble },
                notes: NoteMapper::new(&quantizer, attributes, source).map(&spans, &mut diagnostics),
            }
        })
        .collect();
    measurize_parts(&part_notes, &quantizer, attributes, true)
}

fn ties(measure: &Measure) -> Vec<Option<TieType>> {
    measure.notes().filter(|n| !n.is_rest()).map(|n| n.tie).collect()
}

#[test]
fn test_measure_bounds_follow_meter_changes() {
    let attributes = attributes(vec![(1920, time_signature(6, 3)), (3360, time_signature(2, 2))]);
    let quantizer = TickQuantizer::new(TPQ as u16, NoteValue::Sixteenth);

    let bounds = measure_bounds(5000, &quantizer, &attributes);
    let spans: Vec<(u64, u64)> = bounds.iter().map(|b| (b.start, b.end)).collect();
    assert_eq!(spans, vec![(0, 1920), (1920, 3360), (3360, 4320), (4320, 5280)]);
    assert_eq!(bounds[1].time, TimeSignature { numerator: 6, denominator: 8 });
    assert_eq!(bounds[3].time, TimeSignature { numerator: 2, denominator: 4 });
    assert_eq!(bounds[3].number, 4);
}

#[test]
fn test_tie_chain_over_three_measures() {
    // Dotted whole note in 2/4: half + half + half
    let attributes = attributes(vec![(0, time_signature(2, 2))]);
    let measures = slice(vec![(vec![span(0, 2880, 67, 0)], false)], &attributes);

    assert_eq!(measures[0].len(), 3);
    assert_eq!(ties(&measures[0][0]), vec![Some(TieType::Start)]);
    assert_eq!(ties(&measures[0][1]), vec![Some(TieType::Continue)]);
    assert_eq!(ties(&measures[0][2]), vec![Some(TieType::Stop)]);
    for measure in &measures[0] {
        assert_eq!(measure.voice_duration(1), 32);
        assert!(measure.notes().all(|n| n.duration.value == NoteValue::Half));
    }
}

#[test]
fn test_chord_straddling_barline() {
    let attributes = attributes(vec![]);
    let chord = vec![span(1440, 960, 60, 0), span(1440, 960, 64, 0), span(1440, 960, 67, 0)];
    let measures = slice(vec![(chord, false)], &attributes);
    let measures = &measures[0];
    assert_eq!(measures.len(), 2);

    let head: Vec<_> = measures[0].notes().filter(|n| !n.is_rest()).collect();
    assert_eq!(head.len(), 3);
    assert_eq!(head.iter().map(|n| n.chord).collect::<Vec<_>>(), vec![false, true, true]);
    assert!(head.iter().all(|n| n.tie == Some(TieType::Start)));

    let tail: Vec<_> = measures[1].notes().filter(|n| !n.is_rest()).collect();
    assert_eq!(tail.len(), 3);
    assert_eq!(tail.iter().map(|n| n.chord).collect::<Vec<_>>(), vec![false, true, true]);
    assert!(tail.iter().all(|n| n.tie == Some(TieType::Stop)));

    assert_eq!(measures[0].voice_duration(1), 64);
    assert_eq!(measures[1].voice_duration(1), 64);
}

#[test]
fn test_every_measure_is_filled() {
    let attributes = attributes(vec![]);
    let line = vec![
        span(0, 240, 60, 0),
        span(240, 720, 62, 0),
        // quarter gap
        span(1440, 240, 64, 0),
        span(1680, 120, 65, 0),
        span(1800, 120, 67, 0),
        span(2400, 1440, 69, 0),
    ];
    let measures = slice(vec![(line, false)], &attributes);
    let measures = &measures[0];
    assert_eq!(measures.len(), 2);
    for measure in measures {
        assert_eq!(measure.voice_duration(1), 64);
        assert!(!measure
            .elements
            .iter()
            .any(|e| matches!(e, MeasureElement::Backup { .. })));
    }
    assert_eq!(measures[0].notes().filter(|n| n.is_rest()).count(), 1);
}

#[test]
fn test_second_voice_only_where_it_plays() {
    let attributes = attributes(vec![]);
    let mut drums = Vec::new();
    for i in 0..8 {
        drums.push(span(i * TPQ, TPQ, 42, 9));
    }
    drums.push(span(0, TPQ, 36, 9));
    drums.push(span(2 * TPQ, TPQ, 36, 9));

    let measures = slice(vec![(drums, true)], &attributes);
    let measures = &measures[0];
    assert_eq!(measures.len(), 2);

    assert_eq!(
        measures[0]
            .elements
            .iter()
            .filter(|e| matches!(e, MeasureElement::Backup { duration: 64 }))
            .count(),
        1
    );
    assert_eq!(measures[0].voice_duration(2), 64);

    assert!(measures[1].notes().all(|n| n.voice == 1));
    assert!(!measures[1]
        .elements
        .iter()
        .any(|e| matches!(e, MeasureElement::Backup { .. })));
}

#[test]
fn test_parts_share_measures_and_tempo_marks_stay_on_first_part() {
    let attributes = attributes(vec![(0, MetaEvent::Tempo(500_000)), (1920, MetaEvent::Tempo(600_000))]);
    let melody = vec![span(0, 480, 72, 0)];
    let bass = vec![span(0, 3840, 36, 1)];
    let measures = slice(vec![(melody, false), (bass, false)], &attributes);

    assert_eq!(measures.len(), 2);
    assert_eq!(measures[0].len(), 2);
    assert_eq!(measures[1].len(), 2);

    assert_eq!(measures[0][0].directions.len(), 1);
    assert_eq!(measures[0][0].directions[0].bpm, 120.0);
    assert_eq!(measures[0][1].directions[0].bpm, 100.0);
    assert!(measures[1].iter().all(|m| m.directions.is_empty()));

    // Melody part padded with a whole-measure rest
    assert!(measures[0][1].notes().all(|n| n.is_rest()));
    assert_eq!(measures[0][1].voice_duration(1), 64);
}
