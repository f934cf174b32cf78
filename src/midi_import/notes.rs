//! Note pairing and mapping
//!
//! Turns a group's channel events into quantized score notes:
//!
//! 1. `pair_notes` matches note-on/note-off into timed spans
//! 2. `NoteMapper` snaps the spans onto the grid, groups simultaneous onsets
//!    into chords and assigns voices, spelling and noteheads

use std::collections::{BTreeMap, HashMap};

use crate::diagnostics::{Diagnostics, ImportWarning};
use crate::ir::{Note, NoteContent, Notehead, NoteheadShape, Pitch, QuantizedNote, Unpitched};

use super::attributes::AttributesMap;
use super::events::{ChannelMessage, EventKind, TrackEvent};
use super::percussion::{PercussionEntry, PercussionMap};
use super::quantize::TickQuantizer;

/// A sounding note in raw ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteSpan {
    pub start: u64,
    /// Always greater than `start`
    pub end: u64,
    pub key: u8,
    pub velocity: u8,
    pub channel: u8,
}

impl NoteSpan {
    pub fn ticks(&self) -> u64 {
        self.end - self.start
    }
}

/// Pair note-on and note-off events into spans sorted by (start, key).
///
/// A note-on for a key that is still sounding closes the earlier note at the
/// new onset. Unmatched note-offs are ignored. Notes left open at the end,
/// and zero-length notes, last one quarter note.
pub fn pair_notes(events: &[TrackEvent], ticks_per_quarter: u64) -> Vec<NoteSpan> {
    let mut pending: HashMap<(u8, u8), (u64, u8)> = HashMap::new();
    let mut spans = Vec::new();

    let mut close = |start: u64, end: u64, key: u8, velocity: u8, channel: u8| {
        let end = if end > start { end } else { start + ticks_per_quarter };
        spans.push(NoteSpan {
            start,
            end,
            key,
            velocity,
            channel,
        });
    };

    for event in events {
        let EventKind::Channel { channel, message } = event.kind else {
            continue;
        };
        match message {
            ChannelMessage::NoteOn { key, velocity } => {
                if let Some((start, held)) = pending.insert((channel, key), (event.tick, velocity)) {
                    log::debug!("Retriggered key {} on channel {} at tick {}", key, channel, event.tick);
                    close(start, event.tick, key, held, channel);
                }
            }
            ChannelMessage::NoteOff { key, .. } => {
                if let Some((start, velocity)) = pending.remove(&(channel, key)) {
                    close(start, event.tick, key, velocity, channel);
                }
            }
            _ => {}
        }
    }

    for ((channel, key), (start, velocity)) in pending {
        log::debug!("Key {} on channel {} never released, closing after one quarter", key, channel);
        close(start, start, key, velocity, channel);
    }

    spans.sort_by_key(|span| (span.start, span.key, span.channel));
    spans
}

/// How keys become note content
#[derive(Debug, Clone, Copy)]
pub enum NoteSource<'a> {
    /// Pitched instrument, spelled from the key signature
    Pitched,
    /// Drum kit; hits softer than `ghost_threshold` get a parenthesized notehead
    Percussion {
        map: &'a PercussionMap,
        ghost_threshold: u8,
    },
}

/// One span after content and voice assignment
struct MappedSpan {
    span: NoteSpan,
    voice: u8,
    content: NoteContent,
    notehead: Option<Notehead>,
}

pub struct NoteMapper<'a> {
    quantizer: &'a TickQuantizer,
    attributes: &'a AttributesMap,
    source: NoteSource<'a>,
}

impl<'a> NoteMapper<'a> {
    pub fn new(quantizer: &'a TickQuantizer, attributes: &'a AttributesMap, source: NoteSource<'a>) -> Self {
        NoteMapper {
            quantizer,
            attributes,
            source,
        }
    }

    /// Map spans (sorted by start) to quantized notes ordered by voice, then
    /// onset. Each chord's primary note comes before its chord tones.
    pub fn map(&self, spans: &[NoteSpan], diagnostics: &mut Diagnostics) -> Vec<QuantizedNote> {
        // (voice, quantized start) → spans sharing that onset
        let mut groups: BTreeMap<(u8, u64), Vec<MappedSpan>> = BTreeMap::new();
        for span in spans {
            let mapped = self.map_span(span, diagnostics);
            let start = self.quantizer.quantize_position(span.start);
            groups.entry((mapped.voice, start)).or_default().push(mapped);
        }

        let onsets: Vec<(u8, u64)> = groups.keys().copied().collect();
        let mut notes = Vec::with_capacity(spans.len());

        for (index, ((voice, start), members)) in groups.into_iter().enumerate() {
            let next_onset = onsets
                .get(index + 1)
                .filter(|(next_voice, _)| *next_voice == voice)
                .map(|(_, tick)| *tick);

            let Some(primary) = members.first() else {
                continue;
            };
            let ticks = self.group_ticks(start, &primary.span, next_onset);
            let (value, dots) = self.quantizer.quantize_note_duration(ticks);
            let duration = self.quantizer.duration(value, dots);

            for (position, member) in members.into_iter().enumerate() {
                notes.push(QuantizedNote {
                    start,
                    ticks,
                    note: Note {
                        content: member.content,
                        duration,
                        voice,
                        staff: 1,
                        chord: position > 0,
                        tie: None,
                        notehead: member.notehead,
                        velocity: Some(member.span.velocity),
                    },
                });
            }
        }

        notes
    }

    /// Written length of a group in ticks, shortened to end at the next
    /// onset of the same voice.
    ///
    /// Spans longer than any grid value keep their snapped end; the measure
    /// slicer writes them as a tie chain.
    fn group_ticks(&self, start: u64, span: &NoteSpan, next_onset: Option<u64>) -> u64 {
        let quantizer = self.quantizer;
        let long = span.ticks() > quantizer.longest_ticks();
        let ticks = if long {
            quantizer
                .quantize_position(span.end)
                .saturating_sub(start)
                .max(quantizer.floor_ticks())
        } else {
            let (value, dots) = quantizer.quantize_note_duration(span.ticks());
            quantizer.ticks_for(value, dots)
        };

        match next_onset {
            Some(next) if start + ticks > next => {
                let space = next - start;
                if long && space > quantizer.longest_ticks() {
                    space
                } else {
                    quantizer
                        .fit_duration(space)
                        .map_or(space, |(value, dots)| quantizer.ticks_for(value, dots))
                }
            }
            _ => ticks,
        }
    }

    fn map_span(&self, span: &NoteSpan, diagnostics: &mut Diagnostics) -> MappedSpan {
        match self.source {
            NoteSource::Pitched => {
                let key = self.attributes.key_signature_at(span.start);
                MappedSpan {
                    span: *span,
                    voice: 1,
                    content: NoteContent::Pitched(Pitch::from_midi_key(span.key, key.fifths)),
                    notehead: None,
                }
            }
            NoteSource::Percussion { map, ghost_threshold } => {
                let entry = match map.lookup(span.key) {
                    Some(entry) => entry,
                    None => {
                        diagnostics.add(
                            ImportWarning::new(format!("Unmapped percussion key {}, written as snare", span.key))
                                .with_tick(span.start),
                        );
                        map.lookup_or_snare(span.key)
                    }
                };
                let ghost = span.velocity < ghost_threshold;
                MappedSpan {
                    span: *span,
                    voice: entry.voice(),
                    content: NoteContent::Unpitched(unpitched(entry)),
                    notehead: percussion_notehead(entry, ghost),
                }
            }
        }
    }
}

fn unpitched(entry: &PercussionEntry) -> Unpitched {
    Unpitched {
        display_step: entry.display_step,
        display_octave: entry.display_octave,
        instrument: entry.key,
    }
}

fn percussion_notehead(entry: &PercussionEntry, ghost: bool) -> Option<Notehead> {
    if entry.notehead == NoteheadShape::Normal && !ghost {
        return None;
    }
    Some(Notehead {
        shape: entry.notehead,
        parentheses: ghost,
    })
}
