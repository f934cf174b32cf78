//! Tempo, time-signature and key-signature timelines
//!
//! Built once from the meta events of every track (so a conductor track
//! applies to all instruments). Each timeline always has an entry at tick 0.

use crate::diagnostics::{Diagnostics, ImportWarning};
use crate::ir::{KeyMode, KeySignature, TimeSignature};

use super::defaults::DEFAULT_TEMPO_BPM;
use super::events::{EventKind, MetaEvent, ParsedFile};

/// Largest accepted time-signature denominator power (2^6 = 64)
const MAX_DENOMINATOR_POWER: u8 = 6;

/// Tick-sorted values with an entry at tick 0
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline<T> {
    entries: Vec<(u64, T)>,
    /// The tick-0 entry was filled in with the default
    defaulted: bool,
}

impl<T: Clone> Timeline<T> {
    /// Sort by tick (stable), keep the last value written at each tick and
    /// insert `default` at tick 0 when the events do not cover it.
    pub fn from_events(mut events: Vec<(u64, T)>, default: T) -> Self {
        events.sort_by_key(|(tick, _)| *tick);

        let mut entries: Vec<(u64, T)> = Vec::with_capacity(events.len() + 1);
        for (tick, value) in events {
            match entries.last_mut() {
                Some(last) if last.0 == tick => last.1 = value,
                _ => entries.push((tick, value)),
            }
        }

        let defaulted = entries.first().map_or(true, |(tick, _)| *tick != 0);
        if defaulted {
            entries.insert(0, (0, default));
        }

        Timeline { entries, defaulted }
    }

    /// Value active at `tick`: the last entry at or before it
    pub fn value_at(&self, tick: u64) -> &T {
        let mut active = &self.entries[0].1;
        for (entry_tick, value) in &self.entries {
            if *entry_tick > tick {
                break;
            }
            active = value;
        }
        active
    }

    pub fn entries(&self) -> &[(u64, T)] {
        &self.entries
    }

    /// Entries that came from the file (excludes a defaulted tick-0 entry)
    pub fn explicit_entries(&self) -> &[(u64, T)] {
        if self.defaulted {
            &self.entries[1..]
        } else {
            &self.entries
        }
    }
}

/// The three attribute timelines of a file
#[derive(Debug, Clone, PartialEq)]
pub struct AttributesMap {
    /// Quarter notes per minute
    pub tempo: Timeline<f64>,
    pub time_signature: Timeline<TimeSignature>,
    pub key_signature: Timeline<KeySignature>,
}

impl AttributesMap {
    pub fn build(file: &ParsedFile, diagnostics: &mut Diagnostics) -> Self {
        let mut tempos = Vec::new();
        let mut time_signatures = Vec::new();
        let mut key_signatures = Vec::new();

        for (index, track) in file.tracks.iter().enumerate() {
            for event in &track.events {
                let EventKind::Meta(meta) = &event.kind else {
                    continue;
                };
                match *meta {
                    MetaEvent::Tempo(0) => diagnostics.add(
                        ImportWarning::new("Ignoring tempo of 0 microseconds per quarter")
                            .with_track(index)
                            .with_tick(event.tick),
                    ),
                    MetaEvent::Tempo(micros) => {
                        tempos.push((event.tick, 60_000_000.0 / f64::from(micros)));
                    }
                    MetaEvent::TimeSignature {
                        numerator,
                        denominator_power,
                        ..
                    } => {
                        if numerator == 0 || denominator_power > MAX_DENOMINATOR_POWER {
                            diagnostics.add(
                                ImportWarning::new(format!(
                                    "Ignoring invalid time signature {}/2^{}",
                                    numerator, denominator_power
                                ))
                                .with_track(index)
                                .with_tick(event.tick),
                            );
                            continue;
                        }
                        time_signatures.push((
                            event.tick,
                            TimeSignature {
                                numerator,
                                denominator: 1 << denominator_power,
                            },
                        ));
                    }
                    MetaEvent::KeySignature { fifths, minor } => {
                        key_signatures.push((
                            event.tick,
                            KeySignature {
                                fifths: fifths.clamp(-7, 7),
                                mode: if minor { KeyMode::Minor } else { KeyMode::Major },
                            },
                        ));
                    }
                    _ => {}
                }
            }
        }

        let map = AttributesMap {
            tempo: Timeline::from_events(tempos, DEFAULT_TEMPO_BPM),
            time_signature: Timeline::from_events(time_signatures, TimeSignature::default()),
            key_signature: Timeline::from_events(key_signatures, KeySignature::default()),
        };
        log::debug!(
            "Attributes: {} tempo, {} time signature, {} key signature entries",
            map.tempo.entries().len(),
            map.time_signature.entries().len(),
            map.key_signature.entries().len()
        );
        map
    }

    pub fn tempo_at(&self, tick: u64) -> f64 {
        *self.tempo.value_at(tick)
    }

    pub fn time_signature_at(&self, tick: u64) -> TimeSignature {
        *self.time_signature.value_at(tick)
    }

    pub fn key_signature_at(&self, tick: u64) -> KeySignature {
        *self.key_signature.value_at(tick)
    }

    /// The time signature at `tick` differs from the one at `previous`
    pub fn time_signature_changed(&self, previous: u64, tick: u64) -> bool {
        self.time_signature_at(previous) != self.time_signature_at(tick)
    }

    /// The key signature at `tick` differs from the one at `previous`
    pub fn key_signature_changed(&self, previous: u64, tick: u64) -> bool {
        self.key_signature_at(previous) != self.key_signature_at(tick)
    }
}
