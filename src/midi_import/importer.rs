//! Import orchestration: bytes → parsed file → parts → measures → score

use std::fs;
use std::path::Path;

use crate::diagnostics::{Diagnostics, ImportWarning};
use crate::ir::{
    measurize_parts, Clef, Measure, MidiInstrument, Part, PartNotes, Score, ScoreMetadata,
};

use super::attributes::AttributesMap;
use super::defaults::{software_tag, BASS_CLEF_THRESHOLD};
use super::errors::{ImportError, Result};
use super::events::{EventKind, MetaEvent, MidiFormat, ParsedFile, TextKind};
use super::notes::{pair_notes, NoteMapper, NoteSource, NoteSpan};
use super::parser::parse_midi;
use super::quantize::TickQuantizer;
use super::tracks::{ChannelGroup, TrackMapper};
use super::types::{ImportOutcome, ImportSettings};

/// Converts Standard MIDI Files into scores.
///
/// Holds its settings and the warnings of the most recent import.
#[derive(Debug, Clone, Default)]
pub struct MidiImporter {
    settings: ImportSettings,
    diagnostics: Diagnostics,
}

impl MidiImporter {
    pub fn new(settings: ImportSettings) -> Self {
        Self {
            settings,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Warnings of the last import call
    pub fn warnings(&self) -> &[ImportWarning] {
        self.diagnostics.as_slice()
    }

    /// Read and import a file from disk
    pub fn import_file(&mut self, path: impl AsRef<Path>) -> Result<Score> {
        let path = path.as_ref();
        self.diagnostics.clear();
        let data = fs::read(path).map_err(|source| ImportError::SourceUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        self.import_bytes(&data)
    }

    /// Import an in-memory file and return the score together with its warnings
    pub fn import_with_warnings(&mut self, data: &[u8]) -> Result<ImportOutcome> {
        let score = self.import_bytes(data)?;
        Ok(ImportOutcome {
            score,
            warnings: self.warnings().to_vec(),
        })
    }

    /// Import an in-memory file
    pub fn import_bytes(&mut self, data: &[u8]) -> Result<Score> {
        self.diagnostics.clear();

        let file = parse_midi(data)?;
        if file.tracks.is_empty() {
            return Err(ImportError::NoTracks);
        }
        let ticks_per_quarter = file
            .ticks_per_quarter()
            .ok_or(ImportError::UnsupportedTimeDivision)?;

        let attributes = AttributesMap::build(&file, &mut self.diagnostics);
        let shortest_beat = attributes
            .time_signature
            .entries()
            .iter()
            .map(|(_, time)| time.denominator)
            .max()
            .unwrap_or(4);
        let quantizer = TickQuantizer::new(ticks_per_quarter, self.settings.resolution)
            .with_meter_denominator(shortest_beat);
        let groups = TrackMapper::new(self.settings.merge_tracks).map(&file, &mut self.diagnostics);
        if groups.is_empty() {
            return Err(ImportError::NoNotes);
        }

        let mut kept: Vec<&ChannelGroup> = Vec::new();
        let mut part_notes: Vec<PartNotes> = Vec::new();
        for group in &groups {
            let spans = pair_notes(&group.events, quantizer.ticks_per_quarter());
            if spans.is_empty() {
                let mut warning = ImportWarning::new(format!("No playable notes in '{}'", group.name));
                if let Some(track) = group.track {
                    warning = warning.with_track(track);
                }
                self.diagnostics.add(warning);
                continue;
            }

            let source = if group.is_percussion {
                NoteSource::Percussion {
                    map: self.settings.percussion_kit.map(),
                    ghost_threshold: self.settings.ghost_note_threshold,
                }
            } else {
                NoteSource::Pitched
            };
            let notes = NoteMapper::new(&quantizer, &attributes, source).map(&spans, &mut self.diagnostics);
            part_notes.push(PartNotes {
                clef: choose_clef(group.is_percussion, &spans),
                notes,
            });
            kept.push(group);
        }
        if kept.is_empty() {
            return Err(ImportError::NoNotes);
        }

        let measures = measurize_parts(&part_notes, &quantizer, &attributes, self.settings.import_tempo);
        let parts: Vec<Part> = kept
            .into_iter()
            .zip(measures)
            .enumerate()
            .map(|(index, (group, measures))| self.build_part(index, group, measures))
            .collect();

        let score = Score {
            metadata: score_metadata(&file),
            parts,
        };
        log::info!(
            "Imported MIDI file: {} parts, {} measures, {} warnings",
            score.parts.len(),
            score.parts.first().map_or(0, |p| p.measures.len()),
            self.diagnostics.len()
        );
        Ok(score)
    }

    fn build_part(&self, index: usize, group: &ChannelGroup, measures: Vec<Measure>) -> Part {
        let id = format!("P{}", index + 1);
        let instrument = |program: u8| MidiInstrument {
            id: format!("{}-I1", id),
            channel: group.channel + 1,
            program,
            name: group.name.clone(),
        };
        let instruments = if group.is_percussion {
            vec![instrument(0)]
        } else {
            group.program.map(instrument).into_iter().collect()
        };

        Part {
            id: id.clone(),
            name: group.name.clone(),
            is_percussion: group.is_percussion,
            instruments,
            percussion_map: group.is_percussion.then_some(self.settings.percussion_kit),
            measures,
        }
    }
}

/// Percussion clef for drums; bass clef when the part sits low
fn choose_clef(is_percussion: bool, spans: &[NoteSpan]) -> Clef {
    if is_percussion {
        return Clef::Percussion;
    }
    let mean = spans.iter().map(|s| f64::from(s.key)).sum::<f64>() / spans.len().max(1) as f64;
    if mean < BASS_CLEF_THRESHOLD {
        Clef::Bass
    } else {
        Clef::Treble
    }
}

fn score_metadata(file: &ParsedFile) -> ScoreMetadata {
    let title = match file.tracks.first() {
        Some(conductor) if file.format == MidiFormat::MultiTrack && conductor.note_on_count() == 0 => {
            conductor.name().map(str::to_string)
        }
        _ => None,
    };
    let copyright = file
        .tracks
        .iter()
        .flat_map(|track| track.events.iter())
        .find_map(|event| match &event.kind {
            EventKind::Meta(MetaEvent::Text {
                kind: TextKind::Copyright,
                text,
            }) => Some(text.trim().to_string()),
            _ => None,
        });

    ScoreMetadata {
        software: software_tag(),
        title,
        copyright,
    }
}
