//! Grouping of channel events into logical instruments
//!
//! # Modes
//!
//! - **Format 0 / format 1 merged**: events of all tracks are pooled and split
//!   by channel; track names are attached to the channel each track mostly plays.
//! - **Format 1 split**: every track with notes becomes its own group on its
//!   dominant channel.

use std::collections::BTreeMap;

use crate::diagnostics::{Diagnostics, ImportWarning};

use super::defaults::fallback_group_name;
use super::events::{
    dominant_channel, ChannelMessage, EventKind, MidiFormat, ParsedFile, TrackEvent,
    PERCUSSION_CHANNEL,
};
use super::instruments::gm_program_name;

/// Events of one logical instrument
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelGroup {
    pub channel: u8,
    pub is_percussion: bool,
    pub name: String,
    /// First program change (0-based GM program)
    pub program: Option<u8>,
    /// Source track when the group was built from a single track
    pub track: Option<usize>,
    /// Channel events, tick-sorted
    pub events: Vec<TrackEvent>,
}

impl ChannelGroup {
    fn new(channel: u8, track: Option<usize>, events: Vec<TrackEvent>) -> Self {
        let program = events.iter().find_map(|e| match e.kind {
            EventKind::Channel {
                message: ChannelMessage::ProgramChange { program },
                ..
            } => Some(program),
            _ => None,
        });
        ChannelGroup {
            channel,
            is_percussion: channel == PERCUSSION_CHANNEL,
            name: String::new(),
            program,
            track,
            events,
        }
    }

    pub fn note_on_count(&self) -> usize {
        self.events.iter().filter(|e| e.kind.is_note_on()).count()
    }

    /// Name priority: track name, then GM program, then a channel fallback
    fn resolve_name(&mut self, track_name: Option<&str>) {
        self.name = match track_name {
            Some(name) => name.to_string(),
            None => self
                .program
                .filter(|_| !self.is_percussion)
                .and_then(gm_program_name)
                .map(str::to_string)
                .unwrap_or_else(|| fallback_group_name(self.channel)),
        };
    }
}

/// Builds channel groups from a parsed file
#[derive(Debug, Clone, Copy)]
pub struct TrackMapper {
    merge_tracks: bool,
}

impl TrackMapper {
    pub fn new(merge_tracks: bool) -> Self {
        TrackMapper { merge_tracks }
    }

    /// Group the file's events. Groups without note-ons are dropped.
    pub fn map(&self, file: &ParsedFile, diagnostics: &mut Diagnostics) -> Vec<ChannelGroup> {
        let groups = if file.format == MidiFormat::MultiTrack && !self.merge_tracks {
            self.group_per_track(file, diagnostics)
        } else {
            self.group_by_channel(file)
        };
        log::debug!(
            "Track mapping produced {} groups: {:?}",
            groups.len(),
            groups.iter().map(|g| g.name.as_str()).collect::<Vec<_>>()
        );
        groups
    }

    fn group_by_channel(&self, file: &ParsedFile) -> Vec<ChannelGroup> {
        // Stable pool: by tick, then by track order
        let mut pooled: Vec<&TrackEvent> = file
            .tracks
            .iter()
            .flat_map(|track| track.events.iter())
            .filter(|e| e.kind.channel().is_some())
            .collect();
        pooled.sort_by_key(|e| e.tick);

        let mut by_channel: BTreeMap<u8, Vec<TrackEvent>> = BTreeMap::new();
        for event in pooled {
            if let Some(channel) = event.kind.channel() {
                by_channel.entry(channel).or_default().push(event.clone());
            }
        }

        // First name found for each channel, in track order
        let mut names: BTreeMap<u8, &str> = BTreeMap::new();
        for track in &file.tracks {
            if let (Some(name), Some(channel)) = (track.name(), track.dominant_channel()) {
                names.entry(channel).or_insert(name);
            }
        }

        by_channel
            .into_iter()
            .map(|(channel, events)| {
                let mut group = ChannelGroup::new(channel, None, events);
                group.resolve_name(names.get(&channel).copied());
                group
            })
            .filter(|group| {
                let keep = group.note_on_count() > 0;
                if !keep {
                    log::debug!("Dropping channel {} without notes", group.channel + 1);
                }
                keep
            })
            .collect()
    }

    fn group_per_track(&self, file: &ParsedFile, diagnostics: &mut Diagnostics) -> Vec<ChannelGroup> {
        let mut groups = Vec::new();
        for (index, track) in file.tracks.iter().enumerate() {
            let events: Vec<TrackEvent> = track
                .events
                .iter()
                .filter(|e| e.kind.channel().is_some())
                .cloned()
                .collect();
            let Some(channel) = dominant_channel(&events) else {
                // Meta-only (conductor) tracks are expected to be note-free
                if !events.is_empty() {
                    diagnostics.add(ImportWarning::new("Track has no notes and was skipped").with_track(index));
                }
                continue;
            };
            let mut group = ChannelGroup::new(channel, Some(index), events);
            group.resolve_name(track.name());
            groups.push(group);
        }
        groups
    }
}
