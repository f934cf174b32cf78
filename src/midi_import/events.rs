//! Parsed Standard MIDI File representation
//!
//! Produced once by the parser and read by every later stage. Events carry
//! absolute ticks; delta times do not survive parsing.

use std::collections::BTreeMap;

/// Percussion channel index (MIDI channel 10)
pub const PERCUSSION_CHANNEL: u8 = 9;

/// SMF format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiFormat {
    /// Format 0: one multi-channel track
    SingleTrack,
    /// Format 1: simultaneous tracks sharing one tempo map
    MultiTrack,
}

/// Header time division
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Division {
    TicksPerQuarter(u16),
    Smpte {
        /// Negative frames per second as stored in the file (-24, -25, -29, -30)
        frames_per_second: i8,
        ticks_per_frame: u8,
    },
}

/// A fully parsed MIDI file
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    pub format: MidiFormat,
    /// Track count declared by the header
    pub declared_tracks: u16,
    pub division: Division,
    pub tracks: Vec<Track>,
}

impl ParsedFile {
    /// Ticks per quarter note, or None for SMPTE timing
    pub fn ticks_per_quarter(&self) -> Option<u16> {
        match self.division {
            Division::TicksPerQuarter(tpq) => Some(tpq),
            Division::Smpte { .. } => None,
        }
    }
}

/// One track chunk: events sorted by absolute tick, ending with `EndOfTrack`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    pub events: Vec<TrackEvent>,
}

impl Track {
    /// First track-name meta event, if any
    pub fn name(&self) -> Option<&str> {
        self.events.iter().find_map(|e| match &e.kind {
            EventKind::Meta(MetaEvent::TrackName(name)) if !name.trim().is_empty() => {
                Some(name.trim())
            }
            _ => None,
        })
    }

    pub fn note_on_count(&self) -> usize {
        self.events.iter().filter(|e| e.kind.is_note_on()).count()
    }

    /// Channel with the most note-on events (lowest channel wins a tie)
    pub fn dominant_channel(&self) -> Option<u8> {
        dominant_channel(&self.events)
    }
}

/// Channel with the most note-on events among `events`
pub fn dominant_channel(events: &[TrackEvent]) -> Option<u8> {
    let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
    for event in events {
        if let EventKind::Channel { channel, message: ChannelMessage::NoteOn { .. } } = event.kind {
            *counts.entry(channel).or_default() += 1;
        }
    }
    let max = counts.values().copied().max()?;
    counts
        .into_iter()
        .find(|(_, count)| *count == max)
        .map(|(channel, _)| channel)
}

/// An event at an absolute tick
#[derive(Debug, Clone, PartialEq)]
pub struct TrackEvent {
    pub tick: u64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Channel { channel: u8, message: ChannelMessage },
    Meta(MetaEvent),
    SysEx(Vec<u8>),
    /// Status byte that could not be dispatched (system common/real-time,
    /// or a data byte with no running status)
    Unknown { status: u8 },
}

impl EventKind {
    pub fn is_note_on(&self) -> bool {
        matches!(
            self,
            EventKind::Channel {
                message: ChannelMessage::NoteOn { .. },
                ..
            }
        )
    }

    pub fn channel(&self) -> Option<u8> {
        match self {
            EventKind::Channel { channel, .. } => Some(*channel),
            _ => None,
        }
    }
}

/// Channel voice message. Data bytes are 7-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMessage {
    NoteOff { key: u8, velocity: u8 },
    /// Always has velocity > 0; velocity 0 is parsed as `NoteOff`
    NoteOn { key: u8, velocity: u8 },
    PolyAftertouch { key: u8, pressure: u8 },
    ControlChange { controller: u8, value: u8 },
    ProgramChange { program: u8 },
    ChannelAftertouch { pressure: u8 },
    /// 14-bit value, 8192 = centre
    PitchBend { value: u16 },
}

/// Text meta event categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Text,
    Copyright,
    InstrumentName,
    Lyric,
    Marker,
    CuePoint,
    ProgramName,
    DeviceName,
}

impl TextKind {
    fn from_meta_type(kind: u8) -> Option<Self> {
        Some(match kind {
            0x01 => TextKind::Text,
            0x02 => TextKind::Copyright,
            0x04 => TextKind::InstrumentName,
            0x05 => TextKind::Lyric,
            0x06 => TextKind::Marker,
            0x07 => TextKind::CuePoint,
            0x08 => TextKind::ProgramName,
            0x09 => TextKind::DeviceName,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetaEvent {
    SequenceNumber(Option<u16>),
    Text { kind: TextKind, text: String },
    TrackName(String),
    ChannelPrefix(u8),
    EndOfTrack,
    /// Microseconds per quarter note
    Tempo(u32),
    TimeSignature {
        numerator: u8,
        /// Denominator as a power of two (2 → quarter)
        denominator_power: u8,
        clocks_per_click: u8,
        thirty_seconds_per_quarter: u8,
    },
    KeySignature { fifths: i8, minor: bool },
    /// Unrecognised type, or a known type with an unexpected payload size
    Unknown { kind: u8, data: Vec<u8> },
}

impl MetaEvent {
    /// Decode a meta payload. Never fails: malformed payloads become `Unknown`.
    pub fn decode(kind: u8, data: &[u8]) -> Self {
        let text = || String::from_utf8_lossy(data).into_owned();
        match (kind, data.len()) {
            (0x00, 0) => MetaEvent::SequenceNumber(None),
            (0x00, 2) => MetaEvent::SequenceNumber(Some(u16::from_be_bytes([data[0], data[1]]))),
            (0x03, _) => MetaEvent::TrackName(text()),
            (0x20, 1) => MetaEvent::ChannelPrefix(data[0] & 0x0F),
            (0x2F, _) => MetaEvent::EndOfTrack,
            (0x51, 3) => MetaEvent::Tempo(
                (u32::from(data[0]) << 16) | (u32::from(data[1]) << 8) | u32::from(data[2]),
            ),
            (0x58, 4) => MetaEvent::TimeSignature {
                numerator: data[0],
                denominator_power: data[1],
                clocks_per_click: data[2],
                thirty_seconds_per_quarter: data[3],
            },
            (0x59, 2) => MetaEvent::KeySignature {
                fifths: data[0] as i8,
                minor: data[1] == 1,
            },
            _ => match TextKind::from_meta_type(kind) {
                Some(text_kind) => MetaEvent::Text {
                    kind: text_kind,
                    text: text(),
                },
                None => MetaEvent::Unknown {
                    kind,
                    data: data.to_vec(),
                },
            },
        }
    }
}
