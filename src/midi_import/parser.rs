//! Standard MIDI File parser
//!
//! Decodes the "MThd" header and each "MTrk" chunk into absolute-tick events.
//!
//! # Event framing
//!
//! ```text
//! <delta VLQ> <status?> <data...>
//!
//! 0x80-0xEF  channel message, updates running status
//! < 0x80     data byte: the previous channel status repeats (running status)
//! 0xFF       meta:  <type> <len VLQ> <payload>
//! 0xF0/0xF7  sysex: <len VLQ> <payload>
//! other      unknown, kept as a catch-all event
//! ```

use super::errors::{ImportError, Result};
use super::events::{
    ChannelMessage, Division, EventKind, MetaEvent, MidiFormat, ParsedFile, Track, TrackEvent,
};
use super::reader::ByteReader;

const HEADER_TAG: &[u8; 4] = b"MThd";
const TRACK_TAG: &[u8; 4] = b"MTrk";
const MIN_HEADER_SIZE: u32 = 6;

/// Parse a complete Standard MIDI File
pub fn parse_midi(data: &[u8]) -> Result<ParsedFile> {
    let mut reader = ByteReader::new(data);
    let (format, declared_tracks, division) = parse_header(&mut reader)?;

    let mut tracks = Vec::with_capacity(declared_tracks as usize);
    for index in 0..declared_tracks as usize {
        tracks.push(parse_track(&mut reader, index)?);
    }

    if reader.remaining() > 0 {
        log::debug!("{} trailing bytes after last track ignored", reader.remaining());
    }
    log::debug!(
        "Parsed MIDI file: format {:?}, {} tracks, division {:?}",
        format,
        tracks.len(),
        division
    );

    Ok(ParsedFile {
        format,
        declared_tracks,
        division,
        tracks,
    })
}

fn parse_header(reader: &mut ByteReader) -> Result<(MidiFormat, u16, Division)> {
    let tag = reader
        .read_bytes(4)
        .map_err(|_| ImportError::MalformedHeader("missing MThd tag".to_string()))?;
    if tag != HEADER_TAG {
        return Err(ImportError::MalformedHeader(format!(
            "expected MThd tag, found {:?}",
            String::from_utf8_lossy(tag)
        )));
    }

    let truncated = |_| ImportError::MalformedHeader("truncated header chunk".to_string());
    let size = reader.read_u32().map_err(truncated)?;
    if size < MIN_HEADER_SIZE {
        return Err(ImportError::MalformedHeader(format!(
            "header size {} is smaller than {}",
            size, MIN_HEADER_SIZE
        )));
    }

    let format = match reader.read_u16().map_err(truncated)? {
        0 => MidiFormat::SingleTrack,
        1 => MidiFormat::MultiTrack,
        other => return Err(ImportError::UnsupportedFormat(other)),
    };
    let declared_tracks = reader.read_u16().map_err(truncated)?;
    let raw_division = reader
        .read_u16()
        .map_err(|_| ImportError::MalformedHeader("unreadable division field".to_string()))?;

    let division = if raw_division & 0x8000 == 0 {
        Division::TicksPerQuarter(raw_division & 0x7FFF)
    } else {
        let [fps, ticks_per_frame] = raw_division.to_be_bytes();
        Division::Smpte {
            frames_per_second: fps as i8,
            ticks_per_frame,
        }
    };

    reader.skip((size - MIN_HEADER_SIZE) as usize)?;

    Ok((format, declared_tracks, division))
}

fn parse_track(reader: &mut ByteReader, index: usize) -> Result<Track> {
    let chunk_start = reader.position();
    let tag = reader.read_bytes(4).map_err(|_| ImportError::MalformedTrack {
        index,
        position: chunk_start,
    })?;
    if tag != TRACK_TAG {
        return Err(ImportError::MalformedTrack {
            index,
            position: chunk_start,
        });
    }

    let size = reader.read_u32()? as usize;
    let declared_end = reader.position().saturating_add(size);
    let chunk_end = declared_end.min(reader.len());
    if chunk_end < declared_end {
        log::warn!(
            "Track {} declares {} bytes but only {} remain",
            index,
            size,
            reader.remaining()
        );
    }

    let mut events = Vec::new();
    let mut tick: u64 = 0;
    let mut running_status: Option<u8> = None;
    let mut ended = false;

    while reader.position() < chunk_end {
        tick += u64::from(reader.read_vlq()?);
        let kind = parse_event(reader, &mut running_status)?;
        ended = matches!(kind, EventKind::Meta(MetaEvent::EndOfTrack));
        events.push(TrackEvent { tick, kind });
        if ended {
            break;
        }
    }
    reader.seek_to(chunk_end);

    if !ended {
        log::debug!("Track {} has no end-of-track event", index);
        events.push(TrackEvent {
            tick,
            kind: EventKind::Meta(MetaEvent::EndOfTrack),
        });
    }

    Ok(Track { events })
}

/// Parse one event after its delta time.
///
/// `running_status` holds the last channel status byte of the current track.
fn parse_event(reader: &mut ByteReader, running_status: &mut Option<u8>) -> Result<EventKind> {
    let lead = reader.read_u8()?;
    let (status, first_data) = if lead >= 0x80 {
        (lead, None)
    } else {
        match *running_status {
            Some(status) => (status, Some(lead)),
            None => return Ok(EventKind::Unknown { status: lead }),
        }
    };

    match status {
        0xFF => {
            let kind = reader.read_u8()?;
            let len = reader.read_vlq()? as usize;
            let data = reader.read_bytes(len)?;
            Ok(EventKind::Meta(MetaEvent::decode(kind, data)))
        }
        0xF0 | 0xF7 => {
            let len = reader.read_vlq()? as usize;
            Ok(EventKind::SysEx(reader.read_bytes(len)?.to_vec()))
        }
        0x80..=0xEF => {
            *running_status = Some(status);
            let channel = status & 0x0F;
            let first = match first_data {
                Some(byte) => byte,
                None => reader.read_u8()?,
            } & 0x7F;
            let message = parse_channel_message(reader, status >> 4, first)?;
            Ok(EventKind::Channel { channel, message })
        }
        _ => Ok(EventKind::Unknown { status }),
    }
}

fn parse_channel_message(reader: &mut ByteReader, kind: u8, first: u8) -> Result<ChannelMessage> {
    let mut second = || reader.read_u8().map(|b| b & 0x7F);
    Ok(match kind {
        0x8 => ChannelMessage::NoteOff {
            key: first,
            velocity: second()?,
        },
        0x9 => match second()? {
            0 => ChannelMessage::NoteOff {
                key: first,
                velocity: 0,
            },
            velocity => ChannelMessage::NoteOn {
                key: first,
                velocity,
            },
        },
        0xA => ChannelMessage::PolyAftertouch {
            key: first,
            pressure: second()?,
        },
        0xB => ChannelMessage::ControlChange {
            controller: first,
            value: second()?,
        },
        0xC => ChannelMessage::ProgramChange { program: first },
        0xD => ChannelMessage::ChannelAftertouch { pressure: first },
        _ => ChannelMessage::PitchBend {
            value: u16::from(first) | (u16::from(second()?) << 7),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a file from a header and raw track payloads
    fn smf(format: u16, division: u16, tracks: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"MThd");
        out.extend_from_slice(&6u32.to_be_bytes());
        out.extend_from_slice(&format.to_be_bytes());
        out.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
        out.extend_from_slice(&division.to_be_bytes());
        for track in tracks {
            out.extend_from_slice(b"MTrk");
            out.extend_from_slice(&(track.len() as u32).to_be_bytes());
            out.extend_from_slice(track);
        }
        out
    }

    fn channel_messages(track: &Track) -> Vec<(u64, ChannelMessage)> {
        track
            .events
            .iter()
            .filter_map(|e| match e.kind {
                EventKind::Channel { message, .. } => Some((e.tick, message)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_running_status_note_ons() {
        let track = [0x00, 0x90, 60, 100, 0x00, 62, 100, 0x00, 64, 100, 0x00, 0xFF, 0x2F, 0x00];
        let file = parse_midi(&smf(0, 480, &[&track])).unwrap();

        let messages = channel_messages(&file.tracks[0]);
        assert_eq!(messages.len(), 3);
        for ((_, message), key) in messages.iter().zip([60, 62, 64]) {
            assert_eq!(*message, ChannelMessage::NoteOn { key, velocity: 100 });
        }
        assert_eq!(file.tracks[0].events.len(), 4);
    }

    #[test]
    fn test_velocity_zero_becomes_note_off() {
        let track = [0x00, 0x90, 60, 100, 0x83, 0x60, 60, 0, 0x00, 0xFF, 0x2F, 0x00];
        let file = parse_midi(&smf(0, 480, &[&track])).unwrap();

        let messages = channel_messages(&file.tracks[0]);
        assert_eq!(messages[1], (480, ChannelMessage::NoteOff { key: 60, velocity: 0 }));
    }

    #[test]
    fn test_header_fields() {
        let file = parse_midi(&smf(1, 960, &[&[0x00, 0xFF, 0x2F, 0x00]])).unwrap();
        assert_eq!(file.format, MidiFormat::MultiTrack);
        assert_eq!(file.declared_tracks, 1);
        assert_eq!(file.division, Division::TicksPerQuarter(960));
        assert_eq!(file.ticks_per_quarter(), Some(960));
    }

    #[test]
    fn test_smpte_division_is_recognised() {
        let file = parse_midi(&smf(0, 0xE728, &[&[0x00, 0xFF, 0x2F, 0x00]])).unwrap();
        assert_eq!(
            file.division,
            Division::Smpte { frames_per_second: -25, ticks_per_frame: 40 }
        );
        assert_eq!(file.ticks_per_quarter(), None);
    }

    #[test]
    fn test_unsupported_format() {
        let err = parse_midi(&smf(2, 480, &[])).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(2)));
    }

    #[test]
    fn test_malformed_header() {
        assert!(matches!(parse_midi(b"MTh"), Err(ImportError::MalformedHeader(_))));
        assert!(matches!(parse_midi(b"RIFF\0\0\0\x06"), Err(ImportError::MalformedHeader(_))));

        let mut short = b"MThd".to_vec();
        short.extend_from_slice(&4u32.to_be_bytes());
        short.extend_from_slice(&[0, 0, 0, 1]);
        assert!(matches!(parse_midi(&short), Err(ImportError::MalformedHeader(_))));
    }

    #[test]
    fn test_extra_header_bytes_are_skipped() {
        let mut data = b"MThd".to_vec();
        data.extend_from_slice(&8u32.to_be_bytes());
        data.extend_from_slice(&[0, 0, 0, 1, 0x01, 0xE0, 0xAB, 0xCD]);
        data.extend_from_slice(b"MTrk");
        data.extend_from_slice(&4u32.to_be_bytes());
        data.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

        let file = parse_midi(&data).unwrap();
        assert_eq!(file.tracks.len(), 1);
        assert_eq!(file.division, Division::TicksPerQuarter(480));
    }

    #[test]
    fn test_missing_track_tag() {
        let mut data = smf(0, 480, &[]);
        data[10..12].copy_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(b"XTrk\0\0\0\0");
        assert!(matches!(
            parse_midi(&data),
            Err(ImportError::MalformedTrack { index: 0, position: 14 })
        ));
    }

    #[test]
    fn test_truncated_event_is_unexpected_eof() {
        let mut data = smf(0, 480, &[&[0x00, 0x90, 60]]);
        // Declare a longer chunk than the buffer holds
        data[18..22].copy_from_slice(&10u32.to_be_bytes());
        assert!(matches!(parse_midi(&data), Err(ImportError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_end_of_track_stops_parsing_and_skips_to_chunk_end() {
        let first = [0x00, 0xFF, 0x2F, 0x00, 0x00, 0x90, 60, 100];
        let second = [0x00, 0xC0, 5, 0x00, 0xFF, 0x2F, 0x00];
        let file = parse_midi(&smf(1, 480, &[&first, &second])).unwrap();

        assert_eq!(file.tracks[0].events.len(), 1);
        assert_eq!(
            channel_messages(&file.tracks[1]),
            vec![(0, ChannelMessage::ProgramChange { program: 5 })]
        );
    }

    #[test]
    fn test_missing_end_of_track_is_synthesised() {
        let file = parse_midi(&smf(0, 480, &[&[0x00, 0x90, 60, 100, 0x60, 0x80, 60, 0]])).unwrap();
        let last = file.tracks[0].events.last().unwrap();
        assert_eq!(last.tick, 96);
        assert_eq!(last.kind, EventKind::Meta(MetaEvent::EndOfTrack));
    }

    #[test]
    fn test_pitch_bend_and_short_messages() {
        let track = [
            0x00, 0xE1, 0x00, 0x40, // centre bend
            0x00, 0xD1, 0x33, // channel aftertouch
            0x00, 0xB1, 7, 100, // volume
            0x00, 0xA1, 60, 20, // poly aftertouch
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let file = parse_midi(&smf(0, 480, &[&track])).unwrap();
        let messages: Vec<_> = channel_messages(&file.tracks[0]).into_iter().map(|(_, m)| m).collect();
        assert_eq!(
            messages,
            vec![
                ChannelMessage::PitchBend { value: 8192 },
                ChannelMessage::ChannelAftertouch { pressure: 0x33 },
                ChannelMessage::ControlChange { controller: 7, value: 100 },
                ChannelMessage::PolyAftertouch { key: 60, pressure: 20 },
            ]
        );
    }

    #[test]
    fn test_sysex_meta_and_unknown_status() {
        let track = [
            0x00, 0xF0, 0x03, 0x7E, 0x7F, 0xF7, // sysex
            0x00, 0xF8, // timing clock: unknown
            0x00, 0xFF, 0x7F, 0x02, 0x00, 0x41, // sequencer specific
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let file = parse_midi(&smf(0, 480, &[&track])).unwrap();
        let kinds: Vec<_> = file.tracks[0].events.iter().map(|e| e.kind.clone()).collect();
        assert_eq!(kinds[0], EventKind::SysEx(vec![0x7E, 0x7F, 0xF7]));
        assert_eq!(kinds[1], EventKind::Unknown { status: 0xF8 });
        assert_eq!(
            kinds[2],
            EventKind::Meta(MetaEvent::Unknown { kind: 0x7F, data: vec![0x00, 0x41] })
        );
    }

    #[test]
    fn test_data_byte_without_running_status_is_unknown() {
        let file = parse_midi(&smf(0, 480, &[&[0x00, 0x3C, 0x00, 0xFF, 0x2F, 0x00]])).unwrap();
        assert_eq!(file.tracks[0].events[0].kind, EventKind::Unknown { status: 0x3C });
    }

    #[test]
    fn test_ticks_accumulate() {
        let track = [0x00, 0x90, 60, 100, 0x81, 0x00, 0x80, 60, 0, 0x10, 0xFF, 0x2F, 0x00];
        let file = parse_midi(&smf(0, 480, &[&track])).unwrap();
        let ticks: Vec<u64> = file.tracks[0].events.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![0, 128, 144]);
    }
}
