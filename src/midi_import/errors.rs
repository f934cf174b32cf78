//! Error types for MIDI import
//!
//! Every variant is fatal to the current import call. Recoverable problems
//! (unmatched note-offs, empty tracks, unknown events) never surface here;
//! they are represented in the parsed data or reported as warnings.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal MIDI import error
#[derive(Debug, Error)]
pub enum ImportError {
    /// Missing or short "MThd" tag, header size below 6, or unreadable fields
    #[error("Malformed MIDI header: {0}")]
    MalformedHeader(String),

    /// Header format other than 0 or 1
    #[error("Unsupported MIDI format: {0}")]
    UnsupportedFormat(u16),

    /// A read ran past the end of the input
    #[error("Unexpected end of input at byte {position}")]
    UnexpectedEof { position: usize },

    /// Missing or short "MTrk" tag
    #[error("Malformed track chunk {index} at byte {position}")]
    MalformedTrack { index: usize, position: usize },

    /// The file contains no track chunks
    #[error("MIDI file contains no tracks")]
    NoTracks,

    /// SMPTE time division
    #[error("Unsupported time division: SMPTE timing is not supported")]
    UnsupportedTimeDivision,

    /// No channel group produced any note
    #[error("MIDI file contains no notes")]
    NoNotes,

    /// The byte source could not be read
    #[error("Could not read {}: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ImportError::UnexpectedEof { position: 14 }.to_string(),
            "Unexpected end of input at byte 14"
        );
        assert_eq!(ImportError::NoNotes.to_string(), "MIDI file contains no notes");
        assert_eq!(
            ImportError::UnsupportedFormat(2).to_string(),
            "Unsupported MIDI format: 2"
        );
    }

    #[test]
    fn test_source_unreadable_keeps_path() {
        let err = ImportError::SourceUnreadable {
            path: PathBuf::from("missing.mid"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("missing.mid"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
