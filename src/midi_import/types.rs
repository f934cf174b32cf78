//! Public API types for MIDI import

use serde::{Deserialize, Serialize};

use crate::diagnostics::ImportWarning;
use crate::ir::{NoteValue, PercussionKit, Score};

use super::defaults::{DEFAULT_GHOST_NOTE_THRESHOLD, DEFAULT_RESOLUTION};

/// Configuration options for an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Shortest note value on the quantization grid
    pub resolution: NoteValue,

    /// Drum kit layout for percussion parts
    pub percussion_kit: PercussionKit,

    /// Format 1 only: pool all tracks and split by channel (true) or make
    /// one part per track (false)
    pub merge_tracks: bool,

    /// Percussion hits below this velocity become ghost notes
    pub ghost_note_threshold: u8,

    /// Emit tempo directions for tempo changes in the file
    pub import_tempo: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            percussion_kit: PercussionKit::default(),
            merge_tracks: true,
            ghost_note_threshold: DEFAULT_GHOST_NOTE_THRESHOLD,
            import_tempo: true,
        }
    }
}

/// Result of a successful import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub score: Score,

    /// Non-fatal problems found while importing
    pub warnings: Vec<ImportWarning>,
}
