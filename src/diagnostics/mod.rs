//! Diagnostics collected during a MIDI import
//!
//! Non-fatal problems (dropped tracks, unpairable notes, unmapped drum keys)
//! are recorded here instead of aborting the import. The list belongs to one
//! import call and is cleared when the next call starts.

use serde::{Deserialize, Serialize};

/// A non-fatal problem found while importing
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ImportWarning {
    /// Human-readable message
    pub message: String,
    /// Source track index, when the problem belongs to one track
    pub track: Option<usize>,
    /// Source tick, when the problem belongs to one position
    pub tick: Option<u64>,
}

impl ImportWarning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            track: None,
            tick: None,
        }
    }

    pub fn with_track(mut self, track: usize) -> Self {
        self.track = Some(track);
        self
    }

    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = Some(tick);
        self
    }
}

/// Collection of warnings for one import call
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Diagnostics {
    pub warnings: Vec<ImportWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Record a warning (also forwarded to the log)
    pub fn add(&mut self, warning: ImportWarning) {
        log::warn!(
            "MIDI import: {} (track {:?}, tick {:?})",
            warning.message,
            warning.track,
            warning.tick
        );
        self.warnings.push(warning);
    }

    pub fn extend(&mut self, warnings: impl IntoIterator<Item = ImportWarning>) {
        for warning in warnings {
            self.add(warning);
        }
    }

    pub fn clear(&mut self) {
        self.warnings.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn as_slice(&self) -> &[ImportWarning] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_builder() {
        let warning = ImportWarning::new("Track has no notes").with_track(2).with_tick(480);
        assert_eq!(warning.message, "Track has no notes");
        assert_eq!(warning.track, Some(2));
        assert_eq!(warning.tick, Some(480));
    }

    #[test]
    fn test_diagnostics_add_and_clear() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());

        diags.add(ImportWarning::new("first"));
        diags.extend(vec![ImportWarning::new("second"), ImportWarning::new("third")]);
        assert_eq!(diags.len(), 3);
        assert_eq!(diags.as_slice()[1].message, "second");

        diags.clear();
        assert!(diags.is_empty());
    }
}
