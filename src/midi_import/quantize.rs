//! Tick quantizer
//!
//! Snaps raw tick positions and lengths onto a rhythmic grid whose finest
//! value is the configured resolution (the "floor").
//!
//! # Grid
//!
//! Built once per file: every note value from a whole note down to the
//! floor, each with 0, 1 and 2 dots, in that order.
//!
//! ```text
//! ticks(value, dots) = whole_ticks * (2^(dots+1) - 1) / (value * 2^dots)
//! whole_ticks        = ticks_per_quarter * 4
//! ```
//!
//! Divisions (the arithmetic duration written into the score) use at least
//! `floor.denominator()` divisions per quarter, which keeps every grid entry
//! integral, including a double-dotted floor value. Files with short meter
//! denominators (3/32, 5/64) raise that count so a measure is integral too.
//!
//! Notes only take "aligned" entries, whose length is a whole number of
//! floor values, so every note ends on a grid position.

use num_rational::Rational32;

use crate::ir::{NoteDuration, NoteValue};

/// Maximum number of augmentation dots on the grid
pub const MAX_DOTS: u8 = 2;

/// One grid entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridEntry {
    pub value: NoteValue,
    pub dots: u8,
    pub ticks: u64,
    /// Length is a whole number of floor values
    pub aligned: bool,
}

#[derive(Debug, Clone)]
pub struct TickQuantizer {
    ticks_per_quarter: u64,
    floor: NoteValue,
    divisions_per_quarter: u32,
    grid: Vec<GridEntry>,
}

impl TickQuantizer {
    pub fn new(ticks_per_quarter: u16, floor: NoteValue) -> Self {
        let ticks_per_quarter = u64::from(ticks_per_quarter.max(1));
        let mut quantizer = TickQuantizer {
            ticks_per_quarter,
            floor,
            divisions_per_quarter: floor.denominator(),
            grid: Vec::new(),
        };
        let grid = NoteValue::down_to(floor)
            .flat_map(|value| (0..=MAX_DOTS).map(move |dots| (value, dots)))
            .map(|(value, dots)| GridEntry {
                value,
                dots,
                ticks: quantizer.ticks_for(value, dots),
                aligned: floor.denominator() * dot_numerator(dots) % (value.denominator() << dots) == 0,
            })
            .collect();
        quantizer.grid = grid;
        log::debug!(
            "Quantizer: {} ticks per quarter, floor {:?}, {} grid entries",
            ticks_per_quarter,
            floor,
            quantizer.grid.len()
        );
        quantizer
    }

    /// Raise divisions per quarter so a measure with this meter denominator
    /// has an integral length
    pub fn with_meter_denominator(mut self, denominator: u8) -> Self {
        let needed = (u32::from(denominator) / 4).next_power_of_two();
        self.divisions_per_quarter = self.divisions_per_quarter.max(needed);
        self
    }

    pub fn ticks_per_quarter(&self) -> u64 {
        self.ticks_per_quarter
    }

    pub fn grid(&self) -> &[GridEntry] {
        &self.grid
    }

    pub fn whole_ticks(&self) -> u64 {
        self.ticks_per_quarter * 4
    }

    /// Tick length of a note value with dots (never 0)
    pub fn ticks_for(&self, value: NoteValue, dots: u8) -> u64 {
        let numerator = self.whole_ticks() * u64::from(dot_numerator(dots));
        let denominator = u64::from(value.denominator()) << dots;
        (numerator / denominator).max(1)
    }

    /// Tick length of the undotted floor value
    pub fn floor_ticks(&self) -> u64 {
        self.ticks_for(self.floor, 0)
    }

    /// Longest tick length on the grid (double-dotted whole)
    pub fn longest_ticks(&self) -> u64 {
        self.grid.iter().map(|entry| entry.ticks).max().unwrap_or(1)
    }

    /// Nearest grid entry to `ticks`. Linear scan; the first minimum wins.
    pub fn quantize_duration(&self, ticks: u64) -> (NoteValue, u8) {
        self.nearest(ticks, |_| true)
    }

    /// Nearest aligned grid entry to `ticks`, first minimum winning
    pub fn quantize_note_duration(&self, ticks: u64) -> (NoteValue, u8) {
        self.nearest(ticks, |entry| entry.aligned)
    }

    fn nearest(&self, ticks: u64, accept: impl Fn(&GridEntry) -> bool) -> (NoteValue, u8) {
        let mut best: Option<(GridEntry, u64)> = None;
        for entry in self.grid.iter().filter(|entry| accept(entry)) {
            let distance = entry.ticks.abs_diff(ticks);
            if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                best = Some((*entry, distance));
            }
        }
        best.map_or((self.floor, 0), |(entry, _)| (entry.value, entry.dots))
    }

    /// Longest aligned grid entry that does not exceed `ticks`
    pub fn fit_duration(&self, ticks: u64) -> Option<(NoteValue, u8)> {
        let mut best: Option<GridEntry> = None;
        for entry in self.grid.iter().filter(|entry| entry.aligned) {
            if entry.ticks <= ticks && best.map_or(true, |b| entry.ticks > b.ticks) {
                best = Some(*entry);
            }
        }
        best.map(|entry| (entry.value, entry.dots))
    }

    /// Snap a tick position to the nearest multiple of the floor tick count,
    /// rounding up on an exact half
    pub fn quantize_position(&self, tick: u64) -> u64 {
        let step = self.floor_ticks();
        let base = tick / step * step;
        if (tick - base) * 2 >= step {
            base + step
        } else {
            base
        }
    }

    /// Divisions per quarter note written into the score
    pub fn divisions_per_quarter(&self) -> u32 {
        self.divisions_per_quarter
    }

    pub fn divisions_for(&self, value: NoteValue, dots: u8) -> u32 {
        let numerator = self.divisions_per_quarter * 4 * dot_numerator(dots);
        numerator / (value.denominator() << dots)
    }

    /// Divisions of a value when they are a whole, non-zero number
    fn exact_divisions(&self, value: NoteValue, dots: u8) -> Option<u32> {
        let numerator = self.divisions_per_quarter * 4 * dot_numerator(dots);
        let denominator = value.denominator() << dots;
        (numerator % denominator == 0).then_some(numerator / denominator)
    }

    /// Duration as a fraction of a whole note (dotted quarter → 3/8)
    pub fn fraction_for(&self, value: NoteValue, dots: u8) -> Rational32 {
        Rational32::new(dot_numerator(dots) as i32, (value.denominator() as i32) << dots)
    }

    pub fn duration(&self, value: NoteValue, dots: u8) -> NoteDuration {
        NoteDuration {
            value,
            dots,
            divisions: self.divisions_for(value, dots),
            fraction: self.fraction_for(value, dots),
        }
    }

    /// Convert a tick distance to divisions, rounded to the nearest division
    pub fn ticks_to_divisions(&self, ticks: u64) -> u32 {
        let dpq = u64::from(self.divisions_per_quarter);
        ((ticks * dpq + self.ticks_per_quarter / 2) / self.ticks_per_quarter) as u32
    }

    /// Convert a grid-snapped tick position or length to divisions by
    /// counting floor steps
    pub fn grid_divisions(&self, ticks: u64) -> u64 {
        let step = self.floor_ticks();
        (ticks + step / 2) / step * u64::from(self.divisions_for(self.floor, 0))
    }

    /// Write `divisions` as note values, longest first. Values finer than the
    /// floor are used only for what coarser ones cannot cover.
    pub fn split_divisions(&self, divisions: u64) -> Vec<NoteDuration> {
        let mut candidates: Vec<(u64, NoteValue, u8)> = NoteValue::ALL
            .into_iter()
            .flat_map(|value| (0..=MAX_DOTS).map(move |dots| (value, dots)))
            .filter_map(|(value, dots)| {
                self.exact_divisions(value, dots)
                    .filter(|d| *d > 0)
                    .map(|d| (u64::from(d), value, dots))
            })
            .collect();
        candidates.sort_by(|a, b| b.0.cmp(&a.0));

        let mut out = Vec::new();
        let mut remaining = divisions;
        while remaining > 0 {
            let Some(&(length, value, dots)) = candidates.iter().find(|(length, _, _)| *length <= remaining) else {
                log::debug!("{} divisions cannot be written with note values", remaining);
                break;
            };
            out.push(self.duration(value, dots));
            remaining -= length;
        }
        out
    }
}

/// Numerator of the dot multiplier: 1, 3, 7 for 0, 1, 2 dots
fn dot_numerator(dots: u8) -> u32 {
    (1u32 << (dots + 1)) - 1
}
