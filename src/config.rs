//! Parse configuration.
//!
//! Options the caller hands to a file parse: which reporting
//! frequencies to skip, whether peak side-values are tracked, an
//! optional explicit base year and the suppress-errors mode.

use crate::models::Frequency;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Configuration for parsing one ESO file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseConfig {
    /// Frequencies to discard entirely; no storage is allocated for
    /// their variables or intervals.
    pub excluded_frequencies: HashSet<Frequency>,

    /// Track min/max side-values for daily and coarser frequencies.
    pub track_peaks: bool,

    /// Explicit base year; when absent the year is inferred from the
    /// leap-year and start-weekday signal of the data.
    pub year: Option<i32>,

    /// Downgrade fatal parse conditions to an absent result instead of
    /// an error.
    pub suppress_errors: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            excluded_frequencies: HashSet::new(),
            track_peaks: true,
            year: None,
            suppress_errors: false,
        }
    }
}

impl ParseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_excluded(mut self, frequencies: impl IntoIterator<Item = Frequency>) -> Self {
        self.excluded_frequencies.extend(frequencies);
        self
    }

    pub fn with_peaks(mut self, track_peaks: bool) -> Self {
        self.track_peaks = track_peaks;
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_suppressed_errors(mut self, suppress: bool) -> Self {
        self.suppress_errors = suppress;
        self
    }

    pub fn is_excluded(&self, frequency: Frequency) -> bool {
        self.excluded_frequencies.contains(&frequency)
    }
}
