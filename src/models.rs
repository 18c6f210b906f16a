//! Core data structures for ESO processing.
//!
//! Defines reporting frequencies, variable descriptors, raw interval
//! tuples, the data-dictionary header and peak-value records used
//! throughout the library.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Reporting frequencies supported by EnergyPlus output, ordered fine
/// to coarse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Frequency {
    Timestep,
    Hourly,
    Daily,
    Monthly,
    Annual,
    Runperiod,
}

impl Frequency {
    pub const ALL: [Frequency; 6] = [
        Frequency::Timestep,
        Frequency::Hourly,
        Frequency::Daily,
        Frequency::Monthly,
        Frequency::Annual,
        Frequency::Runperiod,
    ];

    /// Resolve a data dictionary frequency keyword.
    ///
    /// `Each Call` reporting is folded into the timestep bucket; only
    /// the first word of the keyword is significant.
    pub fn from_keyword(word: &str) -> Option<Self> {
        let word = word.trim().to_lowercase();
        match word.split_whitespace().next()? {
            "timestep" | "each" | "detailed" => Some(Frequency::Timestep),
            "hourly" => Some(Frequency::Hourly),
            "daily" => Some(Frequency::Daily),
            "monthly" => Some(Frequency::Monthly),
            "annual" => Some(Frequency::Annual),
            "runperiod" => Some(Frequency::Runperiod),
            _ => None,
        }
    }

    /// Frequencies finer than daily carry a day-of-week string per step.
    pub fn is_sub_daily(&self) -> bool {
        matches!(self, Frequency::Timestep | Frequency::Hourly)
    }

    /// Daily and coarser frequencies report min/max side-values.
    pub fn has_peaks(&self) -> bool {
        !self.is_sub_daily()
    }

    /// Whether finalized tables carry the day-of-week special column.
    pub fn has_day_column(&self) -> bool {
        matches!(self, Frequency::Timestep | Frequency::Hourly | Frequency::Daily)
    }

    /// Whether finalized tables carry the number-of-days special column.
    pub fn has_n_days_column(&self) -> bool {
        matches!(self, Frequency::Monthly | Frequency::Annual | Frequency::Runperiod)
    }

    /// Number of occurrence fields accompanying each peak value
    /// (excluding the value itself).
    pub fn peak_occurrence_fields(&self) -> usize {
        match self {
            Frequency::Timestep | Frequency::Hourly => 0,
            Frequency::Daily => 2,
            Frequency::Monthly => 3,
            Frequency::Annual | Frequency::Runperiod => 4,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Frequency::Timestep => "timestep",
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::Monthly => "monthly",
            Frequency::Annual => "annual",
            Frequency::Runperiod => "runperiod",
        };
        write!(f, "{}", name)
    }
}

/// Descriptor of one reported output variable.
///
/// The `Full` shape carries a variable type alongside the key; sources
/// without a type category (header-less table columns, some imports)
/// use the `Simple` shape. Both share the `(frequency, key, units)`
/// prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variable {
    Full {
        frequency: Frequency,
        key: String,
        type_: String,
        units: String,
    },
    Simple {
        frequency: Frequency,
        key: String,
        units: String,
    },
}

impl Variable {
    pub fn new(
        frequency: Frequency,
        key: impl Into<String>,
        type_: impl Into<String>,
        units: impl Into<String>,
    ) -> Self {
        Variable::Full {
            frequency,
            key: key.into(),
            type_: type_.into(),
            units: units.into(),
        }
    }

    pub fn simple(
        frequency: Frequency,
        key: impl Into<String>,
        units: impl Into<String>,
    ) -> Self {
        Variable::Simple {
            frequency,
            key: key.into(),
            units: units.into(),
        }
    }

    pub fn frequency(&self) -> Frequency {
        match self {
            Variable::Full { frequency, .. } | Variable::Simple { frequency, .. } => *frequency,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Variable::Full { key, .. } | Variable::Simple { key, .. } => key,
        }
    }

    /// Variable type for the `Full` shape, `None` for `Simple`.
    pub fn type_(&self) -> Option<&str> {
        match self {
            Variable::Full { type_, .. } => Some(type_),
            Variable::Simple { .. } => None,
        }
    }

    pub fn units(&self) -> &str {
        match self {
            Variable::Full { units, .. } | Variable::Simple { units, .. } => units,
        }
    }

    pub fn is_simple(&self) -> bool {
        matches!(self, Variable::Simple { .. })
    }

    /// Copy of this variable with a different key; shape is preserved.
    pub fn with_key(&self, new_key: impl Into<String>) -> Self {
        match self {
            Variable::Full {
                frequency,
                type_,
                units,
                ..
            } => Variable::Full {
                frequency: *frequency,
                key: new_key.into(),
                type_: type_.clone(),
                units: units.clone(),
            },
            Variable::Simple {
                frequency, units, ..
            } => Variable::Simple {
                frequency: *frequency,
                key: new_key.into(),
                units: units.clone(),
            },
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Full {
                frequency,
                key,
                type_,
                units,
            } => write!(f, "({}, {}, {}, {})", frequency, key, type_, units),
            Variable::Simple {
                frequency,
                key,
                units,
            } => write!(f, "({}, {}, {})", frequency, key, units),
        }
    }
}

/// Raw positional date fields as encoded in interval lines.
///
/// `hour == 24` and `end_minute == 60` mark exclusive end-of-period
/// boundaries and are not valid calendar values; conversion happens in
/// the date reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntervalTuple {
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub end_minute: u32,
}

impl IntervalTuple {
    pub fn new(month: u32, day: u32, hour: u32, end_minute: u32) -> Self {
        Self {
            month,
            day,
            hour,
            end_minute,
        }
    }
}

/// Data dictionary: per-frequency mapping of numeric id to variable.
///
/// Ids are unique within a frequency only. Frequencies disappear when
/// their last variable is removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    variables: BTreeMap<Frequency, BTreeMap<i32, Variable>>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: i32, variable: Variable) {
        self.variables
            .entry(variable.frequency())
            .or_default()
            .insert(id, variable);
    }

    pub fn get(&self, frequency: Frequency, id: i32) -> Option<&Variable> {
        self.variables.get(&frequency)?.get(&id)
    }

    /// Remove one variable; the frequency vanishes when emptied.
    pub fn remove(&mut self, frequency: Frequency, id: i32) -> Option<Variable> {
        let bucket = self.variables.get_mut(&frequency)?;
        let removed = bucket.remove(&id);
        if bucket.is_empty() {
            self.variables.remove(&frequency);
        }
        removed
    }

    pub fn frequencies(&self) -> Vec<Frequency> {
        self.variables.keys().copied().collect()
    }

    pub fn contains_frequency(&self, frequency: Frequency) -> bool {
        self.variables.contains_key(&frequency)
    }

    pub fn variables(&self, frequency: Frequency) -> Option<&BTreeMap<i32, Variable>> {
        self.variables.get(&frequency)
    }

    pub fn ids(&self, frequency: Frequency) -> Vec<i32> {
        self.variables
            .get(&frequency)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Smallest id not yet used for the given frequency.
    pub fn next_id(&self, frequency: Frequency) -> i32 {
        self.variables
            .get(&frequency)
            .and_then(|m| m.keys().max())
            .map(|max| max + 1)
            .unwrap_or(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Frequency, i32, &Variable)> {
        self.variables
            .iter()
            .flat_map(|(f, m)| m.iter().map(move |(id, v)| (*f, *id, v)))
    }

    pub fn len(&self) -> usize {
        self.variables.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// One peak value with its occurrence fields.
///
/// Coarser frequencies carry more occurrence detail: daily peaks report
/// hour and minute, monthly add the day, annual and runperiod add the
/// month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakOccurrence {
    pub value: f64,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hour: u32,
    pub minute: u32,
}

impl PeakOccurrence {
    pub fn nan() -> Self {
        Self {
            value: f64::NAN,
            month: None,
            day: None,
            hour: 0,
            minute: 0,
        }
    }

    pub fn is_nan(&self) -> bool {
        self.value.is_nan()
    }
}

/// Minimum and maximum side-values for one step of a daily+ series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakEntry {
    pub min: PeakOccurrence,
    pub max: PeakOccurrence,
}

impl PeakEntry {
    pub fn nan() -> Self {
        Self {
            min: PeakOccurrence::nan(),
            max: PeakOccurrence::nan(),
        }
    }

    pub fn is_nan(&self) -> bool {
        self.min.is_nan() && self.max.is_nan()
    }

    /// Decompose the trailing fields of a daily+ data line into min and
    /// max occurrence records. `fields` excludes the leading scalar.
    pub fn from_fields(frequency: Frequency, fields: &[f64]) -> Option<Self> {
        let n = frequency.peak_occurrence_fields();
        if n == 0 || fields.len() != 2 * (n + 1) {
            return None;
        }
        let decompose = |chunk: &[f64]| {
            let value = chunk[0];
            let occ = &chunk[1..];
            match n {
                2 => PeakOccurrence {
                    value,
                    month: None,
                    day: None,
                    hour: occ[0] as u32,
                    minute: occ[1] as u32,
                },
                3 => PeakOccurrence {
                    value,
                    month: None,
                    day: Some(occ[0] as u32),
                    hour: occ[1] as u32,
                    minute: occ[2] as u32,
                },
                _ => PeakOccurrence {
                    value,
                    month: Some(occ[0] as u32),
                    day: Some(occ[1] as u32),
                    hour: occ[2] as u32,
                    minute: occ[3] as u32,
                },
            }
        };
        Some(Self {
            min: decompose(&fields[..n + 1]),
            max: decompose(&fields[n + 1..]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_keywords() {
        assert_eq!(Frequency::from_keyword("Hourly"), Some(Frequency::Hourly));
        assert_eq!(Frequency::from_keyword("TimeStep"), Some(Frequency::Timestep));
        assert_eq!(Frequency::from_keyword("Each Call"), Some(Frequency::Timestep));
        assert_eq!(Frequency::from_keyword("RunPeriod"), Some(Frequency::Runperiod));
        assert_eq!(Frequency::from_keyword("weekly"), None);
    }

    #[test]
    fn test_frequency_ordering() {
        assert!(Frequency::Timestep < Frequency::Hourly);
        assert!(Frequency::Daily < Frequency::Runperiod);
    }

    #[test]
    fn test_variable_accessors() {
        let v = Variable::new(Frequency::Hourly, "Zone1", "Zone Air Temperature", "C");
        assert_eq!(v.key(), "Zone1");
        assert_eq!(v.type_(), Some("Zone Air Temperature"));
        assert_eq!(v.units(), "C");
        assert!(!v.is_simple());

        let s = Variable::simple(Frequency::Daily, "gas", "J");
        assert_eq!(s.type_(), None);
        assert!(s.is_simple());
    }

    #[test]
    fn test_variable_with_key_preserves_shape() {
        let v = Variable::new(Frequency::Hourly, "a", "b", "c");
        let renamed = v.with_key("z");
        assert_eq!(renamed.key(), "z");
        assert_eq!(renamed.type_(), Some("b"));

        let s = Variable::simple(Frequency::Hourly, "a", "c").with_key("z");
        assert!(s.is_simple());
    }

    #[test]
    fn test_header_frequency_vanishes_when_empty() {
        let mut header = Header::new();
        header.insert(7, Variable::new(Frequency::Hourly, "a", "b", "c"));
        assert!(header.contains_frequency(Frequency::Hourly));

        header.remove(Frequency::Hourly, 7);
        assert!(!header.contains_frequency(Frequency::Hourly));
        assert!(header.is_empty());
    }

    #[test]
    fn test_header_next_id() {
        let mut header = Header::new();
        assert_eq!(header.next_id(Frequency::Daily), 1);
        header.insert(12, Variable::new(Frequency::Daily, "a", "b", "c"));
        assert_eq!(header.next_id(Frequency::Daily), 13);
    }

    #[test]
    fn test_interval_tuple_ordering() {
        let first = IntervalTuple::new(1, 1, 1, 60);
        assert!(IntervalTuple::new(1, 1, 2, 60) > first);
        assert!(IntervalTuple::new(12, 31, 24, 60) > first);
        assert!(IntervalTuple::new(1, 1, 1, 60) <= first);
    }

    #[test]
    fn test_peak_entry_daily_decomposition() {
        // min 15.1 at 06:30, max 25.5 at 14:00
        let entry =
            PeakEntry::from_fields(Frequency::Daily, &[15.1, 6.0, 30.0, 25.5, 14.0, 60.0])
                .unwrap();
        assert_eq!(entry.min.value, 15.1);
        assert_eq!(entry.min.hour, 6);
        assert_eq!(entry.min.minute, 30);
        assert_eq!(entry.min.day, None);
        assert_eq!(entry.max.value, 25.5);
        assert_eq!(entry.max.minute, 60);
    }

    #[test]
    fn test_peak_entry_runperiod_decomposition() {
        let fields = [-5.0, 1.0, 21.0, 24.0, 60.0, 32.0, 7.0, 15.0, 14.0, 30.0];
        let entry = PeakEntry::from_fields(Frequency::Runperiod, &fields).unwrap();
        assert_eq!(entry.min.month, Some(1));
        assert_eq!(entry.min.day, Some(21));
        assert_eq!(entry.max.month, Some(7));
        assert_eq!(entry.max.hour, 14);
    }

    #[test]
    fn test_peak_entry_rejects_wrong_width() {
        assert!(PeakEntry::from_fields(Frequency::Daily, &[1.0, 2.0]).is_none());
        assert!(PeakEntry::from_fields(Frequency::Hourly, &[1.0]).is_none());
    }
}
