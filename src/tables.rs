//! Finalized results tables.
//!
//! Assembles per-frequency polars DataFrames from reconciled dates and
//! raw value sequences. Each numeric column is named by its variable
//! id and carries the full variable tuple as side metadata; special
//! day-of-week and number-of-days columns use reserved sentinel ids.
//! Peak stores become parallel min/max tables whose rows pair each
//! value with its occurrence timestamp.

use crate::constants::{
    DAY_COLUMN, DAY_COLUMN_ID, N_DAYS_COLUMN, N_DAYS_COLUMN_ID, OCCURRENCE_SUFFIX,
    TIMESTAMP_COLUMN,
};
use crate::dates::{parse_eplus_datetime, ReconciledDates};
use crate::error::{EsoError, Result};
use crate::models::{Frequency, Header, PeakEntry, PeakOccurrence, Variable};
use crate::parser::body::RawEnvironment;
use chrono::{Datelike, NaiveDateTime};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Which side of the peak store a table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakKind {
    LocalMin,
    LocalMax,
}

/// Numeric results for one frequency: timestamp-indexed rows, one
/// Float64 column per variable id, plus optional special columns.
#[derive(Debug, Clone)]
pub struct ResultsTable {
    frequency: Frequency,
    df: DataFrame,
    timestamps: Vec<NaiveDateTime>,
    variables: BTreeMap<i32, Variable>,
}

/// Peak results for one frequency: per id, a value column and an
/// occurrence-timestamp column.
#[derive(Debug, Clone)]
pub struct PeakTable {
    pub frequency: Frequency,
    pub kind: PeakKind,
    pub df: DataFrame,
    pub variables: BTreeMap<i32, Variable>,
}

/// All finalized tables for one environment.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentTables {
    pub name: String,
    pub tables: BTreeMap<Frequency, ResultsTable>,
    pub local_min: BTreeMap<Frequency, PeakTable>,
    pub local_max: BTreeMap<Frequency, PeakTable>,
}

fn id_column_name(id: i32) -> PlSmallStr {
    PlSmallStr::from(id.to_string())
}

fn datetime_column(name: &str, datetimes: &[NaiveDateTime]) -> Column {
    DatetimeChunked::from_naive_datetime(
        PlSmallStr::from(name),
        datetimes.iter().copied(),
        TimeUnit::Milliseconds,
    )
    .into_series()
    .into_column()
}

fn optional_datetime_column(name: &str, datetimes: &[Option<NaiveDateTime>]) -> Column {
    DatetimeChunked::from_naive_datetime_options(
        PlSmallStr::from(name),
        datetimes.iter().copied(),
        TimeUnit::Milliseconds,
    )
    .into_series()
    .into_column()
}

impl ResultsTable {
    /// Build the numeric table for one frequency of one environment.
    pub fn build(
        frequency: Frequency,
        timestamps: Vec<NaiveDateTime>,
        outputs: &BTreeMap<i32, Vec<f64>>,
        variables: &BTreeMap<i32, Variable>,
        day_of_week: Option<&[String]>,
        n_days: Option<&[i32]>,
    ) -> Result<Self> {
        let height = timestamps.len();
        let mut columns: Vec<Column> = vec![datetime_column(TIMESTAMP_COLUMN, &timestamps)];

        if let Some(days) = day_of_week {
            check_length(frequency, height, days.len())?;
            columns.push(Column::new(
                PlSmallStr::from(DAY_COLUMN),
                days.iter().map(|d| d.as_str()).collect::<Vec<_>>(),
            ));
        }
        if let Some(n_days) = n_days {
            check_length(frequency, height, n_days.len())?;
            columns.push(Column::new(PlSmallStr::from(N_DAYS_COLUMN), n_days));
        }

        let mut kept = BTreeMap::new();
        for (&id, series) in outputs {
            check_length(frequency, height, series.len())?;
            columns.push(Column::new(id_column_name(id), series));
            if let Some(variable) = variables.get(&id) {
                kept.insert(id, variable.clone());
            }
        }

        let df = DataFrame::new(columns)?;
        Ok(Self {
            frequency,
            df,
            timestamps,
            variables: kept,
        })
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn variables(&self) -> &BTreeMap<i32, Variable> {
        &self.variables
    }

    pub fn variable(&self, id: i32) -> Option<&Variable> {
        self.variables.get(&id)
    }

    pub fn ids(&self) -> Vec<i32> {
        self.variables.keys().copied().collect()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn has_day_column(&self) -> bool {
        self.df.get_column_names_str().contains(&DAY_COLUMN)
    }

    pub fn has_n_days_column(&self) -> bool {
        self.df.get_column_names_str().contains(&N_DAYS_COLUMN)
    }

    /// Reserved id of a special column name, if it is one.
    pub fn special_column_id(name: &str) -> Option<i32> {
        match name {
            DAY_COLUMN => Some(DAY_COLUMN_ID),
            N_DAYS_COLUMN => Some(N_DAYS_COLUMN_ID),
            _ => None,
        }
    }

    /// Numeric values of one variable column, NaN where unreported.
    pub fn values(&self, id: i32) -> Result<Vec<f64>> {
        if !self.variables.contains_key(&id) {
            return Err(EsoError::VariableNotFound {
                id,
                frequency: self.frequency.to_string(),
            });
        }
        let ca = self.df.column(&id.to_string())?.as_materialized_series().f64()?;
        Ok(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }

    /// Append a new variable column. The variable's shape must match
    /// the columns already present for this frequency.
    pub fn insert_column(&mut self, id: i32, variable: Variable, values: Vec<f64>) -> Result<()> {
        if let Some(existing) = self.variables.values().next() {
            if existing.is_simple() != variable.is_simple() {
                return Err(EsoError::VariableShapeMismatch {
                    frequency: self.frequency.to_string(),
                    reason: "cannot mix simple and full variables in one table".to_string(),
                });
            }
        }
        check_length(self.frequency, self.height(), values.len())?;
        self.df
            .with_column(Column::new(id_column_name(id), values))?;
        self.variables.insert(id, variable);
        Ok(())
    }

    /// Update one variable's metadata in place; column data and naming
    /// are id-based and unaffected.
    pub fn rename_variable(&mut self, id: i32, variable: Variable) -> Result<()> {
        if !self.variables.contains_key(&id) {
            return Err(EsoError::VariableNotFound {
                id,
                frequency: self.frequency.to_string(),
            });
        }
        self.variables.insert(id, variable);
        Ok(())
    }

    /// Drop variable columns; returns true when no numeric columns
    /// remain.
    pub fn delete_columns(&mut self, ids: &[i32]) -> Result<bool> {
        for &id in ids {
            if self.variables.remove(&id).is_some() {
                self.df = self.df.drop(&id.to_string())?;
            }
        }
        Ok(self.variables.is_empty())
    }
}

impl PeakTable {
    fn build(
        frequency: Frequency,
        kind: PeakKind,
        timestamps: &[NaiveDateTime],
        peaks: &BTreeMap<i32, Vec<PeakEntry>>,
        variables: &BTreeMap<i32, Variable>,
    ) -> Result<Self> {
        let height = timestamps.len();
        let mut columns: Vec<Column> = vec![datetime_column(TIMESTAMP_COLUMN, timestamps)];
        let mut kept = BTreeMap::new();

        for (&id, entries) in peaks {
            check_length(frequency, height, entries.len())?;
            let mut values = Vec::with_capacity(height);
            let mut occurrences = Vec::with_capacity(height);
            for (entry, period) in entries.iter().zip(timestamps) {
                let occ = match kind {
                    PeakKind::LocalMin => &entry.min,
                    PeakKind::LocalMax => &entry.max,
                };
                values.push(occ.value);
                occurrences.push(occurrence_timestamp(occ, period)?);
            }
            columns.push(Column::new(id_column_name(id), values));
            let occ_name = format!("{}{}", id, OCCURRENCE_SUFFIX);
            columns.push(optional_datetime_column(&occ_name, &occurrences));
            if let Some(variable) = variables.get(&id) {
                kept.insert(id, variable.clone());
            }
        }

        Ok(Self {
            frequency,
            kind,
            df: DataFrame::new(columns)?,
            variables: kept,
        })
    }

    /// Update one variable's metadata in place; column data and naming
    /// are id-based and unaffected.
    pub fn rename_variable(&mut self, id: i32, variable: Variable) -> Result<()> {
        if !self.variables.contains_key(&id) {
            return Err(EsoError::VariableNotFound {
                id,
                frequency: self.frequency.to_string(),
            });
        }
        self.variables.insert(id, variable);
        Ok(())
    }

    pub fn delete_columns(&mut self, ids: &[i32]) -> Result<bool> {
        for &id in ids {
            if self.variables.remove(&id).is_some() {
                self.df = self.df.drop(&id.to_string())?;
                self.df = self.df.drop(&format!("{}{}", id, OCCURRENCE_SUFFIX))?;
            }
        }
        Ok(self.variables.is_empty())
    }
}

/// Combine the enclosing period's date with a peak record's own
/// occurrence fields. Missing day or month fields inherit from the
/// period; the same end-of-period rollover rule as regular timestamps
/// applies.
fn occurrence_timestamp(
    occ: &PeakOccurrence,
    period: &NaiveDateTime,
) -> Result<Option<NaiveDateTime>> {
    if occ.is_nan() {
        return Ok(None);
    }
    let month = occ.month.unwrap_or(period.month());
    let day = occ.day.unwrap_or(period.day());
    parse_eplus_datetime(period.year(), month, day, occ.hour, occ.minute).map(Some)
}

fn check_length(frequency: Frequency, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(EsoError::ColumnLengthMismatch {
            frequency: frequency.to_string(),
            expected,
            got,
        });
    }
    Ok(())
}

/// Build all tables for one environment from its raw accumulators and
/// reconciled dates.
pub fn build_environment(
    header: &Header,
    env: &RawEnvironment,
    reconciled: &ReconciledDates,
) -> Result<EnvironmentTables> {
    let mut built = EnvironmentTables {
        name: env.name.clone(),
        ..Default::default()
    };

    for (&frequency, outputs) in &env.outputs {
        let Some(variables) = header.variables(frequency) else {
            continue;
        };
        let timestamps = reconciled
            .datetimes
            .get(&frequency)
            .cloned()
            .unwrap_or_default();
        let day_of_week = env
            .day_of_week
            .get(&frequency)
            .filter(|_| frequency.has_day_column())
            .map(|d| d.as_slice());
        let n_days = reconciled
            .n_days
            .get(&frequency)
            .filter(|_| frequency.has_n_days_column())
            .map(|d| d.as_slice());

        let table = ResultsTable::build(
            frequency,
            timestamps.clone(),
            outputs,
            variables,
            day_of_week,
            n_days,
        )?;
        debug!(
            "Built {} table: {} rows x {} variables",
            frequency,
            table.height(),
            table.ids().len()
        );
        built.tables.insert(frequency, table);

        if let Some(peaks) = env.peak_outputs.get(&frequency) {
            for kind in [PeakKind::LocalMin, PeakKind::LocalMax] {
                let table =
                    PeakTable::build(frequency, kind, &timestamps, peaks, variables)?;
                match kind {
                    PeakKind::LocalMin => built.local_min.insert(frequency, table),
                    PeakKind::LocalMax => built.local_max.insert(frequency, table),
                };
            }
        }
    }

    Ok(built)
}
