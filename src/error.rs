//! Error handling for ESO processing operations.
//!
//! Fatal parse conditions each get their own variant so callers can
//! discriminate a malformed file from a programming error.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EsoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Blank line encountered at line {line}; file is truncated or corrupt")]
    BlankLine { line: usize },

    #[error("Cannot parse line {line}: '{content}'")]
    InvalidLine { line: usize, content: String },

    #[error("Cannot parse data dictionary line {line}: '{content}'")]
    InvalidHeaderLine { line: usize, content: String },

    #[error("Invalid numeric token '{token}' at line {line}")]
    InvalidNumber { line: usize, token: String },

    #[error("Reached end of file without finding '{sentinel}'")]
    MissingSentinel { sentinel: String },

    #[error("Cannot read EnergyPlus version from: '{content}'")]
    InvalidVersion { content: String },

    #[error("Unknown reporting frequency '{word}' at line {line}")]
    UnknownFrequency { word: String, line: usize },

    #[error("Year {year} does not match file contents: leap year expected to be {expected_leap}")]
    LeapYearMismatch { year: i32, expected_leap: bool },

    #[error("Year {year} starts on {actual}, but file data start on {expected}")]
    StartDayMismatch {
        year: i32,
        expected: String,
        actual: String,
    },

    #[error("No year in {span} years before {reference} matches leap={is_leap}, start day={start_day:?}")]
    YearNotFound {
        reference: i32,
        span: i32,
        is_leap: bool,
        start_day: Option<String>,
    },

    #[error("Invalid date fields: year={year} month={month} day={day} hour={hour} minute={minute}")]
    InvalidDate {
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
    },

    #[error("Variable id {id} not found for frequency {frequency}")]
    VariableNotFound { id: i32, frequency: String },

    #[error("Variable shape mismatch for frequency {frequency}: {reason}")]
    VariableShapeMismatch { frequency: String, reason: String },

    #[error("Column length mismatch for frequency {frequency}: expected {expected}, got {got}")]
    ColumnLengthMismatch {
        frequency: String,
        expected: usize,
        got: usize,
    },
}

pub type Result<T> = std::result::Result<T, EsoError>;
