//! ESO Processor Library
//!
//! A Rust library for parsing EnergyPlus simulation output files (the
//! line-oriented ESO text format) into structured, queryable
//! time-series tables backed by polars DataFrames.
//!
//! This library provides tools for:
//! - Streaming, single-pass parsing of the ESO data dictionary and body
//! - Reconstructing calendar-correct timestamps per reporting frequency,
//!   including base-year inference from leap-year and weekday signals
//! - Tracking min/max peak side-values for daily and coarser frequencies
//! - Building per-frequency results tables with variable metadata and
//!   special day-of-week / number-of-days columns
//! - Indexing variables in a searchable tree with substring matching
//! - Concurrent batch validation of whole directory trees

pub mod cli;
pub mod config;
pub mod constants;
pub mod dates;
pub mod error;
pub mod file;
pub mod models;
pub mod parser;
pub mod processor;
pub mod tables;
pub mod tree;

// Re-export commonly used types
pub use config::ParseConfig;
pub use error::{EsoError, Result};
pub use file::EsoFile;
pub use models::{Frequency, Header, IntervalTuple, Variable};
pub use tables::{PeakTable, ResultsTable};
pub use tree::{Tree, VariablePattern};
