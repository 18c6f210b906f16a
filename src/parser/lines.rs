//! Line classification for raw ESO text.
//!
//! Turns single lines into typed records: data dictionary entries,
//! interval markers with their fixed positional field layouts, and
//! numeric data payloads. No state lives here; the body reader owns
//! interval context.

use crate::constants::{CUMULATIVE_METER_KEY, METER_KEY};
use crate::error::{EsoError, Result};
use crate::models::{Frequency, IntervalTuple, Variable};
use regex::Regex;
use std::sync::LazyLock;

/// Data dictionary line: id, field count, key/type text, bracketed
/// units, `!` frequency keyword. Units bracket may be absent.
static HEADER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+),(\d+),(.*?)(?:\[(.*?)\])?\s*!(\w+(?:\s+\w+)?)").expect("valid pattern")
});

/// One parsed data dictionary entry.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRecord {
    pub id: i32,
    pub variable: Variable,
}

/// One decoded interval marker.
///
/// The sub-hourly marker keeps its start minute: timestep and hourly
/// reporting share marker id 2 and are told apart by the minute span.
#[derive(Debug, Clone, PartialEq)]
pub enum IntervalRecord {
    Environment {
        name: String,
    },
    SubHourly {
        tuple: IntervalTuple,
        start_minute: u32,
        day: String,
    },
    Daily {
        tuple: IntervalTuple,
        day: String,
    },
    Monthly {
        tuple: IntervalTuple,
        cumulative_days: u32,
    },
    Runperiod {
        cumulative_days: u32,
    },
    Annual {
        year: i32,
    },
}

/// Parse a data dictionary line into its variable descriptor.
///
/// Text without a key/type comma separator denotes a meter variable:
/// the text becomes the type and the key is `Meter` (or `Cumulative
/// Meter` when the text mentions it).
pub fn parse_header_line(line: &str, line_no: usize) -> Result<HeaderRecord> {
    let captures = HEADER_PATTERN
        .captures(line)
        .ok_or_else(|| EsoError::InvalidHeaderLine {
            line: line_no,
            content: line.trim_end().to_string(),
        })?;

    let id: i32 = captures[1]
        .parse()
        .map_err(|_| EsoError::InvalidHeaderLine {
            line: line_no,
            content: line.trim_end().to_string(),
        })?;
    let text = captures[3].trim();
    let units = captures
        .get(4)
        .map(|m| m.as_str().trim())
        .unwrap_or_default();
    let keyword = &captures[5];
    let frequency =
        Frequency::from_keyword(keyword).ok_or_else(|| EsoError::UnknownFrequency {
            word: keyword.to_string(),
            line: line_no,
        })?;

    let variable = match text.split_once(',') {
        Some((key, type_)) => Variable::new(frequency, key.trim(), type_.trim(), units),
        None => {
            let key = if text.contains("Cumulative") {
                CUMULATIVE_METER_KEY
            } else {
                METER_KEY
            };
            Variable::new(frequency, key, text, units)
        }
    };

    Ok(HeaderRecord { id, variable })
}

/// Split a body line into its leading integer id and raw trimmed
/// fields. No numeric conversion happens here.
pub fn split_body_line(line: &str, line_no: usize) -> Result<(i32, Vec<String>)> {
    let mut parts = line.split(',');
    let id_token = parts.next().unwrap_or_default().trim();
    let id: i32 = id_token.parse().map_err(|_| EsoError::InvalidLine {
        line: line_no,
        content: line.trim_end().to_string(),
    })?;
    Ok((id, parts.map(|p| p.trim().to_string()).collect()))
}

/// Parse raw data fields into floats.
pub fn parse_values(fields: &[String], line_no: usize) -> Result<Vec<f64>> {
    fields
        .iter()
        .map(|token| {
            token.parse::<f64>().map_err(|_| EsoError::InvalidNumber {
                line: line_no,
                token: token.clone(),
            })
        })
        .collect()
}

fn field<'a>(fields: &'a [String], index: usize, line_no: usize) -> Result<&'a str> {
    fields
        .get(index)
        .map(|s| s.as_str())
        .ok_or_else(|| EsoError::InvalidLine {
            line: line_no,
            content: fields.join(","),
        })
}

/// Interval minutes are written as decimal strings ("60.00").
fn field_u32(fields: &[String], index: usize, line_no: usize) -> Result<u32> {
    let token = field(fields, index, line_no)?;
    token
        .parse::<f64>()
        .map(|v| v as u32)
        .map_err(|_| EsoError::InvalidNumber {
            line: line_no,
            token: token.to_string(),
        })
}

/// Decode an interval marker line from its fixed positional layout.
pub fn parse_interval_record(
    interval_id: i32,
    fields: &[String],
    line_no: usize,
) -> Result<IntervalRecord> {
    match interval_id {
        1 => Ok(IntervalRecord::Environment {
            name: field(fields, 0, line_no)?.to_string(),
        }),
        2 => Ok(IntervalRecord::SubHourly {
            tuple: IntervalTuple::new(
                field_u32(fields, 1, line_no)?,
                field_u32(fields, 2, line_no)?,
                field_u32(fields, 4, line_no)?,
                field_u32(fields, 6, line_no)?,
            ),
            start_minute: field_u32(fields, 5, line_no)?,
            day: field(fields, 7, line_no)?.to_string(),
        }),
        3 => Ok(IntervalRecord::Daily {
            tuple: IntervalTuple::new(
                field_u32(fields, 1, line_no)?,
                field_u32(fields, 2, line_no)?,
                0,
                0,
            ),
            day: field(fields, 4, line_no)?.to_string(),
        }),
        4 => Ok(IntervalRecord::Monthly {
            tuple: IntervalTuple::new(field_u32(fields, 1, line_no)?, 1, 0, 0),
            cumulative_days: field_u32(fields, 0, line_no)?,
        }),
        5 => Ok(IntervalRecord::Runperiod {
            cumulative_days: field_u32(fields, 0, line_no)?,
        }),
        6 => Ok(IntervalRecord::Annual {
            year: field_u32(fields, 0, line_no)? as i32,
        }),
        _ => Err(EsoError::InvalidLine {
            line: line_no,
            content: format!("{},{}", interval_id, fields.join(",")),
        }),
    }
}
