//! Data dictionary (header) reading.
//!
//! Consumes classified lines until the dictionary terminator,
//! building the per-frequency id → variable mapping. Variables of
//! excluded frequencies are discarded without allocating storage.

use super::lines::parse_header_line;
use super::LineSource;
use crate::config::ParseConfig;
use crate::constants::END_OF_DATA_DICTIONARY;
use crate::error::{EsoError, Result};
use crate::models::Header;
use std::io::BufRead;
use tracing::debug;

/// Read the data dictionary section. The source must be positioned
/// just past the standard preamble items.
pub fn read_header<R: BufRead>(source: &mut LineSource<R>, config: &ParseConfig) -> Result<Header> {
    let mut header = Header::new();
    let mut excluded = 0usize;

    loop {
        let Some(line) = source.next_line()? else {
            return Err(EsoError::MissingSentinel {
                sentinel: END_OF_DATA_DICTIONARY.to_string(),
            });
        };
        if line.contains(END_OF_DATA_DICTIONARY) {
            break;
        }
        if line.trim().is_empty() {
            return Err(EsoError::BlankLine {
                line: source.line_no(),
            });
        }
        let record = parse_header_line(&line, source.line_no())?;
        if config.is_excluded(record.variable.frequency()) {
            excluded += 1;
            continue;
        }
        header.insert(record.id, record.variable);
    }

    debug!(
        "Read data dictionary: {} variables across {} frequencies ({} excluded)",
        header.len(),
        header.frequencies().len(),
        excluded
    );
    Ok(header)
}
