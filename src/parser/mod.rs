//! Streaming ESO parser.
//!
//! Single-pass, line-by-line processing: version line, standard
//! preamble, data dictionary, body, then date reconciliation and
//! table construction. All mutable parse state is owned by one call;
//! a fatal condition aborts the whole file with no partial result.

pub mod body;
pub mod header;
pub mod lines;

#[cfg(test)]
pub(crate) mod tests;

use crate::config::ParseConfig;
use crate::constants::ANNUAL_MARKER_VERSION;
use crate::dates::reconcile;
use crate::error::{EsoError, Result};
use crate::models::Header;
use crate::tables::{build_environment, EnvironmentTables};
use crate::tree::Tree;
use body::RawEnvironment;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// Parsed contents of one ESO file, before file metadata is attached.
#[derive(Debug, Clone)]
pub struct ParsedEso {
    pub header: Header,
    pub tree: Tree,
    pub environments: Vec<EnvironmentTables>,
}

/// Line iterator with position tracking; only one line is live at a
/// time.
pub struct LineSource<R: BufRead> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }

    /// Next raw line, or `None` at end of input.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        match self.lines.next() {
            Some(line) => {
                self.line_no += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }

    /// 1-based number of the line most recently returned.
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

/// Parse one ESO file from disk.
pub fn parse_file(path: &Path, config: &ParseConfig) -> Result<ParsedEso> {
    if !path.exists() {
        return Err(EsoError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    info!("Parsing ESO file: {}", path.display());
    let reader = BufReader::new(File::open(path)?);
    parse_reader(reader, config)
}

/// Parse ESO content from any buffered reader.
pub fn parse_reader<R: BufRead>(reader: R, config: &ParseConfig) -> Result<ParsedEso> {
    let mut source = LineSource::new(reader);

    let version = read_version(&mut source)?;
    let last_standard_item_id = if version >= ANNUAL_MARKER_VERSION { 6 } else { 5 };
    skip_preamble(&mut source, last_standard_item_id as usize)?;

    let mut header = header::read_header(&mut source, config)?;
    let mut environments =
        body::read_body(&mut source, &header, config, last_standard_item_id)?;

    let tree = purge_duplicates(&mut header, &mut environments);

    let mut built = Vec::with_capacity(environments.len());
    for env in &environments {
        let reconciled = reconcile(
            &env.dates,
            &env.day_of_week,
            &env.cumulative_days,
            config.year,
        )?;
        built.push(build_environment(&header, env, &reconciled)?);
    }

    info!(
        "Parsed {} variables across {} environments (EnergyPlus version {})",
        header.len(),
        built.len(),
        version
    );
    Ok(ParsedEso {
        header,
        tree,
        environments: built,
    })
}

/// First line: `Program Version,EnergyPlus, Version <semver>, ...`.
/// The version is the digits-only prefix of the semver ("9.1.0" → 910).
fn read_version<R: BufRead>(source: &mut LineSource<R>) -> Result<u32> {
    let Some(line) = source.next_line()? else {
        return Err(EsoError::InvalidVersion {
            content: String::new(),
        });
    };
    let invalid = || EsoError::InvalidVersion {
        content: line.trim_end().to_string(),
    };
    let after = line.split("Version ").nth(1).ok_or_else(invalid)?;
    let semver = after
        .split([',', ' '])
        .next()
        .ok_or_else(invalid)?
        .split('-')
        .next()
        .ok_or_else(invalid)?;
    let digits: String = semver.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().map_err(|_| invalid())
}

/// The standard dictionary items (interval marker definitions) follow
/// the version line and are skipped verbatim.
fn skip_preamble<R: BufRead>(source: &mut LineSource<R>, count: usize) -> Result<()> {
    for _ in 0..count {
        let Some(line) = source.next_line()? else {
            return Err(EsoError::MissingSentinel {
                sentinel: crate::constants::END_OF_DATA_DICTIONARY.to_string(),
            });
        };
        if line.trim().is_empty() {
            return Err(EsoError::BlankLine {
                line: source.line_no(),
            });
        }
    }
    Ok(())
}

/// Duplicate variable definitions (identical tuple under different
/// ids) surface during tree construction; the later ids and all their
/// accumulated data are purged, keeping the first-seen id.
fn purge_duplicates(header: &mut Header, environments: &mut [RawEnvironment]) -> Tree {
    let (tree, duplicates) = Tree::from_header(header);
    for (frequency, id) in duplicates {
        warn!("Purging duplicate variable id {} ({})", id, frequency);
        header.remove(frequency, id);
        for env in environments.iter_mut() {
            env.purge_id(frequency, id);
        }
    }
    tree
}
