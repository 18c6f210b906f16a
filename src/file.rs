//! Published results of one parsed ESO file.
//!
//! Bundles per-file metadata with the data dictionary, search tree and
//! per-environment tables, and exposes the mutation operations
//! downstream consumers are allowed: tree queries, variable rename,
//! insert and delete. Raw parse buffers never leak past this boundary.

use crate::config::ParseConfig;
use crate::error::{EsoError, Result};
use crate::models::{Frequency, Header, Variable};
use crate::parser::{parse_file, ParsedEso};
use crate::tables::{EnvironmentTables, PeakTable, ResultsTable};
use crate::tree::{Tree, VariablePattern};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::error;

/// One parsed ESO file.
#[derive(Debug, Clone)]
pub struct EsoFile {
    path: PathBuf,
    file_name: String,
    created: DateTime<Local>,
    header: Header,
    tree: Tree,
    environments: Vec<EnvironmentTables>,
}

impl EsoFile {
    /// Parse a file with default configuration.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_path_with_config(path, &ParseConfig::default())
    }

    /// Parse a file with explicit configuration.
    pub fn from_path_with_config(path: impl AsRef<Path>, config: &ParseConfig) -> Result<Self> {
        let path = path.as_ref();
        let parsed = parse_file(path, config)?;
        Ok(Self::from_parsed(path, parsed))
    }

    /// Parse a file, honoring the configuration's suppress-errors
    /// mode: a fatal parse condition yields `Ok(None)` instead of an
    /// error when suppression is on.
    pub fn try_from_path(path: impl AsRef<Path>, config: &ParseConfig) -> Result<Option<Self>> {
        match Self::from_path_with_config(path.as_ref(), config) {
            Ok(file) => Ok(Some(file)),
            Err(e) if config.suppress_errors => {
                error!("Failed to parse {}: {}", path.as_ref().display(), e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn from_parsed(path: &Path, parsed: ParsedEso) -> Self {
        let created = std::fs::metadata(path)
            .and_then(|m| m.created())
            .map(DateTime::<Local>::from)
            .unwrap_or_else(|_| Local::now());
        let file_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            file_name,
            created,
            header: parsed.header,
            tree: parsed.tree,
            environments: parsed.environments,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn created(&self) -> DateTime<Local> {
        self.created
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn environments(&self) -> &[EnvironmentTables] {
        &self.environments
    }

    /// The primary environment: the last one in the file. Design-day
    /// segments precede the run period in EnergyPlus output.
    pub fn primary_environment(&self) -> Option<&EnvironmentTables> {
        self.environments.last()
    }

    pub fn frequencies(&self) -> Vec<Frequency> {
        self.header.frequencies()
    }

    /// Numeric table for a frequency in the primary environment.
    pub fn table(&self, frequency: Frequency) -> Option<&ResultsTable> {
        self.primary_environment()?.tables.get(&frequency)
    }

    /// Peak minima table for a frequency in the primary environment.
    pub fn local_min(&self, frequency: Frequency) -> Option<&PeakTable> {
        self.primary_environment()?.local_min.get(&frequency)
    }

    /// Peak maxima table for a frequency in the primary environment.
    pub fn local_max(&self, frequency: Frequency) -> Option<&PeakTable> {
        self.primary_environment()?.local_max.get(&frequency)
    }

    /// Query the search tree.
    pub fn find_ids(&self, pattern: &VariablePattern, part_match: bool) -> Vec<i32> {
        self.tree.find_ids(pattern, part_match)
    }

    /// Values of one variable from the primary environment.
    pub fn values(&self, frequency: Frequency, id: i32) -> Result<Vec<f64>> {
        let table = self.table(frequency).ok_or_else(|| EsoError::VariableNotFound {
            id,
            frequency: frequency.to_string(),
        })?;
        table.values(id)
    }

    /// Disambiguate a key against the existing index by suffixing
    /// `" (n)"` until it is unique.
    fn make_unique_key(&self, variable: &Variable) -> String {
        let mut candidate = variable.key().to_string();
        let mut n = 0;
        loop {
            let probe = variable.with_key(&candidate);
            if self
                .tree
                .find_ids(&VariablePattern::exact(&probe), false)
                .is_empty()
            {
                return candidate;
            }
            n += 1;
            candidate = format!("{} ({})", variable.key(), n);
        }
    }

    /// Change one variable's key. The stored key may differ from the
    /// requested one when a suffix is needed to keep the tuple unique.
    pub fn rename_variable(
        &mut self,
        frequency: Frequency,
        id: i32,
        new_key: &str,
    ) -> Result<Variable> {
        let old = self
            .header
            .get(frequency, id)
            .cloned()
            .ok_or_else(|| EsoError::VariableNotFound {
                id,
                frequency: frequency.to_string(),
            })?;
        self.tree.remove(&old);
        let renamed = old.with_key(self.make_unique_key(&old.with_key(new_key)));
        self.tree.insert(id, &renamed);
        self.header.insert(id, renamed.clone());
        for env in &mut self.environments {
            if let Some(table) = env.tables.get_mut(&frequency) {
                if table.variable(id).is_some() {
                    table.rename_variable(id, renamed.clone())?;
                }
            }
            let peak_tables = [
                env.local_min.get_mut(&frequency),
                env.local_max.get_mut(&frequency),
            ];
            for peaks in peak_tables.into_iter().flatten() {
                if peaks.variables.contains_key(&id) {
                    peaks.rename_variable(id, renamed.clone())?;
                }
            }
        }
        Ok(renamed)
    }

    /// Insert a new variable with values for the primary environment.
    /// Other environments receive a NaN-filled column so the table
    /// shape invariant holds everywhere. Returns the assigned id and
    /// the (possibly suffixed) stored variable.
    pub fn insert_variable(
        &mut self,
        variable: Variable,
        values: Vec<f64>,
    ) -> Result<(i32, Variable)> {
        let frequency = variable.frequency();
        if self.table(frequency).is_none() {
            return Err(EsoError::VariableShapeMismatch {
                frequency: frequency.to_string(),
                reason: "no table exists for this frequency".to_string(),
            });
        }
        let stored = variable.with_key(self.make_unique_key(&variable));
        let id = self.header.next_id(frequency);

        let primary_index = self.environments.len() - 1;
        for (i, env) in self.environments.iter_mut().enumerate() {
            let Some(table) = env.tables.get_mut(&frequency) else {
                continue;
            };
            let column = if i == primary_index {
                values.clone()
            } else {
                vec![f64::NAN; table.height()]
            };
            table.insert_column(id, stored.clone(), column)?;
        }

        self.header.insert(id, stored.clone());
        self.tree.insert(id, &stored);
        Ok((id, stored))
    }

    /// Delete variables from the header, tree and every environment's
    /// tables. A frequency whose last variable disappears loses its
    /// tables as well.
    pub fn delete_variables(&mut self, frequency: Frequency, ids: &[i32]) -> Result<()> {
        for &id in ids {
            if let Some(variable) = self.header.remove(frequency, id) {
                self.tree.remove(&variable);
            }
        }
        for env in &mut self.environments {
            let empty = match env.tables.get_mut(&frequency) {
                Some(table) => table.delete_columns(ids)?,
                None => continue,
            };
            if let Some(peaks) = env.local_min.get_mut(&frequency) {
                peaks.delete_columns(ids)?;
            }
            if let Some(peaks) = env.local_max.get_mut(&frequency) {
                peaks.delete_columns(ids)?;
            }
            if empty {
                env.tables.remove(&frequency);
                env.local_min.remove(&frequency);
                env.local_max.remove(&frequency);
            }
        }
        Ok(())
    }
}
