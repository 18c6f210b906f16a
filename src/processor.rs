//! Batch processing of ESO files.
//!
//! Discovers `.eso` files under a root, parses them concurrently and
//! reports aggregate statistics. Each file parse is independent; no
//! state is shared across in-flight parses.

use crate::config::ParseConfig;
use crate::constants::ESO_EXTENSION;
use crate::error::{EsoError, Result};
use crate::file::EsoFile;

use colored::*;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::task;
use tracing::{debug, error};

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchStats {
    pub files_processed: usize,
    pub files_failed: usize,
    pub total_variables: usize,
    pub elapsed_ms: u128,
    pub failures: Vec<(PathBuf, String)>,
}

/// Concurrent ESO batch processor.
pub struct BatchProcessor {
    root: PathBuf,
    config: ParseConfig,
    max_concurrent: usize,
}

impl BatchProcessor {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: ParseConfig::default(),
            max_concurrent: num_cpus::get(),
        }
    }

    pub fn with_config(mut self, config: ParseConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_concurrency(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Find all ESO files under the root; a root that is itself a
    /// file is processed alone.
    pub fn discover_files(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Err(EsoError::FileNotFound {
                path: self.root.clone(),
            });
        }
        if self.root.is_file() {
            return Ok(vec![self.root.clone()]);
        }
        let pattern = self
            .root
            .join(format!("**/*.{}", ESO_EXTENSION))
            .to_string_lossy()
            .into_owned();
        debug!("Discovering ESO files with pattern: {}", pattern);
        let mut files: Vec<PathBuf> = glob::glob(&pattern)
            .map_err(|e| EsoError::FileNotFound {
                path: PathBuf::from(e.to_string()),
            })?
            .filter_map(|entry| entry.ok())
            .collect();
        files.sort();
        Ok(files)
    }

    /// Parse all discovered files concurrently.
    pub async fn process(&self) -> Result<BatchStats> {
        let start = Instant::now();
        let files = self.discover_files()?;
        println!(
            "{} {} ESO files under {}",
            "Found".bright_green(),
            files.len().to_string().bright_white().bold(),
            self.root.display()
        );
        if files.is_empty() {
            return Ok(BatchStats::default());
        }

        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
                )
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_message("Parsing files");

        let limit = self.max_concurrent.min(files.len());
        let config = Arc::new(self.config.clone());

        let results: Vec<(PathBuf, std::result::Result<usize, String>)> = stream::iter(files)
            .map(|path| {
                let config = Arc::clone(&config);
                let pb = pb.clone();
                async move {
                    let parse_path = path.clone();
                    let outcome = task::spawn_blocking(move || {
                        EsoFile::from_path_with_config(&parse_path, &config)
                            .map(|file| file.header().len())
                            .map_err(|e| e.to_string())
                    })
                    .await
                    .unwrap_or_else(|e| Err(format!("parse task panicked: {}", e)));
                    pb.inc(1);
                    (path, outcome)
                }
            })
            .buffer_unordered(limit)
            .collect()
            .await;
        pb.finish_and_clear();

        let mut stats = BatchStats::default();
        for (path, outcome) in results {
            match outcome {
                Ok(variables) => {
                    stats.files_processed += 1;
                    stats.total_variables += variables;
                }
                Err(reason) => {
                    error!("Failed to parse {}: {}", path.display(), reason);
                    stats.files_failed += 1;
                    stats.failures.push((path, reason));
                }
            }
        }
        stats.elapsed_ms = start.elapsed().as_millis();
        self.report(&stats);
        Ok(stats)
    }

    fn report(&self, stats: &BatchStats) {
        println!("\n{}", "Batch Summary".bright_green().bold());
        println!(
            "  {} {}ms",
            "Time elapsed:".bright_cyan(),
            stats.elapsed_ms.to_string().bright_white()
        );
        println!(
            "  {} {}",
            "Files parsed:".bright_cyan(),
            stats.files_processed.to_string().bright_white()
        );
        println!(
            "  {} {}",
            "Total variables:".bright_cyan(),
            stats.total_variables.to_string().bright_white().bold()
        );
        if stats.files_failed > 0 {
            println!(
                "  {} {}",
                "Files failed:".bright_red(),
                stats.files_failed.to_string().bright_red().bold()
            );
            for (path, reason) in &stats.failures {
                println!("    {} {}", path.display().to_string().bright_red(), reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_missing_root() {
        let processor = BatchProcessor::new(PathBuf::from("/nonexistent/eso/root"));
        assert!(matches!(
            processor.discover_files(),
            Err(EsoError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_discover_single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("run.eso");
        std::fs::write(&file, "x").unwrap();
        let processor = BatchProcessor::new(file.clone());
        assert_eq!(processor.discover_files().unwrap(), vec![file]);
    }

    #[tokio::test]
    async fn test_process_records_failures_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("good.eso"),
            crate::parser::tests::sample_eso(),
        )
        .unwrap();
        std::fs::write(dir.path().join("bad.eso"), "not an eso file\n").unwrap();

        let processor = BatchProcessor::new(dir.path().to_path_buf()).with_concurrency(2);
        let stats = processor.process().await.unwrap();

        assert_eq!(stats.files_processed, 1);
        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.total_variables, 3);
        assert_eq!(stats.failures.len(), 1);
        assert!(stats.failures[0].0.ends_with("bad.eso"));
    }

    #[test]
    fn test_discover_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("one.eso"), "x").unwrap();
        std::fs::write(dir.path().join("two.eso"), "x").unwrap();
        std::fs::write(dir.path().join("skip.csv"), "x").unwrap();
        let processor = BatchProcessor::new(dir.path().to_path_buf());
        let files = processor.discover_files().unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "eso"));
    }
}
