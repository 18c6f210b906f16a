//! Command-line interface components.

use crate::config::ParseConfig;
use crate::file::EsoFile;
use crate::models::Frequency;
use crate::processor::BatchProcessor;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "eso-processor")]
#[command(about = "Parse EnergyPlus ESO output into queryable time-series tables")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse one ESO file and print its contents summary
    Inspect {
        /// Path to the ESO file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Explicit base year (validated against the file's calendar signal)
        #[arg(long)]
        year: Option<i32>,

        /// Skip min/max peak tracking
        #[arg(long)]
        no_peaks: bool,

        /// Comma-separated reporting frequencies to exclude
        /// (timestep, hourly, daily, monthly, annual, runperiod)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// List every variable instead of per-frequency counts only
        #[arg(long)]
        variables: bool,
    },
    /// Parse every ESO file under a directory and report failures
    Check {
        /// Root directory (or single file) to scan
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Maximum concurrent file parses
        #[arg(short, long)]
        jobs: Option<usize>,
    },
}

/// Initialize the tracing subscriber from the environment, with the
/// verbose flag forcing debug level.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    match args.command {
        Commands::Inspect {
            file,
            year,
            no_peaks,
            exclude,
            variables,
        } => inspect(file, year, no_peaks, &exclude, variables),
        Commands::Check { path, jobs } => check(path, jobs).await,
    }
}

fn parse_excluded(words: &[String]) -> anyhow::Result<Vec<Frequency>> {
    words
        .iter()
        .map(|word| {
            Frequency::from_keyword(word)
                .with_context(|| format!("unknown reporting frequency '{}'", word))
        })
        .collect()
}

fn inspect(
    path: PathBuf,
    year: Option<i32>,
    no_peaks: bool,
    exclude: &[String],
    list_variables: bool,
) -> anyhow::Result<()> {
    let mut config = ParseConfig::new()
        .with_excluded(parse_excluded(exclude)?)
        .with_peaks(!no_peaks);
    if let Some(year) = year {
        config = config.with_year(year);
    }

    let file = EsoFile::from_path_with_config(&path, &config)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    println!("{}", file.file_name().bright_green().bold());
    println!("  {} {}", "Path:".bright_cyan(), file.path().display());
    println!(
        "  {} {}",
        "Created:".bright_cyan(),
        file.created().format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "  {} {}",
        "Environments:".bright_cyan(),
        file.environments().len()
    );
    for env in file.environments() {
        println!("\n  {}", env.name.bright_yellow());
        for (frequency, table) in &env.tables {
            let peaks = if env.local_min.contains_key(frequency) {
                " (+peaks)"
            } else {
                ""
            };
            println!(
                "    {:<10} {} rows x {} variables{}",
                frequency.to_string(),
                table.height().to_string().bright_white(),
                table.ids().len().to_string().bright_white(),
                peaks
            );
            if list_variables {
                for (id, variable) in table.variables() {
                    println!("      {:>6}  {}", id, variable);
                }
            }
        }
    }
    Ok(())
}

async fn check(path: PathBuf, jobs: Option<usize>) -> anyhow::Result<()> {
    let mut processor = BatchProcessor::new(path);
    if let Some(jobs) = jobs {
        processor = processor.with_concurrency(jobs);
    }
    let stats = processor.process().await?;
    if stats.files_failed > 0 {
        bail!("{} file(s) failed to parse", stats.files_failed);
    }
    Ok(())
}
