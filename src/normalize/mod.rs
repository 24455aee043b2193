//! Stage 2: turn downloaded statement spreadsheets into one merged CSV.

pub mod currency;
pub mod mapping;
pub mod merge;
pub mod sheet;
pub mod table;

use crate::config;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Run the whole normalize stage against the configured directories:
/// ingest every statement in the input dir, then merge the per-file CSVs.
pub fn run() -> Result<()> {
    run_at(
        Path::new(config::INPUT_DIR),
        Path::new(config::NORMALIZED_DIR),
        Path::new(config::CORRESPONDENCE_FILE),
    )
}

/// As [`run`], with explicit paths.
pub fn run_at(input_dir: &Path, normalized_dir: &Path, correspondence: &Path) -> Result<()> {
    let correspondence = mapping::Correspondence::load(correspondence)?;

    let written = sheet::ingest_dir(input_dir, normalized_dir, &correspondence)
        .context("ingesting statement spreadsheets")?;
    info!(files = written, "ingestion done");

    merge::merge_dir(normalized_dir, config::MERGED_FILE_NAME)
        .context("merging normalized statements")?;
    Ok(())
}
