//! Per-file ingestion: filename date range, banner skip, group filter,
//! column mapping, currency cleanup, date tagging, CSV output.

use super::currency;
use super::mapping::{self, Correspondence};
use super::table::{Cell, Table};
use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook, Data, Reader, Xlsx};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Statement filenames carry their reporting period, e.g.
/// `"Extrato 01012024 à 31012024.xlsx"`.
static DATE_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2})(\d{2})(\d{4}) à (\d{2})(\d{2})(\d{4})")
        .expect("date range pattern should be valid")
});

/// The reporting period of one statement file, both ends as `YYYYMMDD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub init_date: String,
    pub final_date: String,
}

/// Parse the `DDMMYYYY à DDMMYYYY` range out of a filename, reordering each
/// triple to `YYYYMMDD`. `None` when the name does not carry a range.
pub fn parse_date_range(file_name: &str) -> Option<DateRange> {
    let caps = DATE_RANGE_RE.captures(file_name)?;
    Some(DateRange {
        init_date: format!("{}{}{}", &caps[3], &caps[2], &caps[1]),
        final_date: format!("{}{}{}", &caps[6], &caps[5], &caps[4]),
    })
}

fn cell_from_excel(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Blank,
        Data::String(s) if s.is_empty() => Cell::Blank,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => {
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                Cell::Int(*f as i64)
            } else {
                Cell::Float(*f)
            }
        }
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Text(format!("{}", dt)),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Blank,
    }
}

/// Load the first worksheet of an `.xlsx` file. The first physical row is a
/// banner and is discarded; the second row is the header. Headerless columns
/// get pandas-style `Unnamed: N` placeholders.
pub fn load_sheet(path: &Path) -> Result<Table> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("opening spreadsheet {}", path.display()))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("{} has no worksheets", path.display()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("reading sheet {:?} of {}", sheet_name, path.display()))?;

    let mut rows = range.rows().skip(1);
    let header_row = rows
        .next()
        .ok_or_else(|| anyhow!("{} has no header row below the banner", path.display()))?;

    let columns: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(i, d)| match d {
            Data::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            Data::Empty => format!("Unnamed: {}", i),
            other => {
                let s = other.to_string();
                if s.trim().is_empty() {
                    format!("Unnamed: {}", i)
                } else {
                    s.trim().to_string()
                }
            }
        })
        .collect();

    let mut table = Table::new(columns);
    for row in rows {
        let cells: Vec<Cell> = row.iter().map(cell_from_excel).collect();
        table.push_row(cells)?;
    }
    Ok(table)
}

/// Ingest one source file end to end. Returns the path of the normalized CSV,
/// or `None` when the file is not a statement (wrong extension or no date
/// range in the name) and was skipped.
pub fn ingest_file(
    path: &Path,
    out_dir: &Path,
    correspondence: &Correspondence,
) -> Result<Option<PathBuf>> {
    let file_name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return Ok(None),
    };
    if path.extension().and_then(|e| e.to_str()) != Some("xlsx") {
        debug!(file = file_name, "not a spreadsheet; skipping");
        return Ok(None);
    }
    let range = match parse_date_range(file_name) {
        Some(r) => r,
        None => {
            debug!(file = file_name, "no date range in name; skipping");
            return Ok(None);
        }
    };

    let mut table = load_sheet(path)?;

    // Group filter runs on the original header, before renaming.
    let group_idx = table
        .column_index("Grupo")
        .ok_or_else(|| anyhow!("{} has no 'Grupo' column", path.display()))?;
    table.retain_rows(|row| !row[group_idx].is_blank());

    mapping::apply(&mut table, correspondence);
    currency::apply(&mut table);

    table.push_column("init_date", Cell::Text(range.init_date.clone()));
    table.push_column("final_date", Cell::Text(range.final_date.clone()));

    let stem = file_name.trim_end_matches(".xlsx");
    let out_path = out_dir.join(format!("{}_csv.csv", stem));
    table.write_csv(&out_path)?;
    info!(
        file = file_name,
        rows = table.len(),
        init_date = %range.init_date,
        final_date = %range.final_date,
        "normalized"
    );
    Ok(Some(out_path))
}

/// Ingest every statement in `input_dir` into `out_dir`, in lexicographic
/// filename order. Returns how many normalized CSVs were written.
pub fn ingest_dir(
    input_dir: &Path,
    out_dir: &Path,
    correspondence: &Correspondence,
) -> Result<usize> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let mut paths: Vec<PathBuf> = fs::read_dir(input_dir)
        .with_context(|| format!("listing input directory {}", input_dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    // Explicit sort keeps processing order stable across platforms.
    paths.sort();

    let mut written = 0;
    for path in &paths {
        if ingest_file(path, out_dir, correspondence)?.is_some() {
            written += 1;
        }
    }
    Ok(written)
}
