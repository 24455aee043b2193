//! Minimal in-memory table: an ordered header row plus cells of mixed type.
//!
//! The normalized intermediates are plain CSVs, so the cell model only needs
//! to distinguish text, integers, floats and blanks. CSV files are written
//! with a UTF-8 BOM so accented headers survive a round trip through Excel.

use anyhow::{bail, Context, Result};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    Blank,
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        matches!(self, Cell::Blank)
    }

    /// Re-infer a cell from a CSV field: empty → blank, otherwise the
    /// narrowest of integer, float, text. Numeric parsing tolerates
    /// surrounding whitespace left over from currency stripping.
    pub fn from_csv_field(field: &str) -> Cell {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return Cell::Blank;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Cell::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Cell::Float(f);
        }
        Cell::Text(field.to_string())
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Cell::Text(s) => serde_json::Value::String(s.clone()),
            Cell::Int(i) => serde_json::json!(i),
            Cell::Float(f) => serde_json::json!(f),
            Cell::Blank => serde_json::Value::Null,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Blank => Ok(()),
        }
    }
}

/// Ordered columns + rows. Every row holds exactly `columns.len()` cells.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            bail!(
                "row has {} cells but table has {} columns",
                row.len(),
                self.columns.len()
            );
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Rename headers through `f`; headers it returns `None` for are kept.
    pub fn rename_columns(&mut self, f: impl Fn(&str) -> Option<&'static str>) {
        for col in &mut self.columns {
            if let Some(new) = f(col) {
                *col = new.to_string();
            }
        }
    }

    /// Rewrite every cell of one column in place.
    pub fn map_column(&mut self, idx: usize, mut f: impl FnMut(Cell) -> Cell) {
        for row in &mut self.rows {
            let cell = std::mem::replace(&mut row[idx], Cell::Blank);
            row[idx] = f(cell);
        }
    }

    /// Rewrite every cell of the whole table in place.
    pub fn map_cells(&mut self, mut f: impl FnMut(Cell) -> Cell) {
        for row in &mut self.rows {
            for slot in row.iter_mut() {
                let cell = std::mem::replace(slot, Cell::Blank);
                *slot = f(cell);
            }
        }
    }

    pub fn retain_rows(&mut self, mut pred: impl FnMut(&[Cell]) -> bool) {
        self.rows.retain(|row| pred(row));
    }

    /// Append a new column holding the same value in every existing row.
    pub fn push_column(&mut self, name: impl Into<String>, value: Cell) {
        self.columns.push(name.into());
        for row in &mut self.rows {
            row.push(value.clone());
        }
    }

    /// Drop every column whose header satisfies `pred`.
    pub fn drop_columns(&mut self, pred: impl Fn(&str) -> bool) {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !pred(&self.columns[i]))
            .collect();
        self.columns = keep.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            *row = keep.iter().map(|&i| row[i].clone()).collect();
        }
    }

    /// Write the table as CSV, prefixed with a UTF-8 BOM.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        let mut out = BufWriter::new(file);
        out.write_all("\u{feff}".as_bytes())
            .with_context(|| format!("writing BOM to {}", path.display()))?;

        // The csv crate rejects zero-field records; a columnless table is
        // just the BOM.
        if self.columns.is_empty() {
            out.flush()
                .with_context(|| format!("flushing {}", path.display()))?;
            return Ok(());
        }

        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|c| c.to_string()))?;
        }
        writer
            .flush()
            .with_context(|| format!("flushing {}", path.display()))?;
        Ok(())
    }

    /// Read a CSV written by `write_csv` (or any headered CSV), re-inferring
    /// cell types. A leading BOM on the first header is stripped.
    pub fn read_csv(path: &Path) -> Result<Table> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;

        let columns: Vec<String> = reader
            .headers()
            .with_context(|| format!("reading headers of {}", path.display()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut table = Table::new(columns);
        for record in reader.records() {
            let record =
                record.with_context(|| format!("reading row of {}", path.display()))?;
            let mut row: Vec<Cell> =
                record.iter().map(Cell::from_csv_field).collect();
            // Tolerate ragged rows from hand-edited files.
            row.resize(table.columns.len(), Cell::Blank);
            table.rows.push(row);
        }
        Ok(table)
    }
}
