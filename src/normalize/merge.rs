//! Concatenates the per-file normalized CSVs into one combined table.

use super::table::{Cell, Table};
use anyhow::{Context, Result};
use glob::glob;
use std::path::{Path, PathBuf};
use tracing::info;

/// Append `other` onto `merged`, widening the column set to the union.
/// Rows gain blanks for columns their source file lacked.
pub fn concat_into(merged: &mut Table, other: &Table) {
    for col in other.columns() {
        if merged.column_index(col).is_none() {
            merged.push_column(col.clone(), Cell::Blank);
        }
    }
    // Source column position inside the widened table, per column.
    let positions: Vec<usize> = other
        .columns()
        .iter()
        .map(|c| merged.column_index(c).expect("column was just added"))
        .collect();

    let width = merged.columns().len();
    for row in other.rows() {
        let mut out = vec![Cell::Blank; width];
        for (cell, &pos) in row.iter().zip(&positions) {
            out[pos] = cell.clone();
        }
        merged
            .push_row(out)
            .expect("widened row matches merged arity");
    }
}

/// Merge every `*.csv` under `dir` (except the merged artifact itself) into
/// `dir/<merged_name>`, in lexicographic path order. Returns the artifact
/// path.
pub fn merge_dir(dir: &Path, merged_name: &str) -> Result<PathBuf> {
    let pattern = format!("{}/*.csv", dir.display());
    let mut paths: Vec<PathBuf> = glob(&pattern)
        .context("invalid glob pattern for merge")?
        .filter_map(|entry| entry.ok())
        .filter(|p| {
            p.file_name().and_then(|n| n.to_str()) != Some(merged_name)
        })
        .collect();
    paths.sort();

    let mut merged = Table::default();
    for path in &paths {
        let table = Table::read_csv(path)?;
        concat_into(&mut merged, &table);
    }

    let out_path = dir.join(merged_name);
    merged.write_csv(&out_path)?;
    info!(
        files = paths.len(),
        rows = merged.len(),
        out = %out_path.display(),
        "merged"
    );
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    fn table(cols: &[&str], rows: &[&[Cell]]) -> Table {
        let mut t = Table::new(cols.iter().map(|c| c.to_string()).collect());
        for row in rows {
            t.push_row(row.to_vec()).unwrap();
        }
        t
    }

    #[test]
    fn disjoint_extra_columns_union_with_blanks() {
        let a = table(
            &["grupo", "rake"],
            &[&[Cell::Text("A".into()), Cell::Float(1.5)]],
        );
        let b = table(
            &["grupo", "overlay"],
            &[&[Cell::Text("B".into()), Cell::Int(3)]],
        );

        let mut merged = Table::default();
        concat_into(&mut merged, &a);
        concat_into(&mut merged, &b);

        assert_eq!(merged.columns(), &["grupo", "rake", "overlay"]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.rows()[0], vec![
            Cell::Text("A".into()),
            Cell::Float(1.5),
            Cell::Blank,
        ]);
        assert_eq!(merged.rows()[1], vec![
            Cell::Text("B".into()),
            Cell::Blank,
            Cell::Int(3),
        ]);
    }

    #[test]
    fn merge_dir_skips_its_own_artifact_and_sorts() -> Result<()> {
        let dir = tempdir()?;

        table(&["grupo"], &[&[Cell::Text("B".into())]])
            .write_csv(&dir.path().join("b_csv.csv"))?;
        table(&["grupo"], &[&[Cell::Text("A".into())]])
            .write_csv(&dir.path().join("a_csv.csv"))?;

        // First merge, then merge again: the artifact must not fold into
        // itself on the second run.
        merge_dir(dir.path(), "merged_output.csv")?;
        let out = merge_dir(dir.path(), "merged_output.csv")?;

        let merged = Table::read_csv(&out)?;
        assert_eq!(merged.len(), 2);
        // Lexicographic file order, not creation order.
        assert_eq!(merged.rows()[0][0], Cell::Text("A".into()));
        assert_eq!(merged.rows()[1][0], Cell::Text("B".into()));
        Ok(())
    }
}
