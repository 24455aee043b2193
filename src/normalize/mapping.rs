//! Column renaming and best-effort type coercion.
//!
//! Renaming is driven by a static table of the headers the statement
//! spreadsheets actually use; coercion is driven by the external
//! correspondence CSV, whose type column carries Postgres type names.
//! Coercion never fails: a cell that cannot be parsed as the declared type
//! is kept in its original representation.

use super::table::{Cell, Table};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Spreadsheet header → canonical snake_case name.
static RENAME_TABLE: &[(&str, &str)] = &[
    ("Grupo", "grupo"),
    ("Liga", "liga"),
    ("ID Slot", "id_slot"),
    ("Nome do Slot", "nome_slot"),
    ("Taxa Liga %", "taxa_liga_porc"),
    ("Taxa App%", "taxa_app_porc"),
    ("Taxa Rodeo GGR %", "taxa_rodeo_ggr_porc"),
    ("Taxa Rodeo APP %", "taxa_rodeo_app_porc"),
    ("Rake", "rake"),
    ("Ativos", "ativos"),
    ("Rodeo PL", "rodeo_pl"),
    ("Handcap", "handcap"),
    ("Resultado do Clube", "resultado_clube"),
    ("Resultado Final do Clube MTT/SNG", "resultado_final_mtt_sng"),
    ("Resultado Final do Clube RG", "resultado_final_rg"),
    ("Rebate", "rebate"),
    ("Taxa Liga", "taxa_liga_valor"),
    ("Taxa App", "taxa_app_valor"),
    ("Taxa Rodeo", "taxa_rodeo_valor"),
    ("Vendas", "vendas"),
    ("Acordos/Acertos", "acordos_acertos"),
    ("Diamantes Liga", "diamantes_liga"),
    ("Overlay", "overlay"),
    ("Security", "security"),
    ("Adiantamentos", "adiantamentos"),
    ("Inadimplencia", "inadimplencia"),
    ("Eventos", "eventos"),
    ("Estorno de Taxas", "estorno_taxas"),
    ("Rakeback", "rakeback"),
    ("Descontos", "descontos"),
    ("Acerto Final", "acerto_final"),
];

/// Canonical name for a spreadsheet header, if it is a known column.
pub fn canonical_name(header: &str) -> Option<&'static str> {
    RENAME_TABLE
        .iter()
        .find(|(from, _)| *from == header)
        .map(|(_, to)| *to)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Decimal,
}

impl ColumnType {
    /// Map the Postgres type names used by the correspondence CSV. Unknown
    /// names yield `None` and the column keeps whatever types it has.
    pub fn from_pg_name(name: &str) -> Option<ColumnType> {
        match name.trim() {
            "text" => Some(ColumnType::Text),
            "int2" | "int4" | "bigint" => Some(ColumnType::Integer),
            "numeric" => Some(ColumnType::Decimal),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CorrespondenceRecord {
    #[serde(rename = "nome tabela nova")]
    target_column: String,
    #[serde(rename = "tipo de dado")]
    data_type: String,
}

/// The correspondence table: canonical column name → declared target type,
/// in file order. Loaded once per run.
pub struct Correspondence {
    entries: Vec<(String, ColumnType)>,
}

impl Correspondence {
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("opening correspondence table {}", path.display()))?;
        let mut entries = Vec::new();
        for record in reader.deserialize::<CorrespondenceRecord>() {
            let record = record
                .with_context(|| format!("reading correspondence table {}", path.display()))?;
            if let Some(ty) = ColumnType::from_pg_name(&record.data_type) {
                entries.push((record.target_column, ty));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[(String, ColumnType)] {
        &self.entries
    }
}

/// Outcome of a single-cell coercion: either the cell was cast to the
/// declared type, or the original was kept because the cast is impossible.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    Cast(Cell),
    Kept(Cell),
}

impl Coerced {
    pub fn into_cell(self) -> Cell {
        match self {
            Coerced::Cast(c) | Coerced::Kept(c) => c,
        }
    }
}

/// Best-effort cast of one cell. Blanks are always kept as blanks.
pub fn coerce(cell: Cell, ty: ColumnType) -> Coerced {
    match (ty, cell) {
        (_, Cell::Blank) => Coerced::Kept(Cell::Blank),

        (ColumnType::Text, Cell::Text(s)) => Coerced::Cast(Cell::Text(s)),
        (ColumnType::Text, other) => Coerced::Cast(Cell::Text(other.to_string())),

        (ColumnType::Integer, Cell::Int(i)) => Coerced::Cast(Cell::Int(i)),
        (ColumnType::Integer, Cell::Float(f)) if f.fract() == 0.0 => {
            Coerced::Cast(Cell::Int(f as i64))
        }
        (ColumnType::Integer, Cell::Text(s)) => match s.trim().parse::<i64>() {
            Ok(i) => Coerced::Cast(Cell::Int(i)),
            Err(_) => Coerced::Kept(Cell::Text(s)),
        },
        (ColumnType::Integer, other) => Coerced::Kept(other),

        (ColumnType::Decimal, Cell::Float(f)) => Coerced::Cast(Cell::Float(f)),
        (ColumnType::Decimal, Cell::Int(i)) => Coerced::Cast(Cell::Float(i as f64)),
        (ColumnType::Decimal, Cell::Text(s)) => match s.trim().parse::<f64>() {
            Ok(f) => Coerced::Cast(Cell::Float(f)),
            Err(_) => Coerced::Kept(Cell::Text(s)),
        },
    }
}

/// Rename known headers, then coerce every column the correspondence table
/// declares a type for.
pub fn apply(table: &mut Table, correspondence: &Correspondence) {
    table.rename_columns(canonical_name);
    for (name, ty) in correspondence.entries() {
        if let Some(idx) = table.column_index(name) {
            table.map_column(idx, |cell| coerce(cell, *ty).into_cell());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn known_headers_are_renamed_unknown_kept() {
        let mut table = Table::new(vec![
            "Grupo".into(),
            "Taxa Liga %".into(),
            "Coluna Nova".into(),
        ]);
        table.rename_columns(canonical_name);
        assert_eq!(table.columns(), &["grupo", "taxa_liga_porc", "Coluna Nova"]);
    }

    #[test]
    fn coercion_casts_or_keeps_never_fails() {
        assert_eq!(
            coerce(Cell::Text("12".into()), ColumnType::Integer),
            Coerced::Cast(Cell::Int(12))
        );
        assert_eq!(
            coerce(Cell::Float(12.0), ColumnType::Integer),
            Coerced::Cast(Cell::Int(12))
        );
        // A fractional float is not an integer; the original survives.
        assert_eq!(
            coerce(Cell::Float(12.5), ColumnType::Integer),
            Coerced::Kept(Cell::Float(12.5))
        );
        assert_eq!(
            coerce(Cell::Text("abc".into()), ColumnType::Integer),
            Coerced::Kept(Cell::Text("abc".into()))
        );
        assert_eq!(
            coerce(Cell::Text(" 1200.50 ".into()), ColumnType::Decimal),
            Coerced::Cast(Cell::Float(1200.5))
        );
        assert_eq!(
            coerce(Cell::Int(3), ColumnType::Text),
            Coerced::Cast(Cell::Text("3".into()))
        );
        assert_eq!(
            coerce(Cell::Blank, ColumnType::Decimal),
            Coerced::Kept(Cell::Blank)
        );
    }

    #[test]
    fn correspondence_maps_pg_names_and_skips_unknown() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "nome tabela nova,tipo de dado")?;
        writeln!(file, "grupo,text")?;
        writeln!(file, "ativos,int4")?;
        writeln!(file, "id_slot,bigint")?;
        writeln!(file, "handcap,int2")?;
        writeln!(file, "rake,numeric")?;
        writeln!(file, "misterio,jsonb")?;
        file.flush()?;

        let corr = Correspondence::load(file.path())?;
        let entries = corr.entries();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0], ("grupo".to_string(), ColumnType::Text));
        assert_eq!(entries[1], ("ativos".to_string(), ColumnType::Integer));
        assert_eq!(entries[2], ("id_slot".to_string(), ColumnType::Integer));
        assert_eq!(entries[3], ("handcap".to_string(), ColumnType::Integer));
        assert_eq!(entries[4], ("rake".to_string(), ColumnType::Decimal));
        Ok(())
    }

    #[test]
    fn apply_renames_then_types_matching_columns() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "nome tabela nova,tipo de dado")?;
        writeln!(file, "ativos,int4")?;
        writeln!(file, "rake,numeric")?;
        file.flush()?;
        let corr = Correspondence::load(file.path())?;

        let mut table = Table::new(vec!["Grupo".into(), "Ativos".into(), "Rake".into()]);
        table.push_row(vec![
            Cell::Text("Clube A".into()),
            Cell::Text("15".into()),
            Cell::Text("980.25".into()),
        ])?;
        table.push_row(vec![
            Cell::Text("Clube B".into()),
            Cell::Text("n/d".into()),
            Cell::Float(10.0),
        ])?;

        apply(&mut table, &corr);
        assert_eq!(table.columns(), &["grupo", "ativos", "rake"]);
        assert_eq!(table.rows()[0][1], Cell::Int(15));
        assert_eq!(table.rows()[0][2], Cell::Float(980.25));
        // Unparseable stays as-is.
        assert_eq!(table.rows()[1][1], Cell::Text("n/d".into()));
        assert_eq!(table.rows()[1][2], Cell::Float(10.0));
        Ok(())
    }
}
