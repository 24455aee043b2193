//! Strips currency formatting from textual cells.

use super::table::{Cell, Table};

/// Remove the `R$` prefix and thousands-separator commas from a textual
/// cell. Non-textual cells pass through untouched, so already-typed numeric
/// columns keep their types.
pub fn strip_currency(cell: Cell) -> Cell {
    match cell {
        Cell::Text(s) => Cell::Text(s.replace("R$", "").replace(',', "")),
        other => other,
    }
}

/// Apply [`strip_currency`] to every cell of the table.
pub fn apply(table: &mut Table) {
    table.map_cells(strip_currency);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textual_cells_lose_symbol_and_separators() {
        assert_eq!(
            strip_currency(Cell::Text("R$ 1,234.56".into())),
            Cell::Text(" 1234.56".into())
        );
        assert_eq!(
            strip_currency(Cell::Text("R$-10.00".into())),
            Cell::Text("-10.00".into())
        );
        // No symbol, no commas: unchanged text.
        assert_eq!(
            strip_currency(Cell::Text("Clube A".into())),
            Cell::Text("Clube A".into())
        );
    }

    #[test]
    fn non_textual_cells_pass_through() {
        assert_eq!(strip_currency(Cell::Int(1234)), Cell::Int(1234));
        assert_eq!(strip_currency(Cell::Float(12.5)), Cell::Float(12.5));
        assert_eq!(strip_currency(Cell::Blank), Cell::Blank);
    }
}
