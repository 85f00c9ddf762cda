//! Console previews of loaded and enriched tables.
//!
//! Prints the first few rows of a table as an aligned text grid on stdout,
//! with the row index in the first column. Purely observational.

use crate::models::Table;

/// Cells wider than this are cut and suffixed with `...`.
const MAX_CELL_WIDTH: usize = 40;

/// Format the first `rows` rows of `table`.
pub fn format_head(table: &Table, rows: usize) -> String {
    let shown = table.rows.iter().take(rows);

    let index_cells: Vec<String> = (0..table.len().min(rows)).map(|i| i.to_string()).collect();
    let body: Vec<Vec<String>> = shown
        .map(|row| row.iter().map(|v| truncate(&v.to_string())).collect())
        .collect();

    let index_width = index_cells.iter().map(|s| s.len()).max().unwrap_or(0);
    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(col, name)| {
            body.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    out.push_str(&format!(
        "{} (showing {} of {} rows)\n",
        table.name,
        index_cells.len(),
        table.len()
    ));

    out.push_str(&" ".repeat(index_width));
    for (name, width) in table.columns.iter().zip(&widths) {
        out.push_str(&format!("  {:>width$}", name, width = *width));
    }
    out.push('\n');

    for (idx, row) in index_cells.iter().zip(&body) {
        out.push_str(&format!("{:<width$}", idx, width = index_width));
        for (cell, width) in row.iter().zip(&widths) {
            out.push_str(&format!("  {:>width$}", cell, width = *width));
        }
        out.push('\n');
    }
    out
}

/// Print the head of `table` to stdout; `rows == 0` prints nothing.
pub fn print_head(table: &Table, rows: usize) {
    if rows == 0 {
        return;
    }
    println!("{}", format_head(table, rows));
}

fn truncate(cell: &str) -> String {
    if cell.chars().count() <= MAX_CELL_WIDTH {
        return cell.replace('\n', " ");
    }
    let cut: String = cell.chars().take(MAX_CELL_WIDTH - 3).collect();
    format!("{}...", cut.replace('\n', " "))
}
