//! CSV export of the enriched visits.
//!
//! The file layout is `<row-index>,<columns...>`: the first header cell is
//! empty and each row starts with its zero-based position. Fields are quoted
//! only when they contain a delimiter, a quote, or a line break.
//!
//! Output is written to a temporary file beside the destination and renamed
//! over it, so a failed run never leaves a truncated CSV behind.

use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::ExportError;
use crate::models::Table;

/// Serialize `table` as CSV into `out`.
pub fn write_csv_to<W: Write>(table: &Table, out: &mut W) -> std::io::Result<()> {
    // Row-index column has no name.
    for column in &table.columns {
        write!(out, ",{}", escape_csv_field(column))?;
    }
    out.write_all(b"\n")?;

    for (idx, row) in table.rows.iter().enumerate() {
        write!(out, "{}", idx)?;
        for value in row {
            write!(out, ",{}", escape_csv_field(&value.to_string()))?;
        }
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Render `table` as a CSV string.
pub fn render_csv(table: &Table) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_csv_to(table, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Atomically write `table` to `dest`, replacing any existing file.
pub fn write_csv(table: &Table, dest: &Path) -> Result<(), ExportError> {
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(ExportError::destination(
            dest,
            format!("directory {} does not exist", parent.display()),
        ));
    }

    let tmp = NamedTempFile::new_in(parent).map_err(|e| ExportError::destination(dest, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        write_csv_to(table, &mut writer).map_err(|e| ExportError::destination(dest, e))?;
        writer
            .flush()
            .map_err(|e| ExportError::destination(dest, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| ExportError::destination(dest, e))?;
    tmp.persist(dest)
        .map_err(|e| ExportError::destination(dest, e.error))?;

    info!(path = %dest.display(), rows = table.len(), "wrote csv");
    Ok(())
}

fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
