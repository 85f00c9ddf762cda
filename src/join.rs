//! The visits ⋈ urls join.
//!
//! The join is index-then-map: [`UrlIndex::build`] reads every `urls` row
//! into an `id → url` map (later rows overwrite earlier ones), then
//! [`enrich`] walks `visits` in order and looks up each `url` foreign key.
//! A miss never fails; the row gets a `NULL` in `url_visited`.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::ExportError;
use crate::models::{Table, Value};

/// Name of the derived column holding the resolved URL.
pub const URL_VISITED: &str = "url_visited";

/// Lookup from URL id to URL string.
#[derive(Debug, Default)]
pub struct UrlIndex {
    urls: HashMap<i64, Value>,
}

impl UrlIndex {
    /// Build the index from a loaded `urls` table.
    ///
    /// Rows whose `id` is not an integer cannot be referenced by a visit and
    /// are skipped.
    pub fn build(urls: &Table) -> Result<Self, ExportError> {
        let id_col = urls
            .column_index("id")
            .ok_or_else(|| ExportError::schema(&urls.name, "missing column 'id'"))?;
        let url_col = urls
            .column_index("url")
            .ok_or_else(|| ExportError::schema(&urls.name, "missing column 'url'"))?;

        let mut map = HashMap::with_capacity(urls.len());
        let mut skipped = 0usize;
        for row in &urls.rows {
            let Some(id) = row.get(id_col).and_then(Value::as_key) else {
                skipped += 1;
                continue;
            };
            let url = row.get(url_col).cloned().unwrap_or(Value::Null);
            if map.insert(id, url).is_some() {
                debug!(id, "duplicate url id, keeping later row");
            }
        }

        info!(entries = map.len(), skipped, "built url index");
        Ok(Self { urls: map })
    }

    /// Resolve a foreign-key cell. `NULL`, non-integer and unknown keys all
    /// resolve to `None`.
    pub fn resolve(&self, key: &Value) -> Option<&Value> {
        key.as_key().and_then(|id| self.urls.get(&id))
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }
}

/// Result of [`enrich`]: the enriched visits plus resolution counts.
#[derive(Debug, Clone, PartialEq)]
pub struct Enriched {
    pub table: Table,
    pub resolved: usize,
    pub unresolved: usize,
}

/// Attach `url_visited` to every visit row, preserving row order.
///
/// If `visits` already carries a `url_visited` column it is overwritten in
/// place; otherwise the column is appended.
pub fn enrich(visits: Table, index: &UrlIndex) -> Result<Enriched, ExportError> {
    let fk_col = visits
        .column_index("url")
        .ok_or_else(|| ExportError::schema(&visits.name, "missing column 'url'"))?;

    let Table {
        name,
        mut columns,
        rows,
    } = visits;

    let width = columns.len();
    let target_col = match columns.iter().position(|c| c == URL_VISITED) {
        Some(idx) => idx,
        None => {
            columns.push(URL_VISITED.to_string());
            columns.len() - 1
        }
    };

    let mut resolved = 0usize;
    let mut unresolved = 0usize;
    let mut enriched_rows = Vec::with_capacity(rows.len());

    for (row_idx, mut row) in rows.into_iter().enumerate() {
        if row.len() != width {
            return Err(ExportError::schema(
                &name,
                format!(
                    "row {} has {} values but the table has {} columns",
                    row_idx,
                    row.len(),
                    width
                ),
            ));
        }
        let key = row.get(fk_col).cloned().unwrap_or(Value::Null);
        let cell = match index.resolve(&key) {
            Some(url) => {
                resolved += 1;
                url.clone()
            }
            None => {
                unresolved += 1;
                debug!(row = row_idx, key = %key, "unresolved url foreign key");
                Value::Null
            }
        };

        if target_col < width {
            row[target_col] = cell;
        } else {
            row.push(cell);
        }
        enriched_rows.push(row);
    }

    info!(resolved, unresolved, "enriched visits");

    Ok(Enriched {
        table: Table {
            name,
            columns,
            rows: enriched_rows,
        },
        resolved,
        unresolved,
    })
}
