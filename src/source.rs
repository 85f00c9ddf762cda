//! Data source abstraction.
//!
//! The [`HistorySource`] trait is the seam between the export pipeline and
//! the database. [`crate::db::SqliteSource`] reads a real history file;
//! [`MemorySource`] serves prebuilt tables for tests and embedding.
//!
//! `close` consumes the source, so a source is released at most once.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::ExportError;
use crate::models::Table;

#[async_trait]
pub trait HistorySource: Send {
    /// Human-readable location, used in log lines.
    fn describe(&self) -> String;

    /// Load every row of `table` in native column and row order.
    ///
    /// Fails with [`ExportError::SchemaMismatch`] when the table does not exist.
    async fn load_table(&mut self, table: &str) -> Result<Table, ExportError>;

    /// Release the underlying connection.
    async fn close(self) -> Result<(), ExportError>
    where
        Self: Sized;
}

/// In-memory source backed by a map of table name to [`Table`].
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    tables: HashMap<String, Table>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }
}

#[async_trait]
impl HistorySource for MemorySource {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn load_table(&mut self, table: &str) -> Result<Table, ExportError> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| ExportError::schema(table, "no such table"))
    }

    async fn close(self) -> Result<(), ExportError> {
        Ok(())
    }
}
