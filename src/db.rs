//! SQLite-backed [`HistorySource`].
//!
//! Opens the history file read-only with a bounded busy timeout, so a
//! database held by a running browser surfaces as
//! [`ExportError::SourceLocked`] instead of hanging. In snapshot mode the
//! file and its journal sidecars are first copied into a private temporary
//! directory and the copy is opened.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Connection, Row, TypeInfo, ValueRef};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::error::ExportError;
use crate::models::{Table, Value};
use crate::source::HistorySource;

const CATALOG: &str = "sqlite_master";

/// An open connection to a history database.
pub struct SqliteSource {
    conn: SqliteConnection,
    path: PathBuf,
    // Removed on drop, after the connection is closed.
    snapshot: Option<TempDir>,
}

/// Open the history database described by `config`.
pub async fn connect(config: &SourceConfig) -> Result<SqliteSource, ExportError> {
    let path = &config.path;

    // SQLite reports a missing file as a generic CANTOPEN; check up front so
    // the caller gets a precise error kind.
    let metadata = std::fs::metadata(path).map_err(|e| ExportError::from_source_io(path, &e))?;
    if !metadata.is_file() {
        return Err(ExportError::SourceUnavailable {
            path: path.clone(),
            reason: "not a regular file".to_string(),
        });
    }
    std::fs::File::open(path).map_err(|e| ExportError::from_source_io(path, &e))?;

    let snapshot = if config.snapshot {
        Some(take_snapshot(path)?)
    } else {
        None
    };
    let open_path = match &snapshot {
        Some(dir) => snapshot_db_path(dir.path(), path),
        None => path.clone(),
    };

    let options = SqliteConnectOptions::new()
        .filename(&open_path)
        .create_if_missing(false)
        .read_only(snapshot.is_none())
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

    let mut conn = SqliteConnection::connect_with(&options)
        .await
        .map_err(|e| ExportError::from_sqlx(path, CATALOG, e))?;

    // The file header is only validated on first read.
    let probe: Result<i64, sqlx::Error> = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master")
        .fetch_one(&mut conn)
        .await;
    if let Err(e) = probe {
        let _ = conn.close().await;
        return Err(ExportError::from_sqlx(path, CATALOG, e));
    }

    info!(path = %path.display(), snapshot = config.snapshot, "connected to history database");

    Ok(SqliteSource {
        conn,
        path: path.clone(),
        snapshot,
    })
}

#[async_trait]
impl HistorySource for SqliteSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn load_table(&mut self, table: &str) -> Result<Table, ExportError> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?",
        )
        .bind(table)
        .fetch_one(&mut self.conn)
        .await
        .map_err(|e| ExportError::from_sqlx(&self.path, table, e))?;

        if exists == 0 {
            return Err(ExportError::schema(table, "no such table"));
        }

        // Same column set as `SELECT *`: ordinary and generated columns,
        // not the hidden columns of virtual tables.
        let columns: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM pragma_table_xinfo(?) WHERE hidden IN (0, 2, 3) ORDER BY cid",
        )
        .bind(table)
        .fetch_all(&mut self.conn)
        .await
        .map_err(|e| ExportError::from_sqlx(&self.path, table, e))?;

        let sql = format!("SELECT * FROM {}", quote_ident(table));
        let rows = sqlx::query(&sql)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| ExportError::from_sqlx(&self.path, table, e))?;

        let mut loaded = Table::new(table, columns);
        for row in &rows {
            let values = (0..row.len())
                .map(|idx| decode_value(row, idx))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ExportError::from_sqlx(&self.path, table, e))?;
            if values.len() != loaded.columns.len() {
                return Err(ExportError::schema(
                    table,
                    format!(
                        "query returned {} values for {} columns",
                        values.len(),
                        loaded.columns.len()
                    ),
                ));
            }
            loaded.rows.push(values);
        }

        info!(
            table,
            rows = loaded.len(),
            columns = loaded.columns.len(),
            "loaded table"
        );
        Ok(loaded)
    }

    async fn close(self) -> Result<(), ExportError> {
        let SqliteSource {
            conn,
            path,
            snapshot,
        } = self;
        let result = conn
            .close()
            .await
            .map_err(|e| ExportError::from_sqlx(&path, CATALOG, e));
        drop(snapshot);
        info!(path = %path.display(), "closed history database");
        result
    }
}

/// Decode one cell by its runtime storage class.
fn decode_value(row: &SqliteRow, idx: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let kind = raw.type_info().name().to_ascii_uppercase();

    match kind.as_str() {
        "INTEGER" | "BIGINT" | "INT8" | "BOOLEAN" => row.try_get::<i64, _>(idx).map(Value::Integer),
        "REAL" | "FLOAT" | "DOUBLE" => row.try_get::<f64, _>(idx).map(Value::Real),
        "TEXT" => row.try_get::<String, _>(idx).map(Value::Text),
        "BLOB" => row.try_get::<Vec<u8>, _>(idx).map(Value::Blob),
        _ => row
            .try_get::<i64, _>(idx)
            .map(Value::Integer)
            .or_else(|_| row.try_get::<f64, _>(idx).map(Value::Real))
            .or_else(|_| row.try_get::<String, _>(idx).map(Value::Text))
            .or_else(|_| row.try_get::<Vec<u8>, _>(idx).map(Value::Blob)),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn snapshot_db_path(dir: &Path, source: &Path) -> PathBuf {
    dir.join(source.file_name().unwrap_or_else(|| OsStr::new("History")))
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Copy the database and any `-wal` / `-journal` sidecar into a temp dir.
fn take_snapshot(path: &Path) -> Result<TempDir, ExportError> {
    let dir = tempfile::Builder::new()
        .prefix("history-export-")
        .tempdir()
        .map_err(|e| ExportError::SourceUnavailable {
            path: path.to_path_buf(),
            reason: format!("cannot create snapshot directory: {}", e),
        })?;

    let target = snapshot_db_path(dir.path(), path);
    std::fs::copy(path, &target).map_err(|e| ExportError::from_source_io(path, &e))?;
    debug!(from = %path.display(), to = %target.display(), "snapshot copied");

    for suffix in ["-wal", "-journal"] {
        let sidecar = with_suffix(path, suffix);
        if sidecar.is_file() {
            let sidecar_target = with_suffix(&target, suffix);
            std::fs::copy(&sidecar, &sidecar_target)
                .map_err(|e| ExportError::from_source_io(&sidecar, &e))?;
            debug!(from = %sidecar.display(), to = %sidecar_target.display(), "snapshot sidecar copied");
        }
    }

    Ok(dir)
}
