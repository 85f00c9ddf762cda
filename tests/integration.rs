use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn export_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("history-export");
    path
}

/// Build a small Chromium-style history database.
async fn create_history(path: &Path) {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let mut conn = SqliteConnection::connect_with(&options).await.unwrap();

    for stmt in [
        "CREATE TABLE urls (id INTEGER PRIMARY KEY, url LONGVARCHAR, title LONGVARCHAR, \
         visit_count INTEGER DEFAULT 0 NOT NULL, last_visit_time INTEGER NOT NULL)",
        "CREATE TABLE visits (id INTEGER PRIMARY KEY, url INTEGER NOT NULL, \
         visit_time INTEGER NOT NULL, from_visit INTEGER, transition INTEGER DEFAULT 0 NOT NULL)",
        "INSERT INTO urls VALUES (1, 'https://a.com', 'A, the first', 1, 13300000000000000)",
        "INSERT INTO urls VALUES (2, 'https://b.com', 'B', 1, 13300000100000000)",
        "INSERT INTO visits VALUES (10, 1, 13300000000000000, 0, 805306368)",
        "INSERT INTO visits VALUES (11, 99, 13300000050000000, 10, 805306368)",
        "INSERT INTO visits VALUES (12, 2, 13300000100000000, 0, 805306376)",
    ] {
        sqlx::query(stmt).execute(&mut conn).await.unwrap();
    }
    conn.close().await.unwrap();
}

async fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("History");
    create_history(&db_path).await;
    (tmp, db_path)
}

fn run_export(args: &[&str]) -> (String, String, bool) {
    let binary = export_binary();
    let output = Command::new(&binary)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run history-export at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

const EXPECTED_CSV: &str = ",id,url,visit_time,from_visit,transition,url_visited\n\
0,10,1,13300000000000000,0,805306368,https://a.com\n\
1,11,99,13300000050000000,10,805306368,\n\
2,12,2,13300000100000000,0,805306376,https://b.com\n";

#[tokio::test]
async fn test_export_writes_joined_csv() {
    let (tmp, db_path) = setup_test_env().await;
    let out = tmp.path().join("out.csv");

    let (stdout, stderr, success) = run_export(&[
        db_path.to_str().unwrap(),
        out.to_str().unwrap(),
    ]);
    assert!(success, "export failed: stdout={}, stderr={}", stdout, stderr);

    assert_eq!(fs::read_to_string(&out).unwrap(), EXPECTED_CSV);
    assert!(stderr.contains("Exported 3 visits (2 resolved, 1 unresolved)"));
}

#[tokio::test]
async fn test_previews_printed_to_stdout() {
    let (tmp, db_path) = setup_test_env().await;
    let out = tmp.path().join("out.csv");

    let (stdout, _, success) = run_export(&[
        db_path.to_str().unwrap(),
        out.to_str().unwrap(),
    ]);
    assert!(success);

    let visits_at = stdout.find("visits (showing 3 of 3 rows)").unwrap();
    let urls_at = stdout.find("urls (showing 2 of 2 rows)").unwrap();
    let enriched_at = stdout.rfind("visits (showing 3 of 3 rows)").unwrap();
    assert!(visits_at < urls_at && urls_at < enriched_at);
    assert!(stdout.contains("url_visited"));
}

#[tokio::test]
async fn test_preview_rows_zero_is_quiet() {
    let (tmp, db_path) = setup_test_env().await;
    let out = tmp.path().join("out.csv");

    let (stdout, _, success) = run_export(&[
        db_path.to_str().unwrap(),
        out.to_str().unwrap(),
        "--preview-rows",
        "0",
    ]);
    assert!(success);
    assert!(stdout.is_empty(), "unexpected stdout: {}", stdout);
}

#[tokio::test]
async fn test_export_idempotent() {
    let (tmp, db_path) = setup_test_env().await;
    let out = tmp.path().join("out.csv");
    let args = [db_path.to_str().unwrap(), out.to_str().unwrap()];

    let (_, _, first) = run_export(&args);
    let first_bytes = fs::read(&out).unwrap();
    let (_, _, second) = run_export(&args);
    let second_bytes = fs::read(&out).unwrap();

    assert!(first && second);
    assert_eq!(first_bytes, second_bytes);
}

#[tokio::test]
async fn test_snapshot_mode() {
    let (tmp, db_path) = setup_test_env().await;
    let out = tmp.path().join("out.csv");

    let (stdout, stderr, success) = run_export(&[
        db_path.to_str().unwrap(),
        out.to_str().unwrap(),
        "--snapshot",
    ]);
    assert!(success, "export failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(fs::read_to_string(&out).unwrap(), EXPECTED_CSV);
}

#[tokio::test]
async fn test_config_file_paths() {
    let (tmp, db_path) = setup_test_env().await;
    let out = tmp.path().join("from-config.csv");
    let config_path = tmp.path().join("export.toml");
    fs::write(
        &config_path,
        format!(
            "[source]\npath = \"{}\"\n\n[output]\npath = \"{}\"\n\n[preview]\nrows = 1\n",
            db_path.display(),
            out.display()
        ),
    )
    .unwrap();

    let (stdout, stderr, success) = run_export(&["--config", config_path.to_str().unwrap()]);
    assert!(success, "export failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("visits (showing 1 of 3 rows)"));
    assert_eq!(fs::read_to_string(&out).unwrap(), EXPECTED_CSV);
}

#[test]
fn test_missing_source_fails_without_output() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("History");
    let out = tmp.path().join("out.csv");

    let (_, stderr, success) = run_export(&[missing.to_str().unwrap(), out.to_str().unwrap()]);

    assert!(!success);
    assert!(stderr.contains("connect failed"), "stderr: {}", stderr);
    assert!(stderr.contains("source database unavailable"));
    assert!(!out.exists());
}

#[tokio::test]
async fn test_unwritable_destination_fails() {
    let (tmp, db_path) = setup_test_env().await;
    let out = tmp.path().join("no-such-dir").join("out.csv");

    let (_, stderr, success) = run_export(&[db_path.to_str().unwrap(), out.to_str().unwrap()]);

    assert!(!success);
    assert!(stderr.contains("export failed"), "stderr: {}", stderr);
    assert!(stderr.contains("cannot write destination"));
    assert!(!out.exists());

    // The source is released: it can be opened and written afterwards.
    let options = SqliteConnectOptions::new().filename(&db_path);
    let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
    sqlx::query("BEGIN EXCLUSIVE").execute(&mut conn).await.unwrap();
    sqlx::query("COMMIT").execute(&mut conn).await.unwrap();
    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_missing_table_is_schema_mismatch() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("History");
    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true);
    let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
    sqlx::query("CREATE TABLE visits (id INTEGER PRIMARY KEY, url INTEGER)")
        .execute(&mut conn)
        .await
        .unwrap();
    conn.close().await.unwrap();
    let out = tmp.path().join("out.csv");

    let (_, stderr, success) = run_export(&[db_path.to_str().unwrap(), out.to_str().unwrap()]);

    assert!(!success);
    assert!(stderr.contains("load urls failed"), "stderr: {}", stderr);
    assert!(stderr.contains("schema mismatch in table 'urls'"));
    assert!(!out.exists());
}

#[test]
fn test_missing_paths_is_usage_error() {
    let (_, stderr, success) = run_export(&[]);
    assert!(!success);
    assert!(stderr.contains("No source database given"));
}
