//! The export pipeline.
//!
//! ```text
//! connect → load visits → load urls → index → enrich → export → close
//! ```
//!
//! [`export_history`] runs the middle stages against any [`HistorySource`].
//! [`run_with_source`] adds the guaranteed close, and [`run_export`] opens a
//! SQLite file first. The source is closed exactly once whether or not an
//! earlier stage failed; a stage error takes precedence over a close error.

use std::path::Path;

use tracing::{info, warn};

use crate::config::Config;
use crate::db;
use crate::error::{PipelineError, Stage, StageExt};
use crate::export::write_csv;
use crate::join::{enrich, UrlIndex};
use crate::models::ExportSummary;
use crate::preview::print_head;
use crate::source::HistorySource;

pub const VISITS_TABLE: &str = "visits";
pub const URLS_TABLE: &str = "urls";

/// Load, join and write, without opening or closing the source.
pub async fn export_history<S: HistorySource>(
    source: &mut S,
    destination: &Path,
    preview_rows: usize,
) -> Result<ExportSummary, PipelineError> {
    let visits = source.load_table(VISITS_TABLE).await.at(Stage::LoadVisits)?;
    print_head(&visits, preview_rows);

    let urls = source.load_table(URLS_TABLE).await.at(Stage::LoadUrls)?;
    print_head(&urls, preview_rows);

    let index = UrlIndex::build(&urls).at(Stage::Index)?;
    let visit_count = visits.len();
    let enriched = enrich(visits, &index).at(Stage::Enrich)?;
    drop(index);
    print_head(&enriched.table, preview_rows);

    write_csv(&enriched.table, destination).at(Stage::Export)?;

    Ok(ExportSummary {
        visits: visit_count,
        urls: urls.len(),
        resolved: enriched.resolved,
        unresolved: enriched.unresolved,
        destination: destination.to_path_buf(),
    })
}

/// Run the pipeline on an already-open source and close it afterwards.
pub async fn run_with_source<S: HistorySource>(
    mut source: S,
    destination: &Path,
    preview_rows: usize,
) -> Result<ExportSummary, PipelineError> {
    let described = source.describe();
    let outcome = export_history(&mut source, destination, preview_rows).await;
    let closed = source.close().await.at(Stage::Close);

    match (outcome, closed) {
        (Ok(summary), Ok(())) => {
            info!(
                source = %described,
                visits = summary.visits,
                unresolved = summary.unresolved,
                "export complete"
            );
            Ok(summary)
        }
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(err), closed) => {
            if let Err(close_err) = closed {
                warn!(error = %close_err, "close failed after earlier error");
            }
            Err(err)
        }
    }
}

/// Open the configured database and run the full pipeline.
pub async fn run_export(config: &Config) -> Result<ExportSummary, PipelineError> {
    let source = db::connect(&config.source).await.at(Stage::Connect)?;
    run_with_source(source, &config.output.path, config.preview.rows).await
}
