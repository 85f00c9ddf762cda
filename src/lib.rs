//! # history-export
//!
//! Join browser history visits with the URLs they reference and export the
//! result as CSV.
//!
//! Chromium-family browsers (Chrome, Edge, Brave, ...) keep history in a
//! SQLite file with a `urls` table and a `visits` table whose `url` column
//! points at `urls.id`. This crate loads both tables, resolves each visit's
//! URL, and writes one CSV row per visit with an extra `url_visited` column.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ HistorySource│──▶│  UrlIndex +  │──▶│  CSV export  │
//! │ SQLite / mem │   │   enrich     │   │ (atomic)     │
//! └──────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! history-export ~/.config/google-chrome/Default/History visits.csv
//! history-export --config export.toml --snapshot
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and CLI overrides |
//! | [`models`] | Generic tables and cell values |
//! | [`source`] | Data source trait and in-memory source |
//! | [`db`] | SQLite source |
//! | [`join`] | URL index and visit enrichment |
//! | [`export`] | CSV serialization |
//! | [`preview`] | Console previews |
//! | [`pipeline`] | End-to-end run |
//! | [`error`] | Error kinds and pipeline stages |

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod join;
pub mod models;
pub mod pipeline;
pub mod preview;
pub mod source;
