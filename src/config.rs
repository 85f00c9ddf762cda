//! Configuration for an export run.
//!
//! Settings come from an optional TOML file and are overridden by CLI
//! arguments. Both paths must be resolved before a run starts.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Longest busy wait accepted for a locked source, in seconds.
pub const MAX_BUSY_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub path: PathBuf,
    pub busy_timeout_secs: u64,
    pub snapshot: bool,
}

fn default_busy_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PreviewConfig {
    #[serde(default = "default_preview_rows")]
    pub rows: usize,
}

fn default_preview_rows() -> usize {
    5
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            rows: default_preview_rows(),
        }
    }
}

/// Partially specified config as read from disk; every field is optional so
/// CLI arguments can fill the gaps.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    source: FileSource,
    #[serde(default)]
    output: FileOutput,
    #[serde(default)]
    preview: Option<PreviewConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct FileSource {
    path: Option<PathBuf>,
    busy_timeout_secs: Option<u64>,
    snapshot: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct FileOutput {
    path: Option<PathBuf>,
}

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub source: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub preview_rows: Option<usize>,
    pub busy_timeout_secs: Option<u64>,
    pub snapshot: bool,
}

impl Config {
    /// Build a config from paths alone, with defaults for everything else.
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: SourceConfig {
                path: source.into(),
                busy_timeout_secs: default_busy_timeout_secs(),
                snapshot: false,
            },
            output: OutputConfig {
                path: output.into(),
            },
            preview: PreviewConfig::default(),
        }
    }
}

/// Load the optional config file and apply CLI overrides on top.
pub fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<Config> {
    let file = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str::<FileConfig>(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        }
        None => FileConfig::default(),
    };

    let source_path = overrides.source.or(file.source.path).ok_or_else(|| {
        anyhow::anyhow!("No source database given: pass SOURCE or set [source].path")
    })?;
    let output_path = overrides.output.or(file.output.path).ok_or_else(|| {
        anyhow::anyhow!("No output file given: pass OUTPUT or set [output].path")
    })?;

    let busy_timeout_secs = overrides
        .busy_timeout_secs
        .or(file.source.busy_timeout_secs)
        .unwrap_or_else(default_busy_timeout_secs);
    if busy_timeout_secs > MAX_BUSY_TIMEOUT_SECS {
        anyhow::bail!(
            "source.busy_timeout_secs must be <= {} (got {})",
            MAX_BUSY_TIMEOUT_SECS,
            busy_timeout_secs
        );
    }

    let preview_rows = overrides
        .preview_rows
        .or(file.preview.map(|p| p.rows))
        .unwrap_or_else(default_preview_rows);

    Ok(Config {
        source: SourceConfig {
            path: source_path,
            busy_timeout_secs,
            snapshot: overrides.snapshot || file.source.snapshot.unwrap_or(false),
        },
        output: OutputConfig { path: output_path },
        preview: PreviewConfig { rows: preview_rows },
    })
}
