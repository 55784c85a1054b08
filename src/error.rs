//! Error types shared by ingestion, fetching and configuration.

use thiserror::Error;

/// Shape violation detected while ingesting a clustering payload.
#[derive(Debug, Error)]
pub enum MalformedDataError {
    #[error("clustering data is missing the `{0}` field")]
    MissingField(&'static str),
    #[error("expression row {row} has {found} values, expected {expected} (one per sample)")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("expression data has {found} rows but {expected} genes")]
    RowCount { expected: usize, found: usize },
    #[error("failed to parse clustering JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure at the data fetch boundary.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Status(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("fetch worker stopped before delivering a result")]
    Disconnected,
}

/// Invalid viewer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything that can stop a matrix from reaching the screen.
#[derive(Debug, Error)]
pub enum HeatmapError {
    #[error(transparent)]
    Malformed(#[from] MalformedDataError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub type Result<T> = std::result::Result<T, HeatmapError>;
