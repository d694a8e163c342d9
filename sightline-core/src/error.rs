//! Error types for the correlation engine.

use thiserror::Error;

/// Top-level engine error.
#[derive(Debug, Error)]
pub enum CorrelationError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a whole telemetry source. Isolated per source by the collector.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read '{path}': {message}")]
    Read { path: String, message: String },
    #[error("request to '{url}' failed: {message}")]
    Http { url: String, message: String },
    #[error("'{source_name}' did not return a JSON array: {message}")]
    Decode {
        source_name: String,
        message: String,
    },
    #[error("source '{0}' timed out after {1}s")]
    Timeout(String, u64),
    #[error("source '{0}' was cancelled")]
    Cancelled(String),
    #[error("source task '{0}' aborted: {1}")]
    Aborted(String, String),
}

/// Errors from rendering or writing export payloads.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("JSON serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from configuration loading, validation, or selector parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid value for '{field}': {message}")]
    Invalid { field: String, message: String },
    #[error("unknown severity filter '{0}' (expected all, critical, high, medium, or low)")]
    UnknownFilter(String),
    #[error("unknown export format '{0}' (expected csv, json, or both)")]
    UnknownFormat(String),
}
