//! Export serializer — CSV and JSON renderings of a (filtered) detection set.
//!
//! Renderers are pure functions of their inputs. Delivering the payload to
//! disk or elsewhere is a separate step ([`ExportPayload::write_to_dir`]).

pub mod csv;
pub mod json;

use crate::error::{ConfigError, ExportError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use csv::render_csv;
pub use json::{ExportDocument, ExportSummary, SeverityBreakdown, TopAsset, render_json};

/// Supported interchange formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A rendered export, ready to be delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPayload {
    pub format: ExportFormat,
    pub filename: String,
    pub body: String,
}

impl ExportPayload {
    /// Write the payload into `dir` under its standard file name.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(&self.filename);
        std::fs::create_dir_all(dir)
            .and_then(|_| std::fs::write(&path, self.body.as_bytes()))
            .map_err(|source| ExportError::Write {
                path: path.display().to_string(),
                source,
            })?;
        Ok(path)
    }
}

/// `<category>_detections_<YYYY-MM-DD>.<ext>`
pub fn export_filename(category: &str, date: NaiveDate, format: ExportFormat) -> String {
    format!(
        "{}_detections_{}.{}",
        category_slug(category),
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Lowercase the category and replace anything but ASCII alphanumerics with `_`.
pub fn category_slug(category: &str) -> String {
    let slug: String = category
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if slug.is_empty() { "all".to_string() } else { slug }
}
