//! Severity filtering and fixed-size pagination.

use crate::detection::{Detection, Severity};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default number of detections per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Severity selector applied before pagination and export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityFilter {
    #[default]
    All,
    Critical,
    High,
    Medium,
    Low,
}

impl SeverityFilter {
    /// Whether a detection of `severity` passes this filter.
    pub fn matches(&self, severity: Severity) -> bool {
        match self.severity() {
            None => true,
            Some(wanted) => wanted == severity,
        }
    }

    /// The exact severity selected, or `None` for `All`.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            SeverityFilter::All => None,
            SeverityFilter::Critical => Some(Severity::Critical),
            SeverityFilter::High => Some(Severity::High),
            SeverityFilter::Medium => Some(Severity::Medium),
            SeverityFilter::Low => Some(Severity::Low),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self.severity() {
            None => "all",
            Some(severity) => severity.as_str(),
        }
    }
}

impl FromStr for SeverityFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(SeverityFilter::All),
            "critical" => Ok(SeverityFilter::Critical),
            "high" => Ok(SeverityFilter::High),
            "medium" => Ok(SeverityFilter::Medium),
            "low" => Ok(SeverityFilter::Low),
            _ => Err(ConfigError::UnknownFilter(s.to_string())),
        }
    }
}

impl std::fmt::Display for SeverityFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keep the detections matching `filter`, preserving order.
pub fn filter_detections(detections: &[Detection], filter: SeverityFilter) -> Vec<Detection> {
    detections
        .iter()
        .filter(|d| filter.matches(d.severity))
        .cloned()
        .collect()
}

/// One page of a sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<'a, T> {
    /// 1-based page number that was requested.
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub items: &'a [T],
}

impl<T> Page<'_, T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// `ceil(count / page_size)`. A zero page size yields zero pages.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

/// Slice `[(page-1)*size, page*size)` out of `items`.
///
/// Page 0 and pages past the end yield an empty slice.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> Page<'_, T> {
    let total_items = items.len();
    let slice = if page == 0 || page_size == 0 {
        &items[..0]
    } else {
        let start = (page - 1).saturating_mul(page_size).min(total_items);
        let end = start.saturating_add(page_size).min(total_items);
        &items[start..end]
    };

    Page {
        page,
        page_size,
        total_items,
        total_pages: total_pages(total_items, page_size),
        items: slice,
    }
}
