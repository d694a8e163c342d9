//! JSON renderer.

use crate::aggregate::AffectedAsset;
use crate::detection::{Detection, Severity};
use crate::error::ExportError;
use crate::paginate::SeverityFilter;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Detection count per severity level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityBreakdown {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityBreakdown {
    pub fn from_detections(detections: &[Detection]) -> Self {
        let mut breakdown = Self::default();
        for d in detections {
            match d.severity {
                Severity::Critical => breakdown.critical += 1,
                Severity::High => breakdown.high += 1,
                Severity::Medium => breakdown.medium += 1,
                Severity::Low => breakdown.low += 1,
            }
        }
        breakdown
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }

    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }
}

/// Condensed entry of the top affected assets list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopAsset {
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub detection_count: usize,
    pub severities: Vec<Severity>,
    pub techniques: Vec<String>,
}

impl From<&AffectedAsset> for TopAsset {
    fn from(asset: &AffectedAsset) -> Self {
        Self {
            name: asset.name.clone(),
            asset_type: asset.asset_info.asset_type.clone(),
            detection_count: asset.detection_count,
            severities: asset.severities_desc(),
            techniques: asset.techniques.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSummary {
    pub severity_breakdown: SeverityBreakdown,
    /// Detections per asset type.
    pub asset_type_breakdown: BTreeMap<String, usize>,
    pub top_affected_assets: Vec<TopAsset>,
}

/// The JSON export document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportDocument<'a> {
    pub export_date: DateTime<Utc>,
    pub total_detections: usize,
    pub total_affected_assets: usize,
    pub filter_applied: SeverityFilter,
    pub summary: ExportSummary,
    pub detections: &'a [Detection],
    pub affected_assets: &'a [AffectedAsset],
}

impl<'a> ExportDocument<'a> {
    /// Assemble the document. `assets` must be the rollup of `detections`, already sorted.
    pub fn build(
        detections: &'a [Detection],
        assets: &'a [AffectedAsset],
        filter: SeverityFilter,
        top_assets: usize,
        export_date: DateTime<Utc>,
    ) -> Self {
        let mut asset_type_breakdown = BTreeMap::new();
        for d in detections {
            *asset_type_breakdown
                .entry(d.asset_info.asset_type.clone())
                .or_insert(0) += 1;
        }

        Self {
            export_date,
            total_detections: detections.len(),
            total_affected_assets: assets.len(),
            filter_applied: filter,
            summary: ExportSummary {
                severity_breakdown: SeverityBreakdown::from_detections(detections),
                asset_type_breakdown,
                top_affected_assets: assets.iter().take(top_assets).map(TopAsset::from).collect(),
            },
            detections,
            affected_assets: assets,
        }
    }
}

/// Render the JSON export (pretty-printed).
pub fn render_json(
    detections: &[Detection],
    assets: &[AffectedAsset],
    filter: SeverityFilter,
    top_assets: usize,
    export_date: DateTime<Utc>,
) -> Result<String, ExportError> {
    let document = ExportDocument::build(detections, assets, filter, top_assets, export_date);
    Ok(serde_json::to_string_pretty(&document)?)
}
