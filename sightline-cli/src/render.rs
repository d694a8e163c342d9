//! Terminal rendering of correlation results.

use serde::Serialize;
use sightline_core::export::{SeverityBreakdown, TopAsset};
use sightline_core::{CorrelationResult, Detection, DetectionView, Severity, SourceReport};
use std::fmt::Write;

/// Assets listed under the detection table.
const TOP_ASSETS_SHOWN: usize = 5;
const DESCRIPTION_WIDTH: usize = 48;

#[derive(Serialize)]
struct ViewDocument<'a> {
    run_id: String,
    category: &'a str,
    generated_at: String,
    filter: String,
    page: usize,
    total_pages: usize,
    total_filtered: usize,
    synthesized: usize,
    summary: SeverityBreakdown,
    detections: &'a [Detection],
    top_affected_assets: Vec<TopAsset>,
    sources: &'a [SourceReport],
}

/// One page of detections plus run metadata as pretty JSON.
pub fn view_json(result: &CorrelationResult, view: &DetectionView) -> anyhow::Result<String> {
    let doc = ViewDocument {
        run_id: result.run_id.to_string(),
        category: &result.category,
        generated_at: result.generated_at.to_rfc3339(),
        filter: view.filter.to_string(),
        page: view.page,
        total_pages: view.total_pages,
        total_filtered: view.total_filtered,
        synthesized: result.synthesized,
        summary: result.summary(),
        detections: &view.detections,
        top_affected_assets: result
            .affected_assets
            .iter()
            .take(TOP_ASSETS_SHOWN)
            .map(TopAsset::from)
            .collect(),
        sources: &result.source_reports,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// One page of detections as a plain-text table.
pub fn view_table(result: &CorrelationResult, view: &DetectionView) -> String {
    let mut out = String::new();
    let summary = result.summary();

    let _ = writeln!(
        out,
        "Run {}  category: {}  detections: {} ({} synthetic)",
        result.run_id,
        result.category,
        result.detections.len(),
        result.synthesized
    );
    let _ = writeln!(
        out,
        "Severity: {}",
        Severity::ALL
            .iter()
            .map(|s| format!("{s} {}", summary.count(*s)))
            .collect::<Vec<_>>()
            .join(" | ")
    );
    for report in result.source_reports.iter().filter(|r| !r.success) {
        let _ = writeln!(
            out,
            "Source {} failed: {}",
            report.source,
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    let _ = writeln!(out);

    if view.detections.is_empty() {
        let _ = writeln!(out, "No {} detections on page {}.", view.filter, view.page);
    } else {
        let _ = writeln!(
            out,
            "{:<20} {:<9} {:<20} {:<20} {:<10} {:>4}  {}",
            "TIME", "SEVERITY", "SOURCE", "ASSET", "TECHNIQUE", "CONF", "DESCRIPTION"
        );
        for d in &view.detections {
            let _ = writeln!(
                out,
                "{:<20} {:<9} {:<20} {:<20} {:<10} {:>4}  {}",
                d.detection_time.format("%Y-%m-%d %H:%M:%S"),
                d.severity.as_str(),
                truncate(&d.source, 20),
                truncate(&d.asset_name, 20),
                d.technique.id,
                d.confidence,
                truncate(&d.description, DESCRIPTION_WIDTH)
            );
        }
    }
    let _ = writeln!(
        out,
        "\nPage {}/{} ({} {} detections)",
        view.page,
        view.total_pages,
        view.total_filtered,
        view.filter
    );

    if !result.affected_assets.is_empty() {
        let _ = writeln!(out, "\nTop affected assets:");
        for asset in result.affected_assets.iter().take(TOP_ASSETS_SHOWN) {
            let severities = asset
                .severities_desc()
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(
                out,
                "  {:<20} {:>4}  [{}]",
                truncate(&asset.name, 20),
                asset.detection_count,
                severities
            );
        }
    }
    out
}

/// Cut `text` to at most `width` characters, marking the cut with `~`.
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('~');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use sightline_core::{
        CorrelationEngine, CorrelationRequest, EngineConfig, SeverityFilter, SourcePayload,
    };

    fn result() -> CorrelationResult {
        let now = DateTime::parse_from_rfc3339("2024-05-02T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let payloads = vec![SourcePayload::IocAlerts(vec![serde_json::json!({
            "id": 1,
            "title": "C2 beacon",
            "severity": "critical",
            "related_iocs": [{"type": "ip", "value": "1.2.3.4"}],
            "matched_assets": [{"name": "WEB-01", "type": "server"}],
            "created_at": "2024-05-01T10:00:00Z"
        })])];
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        CorrelationEngine::new(EngineConfig::default()).correlate(
            &payloads,
            &CorrelationRequest::new("c2"),
            &mut rng,
            now,
        )
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd~");
    }

    #[test]
    fn test_table_lists_page_and_assets() {
        let result = result();
        let view = result.view(SeverityFilter::Critical, 1, 10);
        let table = view_table(&result, &view);
        assert!(table.contains("WEB-01"));
        assert!(table.contains("T1071"));
        assert!(table.contains("Top affected assets:"));
        assert!(table.contains(&format!("Page 1/{}", view.total_pages)));
    }

    #[test]
    fn test_json_view_shape() {
        let result = result();
        let view = result.view(SeverityFilter::All, 1, 2);
        let doc: serde_json::Value = serde_json::from_str(&view_json(&result, &view).unwrap()).unwrap();
        assert_eq!(doc["page"], 1);
        assert_eq!(doc["total_filtered"], 5);
        assert_eq!(doc["total_pages"], 3);
        assert_eq!(doc["detections"].as_array().unwrap().len(), 2);
        assert_eq!(doc["synthesized"], 4);
        assert_eq!(doc["filter"], "all");
    }
}
