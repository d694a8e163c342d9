//! CSV renderer.

use crate::detection::Detection;
use chrono::SecondsFormat;

/// Fixed column order of the CSV export.
pub const HEADER: [&str; 18] = [
    "Detection ID",
    "File Name",
    "File Hash",
    "Severity",
    "Technique ID",
    "Technique Name",
    "Source",
    "Asset Name",
    "Asset Type",
    "Asset Group",
    "Asset OS",
    "Asset Location",
    "Asset IP",
    "User",
    "Action",
    "Confidence",
    "Detection Time",
    "Description",
];

/// Render detections as CSV, one header row plus one row per detection.
///
/// Free-text columns are always quoted. Other columns are bare unless they
/// contain a delimiter, quote, or line break.
pub fn render_csv(detections: &[Detection]) -> String {
    let mut csv = HEADER.join(",");
    csv.push('\n');

    for d in detections {
        let row = [
            bare(&d.id),
            quoted(&d.file_name),
            bare(&d.file_hash),
            bare(d.severity.as_str()),
            bare(&d.technique.id),
            quoted(&d.technique.name),
            quoted(&d.source),
            bare(&d.asset_name),
            bare(&d.asset_info.asset_type),
            bare(&d.asset_info.group),
            quoted(&d.asset_info.os),
            quoted(&d.asset_info.location),
            bare(&d.asset_info.ip_address),
            bare(&d.user_name),
            bare(&d.action),
            d.confidence.to_string(),
            d.detection_time.to_rfc3339_opts(SecondsFormat::Millis, true),
            quoted(&d.description),
        ];
        csv.push_str(&row.join(","));
        csv.push('\n');
    }
    csv
}

fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn bare(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        quoted(s)
    } else {
        s.to_string()
    }
}
