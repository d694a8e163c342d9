//! Incident adapter: SOC incidents become detections on their (resolved) asset.

use super::{
    AdapterContext, decode_indexed, humanize, non_empty, parse_timestamp, resolve_asset,
    technique_for_category,
};
use crate::detection::{Detection, Severity, clamp_confidence};
use crate::source::Incident;
use serde_json::Value;
use tracing::{debug, warn};

pub const SOURCE_LABEL: &str = "SOC Analysis";

/// Map an incident priority onto a detection severity.
///
/// `critical`, `high` and `medium` carry over; everything else is `low`.
pub fn severity_for_priority(priority: &str) -> Severity {
    match priority.trim().to_ascii_lowercase().as_str() {
        "critical" => Severity::Critical,
        "high" => Severity::High,
        "medium" => Severity::Medium,
        _ => Severity::Low,
    }
}

/// Convert raw incidents into detections.
pub fn adapt_incidents(records: &[Value], ctx: &AdapterContext<'_>) -> Vec<Detection> {
    let incidents: Vec<(usize, Incident)> = decode_indexed("incidents", records);

    let detections: Vec<Detection> = incidents
        .iter()
        .filter_map(|(index, incident)| {
            let asset = resolve_asset(incident.asset_id.as_deref(), *index, ctx);
            if asset.is_none() {
                warn!(incident = %incident.id, "No asset available for incident, dropping");
            }
            let asset_info = asset?.into_info();

            let title = non_empty(&incident.title)
                .unwrap_or_else(|| format!("Incident {}", incident.id));
            let description = match non_empty(&incident.description) {
                Some(desc) => format!("{title}: {desc}"),
                None => title,
            };

            Some(Detection {
                id: format!("incident-{}", incident.id),
                severity: severity_for_priority(&incident.priority),
                source: SOURCE_LABEL.to_string(),
                technique: technique_for_category(&incident.category_display),
                detection_time: parse_timestamp(incident.created_at.as_deref(), ctx.now),
                asset_name: asset_info.name.clone(),
                asset_info,
                user_name: incident
                    .assigned_to
                    .as_deref()
                    .and_then(non_empty)
                    .unwrap_or_else(|| "unassigned".to_string()),
                action: non_empty(&incident.status)
                    .map(|s| humanize(&s))
                    .unwrap_or_else(|| "Open".to_string()),
                confidence: incident
                    .confidence
                    .map(clamp_confidence)
                    .unwrap_or(ctx.confidence.incident),
                description,
                file_name: String::new(),
                file_hash: String::new(),
            })
        })
        .collect();

    debug!(
        incidents = incidents.len(),
        detections = detections.len(),
        "Adapted incidents"
    );
    detections
}
