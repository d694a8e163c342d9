//! Custom-alert adapter: asset-scoped alerts from monitoring rules.

use super::{
    AdapterContext, decode_indexed, humanize, non_empty, parse_timestamp, resolve_asset,
    technique_for_category,
};
use crate::detection::{Detection, Severity, clamp_confidence};
use crate::source::{CustomAlert, meta_i64, meta_str};
use serde_json::Value;
use tracing::{debug, warn};

pub const SOURCE_LABEL: &str = "Asset Monitoring";

/// Convert raw custom alerts into detections.
///
/// Alerts whose asset cannot be resolved (positional mode with an empty
/// inventory) are dropped.
pub fn adapt_custom_alerts(records: &[Value], ctx: &AdapterContext<'_>) -> Vec<Detection> {
    let alerts: Vec<(usize, CustomAlert)> = decode_indexed("custom_alerts", records);
    let mut dropped = 0usize;

    let detections: Vec<Detection> = alerts
        .iter()
        .filter_map(|(index, alert)| {
            let detection = convert(*index, alert, ctx);
            if detection.is_none() {
                dropped += 1;
            }
            detection
        })
        .collect();

    if dropped > 0 {
        warn!(dropped, "Dropped custom alerts with no resolvable asset");
    }
    debug!(
        alerts = alerts.len(),
        detections = detections.len(),
        "Adapted custom alerts"
    );
    detections
}

fn convert(index: usize, alert: &CustomAlert, ctx: &AdapterContext<'_>) -> Option<Detection> {
    let asset_info = resolve_asset(alert.asset_id.as_deref(), index, ctx)?.into_info();

    let confidence = meta_i64(&alert.metadata, "confidence")
        .map(clamp_confidence)
        .unwrap_or(ctx.confidence.custom_alert);
    let title = non_empty(&alert.title).unwrap_or_else(|| humanize(&alert.alert_type));
    let description = match non_empty(&alert.description) {
        Some(desc) if !title.is_empty() => format!("{title}: {desc}"),
        Some(desc) => desc,
        None => title,
    };

    Some(Detection {
        id: format!("alert-{}", alert.id),
        severity: Severity::from_label(&alert.severity),
        source: SOURCE_LABEL.to_string(),
        technique: technique_for_category(&alert.alert_type),
        detection_time: parse_timestamp(alert.created_at.as_deref(), ctx.now),
        asset_name: asset_info.name.clone(),
        asset_info,
        user_name: meta_str(&alert.metadata, "user")
            .or_else(|| meta_str(&alert.metadata, "username"))
            .unwrap_or("system")
            .to_string(),
        action: non_empty(&alert.status)
            .map(|s| humanize(&s))
            .unwrap_or_else(|| "Open".to_string()),
        confidence,
        description,
        file_name: meta_str(&alert.metadata, "file_name")
            .unwrap_or_default()
            .to_string(),
        file_hash: meta_str(&alert.metadata, "file_hash")
            .unwrap_or_default()
            .to_string(),
    })
}
