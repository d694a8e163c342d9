//! IOC-alert adapter: one detection per related indicator.

use super::{
    AdapterContext, asset_info_from_record, decode_records, non_empty, parse_timestamp,
    technique_for_indicator,
};
use crate::detection::{AssetInfo, Detection, Severity, Technique, clamp_confidence};
use crate::source::{IocAlert, MatchedAsset, RelatedIoc};
use serde_json::Value;
use tracing::debug;

pub const SOURCE_LABEL: &str = "Threat Intelligence";

/// Convert raw IOC alerts into detections.
pub fn adapt_ioc_alerts(records: &[Value], ctx: &AdapterContext<'_>) -> Vec<Detection> {
    let alerts: Vec<IocAlert> = decode_records("ioc_alerts", records);
    let detections: Vec<Detection> = alerts
        .iter()
        .flat_map(|alert| alert_detections(alert, ctx))
        .collect();
    debug!(
        alerts = alerts.len(),
        detections = detections.len(),
        "Adapted IOC alerts"
    );
    detections
}

fn alert_detections(alert: &IocAlert, ctx: &AdapterContext<'_>) -> Vec<Detection> {
    let asset_info = resolve_matched_asset(alert, ctx);
    let severity = Severity::from_label(&alert.severity);
    let confidence = alert
        .confidence
        .map(clamp_confidence)
        .unwrap_or(ctx.confidence.ioc_alert);
    let detection_time = parse_timestamp(alert.created_at.as_deref(), ctx.now);
    let action = if alert.is_acknowledged {
        "Acknowledged"
    } else {
        "Alerted"
    };
    let title = non_empty(&alert.title).unwrap_or_else(|| format!("IOC alert {}", alert.id));

    let build = |id: String, technique: Technique, ioc: Option<&RelatedIoc>| {
        let (file_name, file_hash) = ioc.map(file_fields).unwrap_or_default();
        let description = match ioc {
            Some(ioc) => format!("{title}: {} {}", ioc.ioc_type, ioc.value),
            None => non_empty(&alert.description).unwrap_or_else(|| title.clone()),
        };
        Detection {
            id,
            severity,
            source: SOURCE_LABEL.to_string(),
            technique,
            detection_time,
            asset_name: asset_info.name.clone(),
            asset_info: asset_info.clone(),
            user_name: "system".to_string(),
            action: action.to_string(),
            confidence,
            description,
            file_name,
            file_hash,
        }
    };

    if alert.related_iocs.is_empty() {
        return vec![build(
            format!("ioc-{}", alert.id),
            Technique::new("T1588", "Obtain Capabilities"),
            None,
        )];
    }

    alert
        .related_iocs
        .iter()
        .enumerate()
        .map(|(i, ioc)| {
            build(
                format!("ioc-{}-{}", alert.id, i + 1),
                technique_for_indicator(&ioc.ioc_type),
                Some(ioc),
            )
        })
        .collect()
}

/// First matched asset, enriched from the inventory when the name is known there.
fn resolve_matched_asset(alert: &IocAlert, ctx: &AdapterContext<'_>) -> AssetInfo {
    let matched = alert
        .matched_assets
        .first()
        .and_then(|m: &MatchedAsset| non_empty(&m.name).map(|name| (name, m)));

    match matched {
        Some((name, matched)) => {
            if let Some(record) = ctx.assets.iter().find(|a| a.name.trim() == name) {
                return asset_info_from_record(record);
            }
            let mut info = AssetInfo::placeholder(name);
            if let Some(asset_type) = non_empty(&matched.asset_type) {
                info.asset_type = asset_type;
            }
            info
        }
        None => AssetInfo::placeholder(format!("ioc-host-{}", alert.id)),
    }
}

/// File name and hash columns implied by an indicator.
fn file_fields(ioc: &RelatedIoc) -> (String, String) {
    match ioc.ioc_type.trim().to_ascii_lowercase().as_str() {
        "md5" | "sha1" | "sha256" | "hash" | "file_hash" => (String::new(), ioc.value.clone()),
        "file" | "filename" => (ioc.value.clone(), String::new()),
        _ => (String::new(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{inventory, now};
    use super::*;
    use crate::config::{AssetResolution, ConfidenceDefaults};
    use serde_json::json;

    fn ctx<'a>(
        assets: &'a [crate::source::AssetRecord],
        confidence: &'a ConfidenceDefaults,
    ) -> AdapterContext<'a> {
        AdapterContext {
            assets,
            resolution: AssetResolution::Positional,
            confidence,
            now: now(),
        }
    }

    #[test]
    fn test_single_ip_indicator_on_web01() {
        let confidence = ConfidenceDefaults::default();
        let detections = adapt_ioc_alerts(
            &[json!({
                "id": 41,
                "title": "Known C2 address",
                "severity": "high",
                "related_iocs": [{"type": "ip", "value": "1.2.3.4"}],
                "matched_assets": [{"name": "WEB-01", "type": "server"}],
                "created_at": "2024-05-01T10:00:00Z",
                "is_acknowledged": false,
                "description": "Outbound traffic to C2"
            })],
            &ctx(&[], &confidence),
        );

        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert_eq!(d.asset_name, "WEB-01");
        assert_eq!(d.severity, Severity::High);
        assert_eq!(d.asset_info.asset_type, "server");
        assert_eq!(d.confidence, 75);
        assert_eq!(d.source, SOURCE_LABEL);
        assert_eq!(d.technique.id, "T1071");
        assert_eq!(d.description, "Known C2 address: ip 1.2.3.4");
        assert_eq!(d.action, "Alerted");
    }

    #[test]
    fn test_one_detection_per_indicator() {
        let confidence = ConfidenceDefaults::default();
        let detections = adapt_ioc_alerts(
            &[json!({
                "id": "a1",
                "severity": "critical",
                "confidence": 93,
                "related_iocs": [
                    {"type": "domain", "value": "evil.example"},
                    {"type": "sha256", "value": "abc123"},
                    {"type": "filename", "value": "dropper.exe"}
                ],
                "matched_assets": []
            })],
            &ctx(&[], &confidence),
        );

        assert_eq!(detections.len(), 3);
        assert_eq!(detections[0].id, "ioc-a1-1");
        assert_eq!(detections[2].id, "ioc-a1-3");
        assert!(detections.iter().all(|d| d.asset_name == "ioc-host-a1"));
        assert!(detections.iter().all(|d| d.confidence == 93));
        assert_eq!(detections[1].file_hash, "abc123");
        assert_eq!(detections[2].file_name, "dropper.exe");
    }

    #[test]
    fn test_alert_without_indicators_yields_one_detection() {
        let confidence = ConfidenceDefaults::default();
        let detections = adapt_ioc_alerts(
            &[json!({"id": 5, "title": "Feed hit", "severity": "low", "is_acknowledged": true})],
            &ctx(&[], &confidence),
        );
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].id, "ioc-5");
        assert_eq!(detections[0].action, "Acknowledged");
        assert_eq!(detections[0].description, "Feed hit");
    }

    #[test]
    fn test_matched_asset_enriched_from_inventory() {
        let assets = inventory();
        let confidence = ConfidenceDefaults::default();
        let detections = adapt_ioc_alerts(
            &[json!({
                "id": 9,
                "severity": "medium",
                "related_iocs": [{"type": "url", "value": "http://x.test/a"}],
                "matched_assets": [{"name": "WEB-01", "type": "server"}]
            })],
            &ctx(&assets, &confidence),
        );
        assert_eq!(detections[0].asset_info.os, "Ubuntu 22.04");
        assert_eq!(detections[0].asset_info.asset_type, "Server");
    }

    #[test]
    fn test_malformed_alert_does_not_block_siblings() {
        let confidence = ConfidenceDefaults::default();
        let detections = adapt_ioc_alerts(
            &[
                json!({"title": "no id"}),
                json!({"id": 2, "related_iocs": "garbage"}),
                json!({"id": 3, "severity": "high", "related_iocs": [{"type": "ip", "value": "5.6.7.8"}]}),
            ],
            &ctx(&[], &confidence),
        );
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].id, "ioc-3-1");
    }

    #[test]
    fn test_confidence_is_clamped() {
        let confidence = ConfidenceDefaults::default();
        let detections = adapt_ioc_alerts(
            &[json!({"id": 1, "confidence": 250, "related_iocs": [{"type": "ip", "value": "1.1.1.1"}]})],
            &ctx(&[], &confidence),
        );
        assert_eq!(detections[0].confidence, 100);
    }

    #[test]
    fn test_null_fields_and_float_confidence() {
        let assets = inventory();
        let confidence = ConfidenceDefaults::default();
        let detections = adapt_ioc_alerts(
            &[
                json!({
                    "id": 30,
                    "title": "Known C2",
                    "severity": "high",
                    "description": null,
                    "related_iocs": [{"type": "ip", "value": "5.6.7.8"}],
                    "matched_assets": [{"name": "WEB-01", "type": null}],
                    "is_acknowledged": null
                }),
                json!({
                    "id": 31,
                    "severity": null,
                    "confidence": 87.5,
                    "related_iocs": null,
                    "matched_assets": null
                }),
            ],
            &ctx(&assets, &confidence),
        );
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].id, "ioc-30-1");
        assert_eq!(detections[0].asset_name, "WEB-01");
        assert_eq!(detections[0].action, "Alerted");
        assert_eq!(detections[1].id, "ioc-31");
        assert_eq!(detections[1].confidence, 88);
        assert_eq!(detections[1].severity, Severity::Low);
        assert_eq!(detections[1].asset_name, "ioc-host-31");
    }
}

