//! Source adapters — convert one source's raw records into canonical detections.
//!
//! Adapters never fail as a whole. A record that cannot be decoded is skipped
//! and logged; missing optional fields are defaulted.

pub mod custom;
pub mod incident;
pub mod ioc;

use crate::config::{AssetResolution, ConfidenceDefaults};
use crate::detection::{AssetInfo, Technique, UNASSIGNED_ASSET};
use crate::source::{AssetRecord, meta_str};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

pub use custom::adapt_custom_alerts;
pub use incident::adapt_incidents;
pub use ioc::adapt_ioc_alerts;

/// Shared inputs for every adapter invocation.
#[derive(Debug, Clone)]
pub struct AdapterContext<'a> {
    /// Decoded asset inventory used for asset resolution and enrichment.
    pub assets: &'a [AssetRecord],
    pub resolution: AssetResolution,
    pub confidence: &'a ConfidenceDefaults,
    /// Substituted for missing or unparsable timestamps.
    pub now: DateTime<Utc>,
}

/// Decode raw records of one kind, skipping the ones that do not fit the schema.
pub fn decode_records<T: DeserializeOwned>(kind: &str, records: &[Value]) -> Vec<T> {
    decode_indexed(kind, records)
        .into_iter()
        .map(|(_, record)| record)
        .collect()
}

/// Like [`decode_records`], but keeps each record's position in the raw list.
///
/// Positional asset resolution uses the raw position, so a skipped record
/// does not shift the attribution of the records after it.
pub fn decode_indexed<T: DeserializeOwned>(kind: &str, records: &[Value]) -> Vec<(usize, T)> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| match serde_json::from_value::<T>(raw.clone()) {
            Ok(record) => Some((index, record)),
            Err(e) => {
                warn!(kind, index, error = %e, "Skipping malformed record");
                None
            }
        })
        .collect()
}

/// Parse an RFC 3339 timestamp, falling back to `now`.
pub(crate) fn parse_timestamp(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    raw.and_then(parse_rfc3339).unwrap_or(now)
}

pub(crate) fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Result of resolving an alert to an inventory asset.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ResolvedAsset<'a> {
    Inventory(&'a AssetRecord),
    Unassigned,
}

impl ResolvedAsset<'_> {
    pub(crate) fn into_info(self) -> AssetInfo {
        match self {
            ResolvedAsset::Inventory(record) => asset_info_from_record(record),
            ResolvedAsset::Unassigned => AssetInfo::placeholder(UNASSIGNED_ASSET),
        }
    }
}

/// Resolve the asset for the `index`-th record of a source.
///
/// Exact id match wins. Otherwise the configured [`AssetResolution`] decides:
/// positional fallback picks `assets[index % len]` and yields `None` for an
/// empty inventory, the sentinel mode always yields `Unassigned`.
pub(crate) fn resolve_asset<'a>(
    asset_id: Option<&str>,
    index: usize,
    ctx: &AdapterContext<'a>,
) -> Option<ResolvedAsset<'a>> {
    if let Some(id) = asset_id
        && let Some(record) = ctx.assets.iter().find(|a| a.id == id)
    {
        return Some(ResolvedAsset::Inventory(record));
    }

    match ctx.resolution {
        AssetResolution::Positional if ctx.assets.is_empty() => None,
        AssetResolution::Positional => {
            Some(ResolvedAsset::Inventory(&ctx.assets[index % ctx.assets.len()]))
        }
        AssetResolution::Unassigned => Some(ResolvedAsset::Unassigned),
    }
}

/// Snapshot an inventory record into the detection's asset fields.
pub(crate) fn asset_info_from_record(record: &AssetRecord) -> AssetInfo {
    let name = non_empty(&record.name).unwrap_or_else(|| format!("asset-{}", record.id));
    let asset_type = record
        .asset_type_display
        .as_deref()
        .and_then(non_empty)
        .or_else(|| record.asset_type.as_deref().and_then(non_empty))
        .unwrap_or_else(|| "unknown".to_string());
    let last_seen = record
        .last_seen
        .as_deref()
        .and_then(parse_rfc3339)
        .or_else(|| record.updated_at.as_deref().and_then(parse_rfc3339));

    AssetInfo {
        name,
        asset_type,
        group: record
            .environment
            .as_deref()
            .and_then(non_empty)
            .unwrap_or_else(|| "unknown".to_string()),
        os: meta_str(&record.metadata, "os").unwrap_or("Unknown").to_string(),
        location: meta_str(&record.metadata, "location")
            .unwrap_or("Unknown")
            .to_string(),
        ip_address: meta_str(&record.metadata, "ip_address")
            .or_else(|| meta_str(&record.metadata, "ip"))
            .unwrap_or("N/A")
            .to_string(),
        last_seen,
        risk_level: record
            .criticality
            .as_deref()
            .and_then(non_empty)
            .unwrap_or_else(|| "unknown".to_string()),
    }
}

pub(crate) fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Turn `snake_case` or `kebab-case` labels into "Title Case".
pub(crate) fn humanize(label: &str) -> String {
    label
        .split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Technique implied by an indicator type.
pub(crate) fn technique_for_indicator(ioc_type: &str) -> Technique {
    match ioc_type.trim().to_ascii_lowercase().as_str() {
        "ip" | "ipv4" | "ipv6" | "ip_address" => {
            Technique::new("T1071", "Application Layer Protocol")
        }
        "domain" | "hostname" | "fqdn" => Technique::new("T1071.004", "DNS"),
        "url" | "uri" => Technique::new("T1566.002", "Spearphishing Link"),
        "email" | "email_address" => Technique::new("T1566", "Phishing"),
        "md5" | "sha1" | "sha256" | "hash" | "file_hash" | "file" | "filename" => {
            Technique::new("T1204.002", "Malicious File")
        }
        _ => Technique::new("T1588", "Obtain Capabilities"),
    }
}

/// Technique implied by a custom alert type or incident category.
pub(crate) fn technique_for_category(category: &str) -> Technique {
    let normalized = category.trim().to_ascii_lowercase().replace([' ', '-'], "_");
    match normalized.as_str() {
        "malware" | "ransomware" => Technique::new("T1204", "User Execution"),
        "phishing" => Technique::new("T1566", "Phishing"),
        "intrusion" | "unauthorized_access" => {
            Technique::new("T1190", "Exploit Public-Facing Application")
        }
        "brute_force" | "failed_login" | "authentication" => {
            Technique::new("T1110", "Brute Force")
        }
        "data_exfiltration" | "data_breach" | "data_leak" => {
            Technique::new("T1041", "Exfiltration Over C2 Channel")
        }
        "privilege_escalation" => {
            Technique::new("T1068", "Exploitation for Privilege Escalation")
        }
        "denial_of_service" | "dos" | "ddos" => Technique::new("T1498", "Network Denial of Service"),
        "network_anomaly" | "unusual_traffic" | "anomaly" => {
            Technique::new("T1071", "Application Layer Protocol")
        }
        "configuration_change" | "policy_violation" => {
            Technique::new("T1562", "Impair Defenses")
        }
        "" => Technique::new("T1082", "System Information Discovery"),
        _ => Technique::new("T1082", humanize(category)),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use serde_json::json;

    pub(crate) fn inventory() -> Vec<AssetRecord> {
        decode_records(
            "assets",
            &[
                json!({
                    "id": 1,
                    "name": "WEB-01",
                    "asset_type_display": "Server",
                    "criticality": "high",
                    "environment": "production",
                    "metadata": {"os": "Ubuntu 22.04", "location": "Frankfurt, DE", "ip_address": "10.0.0.5"},
                    "last_seen": "2024-05-01T08:00:00Z"
                }),
                json!({
                    "id": 2,
                    "name": "LAPTOP-17",
                    "asset_type": "workstation",
                    "criticality": "medium",
                    "environment": "corporate",
                    "updated_at": "2024-04-30T12:00:00Z"
                }),
            ],
        )
    }

    pub(crate) fn now() -> DateTime<Utc> {
        parse_rfc3339("2024-05-02T00:00:00Z").unwrap()
    }
}
