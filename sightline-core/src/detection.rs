//! Canonical detection schema — the normalized record every source adapter produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Grouping key assigned to detections whose asset cannot be resolved
/// when [`AssetResolution::Unassigned`](crate::config::AssetResolution) is active.
pub const UNASSIGNED_ASSET: &str = "Unassigned";

/// Severity of a detection. Ordered so that `Critical` is the greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All levels from most to least severe.
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    /// Parse a source-provided label. Unknown labels map to `Low`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            _ => Severity::Low,
        }
    }

    /// Lowercase name used in exports and filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loose reference to an attack technique. Not validated against any taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technique {
    pub id: String,
    pub name: String,
}

impl Technique {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Denormalized snapshot of an asset at detection time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub group: String,
    pub os: String,
    pub location: String,
    pub ip_address: String,
    pub last_seen: Option<DateTime<Utc>>,
    pub risk_level: String,
}

impl AssetInfo {
    /// A snapshot carrying only a name; every other field gets a neutral placeholder.
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            asset_type: "unknown".into(),
            group: "unknown".into(),
            os: "Unknown".into(),
            location: "Unknown".into(),
            ip_address: "N/A".into(),
            last_seen: None,
            risk_level: "unknown".into(),
        }
    }
}

/// A normalized detection record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    /// Unique within a correlation run.
    pub id: String,
    pub severity: Severity,
    /// Provenance label such as "Threat Intelligence".
    pub source: String,
    pub technique: Technique,
    pub detection_time: DateTime<Utc>,
    /// Grouping key for aggregation. Never empty.
    pub asset_name: String,
    pub asset_info: AssetInfo,
    pub user_name: String,
    pub action: String,
    /// 0-100 inclusive.
    pub confidence: u8,
    pub description: String,
    pub file_name: String,
    pub file_hash: String,
}

impl Detection {
    /// Whether this record was manufactured by the fallback synthesizer.
    pub fn is_synthetic(&self) -> bool {
        self.id.starts_with(crate::synth::SYNTHETIC_ID_PREFIX)
    }
}

/// Clamp an arbitrary source-provided confidence into 0-100.
pub fn clamp_confidence(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        let mut levels = vec![Severity::Low, Severity::Critical, Severity::Medium];
        levels.sort_by(|a, b| b.cmp(a));
        assert_eq!(
            levels,
            vec![Severity::Critical, Severity::Medium, Severity::Low]
        );
    }

    #[test]
    fn test_severity_from_label() {
        assert_eq!(Severity::from_label("HIGH"), Severity::High);
        assert_eq!(Severity::from_label(" critical "), Severity::Critical);
        assert_eq!(Severity::from_label("informational"), Severity::Low);
        assert_eq!(Severity::from_label(""), Severity::Low);
    }

    #[test]
    fn test_clamp_confidence() {
        assert_eq!(clamp_confidence(-4), 0);
        assert_eq!(clamp_confidence(42), 42);
        assert_eq!(clamp_confidence(180), 100);
    }

    #[test]
    fn test_asset_info_serializes_camel_case() {
        let info = AssetInfo::placeholder("WEB-01");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["type"], "unknown");
        assert_eq!(json["ipAddress"], "N/A");
        assert!(json.get("riskLevel").is_some());
    }
}
