//! Asset aggregation — group detections by asset and compute per-asset rollups.

use crate::detection::{AssetInfo, Detection, Severity};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};

/// Rollup of every detection sharing one asset name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedAsset {
    /// Grouping key (the detections' `asset_name`).
    pub name: String,
    /// Asset snapshot from the first detection seen for this asset.
    pub asset_info: AssetInfo,
    pub detection_count: usize,
    /// Serialized from most to least severe.
    #[serde(serialize_with = "severities_descending")]
    pub severities: BTreeSet<Severity>,
    /// Technique ids, serialized in ascending order.
    pub techniques: BTreeSet<String>,
    pub first_detection: DateTime<Utc>,
    pub last_detection: DateTime<Utc>,
}

impl AffectedAsset {
    fn seed(detection: &Detection) -> Self {
        Self {
            name: detection.asset_name.clone(),
            asset_info: detection.asset_info.clone(),
            detection_count: 0,
            severities: BTreeSet::new(),
            techniques: BTreeSet::new(),
            first_detection: detection.detection_time,
            last_detection: detection.detection_time,
        }
    }

    fn absorb(&mut self, detection: &Detection) {
        self.detection_count += 1;
        self.severities.insert(detection.severity);
        self.techniques.insert(detection.technique.id.clone());
        self.first_detection = self.first_detection.min(detection.detection_time);
        self.last_detection = self.last_detection.max(detection.detection_time);
    }

    /// Severities from most to least severe.
    pub fn severities_desc(&self) -> Vec<Severity> {
        self.severities.iter().rev().copied().collect()
    }

    /// The most severe level observed on this asset.
    pub fn highest_severity(&self) -> Option<Severity> {
        self.severities.last().copied()
    }
}

fn severities_descending<S: Serializer>(
    set: &BTreeSet<Severity>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(set.iter().rev())
}

/// Group detections by `asset_name`.
///
/// The result is sorted by detection count descending, ties broken by name
/// ascending.
pub fn aggregate_by_asset(detections: &[Detection]) -> Vec<AffectedAsset> {
    let mut by_name: HashMap<&str, AffectedAsset> = HashMap::new();

    for detection in detections {
        by_name
            .entry(detection.asset_name.as_str())
            .or_insert_with(|| AffectedAsset::seed(detection))
            .absorb(detection);
    }

    let mut assets: Vec<AffectedAsset> = by_name.into_values().collect();
    assets.sort_by(|a, b| {
        b.detection_count
            .cmp(&a.detection_count)
            .then_with(|| a.name.cmp(&b.name))
    });
    assets
}

/// Order detections most recent first; ties broken by id for determinism.
pub fn sort_by_recency(detections: &mut [Detection]) {
    detections.sort_by(|a, b| {
        b.detection_time
            .cmp(&a.detection_time)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::detection::Technique;
    use chrono::Duration;

    pub(crate) fn base_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    pub(crate) fn detection(
        id: &str,
        asset: &str,
        severity: Severity,
        technique: &str,
        minutes: i64,
    ) -> Detection {
        Detection {
            id: id.to_string(),
            severity,
            source: "Test".to_string(),
            technique: Technique::new(technique, "Test Technique"),
            detection_time: base_time() + Duration::minutes(minutes),
            asset_name: asset.to_string(),
            asset_info: AssetInfo::placeholder(asset),
            user_name: "tester".to_string(),
            action: "Alerted".to_string(),
            confidence: 80,
            description: format!("detection {id}"),
            file_name: String::new(),
            file_hash: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{base_time, detection};
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_three_detections_on_one_asset() {
        let detections = vec![
            detection("d1", "WEB-01", Severity::High, "T1071", 10),
            detection("d2", "WEB-01", Severity::High, "T1110", 5),
            detection("d3", "WEB-01", Severity::Critical, "T1071", 30),
        ];
        let assets = aggregate_by_asset(&detections);

        assert_eq!(assets.len(), 1);
        let web = &assets[0];
        assert_eq!(web.name, "WEB-01");
        assert_eq!(web.detection_count, 3);
        assert_eq!(
            web.severities,
            BTreeSet::from([Severity::High, Severity::Critical])
        );
        assert_eq!(
            web.techniques,
            BTreeSet::from(["T1071".to_string(), "T1110".to_string()])
        );
        assert_eq!(web.first_detection, base_time() + Duration::minutes(5));
        assert_eq!(web.last_detection, base_time() + Duration::minutes(30));
        assert_eq!(web.highest_severity(), Some(Severity::Critical));
    }

    #[test]
    fn test_sorted_by_count_then_name() {
        let detections = vec![
            detection("1", "beta", Severity::Low, "T1", 0),
            detection("2", "alpha", Severity::Low, "T1", 0),
            detection("3", "gamma", Severity::Low, "T1", 0),
            detection("4", "gamma", Severity::Medium, "T2", 1),
        ];
        let names: Vec<_> = aggregate_by_asset(&detections)
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["gamma", "alpha", "beta"]);
    }

    #[test]
    fn test_first_seen_snapshot_wins() {
        let mut first = detection("1", "WEB-01", Severity::Low, "T1", 0);
        first.asset_info.os = "Ubuntu".into();
        let mut second = detection("2", "WEB-01", Severity::Low, "T1", 1);
        second.asset_info.os = "Windows".into();

        let assets = aggregate_by_asset(&[first, second]);
        assert_eq!(assets[0].asset_info.os, "Ubuntu");
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate_by_asset(&[]).is_empty());
    }

    #[test]
    fn test_severities_serialize_descending() {
        let detections = vec![
            detection("1", "A", Severity::Low, "T1", 0),
            detection("2", "A", Severity::Critical, "T1", 0),
            detection("3", "A", Severity::Medium, "T1", 0),
        ];
        let json = serde_json::to_value(&aggregate_by_asset(&detections)[0]).unwrap();
        assert_eq!(json["severities"], serde_json::json!(["critical", "medium", "low"]));
        assert_eq!(json["detectionCount"], 3);
    }

    #[test]
    fn test_sort_by_recency() {
        let mut detections = vec![
            detection("b", "A", Severity::Low, "T1", 0),
            detection("c", "A", Severity::Low, "T1", 60),
            detection("a", "A", Severity::Low, "T1", 0),
        ];
        sort_by_recency(&mut detections);
        let ids: Vec<_> = detections.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
