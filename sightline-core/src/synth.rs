//! Fallback synthesizer — tops up sparse detection sets with tagged filler records.
//!
//! Synthesized records exist only to keep aggregation and export non-empty when
//! upstream telemetry is sparse. Every one carries the [`SYNTHETIC_ID_PREFIX`]
//! and the [`SOURCE_LABEL`] so consumers can tell them apart from real data.

use crate::adapters::asset_info_from_record;
use crate::detection::{AssetInfo, Detection, Severity, Technique};
use crate::source::AssetRecord;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Id prefix of every synthesized detection.
pub const SYNTHETIC_ID_PREFIX: &str = "synthetic-";

/// Provenance label of every synthesized detection.
pub const SOURCE_LABEL: &str = "Synthetic";

const TECHNIQUES: [(&str, &str); 8] = [
    ("T1059", "Command and Scripting Interpreter"),
    ("T1071", "Application Layer Protocol"),
    ("T1110", "Brute Force"),
    ("T1204", "User Execution"),
    ("T1566", "Phishing"),
    ("T1055", "Process Injection"),
    ("T1003", "OS Credential Dumping"),
    ("T1486", "Data Encrypted for Impact"),
];

const ACTIONS: [&str; 4] = ["Alerted", "Blocked", "Quarantined", "Logged"];

/// Number of records needed to reach `max(floor, requested)`.
pub fn shortfall(current: usize, floor: usize, requested: Option<usize>) -> usize {
    let target = floor.max(requested.unwrap_or(0));
    target.saturating_sub(current)
}

/// Generates filler detections from an injected random source.
pub struct FallbackSynthesizer<'a, R: Rng> {
    rng: &'a mut R,
    lookback: Duration,
    now: DateTime<Utc>,
}

impl<'a, R: Rng> FallbackSynthesizer<'a, R> {
    pub fn new(rng: &'a mut R, lookback_days: u32, now: DateTime<Utc>) -> Self {
        Self {
            rng,
            lookback: Duration::days(i64::from(lookback_days.max(1))),
            now,
        }
    }

    /// Produce `count` detections, cycling positionally over `assets`.
    ///
    /// Ids continue from `start_index` so repeated calls within one run stay unique.
    pub fn synthesize(
        &mut self,
        count: usize,
        start_index: usize,
        assets: &[AssetRecord],
    ) -> Vec<Detection> {
        (0..count)
            .map(|offset| self.one(start_index + offset, assets))
            .collect()
    }

    fn one(&mut self, index: usize, assets: &[AssetRecord]) -> Detection {
        let asset_info = if assets.is_empty() {
            AssetInfo::placeholder(format!("synthetic-host-{:02}", index % 10 + 1))
        } else {
            asset_info_from_record(&assets[index % assets.len()])
        };

        let severity = Severity::ALL[self.rng.gen_range(0..Severity::ALL.len())];
        let (technique_id, technique_name) = TECHNIQUES[self.rng.gen_range(0..TECHNIQUES.len())];
        let action = ACTIONS[self.rng.gen_range(0..ACTIONS.len())];
        let max_offset = self.lookback.num_seconds().max(1);
        let detection_time = self.now - Duration::seconds(self.rng.gen_range(0..max_offset));
        let confidence = self.rng.gen_range(60..=95u8);

        Detection {
            id: format!("{SYNTHETIC_ID_PREFIX}{:04}", index + 1),
            severity,
            source: SOURCE_LABEL.to_string(),
            technique: Technique::new(technique_id, technique_name),
            detection_time,
            asset_name: asset_info.name.clone(),
            asset_info,
            user_name: "system".to_string(),
            action: action.to_string(),
            confidence,
            description: format!(
                "Synthesized {} detection ({technique_name}); no upstream telemetry",
                severity
            ),
            file_name: String::new(),
            file_hash: String::new(),
        }
    }
}
