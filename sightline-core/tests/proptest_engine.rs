//! Property-based tests for aggregation, filtering, pagination, and export.

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use serde_json::Value;

use sightline_core::export::{render_csv, render_json};
use sightline_core::paginate::total_pages;
use sightline_core::{
    AssetInfo, Detection, Severity, SeverityFilter, Technique, aggregate_by_asset,
    filter_detections, paginate,
};

fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn severity_strategy() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Critical),
        Just(Severity::High),
        Just(Severity::Medium),
        Just(Severity::Low),
    ]
}

fn filter_strategy() -> impl Strategy<Value = SeverityFilter> {
    prop_oneof![
        Just(SeverityFilter::All),
        Just(SeverityFilter::Critical),
        Just(SeverityFilter::High),
        Just(SeverityFilter::Medium),
        Just(SeverityFilter::Low),
    ]
}

/// Free text that exercises the CSV quoting rules.
fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("a".to_string()),
            Just(",".to_string()),
            Just("\"".to_string()),
            Just(" ".to_string()),
            Just("Ubuntu".to_string()),
            Just("x, \"y\"".to_string()),
        ],
        0..5,
    )
    .prop_map(|parts| parts.concat())
}

prop_compose! {
    fn detection_strategy()(
        index in 0usize..10_000,
        asset in prop_oneof![Just("WEB-01"), Just("DB-01"), Just("LAPTOP-7"), Just("FW, edge")],
        severity in severity_strategy(),
        technique in prop_oneof![Just("T1071"), Just("T1110"), Just("T1566")],
        minutes in 0i64..10_080,
        confidence in 0u8..=100,
        description in text_strategy(),
        file_name in text_strategy(),
        os in text_strategy(),
    ) -> Detection {
        let mut asset_info = AssetInfo::placeholder(asset);
        asset_info.os = os;
        Detection {
            id: format!("d-{index}"),
            severity,
            source: "Threat Intelligence".to_string(),
            technique: Technique::new(technique, "Some, \"quoted\" technique"),
            detection_time: base_time() + Duration::minutes(minutes),
            asset_name: asset.to_string(),
            asset_info,
            user_name: "analyst".to_string(),
            action: "Alerted".to_string(),
            confidence,
            description,
            file_name,
            file_hash: "abc123".to_string(),
        }
    }
}

/// Split one CSV record into fields, honouring double-quoted fields.
fn split_csv_row(row: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = row.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            (c, _) => field.push(c),
        }
    }
    fields.push(field);
    fields
}

proptest! {
    #[test]
    fn detection_counts_sum_to_input_len(
        detections in prop::collection::vec(detection_strategy(), 0..60)
    ) {
        let assets = aggregate_by_asset(&detections);
        let total: usize = assets.iter().map(|a| a.detection_count).sum();
        prop_assert_eq!(total, detections.len());
        prop_assert!(assets.iter().all(|a| a.detection_count >= 1));
        prop_assert!(assets.iter().all(|a| a.first_detection <= a.last_detection));
    }

    #[test]
    fn aggregation_is_sorted_by_count_then_name(
        detections in prop::collection::vec(detection_strategy(), 0..60)
    ) {
        let assets = aggregate_by_asset(&detections);
        for pair in assets.windows(2) {
            let ordered = pair[0].detection_count > pair[1].detection_count
                || (pair[0].detection_count == pair[1].detection_count && pair[0].name < pair[1].name);
            prop_assert!(ordered);
        }
    }

    #[test]
    fn filter_keeps_only_selected_and_is_idempotent(
        detections in prop::collection::vec(detection_strategy(), 0..60),
        filter in filter_strategy(),
    ) {
        let once = filter_detections(&detections, filter);
        if let Some(severity) = filter.severity() {
            prop_assert!(once.iter().all(|d| d.severity == severity));
        } else {
            prop_assert_eq!(&once, &detections);
        }
        let twice = filter_detections(&once, filter);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn pages_reassemble_the_sequence(
        detections in prop::collection::vec(detection_strategy(), 0..95),
        filter in filter_strategy(),
    ) {
        let filtered = filter_detections(&detections, filter);
        let pages = total_pages(filtered.len(), 10);
        let mut rebuilt = Vec::new();
        for page in 1..=pages {
            let slice = paginate(&filtered, page, 10);
            prop_assert_eq!(slice.total_pages, pages);
            prop_assert!(slice.items.len() <= 10);
            rebuilt.extend_from_slice(slice.items);
        }
        prop_assert_eq!(&rebuilt, &filtered);
        prop_assert!(paginate(&filtered, pages + 1, 10).items.is_empty());
    }

    #[test]
    fn csv_rows_have_header_width(
        detections in prop::collection::vec(detection_strategy(), 0..30)
    ) {
        let csv = render_csv(&detections);
        let mut lines = csv.lines();
        let header = split_csv_row(lines.next().unwrap());
        prop_assert_eq!(header.len(), 18);
        let mut rows = 0;
        for line in lines {
            prop_assert_eq!(split_csv_row(line).len(), header.len());
            rows += 1;
        }
        prop_assert_eq!(rows, detections.len());
    }

    #[test]
    fn csv_free_text_survives_quoting(detection in detection_strategy()) {
        let csv = render_csv(std::slice::from_ref(&detection));
        let row = split_csv_row(csv.lines().nth(1).unwrap());
        prop_assert_eq!(&row[0], &detection.id);
        prop_assert_eq!(&row[1], &detection.file_name);
        prop_assert_eq!(&row[7], &detection.asset_name);
        prop_assert_eq!(&row[10], &detection.asset_info.os);
        prop_assert_eq!(&row[17], &detection.description);
    }

    #[test]
    fn json_totals_match(
        detections in prop::collection::vec(detection_strategy(), 0..40),
        filter in filter_strategy(),
    ) {
        let filtered = filter_detections(&detections, filter);
        let assets = aggregate_by_asset(&filtered);
        let json = render_json(&filtered, &assets, filter, 5, base_time()).unwrap();
        let doc: Value = serde_json::from_str(&json).unwrap();

        let total = doc["total_detections"].as_u64().unwrap() as usize;
        prop_assert_eq!(total, doc["detections"].as_array().unwrap().len());
        prop_assert_eq!(total, filtered.len());

        let breakdown = doc["summary"]["severity_breakdown"].as_object().unwrap();
        let sum: u64 = breakdown.values().map(|v| v.as_u64().unwrap()).sum();
        prop_assert_eq!(sum as usize, total);

        prop_assert_eq!(
            doc["total_affected_assets"].as_u64().unwrap() as usize,
            doc["affected_assets"].as_array().unwrap().len()
        );
        prop_assert!(doc["summary"]["top_affected_assets"].as_array().unwrap().len() <= 5);
    }
}
