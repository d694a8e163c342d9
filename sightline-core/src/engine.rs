//! Correlation engine — ties adapters, synthesis, aggregation, and export together.

use crate::adapters::{
    AdapterContext, adapt_custom_alerts, adapt_incidents, adapt_ioc_alerts, decode_records,
};
use crate::aggregate::{AffectedAsset, aggregate_by_asset, sort_by_recency};
use crate::collector::{CollectedTelemetry, SourceCollector, SourceReport, TelemetrySource};
use crate::config::{EngineConfig, load_config};
use crate::detection::Detection;
use crate::error::{CorrelationError, ExportError};
use crate::export::{
    ExportFormat, ExportPayload, SeverityBreakdown, export_filename, render_csv, render_json,
};
use crate::paginate::{Page, SeverityFilter, filter_detections, paginate};
use crate::source::{AssetRecord, SourcePayload};
use crate::synth::{FallbackSynthesizer, shortfall};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// What the caller wants correlated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationRequest {
    /// Label used for export file names (e.g. "malware").
    pub category: String,
    /// Caller-expected detection count; the synthesizer tops up to it.
    pub expected_count: Option<usize>,
}

impl Default for CorrelationRequest {
    fn default() -> Self {
        Self {
            category: "all".to_string(),
            expected_count: None,
        }
    }
}

impl CorrelationRequest {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            expected_count: None,
        }
    }

    pub fn with_expected_count(mut self, count: usize) -> Self {
        self.expected_count = Some(count);
        self
    }
}

/// Output of one correlation run.
#[derive(Debug, Clone)]
pub struct CorrelationResult {
    pub run_id: Uuid,
    pub category: String,
    pub generated_at: DateTime<Utc>,
    /// All detections, most recent first.
    pub detections: Vec<Detection>,
    /// Rollup over `detections`.
    pub affected_assets: Vec<AffectedAsset>,
    /// How many of `detections` were synthesized.
    pub synthesized: usize,
    pub source_reports: Vec<SourceReport>,
}

/// One page of (filtered) detections.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionView {
    pub filter: SeverityFilter,
    pub page: usize,
    pub total_pages: usize,
    pub total_filtered: usize,
    pub detections: Vec<Detection>,
}

impl CorrelationResult {
    /// Severity histogram over every detection in the run.
    pub fn summary(&self) -> SeverityBreakdown {
        SeverityBreakdown::from_detections(&self.detections)
    }

    /// Filtered detections, in run order.
    pub fn filtered(&self, filter: SeverityFilter) -> Vec<Detection> {
        filter_detections(&self.detections, filter)
    }

    /// Filter, then cut out one 1-based page.
    pub fn view(&self, filter: SeverityFilter, page: usize, page_size: usize) -> DetectionView {
        let filtered = self.filtered(filter);
        let Page {
            total_pages,
            total_items,
            items,
            ..
        } = paginate(&filtered, page, page_size);
        DetectionView {
            filter,
            page,
            total_pages,
            total_filtered: total_items,
            detections: items.to_vec(),
        }
    }

    /// Render an export of the filtered detections with freshly recomputed assets.
    pub fn export(
        &self,
        format: ExportFormat,
        filter: SeverityFilter,
        top_assets: usize,
        now: DateTime<Utc>,
    ) -> Result<ExportPayload, ExportError> {
        let detections = self.filtered(filter);
        let assets = aggregate_by_asset(&detections);
        let body = match format {
            ExportFormat::Csv => render_csv(&detections),
            ExportFormat::Json => render_json(&detections, &assets, filter, top_assets, now)?,
        };
        debug!(
            run_id = %self.run_id,
            %format,
            %filter,
            detections = detections.len(),
            bytes = body.len(),
            "Rendered export"
        );
        Ok(ExportPayload {
            format,
            filename: export_filename(&self.category, now.date_naive(), format),
            body,
        })
    }
}

/// Runs the correlation pipeline.
pub struct CorrelationEngine {
    config: EngineConfig,
}

impl CorrelationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Build an engine from the layered configuration of `workspace`.
    pub fn from_workspace(
        workspace: &Path,
        config_file: Option<&Path>,
        overrides: Option<&EngineConfig>,
    ) -> Result<Self, CorrelationError> {
        let config = load_config(Some(workspace), config_file, overrides)?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run every payload through its adapter and concatenate the results.
    ///
    /// Asset payloads are not converted; they form the lookup inventory for the
    /// other adapters. Duplicate ids are suffixed so ids stay unique in the run.
    pub fn normalize(&self, payloads: &[SourcePayload], now: DateTime<Utc>) -> Vec<Detection> {
        let assets = self.inventory(payloads);
        self.normalize_with(&assets, payloads, now)
    }

    /// [`normalize`](Self::normalize) against an already decoded inventory.
    pub fn normalize_with(
        &self,
        assets: &[AssetRecord],
        payloads: &[SourcePayload],
        now: DateTime<Utc>,
    ) -> Vec<Detection> {
        let ctx = AdapterContext {
            assets,
            resolution: self.config.asset_resolution,
            confidence: &self.config.confidence,
            now,
        };

        let mut detections = Vec::new();
        for payload in payloads {
            match payload {
                SourcePayload::IocAlerts(records) => {
                    detections.extend(adapt_ioc_alerts(records, &ctx))
                }
                SourcePayload::CustomAlerts(records) => {
                    detections.extend(adapt_custom_alerts(records, &ctx))
                }
                SourcePayload::Incidents(records) => {
                    detections.extend(adapt_incidents(records, &ctx))
                }
                SourcePayload::Assets(_) => {}
            }
        }
        dedupe_ids(&mut detections);
        detections
    }

    /// Full synchronous pipeline over already-fetched payloads.
    pub fn correlate<R: Rng>(
        &self,
        payloads: &[SourcePayload],
        request: &CorrelationRequest,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> CorrelationResult {
        let assets = self.inventory(payloads);
        let mut detections = self.normalize_with(&assets, payloads, now);
        let real = detections.len();

        let missing = shortfall(real, self.config.min_detections, request.expected_count);
        if missing > 0 {
            let mut synth =
                FallbackSynthesizer::new(rng, self.config.synthetic_lookback_days, now);
            detections.extend(synth.synthesize(missing, 0, &assets));
            info!(
                real,
                synthesized = missing,
                "Detection set below minimum, added synthetic records"
            );
        }

        sort_by_recency(&mut detections);
        let affected_assets = aggregate_by_asset(&detections);

        let result = CorrelationResult {
            run_id: Uuid::new_v4(),
            category: request.category.clone(),
            generated_at: now,
            detections,
            affected_assets,
            synthesized: missing,
            source_reports: Vec::new(),
        };
        info!(
            run_id = %result.run_id,
            category = %result.category,
            detections = result.detections.len(),
            affected_assets = result.affected_assets.len(),
            synthesized = result.synthesized,
            "Correlation run complete"
        );
        result
    }

    /// Fetch every source concurrently, then correlate.
    pub async fn run(
        &self,
        sources: &[Arc<dyn TelemetrySource>],
        request: &CorrelationRequest,
        cancel: &CancellationToken,
    ) -> CorrelationResult {
        let collector =
            SourceCollector::new(Duration::from_secs(self.config.sources.timeout_secs));
        let CollectedTelemetry {
            payloads, reports, ..
        } = collector.collect(sources, cancel).await;

        let mut rng = match self.config.synthetic_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut result = self.correlate(&payloads, request, &mut rng, Utc::now());
        result.source_reports = reports;
        result
    }

    fn inventory(&self, payloads: &[SourcePayload]) -> Vec<AssetRecord> {
        payloads
            .iter()
            .filter_map(|p| match p {
                SourcePayload::Assets(records) => {
                    Some(decode_records::<AssetRecord>("assets", records))
                }
                _ => None,
            })
            .flatten()
            .collect()
    }
}

/// Suffix repeated ids (`id`, `id#2`, `id#3`, ...).
fn dedupe_ids(detections: &mut [Detection]) {
    let mut seen: HashSet<String> = HashSet::with_capacity(detections.len());
    for detection in detections.iter_mut() {
        if !seen.insert(detection.id.clone()) {
            let mut n = 2;
            let mut candidate = format!("{}#{n}", detection.id);
            while seen.contains(&candidate) {
                n += 1;
                candidate = format!("{}#{n}", detection.id);
            }
            seen.insert(candidate.clone());
            detection.id = candidate;
        }
    }
}
