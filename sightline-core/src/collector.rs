//! Source collector — fetch raw telemetry from every configured source concurrently.
//!
//! Each source runs in its own task. A failing, timed-out, cancelled, or
//! panicking source degrades to an empty contribution and a failed
//! [`SourceReport`]; it never aborts the run.

use crate::config::SourcesConfig;
use crate::error::SourceError;
use crate::source::{SourceKind, SourcePayload};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A place raw telemetry of one kind can be fetched from.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Human-readable name used in logs and reports.
    fn name(&self) -> &str;

    /// Which schema the fetched records follow.
    fn kind(&self) -> SourceKind;

    /// Fetch the raw records.
    async fn fetch(&self) -> Result<SourcePayload, SourceError>;
}

/// Reads a JSON document from a local file.
pub struct FileSource {
    name: String,
    kind: SourceKind,
    path: PathBuf,
}

impl FileSource {
    pub fn new(kind: SourceKind, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: format!("{kind}:{}", path.display()),
            kind,
            path,
        }
    }
}

#[async_trait]
impl TelemetrySource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self) -> Result<SourcePayload, SourceError> {
        let content =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|e| SourceError::Read {
                    path: self.path.display().to_string(),
                    message: e.to_string(),
                })?;
        let document: Value = serde_json::from_str(&content).map_err(|e| SourceError::Decode {
            source_name: self.name.clone(),
            message: e.to_string(),
        })?;
        Ok(SourcePayload::new(
            self.kind,
            extract_records(&self.name, document)?,
        ))
    }
}

/// GETs a JSON document from an HTTP endpoint.
pub struct HttpSource {
    name: String,
    kind: SourceKind,
    url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(kind: SourceKind, url: impl Into<String>, token: Option<String>) -> Self {
        let url = url.into();
        Self {
            name: format!("{kind}:{url}"),
            kind,
            url,
            token,
            client: reqwest::Client::new(),
        }
    }

    fn http_error(&self, e: reqwest::Error) -> SourceError {
        SourceError::Http {
            url: self.url.clone(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl TelemetrySource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self) -> Result<SourcePayload, SourceError> {
        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let document: Value = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.http_error(e))?
            .json()
            .await
            .map_err(|e| self.http_error(e))?;
        Ok(SourcePayload::new(
            self.kind,
            extract_records(&self.name, document)?,
        ))
    }
}

/// Pull the record array out of a fetched document.
///
/// Accepts a bare array or an envelope object carrying the array under
/// `results` or `data` (paginated list APIs).
pub fn extract_records(source_name: &str, document: Value) -> Result<Vec<Value>, SourceError> {
    match document {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => {
            for key in ["results", "data"] {
                if let Some(Value::Array(records)) = map.remove(key) {
                    return Ok(records);
                }
            }
            Err(SourceError::Decode {
                source_name: source_name.to_string(),
                message: "object has no 'results' or 'data' array".into(),
            })
        }
        other => Err(SourceError::Decode {
            source_name: source_name.to_string(),
            message: format!("expected an array, found {}", json_type(&other)),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Build sources for every location configured in `config`.
///
/// Locations starting with `http://` or `https://` become [`HttpSource`]s,
/// anything else is treated as a file path.
pub fn sources_from_config(config: &SourcesConfig) -> Vec<Arc<dyn TelemetrySource>> {
    [
        (SourceKind::IocAlerts, &config.ioc_alerts),
        (SourceKind::CustomAlerts, &config.custom_alerts),
        (SourceKind::Assets, &config.assets),
        (SourceKind::Incidents, &config.incidents),
    ]
    .into_iter()
    .filter_map(|(kind, location)| {
        let location = location.as_deref()?.trim();
        if location.is_empty() {
            return None;
        }
        let source: Arc<dyn TelemetrySource> =
            if location.starts_with("http://") || location.starts_with("https://") {
                Arc::new(HttpSource::new(kind, location, config.api_token.clone()))
            } else {
                Arc::new(FileSource::new(kind, location))
            };
        Some(source)
    })
    .collect()
}

/// Outcome of fetching one source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub kind: SourceKind,
    pub records: usize,
    pub duration_ms: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything fetched in one collection pass.
#[derive(Debug, Clone, Default)]
pub struct CollectedTelemetry {
    /// One payload per source, empty for failed sources.
    pub payloads: Vec<SourcePayload>,
    pub reports: Vec<SourceReport>,
    /// Whether the pass was cancelled before every source finished.
    pub cancelled: bool,
}

impl CollectedTelemetry {
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.reports.iter().filter(|r| !r.success)
    }
}

/// Runs sources concurrently with a per-source timeout.
pub struct SourceCollector {
    timeout: Duration,
}

impl SourceCollector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Fetch every source, joining all tasks before returning.
    pub async fn collect(
        &self,
        sources: &[Arc<dyn TelemetrySource>],
        cancel: &CancellationToken,
    ) -> CollectedTelemetry {
        let start = Instant::now();
        let timeout = self.timeout;

        let handles: Vec<_> = sources
            .iter()
            .map(|source| {
                let source = Arc::clone(source);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    let started = Instant::now();
                    let name = source.name().to_string();
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(SourceError::Cancelled(name)),
                        result = tokio::time::timeout(timeout, source.fetch()) => match result {
                            Ok(result) => result,
                            Err(_) => Err(SourceError::Timeout(name, timeout.as_secs())),
                        },
                    };
                    (outcome, started.elapsed())
                })
            })
            .collect();

        let results = futures::future::join_all(handles).await;

        let mut collected = CollectedTelemetry::default();
        for (source, joined) in sources.iter().zip(results) {
            let (outcome, elapsed) = match joined {
                Ok(done) => done,
                Err(e) => (
                    Err(SourceError::Aborted(source.name().to_string(), e.to_string())),
                    Duration::ZERO,
                ),
            };

            let (payload, error) = match outcome {
                Ok(payload) if payload.kind() == source.kind() => (payload, None),
                Ok(payload) => (
                    SourcePayload::empty(source.kind()),
                    Some(format!(
                        "returned {} records, expected {}",
                        payload.kind(),
                        source.kind()
                    )),
                ),
                Err(e) => {
                    if matches!(e, SourceError::Cancelled(_)) {
                        collected.cancelled = true;
                    }
                    (SourcePayload::empty(source.kind()), Some(e.to_string()))
                }
            };

            if let Some(error) = &error {
                warn!(source = source.name(), error = %error, "Source failed, using empty contribution");
            } else {
                debug!(
                    source = source.name(),
                    records = payload.len(),
                    "Source fetched"
                );
            }

            collected.reports.push(SourceReport {
                source: source.name().to_string(),
                kind: source.kind(),
                records: payload.len(),
                duration_ms: elapsed.as_millis() as u64,
                success: error.is_none(),
                error,
            });
            collected.payloads.push(payload);
        }

        info!(
            sources = sources.len(),
            failed = collected.failed_sources().count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Telemetry collection finished"
        );
        collected
    }
}

impl Default for SourceCollector {
    fn default() -> Self {
        Self::new(Duration::from_secs(SourcesConfig::default().timeout_secs))
    }
}
