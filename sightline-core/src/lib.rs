//! Sightline Core — detection correlation and reporting engine.
//!
//! Normalizes heterogeneous security telemetry (IOC alerts, asset-scoped custom
//! alerts, SOC incidents) into one canonical [`Detection`] record, tops sparse
//! result sets up with clearly tagged synthetic records, aggregates detections
//! by affected asset, and renders filtered result sets as CSV or JSON.
//!
//! - **Sources:** raw payload schemas and the concurrent [`SourceCollector`]
//! - **Adapters:** per-source conversion into detections
//! - **Synthesis:** [`FallbackSynthesizer`] with an injected RNG
//! - **Aggregation:** [`aggregate_by_asset`] rollups
//! - **Views:** severity filtering and fixed-size pagination
//! - **Export:** CSV and JSON renderers

pub mod adapters;
pub mod aggregate;
pub mod collector;
pub mod config;
pub mod detection;
pub mod engine;
pub mod error;
pub mod export;
pub mod paginate;
pub mod request;
pub mod source;
pub mod synth;

pub use aggregate::{AffectedAsset, aggregate_by_asset};
pub use collector::{
    CollectedTelemetry, FileSource, HttpSource, SourceCollector, SourceReport, TelemetrySource,
    sources_from_config,
};
pub use config::{AssetResolution, EngineConfig, load_config};
pub use detection::{AssetInfo, Detection, Severity, Technique};
pub use engine::{CorrelationEngine, CorrelationRequest, CorrelationResult, DetectionView};
pub use error::{ConfigError, CorrelationError, ExportError, SourceError};
pub use export::{ExportFormat, ExportPayload};
pub use paginate::{Page, SeverityFilter, filter_detections, paginate};
pub use request::{LatestResult, RequestSequencer, RequestToken};
pub use source::{SourceKind, SourcePayload};
pub use synth::FallbackSynthesizer;
