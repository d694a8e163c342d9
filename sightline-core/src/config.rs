//! Configuration for the correlation engine.

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Floor below which the fallback synthesizer tops up the detection set.
    pub min_detections: usize,
    /// Detections per page.
    pub page_size: usize,
    /// Number of assets listed in the JSON export summary.
    pub top_assets: usize,
    /// Synthesized detections are spread over this many trailing days.
    pub synthetic_lookback_days: u32,
    /// Fixed seed for the synthesizer; `None` seeds from entropy.
    pub synthetic_seed: Option<u64>,
    /// How alerts without an exact asset match are attributed.
    pub asset_resolution: AssetResolution,
    /// Confidence assigned when a source record carries none.
    pub confidence: ConfidenceDefaults,
    /// Where raw telemetry comes from.
    pub sources: SourcesConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_detections: 5,
            page_size: 10,
            top_assets: 5,
            synthetic_lookback_days: 7,
            synthetic_seed: None,
            asset_resolution: AssetResolution::default(),
            confidence: ConfidenceDefaults::default(),
            sources: SourcesConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(invalid("page_size", "must be at least 1"));
        }
        if self.synthetic_lookback_days == 0 {
            return Err(invalid("synthetic_lookback_days", "must be at least 1"));
        }
        for (field, value) in [
            ("confidence.ioc_alert", self.confidence.ioc_alert),
            ("confidence.custom_alert", self.confidence.custom_alert),
            ("confidence.incident", self.confidence.incident),
        ] {
            if value > 100 {
                return Err(invalid(field, "must be between 0 and 100"));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Attribution strategy for alerts whose `asset_id` matches no inventory entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetResolution {
    /// Attribute to inventory entry `index mod inventory_len`; drop when the inventory is empty.
    #[default]
    Positional,
    /// Attribute to the `Unassigned` sentinel asset.
    Unassigned,
}

/// Default confidence per source kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceDefaults {
    pub ioc_alert: u8,
    pub custom_alert: u8,
    pub incident: u8,
}

impl Default for ConfidenceDefaults {
    fn default() -> Self {
        Self {
            ioc_alert: 75,
            custom_alert: 85,
            incident: 90,
        }
    }
}

/// Locations of raw telemetry. Each is a file path or an `http(s)://` URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Per-source fetch timeout (seconds).
    pub timeout_secs: u64,
    /// Bearer token sent to HTTP sources.
    pub api_token: Option<String>,
    pub ioc_alerts: Option<String>,
    pub custom_alerts: Option<String>,
    pub assets: Option<String>,
    pub incidents: Option<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            api_token: None,
            ioc_alerts: None,
            custom_alerts: None,
            assets: None,
            incidents: None,
        }
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `SIGHTLINE_`)
/// 3. Explicit config file, or workspace-local `.sightline/config.toml`
/// 4. User config (`~/.config/sightline/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&EngineConfig>,
) -> Result<EngineConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));

    if let Some(dirs) = directories::ProjectDirs::from("dev", "sightline", "sightline") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(path) = config_file {
        figment = figment.merge(Toml::file(path));
    } else if let Some(ws) = workspace {
        let ws_config = ws.join(".sightline").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // SIGHTLINE_PAGE_SIZE, SIGHTLINE_SOURCES__TIMEOUT_SECS, ...
    figment = figment.merge(Env::prefixed("SIGHTLINE_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: EngineConfig = figment.extract().map_err(Box::new)?;
    config.validate()?;
    Ok(config)
}
