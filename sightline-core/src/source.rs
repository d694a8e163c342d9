//! Raw telemetry schemas as delivered by upstream collaborators.
//!
//! Each source kind is a distinct variant of [`SourcePayload`]; adapters match on
//! the variant instead of probing optional fields.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The kinds of telemetry the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    IocAlerts,
    CustomAlerts,
    Assets,
    Incidents,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::IocAlerts => "ioc_alerts",
            SourceKind::CustomAlerts => "custom_alerts",
            SourceKind::Assets => "assets",
            SourceKind::Incidents => "incidents",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One source's worth of raw, still undecoded records.
///
/// Records stay as JSON values until an adapter decodes them, so a single
/// malformed record can be skipped without losing its siblings.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePayload {
    IocAlerts(Vec<Value>),
    CustomAlerts(Vec<Value>),
    Assets(Vec<Value>),
    Incidents(Vec<Value>),
}

impl SourcePayload {
    /// Wrap raw records of the given kind.
    pub fn new(kind: SourceKind, records: Vec<Value>) -> Self {
        match kind {
            SourceKind::IocAlerts => SourcePayload::IocAlerts(records),
            SourceKind::CustomAlerts => SourcePayload::CustomAlerts(records),
            SourceKind::Assets => SourcePayload::Assets(records),
            SourceKind::Incidents => SourcePayload::Incidents(records),
        }
    }

    /// An empty contribution of the given kind.
    pub fn empty(kind: SourceKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            SourcePayload::IocAlerts(_) => SourceKind::IocAlerts,
            SourcePayload::CustomAlerts(_) => SourceKind::CustomAlerts,
            SourcePayload::Assets(_) => SourceKind::Assets,
            SourcePayload::Incidents(_) => SourceKind::Incidents,
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    pub fn records(&self) -> &[Value] {
        match self {
            SourcePayload::IocAlerts(r)
            | SourcePayload::CustomAlerts(r)
            | SourcePayload::Assets(r)
            | SourcePayload::Incidents(r) => r,
        }
    }
}

/// An indicator attached to an IOC alert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedIoc {
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub ioc_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub value: String,
}

/// An asset the IOC platform matched the alert against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchedAsset {
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub asset_type: String,
}

/// Threat-intelligence alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IocAlert {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_default")]
    pub severity: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub confidence: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub related_iocs: Vec<RelatedIoc>,
    #[serde(default, deserialize_with = "null_default")]
    pub matched_assets: Vec<MatchedAsset>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub is_acknowledged: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
}

/// Asset-scoped alert raised by custom monitoring rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomAlert {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub asset_id: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub alert_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub severity: String,
    #[serde(default, deserialize_with = "null_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// Asset inventory entry, used as the lookup table for asset resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub asset_type_display: Option<String>,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub criticality: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Security-operations incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_default")]
    pub priority: String,
    #[serde(default, deserialize_with = "null_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_default")]
    pub category_display: String,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub asset_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub confidence: Option<i64>,
}

/// Read a string field out of an optional metadata map.
pub(crate) fn meta_str<'a>(metadata: &'a Option<Map<String, Value>>, key: &str) -> Option<&'a str> {
    metadata
        .as_ref()?
        .get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Read an integer field out of an optional metadata map.
pub(crate) fn meta_i64(metadata: &Option<Map<String, Value>>, key: &str) -> Option<i64> {
    value_i64(metadata.as_ref()?.get(key)?)
}

/// Integers as-is, floats rounded, numeric strings parsed.
fn value_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64))
        }
        _ => None,
    }
}

/// Treat an explicit `null` like a missing key.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Confidence as delivered: integer, float, or numeric string; anything else is absent.
fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_i64))
}

fn id_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accept ids delivered as either JSON strings or numbers.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    id_to_string(value).ok_or_else(|| serde::de::Error::custom("id must be a non-empty string or a number"))
}

fn opt_id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(id_to_string))
}
