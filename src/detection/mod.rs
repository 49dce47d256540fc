//! Detection data model
//!
//! A [`Detection`] is a single surveillance event record. Producers build them
//! either directly or from a lenient [`DetectionDraft`], which applies the
//! dashboard's forgiving defaults instead of rejecting incomplete input.

pub mod ids;
pub mod time;

use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

pub use ids::IdGenerator;
pub use time::{clock_time, clock_time_seconds, leading_hour, parse_display_time};

/// Site centre used as the default coordinate for incomplete records.
pub const DEFAULT_LAT: f64 = 37.2289;
pub const DEFAULT_LNG: f64 = -80.4170;

/// Image reference shown when a detection carries no thumbnail.
pub const PLACEHOLDER_THUMBNAIL: &str = "/placeholder.svg";

/// Ordinal threat level attached to a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Numeric rank used by the scatter chart (low = 1 .. critical = 4)
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }

    /// Parse a severity label, falling back to `Medium` for anything unknown.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => Severity::Low,
            "high" => Severity::High,
            "critical" | "crit" => Severity::Critical,
            _ => Severity::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Display colour used by the severity chart
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Low => "#10B981",
            Severity::Medium => "#F59E0B",
            Severity::High => "#EF4444",
            Severity::Critical => "#DC2626",
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Medium
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of threat reported by the visual agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatType {
    Person,
    Vehicle,
    Object,
    Behavior,
}

impl ThreatType {
    pub const ALL: [ThreatType; 4] = [
        ThreatType::Person,
        ThreatType::Vehicle,
        ThreatType::Object,
        ThreatType::Behavior,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatType::Person => "person",
            ThreatType::Vehicle => "vehicle",
            ThreatType::Object => "object",
            ThreatType::Behavior => "behavior",
        }
    }
}

impl fmt::Display for ThreatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional scene details some producers attach to a detection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat_type: Option<ThreatType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_count: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub behavior: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub clothing: Vec<String>,
}

/// A single simulated surveillance event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    /// Display text, not a sortable instant
    pub time: String,
    pub confidence: u8,
    pub camera: String,
    pub severity: Severity,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<SceneAttributes>,
}

impl Detection {
    /// Build a detection; confidence is clamped into 0..=100.
    pub fn new(
        id: impl Into<String>,
        lat: f64,
        lng: f64,
        time: impl Into<String>,
        confidence: i64,
        camera: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            lat,
            lng,
            time: time.into(),
            confidence: clamp_confidence(confidence as f64),
            camera: camera.into(),
            severity,
            description: description.into(),
            thumbnail: None,
            attributes: None,
        }
    }

    pub fn with_attributes(mut self, attributes: SceneAttributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn thumbnail_or_placeholder(&self) -> &str {
        self.thumbnail.as_deref().unwrap_or(PLACEHOLDER_THUMBNAIL)
    }
}

/// Clamp and round a raw confidence value into 0..=100.
pub fn clamp_confidence(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

/// One entry of the append-only audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub time: String,
    pub actor: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEvent {
    pub fn new(time: impl Into<String>, actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            actor: actor.into(),
            action: action.into(),
            detail: None,
        }
    }

    /// Audit event stamped with the current local clock time
    pub fn now(actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(clock_time(&Local::now()), actor, action)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Fallback values a producer applies to incomplete drafts
#[derive(Debug, Clone, Copy)]
pub struct DraftDefaults {
    pub camera: &'static str,
    pub description: &'static str,
}

impl Default for DraftDefaults {
    fn default() -> Self {
        Self {
            camera: "Unknown Camera",
            description: "Detection",
        }
    }
}

/// Detection-shaped input where every field is optional
///
/// Numbers may arrive as JSON numbers or strings; extra fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectionDraft {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub lng: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub time: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub confidence: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub camera: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub severity: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub thumbnail: Option<String>,
    pub attributes: Option<SceneAttributes>,
}

impl DetectionDraft {
    /// Apply defaults and turn the draft into a detection.
    ///
    /// Missing ids are drawn from `ids`; missing severity becomes medium.
    pub fn into_detection(
        self,
        ids: &IdGenerator,
        defaults: &DraftDefaults,
        now: &DateTime<Local>,
    ) -> Detection {
        let id = non_empty(self.id).unwrap_or_else(|| ids.next_id());
        let severity = self
            .severity
            .as_deref()
            .map(Severity::parse_lenient)
            .unwrap_or_default();

        Detection {
            id,
            lat: finite_or(self.lat, DEFAULT_LAT),
            lng: finite_or(self.lng, DEFAULT_LNG),
            time: non_empty(self.time).unwrap_or_else(|| clock_time(now)),
            confidence: clamp_confidence(self.confidence.unwrap_or(0.0)),
            camera: non_empty(self.camera).unwrap_or_else(|| defaults.camera.to_string()),
            severity,
            description: non_empty(self.description)
                .unwrap_or_else(|| defaults.description.to_string()),
            thumbnail: non_empty(self.thumbnail),
            attributes: self.attributes,
        }
    }
}

impl From<Detection> for DetectionDraft {
    fn from(detection: Detection) -> Self {
        Self {
            id: Some(detection.id),
            lat: Some(detection.lat),
            lng: Some(detection.lng),
            time: Some(detection.time),
            confidence: Some(detection.confidence as f64),
            camera: Some(detection.camera),
            severity: Some(detection.severity.as_str().to_string()),
            description: Some(detection.description),
            thumbnail: detection.thumbnail,
            attributes: detection.attributes,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn finite_or(value: Option<f64>, fallback: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => fallback,
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }))
}
