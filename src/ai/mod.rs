//! AI Proxy
//!
//! The dashboard's single doorway to a generative-AI provider. Manual analysis,
//! threat assessment, threat prediction and the chat widget all go through
//! [`AnalysisProxy`].
//! Without credentials the [`mock::MockProxy`] answers deterministically so the
//! dashboard stays usable offline.

pub mod gemini;
pub mod mock;

use crate::config::AiConfig;
use crate::detection::Detection;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub use gemini::GeminiProxy;
pub use mock::MockProxy;

/// Free-text analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(alias = "q", default)]
    pub query: String,
}

impl AnalyzeRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDetails {
    pub agents_used: Vec<String>,
    pub processing_time: String,
    pub confidence: String,
    pub recommendations: Vec<String>,
}

/// Result set of a free-text analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub detections: Vec<Detection>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_details: Option<AnalysisDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Structured assessment over a set of detections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatAnalysisRequest {
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default = "default_analysis_type")]
    pub analysis_type: String,
}

fn default_analysis_type() -> String {
    "comprehensive".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatAnalysis {
    pub threat_assessment: String,
    pub pattern_analysis: String,
    pub recommendations: String,
    pub compliance_check: String,
    pub timeline_analysis: String,
    pub resource_allocation: String,
}

impl ThreatAnalysis {
    /// Wrap unstructured provider text
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            threat_assessment: text.into(),
            pattern_analysis: "Analysis provided in text format".to_string(),
            recommendations: "See threat assessment for details".to_string(),
            compliance_check: "Manual review recommended".to_string(),
            timeline_analysis: "See threat assessment for details".to_string(),
            resource_allocation: "See threat assessment for details".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatAnalysisResponse {
    pub success: bool,
    pub analysis: ThreatAnalysis,
    pub raw_response: String,
    pub timestamp: DateTime<Utc>,
    pub model: String,
}

/// Horizon used when a prediction request names none
pub const DEFAULT_PREDICTION_HORIZON: &str = "Next 6 hours";

/// Forecast over historical detections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatPredictionRequest {
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub prediction_horizon: Option<String>,
}

impl ThreatPredictionRequest {
    pub fn horizon(&self) -> &str {
        self.prediction_horizon
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_PREDICTION_HORIZON)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionMetadata {
    pub prediction_horizon: String,
    pub historical_incidents: usize,
    pub generated_at: DateTime<Utc>,
    pub model: String,
    pub confidence: String,
}

/// Provider answers vary in shape, so the predictions stay free-form JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatPredictionResponse {
    pub success: bool,
    pub predictions: Value,
    pub metadata: PredictionMetadata,
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Provider-agnostic AI proxy
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisProxy: Send + Sync {
    /// Short provider name for logs and responses
    fn name(&self) -> &'static str;

    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, ProxyError>;

    async fn assess(
        &self,
        request: &ThreatAnalysisRequest,
    ) -> Result<ThreatAnalysisResponse, ProxyError>;

    async fn predict(
        &self,
        request: &ThreatPredictionRequest,
    ) -> Result<ThreatPredictionResponse, ProxyError>;

    /// Chat-style question; failures collapse into a fallback answer
    async fn ask(&self, prompt: &str) -> String;
}

/// Pick the provider: Gemini when a key is configured, the mock otherwise.
pub fn proxy_from_config(config: &AiConfig) -> Arc<dyn AnalysisProxy> {
    match config.resolved_api_key() {
        Some(key) => {
            info!(model = %config.model, "using Gemini proxy");
            Arc::new(GeminiProxy::new(config, key))
        }
        None => {
            info!("no Gemini API key configured, using mock proxy");
            Arc::new(MockProxy::new())
        }
    }
}
