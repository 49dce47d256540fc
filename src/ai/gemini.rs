//! Gemini Proxy
//!
//! Thin REST client for the `generateContent` endpoint. Only text prompts are
//! sent; answers are pulled from the first candidate's first part.

use super::{
    AnalysisProxy, AnalyzeRequest, AnalyzeResponse, PredictionMetadata, ProxyError,
    ThreatAnalysis, ThreatAnalysisRequest, ThreatAnalysisResponse, ThreatPredictionRequest,
    ThreatPredictionResponse,
};
use crate::detection::Detection;
use crate::config::AiConfig;
use crate::detection::{DetectionDraft, DraftDefaults, IdGenerator};
use async_trait::async_trait;
use chrono::{Local, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const CHAT_FALLBACK: &str =
    "Gemini error. Falling back: detections summarized. Confidence high; post anonymized alert if needed.";

/// Predictions run cooler and longer than the other calls
const PREDICTION_TEMPERATURE: f64 = 0.1;
const PREDICTION_MAX_TOKENS: u32 = 3072;
const DEFAULT_MAX_TOKENS: u32 = 2048;

const GEMINI_DEFAULTS: DraftDefaults = DraftDefaults {
    camera: "Gemini",
    description: "AI-identified detection",
};

pub struct GeminiProxy {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f64,
    ids: IdGenerator,
}

impl GeminiProxy {
    pub fn new(config: &AiConfig, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "falling back to default HTTP client");
                Client::new()
            });

        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            ids: IdGenerator::new("gemini"),
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProxyError> {
        self.generate_with(prompt, self.temperature, DEFAULT_MAX_TOKENS)
            .await
    }

    /// One text-only generateContent call
    async fn generate_with(
        &self,
        prompt: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String, ProxyError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": temperature,
                "topK": 40,
                "topP": 0.95,
                "maxOutputTokens": max_tokens,
            }
        });

        debug!(model = %self.model, "calling Gemini");
        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProxyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProxyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ProxyError::Parse(e.to_string()))?;

        candidate_text(&data)
            .map(str::to_string)
            .ok_or_else(|| ProxyError::Parse("No answer from Gemini".to_string()))
    }
}

/// `candidates[0].content.parts[0].text`
fn candidate_text(data: &Value) -> Option<&str> {
    data.pointer("/candidates/0/content/parts/0/text")?.as_str()
}

/// Strip a surrounding markdown code fence, if any
pub(crate) fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn analyze_prompt(query: &str) -> String {
    format!(
        "You are the detection engine of the Aegis surveillance system. \
         Find CCTV detections matching this request: \"{}\".\n\
         Respond with only a JSON array. Each element must have the fields \
         id, lat, lng, time (HH:MM), confidence (0-100), camera, severity \
         (low|medium|high|critical) and description.",
        query
    )
}

/// Detections as pretty JSON with the location folded into one string
fn detection_summary(detections: &[Detection]) -> String {
    let summary: Vec<Value> = detections
        .iter()
        .map(|d| {
            json!({
                "id": d.id,
                "confidence": d.confidence,
                "severity": d.severity,
                "time": d.time,
                "camera": d.camera,
                "description": d.description,
                "location": format!("{:.4}, {:.4}", d.lat, d.lng),
            })
        })
        .collect();
    serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "[]".to_string())
}

fn assess_prompt(request: &ThreatAnalysisRequest) -> String {
    let data = detection_summary(&request.detections);
    format!(
        "You are an AI security analyst for the Aegis surveillance system. Analyze the following detection data and provide comprehensive insights.\n\n\
         DETECTION DATA:\n{}\n\n\
         ANALYSIS TYPE: {}\n\n\
         Respond with a JSON object with the string fields threatAssessment, patternAnalysis, \
         recommendations, complianceCheck, timelineAnalysis and resourceAllocation. \
         Be specific and actionable.",
        data, request.analysis_type
    )
}

fn predict_prompt(request: &ThreatPredictionRequest) -> String {
    let horizon = request.horizon();
    format!(
        "You are an AI security analyst with predictive capabilities for the Aegis surveillance system. \
         Analyze the historical detection data and provide threat predictions.\n\n\
         HISTORICAL DATA ({} incidents):\n{}\n\n\
         PREDICTION HORIZON: {}\n\n\
         Respond with a JSON object with these keys:\n\
         threatPredictions: the most likely scenarios in the next {}, each with a probability (0-100) and timeframe;\n\
         riskAssessment: high-risk time periods, vulnerable locations or cameras, risk factors;\n\
         predictiveInsights: expected detection volume, severity distribution, geographic hotspots;\n\
         preventiveRecommendations: proactive measures and monitoring priorities;\n\
         uncertaintyAnalysis: confidence level and factors that could change the forecast.",
        request.detections.len(),
        detection_summary(&request.detections),
        horizon,
        horizon
    )
}

/// Wrap a prediction answer that is not a JSON object
fn predictions_from_text(text: &str) -> Value {
    json!({
        "threatPredictions": text,
        "riskAssessment": "Analysis provided in text format",
        "predictiveInsights": "See threat predictions for details",
        "preventiveRecommendations": "Manual review recommended",
        "uncertaintyAnalysis": "See threat predictions for details",
    })
}

fn parse_predictions(text: &str) -> Value {
    serde_json::from_str::<Value>(extract_json(text))
        .ok()
        .filter(Value::is_object)
        .unwrap_or_else(|| predictions_from_text(text))
}

#[async_trait]
impl AnalysisProxy for GeminiProxy {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, ProxyError> {
        let text = self.generate(&analyze_prompt(&request.query)).await?;
        let drafts: Vec<DetectionDraft> = serde_json::from_str(extract_json(&text))
            .map_err(|e| ProxyError::Parse(format!("detections: {}", e)))?;

        let now = Local::now();
        let detections = drafts
            .into_iter()
            .map(|draft| draft.into_detection(&self.ids, &GEMINI_DEFAULTS, &now))
            .collect::<Vec<_>>();

        Ok(AnalyzeResponse {
            message: format!(
                "Aegis analysis for \"{}\" completed with {} detections.",
                request.query,
                detections.len()
            ),
            detections,
            analysis_details: None,
            note: None,
        })
    }

    async fn assess(
        &self,
        request: &ThreatAnalysisRequest,
    ) -> Result<ThreatAnalysisResponse, ProxyError> {
        let text = self.generate(&assess_prompt(request)).await?;
        let analysis = serde_json::from_str::<ThreatAnalysis>(extract_json(&text))
            .unwrap_or_else(|_| ThreatAnalysis::from_text(text.clone()));

        Ok(ThreatAnalysisResponse {
            success: true,
            analysis,
            raw_response: text,
            timestamp: Utc::now(),
            model: self.model.clone(),
        })
    }

    async fn predict(
        &self,
        request: &ThreatPredictionRequest,
    ) -> Result<ThreatPredictionResponse, ProxyError> {
        let text = self
            .generate_with(
                &predict_prompt(request),
                PREDICTION_TEMPERATURE,
                PREDICTION_MAX_TOKENS,
            )
            .await?;

        Ok(ThreatPredictionResponse {
            success: true,
            predictions: parse_predictions(&text),
            metadata: PredictionMetadata {
                prediction_horizon: request.horizon().to_string(),
                historical_incidents: request.detections.len(),
                generated_at: Utc::now(),
                model: self.model.clone(),
                confidence: "High".to_string(),
            },
        })
    }

    async fn ask(&self, prompt: &str) -> String {
        let prompt = format!(
            "You are Aegis Bot. The user asked: {}. Respond concisely with a compliance-aware summary.",
            prompt
        );
        match self.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Gemini chat failed, using fallback answer");
                CHAT_FALLBACK.to_string()
            }
        }
    }
}
