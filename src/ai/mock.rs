//! Offline proxy with fixed answers

use super::{
    AnalysisDetails, AnalysisProxy, AnalyzeRequest, AnalyzeResponse, PredictionMetadata,
    ProxyError, ThreatAnalysis, ThreatAnalysisRequest, ThreatAnalysisResponse,
    ThreatPredictionRequest, ThreatPredictionResponse,
};
use crate::detection::{Detection, Severity};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

const CHAT_ANSWER: &str = "Summary: 3 detections today with high confidence. Chain-of-custody intact. \
Tip: mark predictive outputs as probabilistic to avoid evidence contamination.";

/// Growth factor applied to each severity count in the canned forecast
const SEVERITY_GROWTH: [(Severity, f64); 4] = [
    (Severity::Critical, 1.1),
    (Severity::High, 1.3),
    (Severity::Medium, 0.9),
    (Severity::Low, 1.1),
];

/// Degrees added per detection index, per unit of `query.len() % 7`
const TWEAK_STEP: f64 = 0.0005;

#[derive(Debug, Default, Clone)]
pub struct MockProxy;

impl MockProxy {
    pub fn new() -> Self {
        Self
    }

    /// The three canned detections, nudged by the query length
    pub fn canned_detections(query: &str) -> Vec<Detection> {
        let base = [
            ("d1", 37.2289, -80.4170, "03:16 PM", 95, "Camera C5", Severity::Critical, "High-confidence threat detected at main entrance"),
            ("d2", 37.2299, -80.4150, "03:34 PM", 88, "Camera C8", Severity::High, "Suspicious activity in restricted zone"),
            ("d3", 37.2312, -80.4125, "03:41 PM", 82, "Camera C2", Severity::Medium, "Unusual behavior pattern detected"),
        ];
        let tweak = (query.chars().count().max(1) % 7) as f64 * TWEAK_STEP;

        base.iter()
            .enumerate()
            .map(|(i, &(id, lat, lng, time, confidence, camera, severity, description))| {
                let i = i as f64;
                Detection::new(
                    id,
                    lat + tweak * i,
                    lng - tweak * (2.0 - i),
                    time,
                    confidence,
                    camera,
                    severity,
                    description,
                )
            })
            .collect()
    }

    pub fn canned_analysis() -> ThreatAnalysis {
        ThreatAnalysis {
            threat_assessment: "Mock Analysis: 3 detections analyzed. Overall security posture is moderate with 1 critical threat requiring immediate attention.".to_string(),
            pattern_analysis: "Mock Pattern: Detections show clustering around main entrance area. Time-based analysis indicates increased activity during evening hours.".to_string(),
            recommendations: "Mock Recommendations: 1) Increase patrol frequency at main entrance 2) Review camera positioning for better coverage 3) Implement additional lighting".to_string(),
            compliance_check: "Mock Compliance: All detections properly logged with timestamps. Chain of custody maintained. GDPR compliance verified for data retention.".to_string(),
            timeline_analysis: "Mock Timeline: Peak detection time at 14:30-15:00. Critical threat occurred at 14:45 requiring immediate response protocol activation.".to_string(),
            resource_allocation: "Mock Resources: Deploy 2 additional security personnel to main entrance. Activate backup camera system. Notify local law enforcement of critical threat.".to_string(),
        }
    }

    /// Fixed scenarios; only the volume and severity forecast follow the input.
    pub fn canned_predictions(detections: &[Detection]) -> Value {
        let grown = |count: usize, factor: f64| (count as f64 * factor).floor() as u64;
        let mut distribution = serde_json::Map::new();
        for (severity, factor) in SEVERITY_GROWTH {
            let count = detections.iter().filter(|d| d.severity == severity).count();
            distribution.insert(severity.as_str().to_string(), json!(grown(count, factor)));
        }

        json!({
            "threatPredictions": {
                "High Risk Scenario": {
                    "probability": 75,
                    "description": "Increased activity expected around main entrance based on historical patterns",
                    "timeframe": "Next 2-4 hours"
                },
                "Medium Risk Scenario": {
                    "probability": 45,
                    "description": "Potential security breach attempt during low-traffic hours",
                    "timeframe": "Next 6-8 hours"
                },
                "Low Risk Scenario": {
                    "probability": 20,
                    "description": "Routine security incidents with minimal impact",
                    "timeframe": "Next 12-24 hours"
                }
            },
            "riskAssessment": {
                "highRiskPeriods": ["14:00-16:00", "20:00-22:00"],
                "vulnerableLocations": ["Main Entrance", "Parking Lot C"],
                "riskFactors": ["Low lighting", "High foot traffic", "Limited camera coverage"]
            },
            "predictiveInsights": {
                "expectedDetectionVolume": grown(detections.len(), 1.2),
                "severityDistribution": distribution,
                "geographicHotspots": ["Main Entrance", "Library Cam 1", "Parking Lot C"]
            },
            "preventiveRecommendations": [
                "Deploy additional security personnel during peak hours",
                "Increase camera coverage in identified hotspots",
                "Implement motion-activated lighting in vulnerable areas",
                "Review and update security protocols for high-risk scenarios"
            ],
            "uncertaintyAnalysis": {
                "confidenceLevel": "Moderate (75%)",
                "riskFactors": ["Weather conditions", "Special events", "System maintenance"],
                "monitoringPoints": ["Camera functionality", "Personnel availability", "External threats"]
            }
        })
    }
}

#[async_trait]
impl AnalysisProxy for MockProxy {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, ProxyError> {
        Ok(AnalyzeResponse {
            detections: Self::canned_detections(&request.query),
            message: format!("Aegis analysis for \"{}\" completed.", request.query),
            analysis_details: Some(AnalysisDetails {
                agents_used: vec![
                    "AegisVisualAnalyzer".to_string(),
                    "AegisPatternEngine".to_string(),
                    "AegisThreatAssessor".to_string(),
                ],
                processing_time: "1.5s".to_string(),
                confidence: "High".to_string(),
                recommendations: vec![
                    "Review high-confidence detections immediately".to_string(),
                    "Monitor pattern trends for anomalies".to_string(),
                    "Consider additional surveillance in identified hotspots".to_string(),
                ],
            }),
            note: Some("Mocked analysis; no provider configured.".to_string()),
        })
    }

    async fn assess(
        &self,
        _request: &ThreatAnalysisRequest,
    ) -> Result<ThreatAnalysisResponse, ProxyError> {
        Ok(ThreatAnalysisResponse {
            success: true,
            analysis: Self::canned_analysis(),
            raw_response: "Mock analysis - Gemini API key not configured".to_string(),
            timestamp: Utc::now(),
            model: "mock-analysis".to_string(),
        })
    }

    async fn predict(
        &self,
        request: &ThreatPredictionRequest,
    ) -> Result<ThreatPredictionResponse, ProxyError> {
        Ok(ThreatPredictionResponse {
            success: true,
            predictions: Self::canned_predictions(&request.detections),
            metadata: PredictionMetadata {
                prediction_horizon: request.horizon().to_string(),
                historical_incidents: request.detections.len(),
                generated_at: Utc::now(),
                model: "mock-prediction-engine".to_string(),
                confidence: "Moderate".to_string(),
            },
        })
    }

    async fn ask(&self, _prompt: &str) -> String {
        CHAT_ANSWER.to_string()
    }
}
