//! Visual Analysis
//!
//! One-shot simulated analysis of a single camera frame. Each analysis type
//! has its own hit rate and produces at most one finding; nothing is written
//! to the store.

use crate::detection::{IdGenerator, Severity, ThreatType, DEFAULT_LAT, DEFAULT_LNG};
use crate::error::{AegisError, AegisResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Spread of the reported location around the site centre, in degrees
const LOCATION_SPREAD: f64 = 0.01;

const DIRECTIONS: [&str; 4] = ["north", "south", "east", "west"];

const BEHAVIORS: [&str; 5] = [
    "loitering",
    "running",
    "crouching",
    "looking around",
    "standing still",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    ObjectDetection,
    FacialRecognition,
    BehaviorAnalysis,
    ThreatAssessment,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 4] = [
        AnalysisType::ObjectDetection,
        AnalysisType::FacialRecognition,
        AnalysisType::BehaviorAnalysis,
        AnalysisType::ThreatAssessment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::ObjectDetection => "object_detection",
            AnalysisType::FacialRecognition => "facial_recognition",
            AnalysisType::BehaviorAnalysis => "behavior_analysis",
            AnalysisType::ThreatAssessment => "threat_assessment",
        }
    }

    /// Leading tag of the finding ids
    fn id_tag(&self) -> &'static str {
        match self {
            AnalysisType::ObjectDetection => "obj",
            AnalysisType::FacialRecognition => "face",
            AnalysisType::BehaviorAnalysis => "behav",
            AnalysisType::ThreatAssessment => "threat",
        }
    }

    /// A finding is reported when a uniform draw exceeds this
    fn hit_threshold(&self) -> f64 {
        match self {
            AnalysisType::ObjectDetection => 0.7,
            AnalysisType::FacialRecognition => 0.6,
            AnalysisType::BehaviorAnalysis => 0.5,
            AnalysisType::ThreatAssessment => 0.4,
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = AegisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AegisError::invalid_input(format!("Unknown analysis type: {}", s)))
    }
}

/// Body of a visual analysis call; every field but the image is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisualAnalysisRequest {
    pub image_url: Option<String>,
    pub camera_id: String,
    pub timestamp: String,
    pub analysis_type: String,
}

impl VisualAnalysisRequest {
    /// Check required fields and resolve the analysis type
    pub fn validate(&self) -> AegisResult<AnalysisType> {
        if self.camera_id.trim().is_empty()
            || self.timestamp.trim().is_empty()
            || self.analysis_type.trim().is_empty()
        {
            return Err(AegisError::invalid_input(
                "Missing required fields: cameraId, timestamp, analysisType",
            ));
        }
        self.analysis_type.trim().parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingMetadata {
    pub object_count: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement_speed: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    pub clothing: Vec<String>,
    pub behavior: Vec<String>,
}

/// One thing spotted in the frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualFinding {
    pub id: String,
    pub timestamp: String,
    pub confidence: u8,
    pub threat_type: ThreatType,
    pub severity: Severity,
    pub location: GeoPoint,
    pub camera: String,
    pub description: String,
    pub bounding_box: BoundingBox,
    pub metadata: FindingMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub camera_id: String,
    pub analysis_type: AnalysisType,
    pub timestamp: String,
    /// Simulated, in milliseconds
    pub processing_time: u32,
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualAnalysisReport {
    pub success: bool,
    pub detections: Vec<VisualFinding>,
    pub analysis: AnalysisSummary,
}

/// Seedable frame analyzer
#[derive(Debug)]
pub struct VisualAnalyzer {
    rng: StdRng,
    ids: [IdGenerator; 4],
}

impl Default for VisualAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl VisualAnalyzer {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            ids: AnalysisType::ALL.map(|kind| IdGenerator::new(kind.id_tag())),
        }
    }

    /// Validate the request and analyze the frame it names
    pub fn analyze(&mut self, request: &VisualAnalysisRequest) -> AegisResult<VisualAnalysisReport> {
        let kind = request.validate()?;
        let detections: Vec<VisualFinding> = self
            .detect(kind, &request.camera_id, &request.timestamp)
            .into_iter()
            .collect();

        info!(
            camera = %request.camera_id,
            analysis_type = %kind,
            found = detections.len(),
            "visual analysis completed"
        );

        Ok(VisualAnalysisReport {
            success: true,
            detections,
            analysis: AnalysisSummary {
                camera_id: request.camera_id.clone(),
                analysis_type: kind,
                timestamp: request.timestamp.clone(),
                processing_time: self.rng.gen_range(200..700),
                confidence: self.rng.gen_range(80..100),
            },
        })
    }

    fn detect(&mut self, kind: AnalysisType, camera: &str, timestamp: &str) -> Option<VisualFinding> {
        if self.rng.gen::<f64>() <= kind.hit_threshold() {
            return None;
        }

        let finding = match kind {
            AnalysisType::ObjectDetection => {
                let confidence = self.rng.gen_range(70..100);
                let severity = if self.rng.gen::<f64>() > 0.8 {
                    Severity::High
                } else {
                    Severity::Low
                };
                Draft {
                    confidence,
                    threat_type: ThreatType::Object,
                    severity,
                    description: "Unattended package detected".to_string(),
                    bounding_box: self.bounding_box(200, 50, 100),
                    metadata: FindingMetadata {
                        object_count: 1,
                        movement_speed: None,
                        direction: None,
                        clothing: vec![],
                        behavior: vec![],
                    },
                }
            }
            AnalysisType::FacialRecognition => {
                let confidence = self.rng.gen_range(75..100);
                let severity = if self.rng.gen::<f64>() > 0.7 {
                    Severity::Medium
                } else {
                    Severity::Low
                };
                Draft {
                    confidence,
                    threat_type: ThreatType::Person,
                    severity,
                    description: "Person detected - facial analysis complete".to_string(),
                    bounding_box: self.bounding_box(300, 40, 80),
                    metadata: FindingMetadata {
                        object_count: 1,
                        movement_speed: None,
                        direction: None,
                        clothing: strings(&["black hoodie", "blue jeans"]),
                        behavior: strings(&["walking", "looking around"]),
                    },
                }
            }
            AnalysisType::BehaviorAnalysis => {
                let behavior = BEHAVIORS[self.rng.gen_range(0..BEHAVIORS.len())];
                let confidence = self.rng.gen_range(65..100);
                let severity = if behavior == "loitering" {
                    Severity::High
                } else {
                    Severity::Medium
                };
                Draft {
                    confidence,
                    threat_type: ThreatType::Behavior,
                    severity,
                    description: format!("Suspicious behavior detected: {}", behavior),
                    bounding_box: self.bounding_box(400, 60, 120),
                    metadata: FindingMetadata {
                        object_count: 1,
                        movement_speed: Some(self.rng.gen_range(1..=10)),
                        direction: Some(self.direction()),
                        clothing: strings(&["dark clothing", "backpack"]),
                        behavior: strings(&[behavior]),
                    },
                }
            }
            AnalysisType::ThreatAssessment => {
                let severity = Severity::ALL[self.rng.gen_range(0..Severity::ALL.len())];
                let confidence = self.rng.gen_range(80..100);
                Draft {
                    confidence,
                    threat_type: ThreatType::Person,
                    severity,
                    description: format!("Threat assessment: {} risk level detected", severity),
                    bounding_box: self.bounding_box(500, 80, 150),
                    metadata: FindingMetadata {
                        object_count: self.rng.gen_range(1..=3),
                        movement_speed: Some(self.rng.gen_range(2..=16)),
                        direction: Some(self.direction()),
                        clothing: strings(&["dark clothing", "hoodie", "backpack", "mask"]),
                        behavior: strings(&["suspicious movement", "looking around", "loitering"]),
                    },
                }
            }
        };

        let location = GeoPoint {
            lat: DEFAULT_LAT + (self.rng.gen::<f64>() - 0.5) * LOCATION_SPREAD,
            lng: DEFAULT_LNG + (self.rng.gen::<f64>() - 0.5) * LOCATION_SPREAD,
        };
        let id = self.ids[kind as usize].next_id();

        Some(VisualFinding {
            id,
            timestamp: timestamp.to_string(),
            confidence: finding.confidence,
            threat_type: finding.threat_type,
            severity: finding.severity,
            location,
            camera: camera.to_string(),
            description: finding.description,
            bounding_box: finding.bounding_box,
            metadata: finding.metadata,
        })
    }

    /// Origin in `[0, extent)`, sides in `[min_side, min_side + side_spread)`
    fn bounding_box(&mut self, extent: u32, min_side: u32, side_spread: u32) -> BoundingBox {
        BoundingBox {
            x: self.rng.gen_range(0..extent),
            y: self.rng.gen_range(0..extent),
            width: self.rng.gen_range(min_side..min_side + side_spread),
            height: self.rng.gen_range(min_side..min_side + side_spread),
        }
    }

    fn direction(&mut self) -> String {
        DIRECTIONS[self.rng.gen_range(0..DIRECTIONS.len())].to_string()
    }
}

/// Type-specific part of a finding
struct Draft {
    confidence: u8,
    threat_type: ThreatType,
    severity: Severity,
    description: String,
    bounding_box: BoundingBox,
    metadata: FindingMetadata,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(kind: &str) -> VisualAnalysisRequest {
        VisualAnalysisRequest {
            image_url: None,
            camera_id: "Camera C4".to_string(),
            timestamp: "2024-03-01T14:05:00Z".to_string(),
            analysis_type: kind.to_string(),
        }
    }

    fn findings(analyzer: &mut VisualAnalyzer, kind: &str, runs: usize) -> Vec<VisualFinding> {
        (0..runs)
            .flat_map(|_| analyzer.analyze(&request(kind)).unwrap().detections)
            .collect()
    }

    #[test]
    fn missing_fields_are_rejected() {
        let mut blank_camera = request("object_detection");
        blank_camera.camera_id = "  ".to_string();
        let err = blank_camera.validate().unwrap_err();
        assert!(err.to_string().contains("Missing required fields"));

        assert!(request("").validate().is_err());
        assert!(request("x_ray").validate().unwrap_err().to_string().contains("x_ray"));
        assert_eq!(
            request("behavior_analysis").validate().unwrap(),
            AnalysisType::BehaviorAnalysis
        );
    }

    #[test]
    fn summary_echoes_the_request() {
        let mut analyzer = VisualAnalyzer::with_seed(3);
        let report = analyzer.analyze(&request("facial_recognition")).unwrap();

        assert!(report.success);
        assert_eq!(report.analysis.camera_id, "Camera C4");
        assert_eq!(report.analysis.analysis_type, AnalysisType::FacialRecognition);
        assert_eq!(report.analysis.timestamp, "2024-03-01T14:05:00Z");
        assert!((200..700).contains(&report.analysis.processing_time));
        assert!((80..100).contains(&report.analysis.confidence));
    }

    #[test]
    fn hit_rate_follows_the_analysis_type() {
        let mut analyzer = VisualAnalyzer::with_seed(11);
        let objects = findings(&mut analyzer, "object_detection", 1000).len();
        let threats = findings(&mut analyzer, "threat_assessment", 1000).len();

        // Expected about 300 and 600
        assert!((200..400).contains(&objects), "objects: {}", objects);
        assert!((500..700).contains(&threats), "threats: {}", threats);
    }

    #[test]
    fn object_findings_stay_in_range() {
        let mut analyzer = VisualAnalyzer::with_seed(5);
        let found = findings(&mut analyzer, "object_detection", 200);
        assert!(!found.is_empty());

        for f in &found {
            assert!(f.id.starts_with("obj_"));
            assert_eq!(f.threat_type, ThreatType::Object);
            assert!(matches!(f.severity, Severity::High | Severity::Low));
            assert!((70..100).contains(&f.confidence));
            assert!(f.bounding_box.x < 200 && f.bounding_box.y < 200);
            assert!((50..150).contains(&f.bounding_box.width));
            assert!((f.location.lat - DEFAULT_LAT).abs() <= 0.005);
            assert!((f.location.lng - DEFAULT_LNG).abs() <= 0.005);
            assert_eq!(f.camera, "Camera C4");
            assert!(f.metadata.clothing.is_empty());
        }
    }

    #[test]
    fn loitering_is_the_only_high_behavior() {
        let mut analyzer = VisualAnalyzer::with_seed(8);
        let found = findings(&mut analyzer, "behavior_analysis", 300);
        assert!(found.iter().any(|f| f.severity == Severity::High));

        for f in &found {
            assert!(f.id.starts_with("behav_"));
            let behavior = &f.metadata.behavior[0];
            assert_eq!(f.description, format!("Suspicious behavior detected: {}", behavior));
            let expected = if behavior == "loitering" {
                Severity::High
            } else {
                Severity::Medium
            };
            assert_eq!(f.severity, expected);
            assert!((1..=10).contains(&f.metadata.movement_speed.unwrap()));
            assert!(DIRECTIONS.contains(&f.metadata.direction.as_deref().unwrap()));
        }
    }

    #[test]
    fn threat_assessment_reports_its_severity() {
        let mut analyzer = VisualAnalyzer::with_seed(13);
        let found = findings(&mut analyzer, "threat_assessment", 100);

        for f in &found {
            assert!(f.id.starts_with("threat_"));
            assert_eq!(
                f.description,
                format!("Threat assessment: {} risk level detected", f.severity)
            );
            assert!((1..=3).contains(&f.metadata.object_count));
            assert!((2..=16).contains(&f.metadata.movement_speed.unwrap()));
        }
    }

    #[test]
    fn seeded_analyzers_agree() {
        let mut a = VisualAnalyzer::with_seed(42);
        let mut b = VisualAnalyzer::with_seed(42);
        for _ in 0..20 {
            let left = a.analyze(&request("threat_assessment")).unwrap();
            let right = b.analyze(&request("threat_assessment")).unwrap();
            assert_eq!(left.detections.len(), right.detections.len());
            assert_eq!(left.analysis, right.analysis);
            for (l, r) in left.detections.iter().zip(&right.detections) {
                assert_eq!((l.severity, l.confidence, l.bounding_box), (r.severity, r.confidence, r.bounding_box));
            }
        }
    }

    #[test]
    fn report_serializes_camel_case() {
        let mut analyzer = VisualAnalyzer::with_seed(1);
        let report = analyzer.analyze(&request("object_detection")).unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["analysis"]["cameraId"], "Camera C4");
        assert_eq!(value["analysis"]["analysisType"], "object_detection");
        assert!(value["analysis"]["processingTime"].is_u64());
    }
}
