//! Chart Selector
//!
//! Seven aggregate views over the current detection list, plus the rule that
//! elects one of them as the featured chart. Everything here except
//! [`agent`] is a pure function of its input.

pub mod agent;
pub mod aggregate;
pub mod narrative;
pub mod selector;

use crate::detection::Detection;
use aggregate::{
    CameraCount, CorrelationPair, HourCount, PeriodIntensity, RangeCount, ScatterPoint,
    SeverityCount,
};
use serde::Serialize;
use std::fmt;

pub use agent::VisualizationAgent;
pub use selector::{featured_kind, select_featured, FeaturedChart, SelectionReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    ConfidenceDist,
    SeverityPie,
    TimelineTrend,
    CameraPerformance,
    ThreatCorrelation,
    ConfidenceSeverity,
    TemporalPatterns,
}

impl ChartKind {
    pub const ALL: [ChartKind; 7] = [
        ChartKind::ConfidenceDist,
        ChartKind::SeverityPie,
        ChartKind::TimelineTrend,
        ChartKind::CameraPerformance,
        ChartKind::ThreatCorrelation,
        ChartKind::ConfidenceSeverity,
        ChartKind::TemporalPatterns,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ChartKind::ConfidenceDist => "confidence-dist",
            ChartKind::SeverityPie => "severity-pie",
            ChartKind::TimelineTrend => "timeline-trend",
            ChartKind::CameraPerformance => "camera-performance",
            ChartKind::ThreatCorrelation => "threat-correlation",
            ChartKind::ConfidenceSeverity => "confidence-severity",
            ChartKind::TemporalPatterns => "temporal-patterns",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::ConfidenceDist => "Confidence Distribution",
            ChartKind::SeverityPie => "Threat Severity Breakdown",
            ChartKind::TimelineTrend => "Detection Timeline Trend",
            ChartKind::CameraPerformance => "Camera Performance Analysis",
            ChartKind::ThreatCorrelation => "Threat Correlation Matrix",
            ChartKind::ConfidenceSeverity => "Confidence vs Severity Analysis",
            ChartKind::TemporalPatterns => "Temporal Threat Patterns",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ChartKind::ConfidenceDist => "Distribution of detection confidence levels",
            ChartKind::SeverityPie => "Distribution of threat severity levels",
            ChartKind::TimelineTrend => "Detection frequency over time",
            ChartKind::CameraPerformance => "Detection count by camera location",
            ChartKind::ThreatCorrelation => {
                "Correlation between different threat types and locations"
            }
            ChartKind::ConfidenceSeverity => {
                "Relationship between detection confidence and threat severity"
            }
            ChartKind::TemporalPatterns => "Threat intensity across different time periods",
        }
    }

    pub fn chart_type(&self) -> ChartType {
        match self {
            ChartKind::ConfidenceDist => ChartType::Bar,
            ChartKind::SeverityPie => ChartType::Pie,
            ChartKind::TimelineTrend => ChartType::Line,
            ChartKind::CameraPerformance => ChartType::Area,
            ChartKind::ThreatCorrelation => ChartType::Heatmap,
            ChartKind::ConfidenceSeverity => ChartType::Scatter,
            ChartKind::TemporalPatterns => ChartType::Radar,
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Pie,
    Line,
    Area,
    Heatmap,
    Scatter,
    Radar,
}

impl ChartType {
    pub fn label(&self) -> &'static str {
        match self {
            ChartType::Bar => "Bar chart",
            ChartType::Pie => "Pie chart",
            ChartType::Line => "Line chart",
            ChartType::Area => "Area chart",
            ChartType::Heatmap => "Heatmap",
            ChartType::Scatter => "Scatter plot",
            ChartType::Radar => "Radar chart",
        }
    }
}

/// Screen-reader bundle carried by every chart
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessibility {
    pub alt_text: String,
    pub summary: String,
    pub key_insights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartSeries {
    Confidence(Vec<RangeCount>),
    Severity(Vec<SeverityCount>),
    Hourly(Vec<HourCount>),
    Cameras(Vec<CameraCount>),
    Correlation(Vec<CorrelationPair>),
    Scatter {
        points: Vec<ScatterPoint>,
        correlation: f64,
    },
    Temporal(Vec<PeriodIntensity>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub id: ChartKind,
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub title: &'static str,
    pub description: &'static str,
    pub data: ChartSeries,
    pub justification: String,
    pub accessibility: Accessibility,
}

/// Build one chart
pub fn build_chart(kind: ChartKind, detections: &[Detection]) -> ChartData {
    let data = match kind {
        ChartKind::ConfidenceDist => ChartSeries::Confidence(aggregate::confidence_histogram(detections)),
        ChartKind::SeverityPie => ChartSeries::Severity(aggregate::severity_breakdown(detections)),
        ChartKind::TimelineTrend => ChartSeries::Hourly(aggregate::hourly_trend(detections)),
        ChartKind::CameraPerformance => ChartSeries::Cameras(aggregate::camera_performance(detections)),
        ChartKind::ThreatCorrelation => {
            ChartSeries::Correlation(aggregate::threat_correlation(detections))
        }
        ChartKind::ConfidenceSeverity => {
            let points = aggregate::confidence_severity_scatter(detections);
            let correlation = aggregate::pearson(&points);
            ChartSeries::Scatter {
                points,
                correlation,
            }
        }
        ChartKind::TemporalPatterns => ChartSeries::Temporal(aggregate::temporal_radar(detections)),
    };

    let (justification, accessibility) = if detections.is_empty() {
        narrative::empty(kind)
    } else {
        match &data {
            ChartSeries::Confidence(ranges) => narrative::confidence(ranges),
            ChartSeries::Severity(counts) => narrative::severity(counts),
            ChartSeries::Hourly(hours) => narrative::timeline(hours),
            ChartSeries::Cameras(cameras) => narrative::camera(cameras),
            ChartSeries::Correlation(pairs) => narrative::correlation(pairs),
            ChartSeries::Scatter {
                points,
                correlation,
            } => narrative::scatter(points, *correlation),
            ChartSeries::Temporal(periods) => narrative::radar(periods),
        }
    };

    ChartData {
        id: kind,
        chart_type: kind.chart_type(),
        title: kind.title(),
        description: kind.description(),
        data,
        justification,
        accessibility,
    }
}

/// All seven charts, in fixed order
pub fn generate_charts(detections: &[Detection]) -> Vec<ChartData> {
    ChartKind::ALL
        .iter()
        .map(|&kind| build_chart(kind, detections))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Severity;
    use pretty_assertions::assert_eq;

    #[test]
    fn seven_charts_in_fixed_order() {
        let detections = vec![Detection::new(
            "a", 0.0, 0.0, "14:00", 90, "Gate", Severity::High, "Person at gate",
        )];
        let charts = generate_charts(&detections);
        let ids: Vec<&str> = charts.iter().map(|c| c.id.id()).collect();
        assert_eq!(
            ids,
            vec![
                "confidence-dist",
                "severity-pie",
                "timeline-trend",
                "camera-performance",
                "threat-correlation",
                "confidence-severity",
                "temporal-patterns",
            ]
        );
        for chart in &charts {
            assert!(!chart.accessibility.alt_text.is_empty());
            assert!(!chart.accessibility.summary.is_empty());
            assert!((2..=3).contains(&chart.accessibility.key_insights.len()));
            assert!(!chart.justification.is_empty());
        }
    }

    #[test]
    fn empty_list_degrades_gracefully() {
        let charts = generate_charts(&[]);
        assert_eq!(charts.len(), 7);
        for chart in &charts {
            assert!(chart.accessibility.alt_text.contains("no detections"));
            assert_eq!(chart.accessibility.key_insights.len(), 3);
        }
    }

    #[test]
    fn chart_serializes_with_dashboard_field_names() {
        let chart = build_chart(ChartKind::SeverityPie, &[]);
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["id"], "severity-pie");
        assert_eq!(json["type"], "pie");
        assert!(json["accessibility"]["altText"].is_string());
        assert!(json["accessibility"]["keyInsights"].is_array());
        assert_eq!(json["data"][3]["severity"], "critical");
    }

    #[test]
    fn kind_ids_round_trip() {
        for kind in ChartKind::ALL {
            assert_eq!(ChartKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(ChartKind::from_id("treemap"), None);
    }
}
