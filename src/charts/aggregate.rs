//! Pure aggregations over a detection list.
//!
//! Every function here is deterministic in its input and returns a
//! zero-filled or empty result for an empty list.

use crate::detection::{leading_hour, Detection, Severity, ThreatType};
use indexmap::IndexMap;
use serde::Serialize;

/// Half-open confidence buckets: `[lower, upper)`, the last one unbounded
pub const CONFIDENCE_BUCKETS: [(&str, u8, Option<u8>); 4] = [
    ("40-59%", 40, Some(60)),
    ("60-74%", 60, Some(75)),
    ("75-84%", 75, Some(85)),
    ("85%+", 85, None),
];

/// Confidence at or above which a detection counts as high-confidence
pub const HIGH_CONFIDENCE: u8 = 85;

pub const TEMPORAL_PERIODS: [&str; 8] = [
    "Early Morning (6-9 AM)",
    "Morning (9-12 PM)",
    "Afternoon (12-3 PM)",
    "Late Afternoon (3-6 PM)",
    "Evening (6-9 PM)",
    "Night (9 PM-12 AM)",
    "Late Night (12-3 AM)",
    "Pre-Dawn (3-6 AM)",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeCount {
    pub range: &'static str,
    pub count: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityCount {
    pub severity: Severity,
    pub count: usize,
    pub percentage: u32,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourCount {
    pub hour: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraCount {
    pub camera: String,
    pub count: usize,
    /// Share of all detections, in whole percent
    pub efficiency: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationPair {
    pub pair: String,
    pub correlation: f64,
    pub count1: usize,
    pub count2: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterPoint {
    pub confidence: u8,
    pub severity: u8,
    pub severity_label: Severity,
    pub camera: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodIntensity {
    pub period: &'static str,
    pub intensity: usize,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        (count as f64 / total as f64 * 100.0).round() as u32
    }
}

pub fn confidence_bucket(confidence: u8) -> Option<usize> {
    CONFIDENCE_BUCKETS
        .iter()
        .position(|&(_, lower, upper)| confidence >= lower && upper.map_or(true, |u| confidence < u))
}

/// Counts per confidence bucket. Confidences under 40 fall in no bucket.
pub fn confidence_histogram(detections: &[Detection]) -> Vec<RangeCount> {
    let mut counts = [0usize; CONFIDENCE_BUCKETS.len()];
    for detection in detections {
        if let Some(idx) = confidence_bucket(detection.confidence) {
            counts[idx] += 1;
        }
    }

    CONFIDENCE_BUCKETS
        .iter()
        .zip(counts)
        .map(|(&(range, _, _), count)| RangeCount {
            range,
            count,
            percentage: percentage(count, detections.len()),
        })
        .collect()
}

pub fn high_confidence_count(detections: &[Detection]) -> usize {
    detections
        .iter()
        .filter(|d| d.confidence >= HIGH_CONFIDENCE)
        .count()
}

pub fn severity_breakdown(detections: &[Detection]) -> Vec<SeverityCount> {
    Severity::ALL
        .iter()
        .map(|&severity| {
            let count = detections.iter().filter(|d| d.severity == severity).count();
            SeverityCount {
                severity,
                count,
                percentage: percentage(count, detections.len()),
                color: severity.color(),
            }
        })
        .collect()
}

/// 24 buckets `00:00`..`23:00`. Times without a readable hour are not counted.
pub fn hourly_trend(detections: &[Detection]) -> Vec<HourCount> {
    let mut counts = [0usize; 24];
    for detection in detections {
        if let Some(hour) = leading_hour(&detection.time) {
            counts[hour as usize] += 1;
        }
    }
    counts
        .iter()
        .enumerate()
        .map(|(hour, &count)| HourCount {
            hour: format!("{:02}:00", hour),
            count,
        })
        .collect()
}

/// Per-camera counts in first-seen order
pub fn camera_performance(detections: &[Detection]) -> Vec<CameraCount> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for detection in detections {
        *counts.entry(detection.camera.as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(camera, count)| CameraCount {
            camera: camera.to_string(),
            count,
            efficiency: percentage(count, detections.len()),
        })
        .collect()
}

/// Pairwise min/max ratio of keyword hits in descriptions, strongest first.
pub fn threat_correlation(detections: &[Detection]) -> Vec<CorrelationPair> {
    let descriptions: Vec<String> = detections
        .iter()
        .map(|d| d.description.to_lowercase())
        .collect();
    let hits = |keyword: &str| descriptions.iter().filter(|d| d.contains(keyword)).count();

    let mut pairs = Vec::with_capacity(6);
    for (i, first) in ThreatType::ALL.iter().enumerate() {
        for second in &ThreatType::ALL[i + 1..] {
            let count1 = hits(first.as_str());
            let count2 = hits(second.as_str());
            let high = count1.max(count2);
            let correlation = if high == 0 {
                0.0
            } else {
                count1.min(count2) as f64 / high as f64
            };
            pairs.push(CorrelationPair {
                pair: format!("{} vs {}", first, second),
                correlation: round2(correlation),
                count1,
                count2,
            });
        }
    }

    // Stable, so equal ratios keep their pair order
    pairs.sort_by(|a, b| b.correlation.total_cmp(&a.correlation));
    pairs
}

pub fn confidence_severity_scatter(detections: &[Detection]) -> Vec<ScatterPoint> {
    detections
        .iter()
        .map(|d| ScatterPoint {
            confidence: d.confidence,
            severity: d.severity.rank(),
            severity_label: d.severity,
            camera: d.camera.clone(),
            time: d.time.clone(),
        })
        .collect()
}

/// Pearson correlation between confidence and severity rank, rounded to two
/// decimals. Zero for an empty set or when either variable has no variance.
pub fn pearson(points: &[ScatterPoint]) -> f64 {
    let n = points.len() as f64;
    if points.is_empty() {
        return 0.0;
    }

    let (mut sx, mut sy, mut sxy, mut sx2, mut sy2) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for p in points {
        let x = p.confidence as f64;
        let y = p.severity as f64;
        sx += x;
        sy += y;
        sxy += x * y;
        sx2 += x * x;
        sy2 += y * y;
    }

    let denominator = ((n * sx2 - sx * sx) * (n * sy2 - sy * sy)).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    round2((n * sxy - sx * sy) / denominator)
}

pub fn period_index(hour: u32) -> usize {
    match hour {
        6..=8 => 0,
        9..=11 => 1,
        12..=14 => 2,
        15..=17 => 3,
        18..=20 => 4,
        21..=23 => 5,
        0..=2 => 6,
        _ => 7,
    }
}

/// Detection counts over the eight three-hour periods
pub fn temporal_radar(detections: &[Detection]) -> Vec<PeriodIntensity> {
    let mut counts = [0usize; TEMPORAL_PERIODS.len()];
    for detection in detections {
        if let Some(hour) = leading_hour(&detection.time) {
            counts[period_index(hour)] += 1;
        }
    }
    TEMPORAL_PERIODS
        .iter()
        .zip(counts)
        .map(|(&period, intensity)| PeriodIntensity { period, intensity })
        .collect()
}
