//! Justification and accessibility text for each chart.

use super::aggregate::{
    CameraCount, CorrelationPair, HourCount, PeriodIntensity, RangeCount, ScatterPoint,
    SeverityCount,
};
use super::{Accessibility, ChartKind};
use crate::detection::Severity;

/// Text used for every chart when there is nothing to show
pub fn empty(kind: ChartKind) -> (String, Accessibility) {
    let justification = format!(
        "{} will appear once detections are recorded.",
        kind.title()
    );
    let accessibility = Accessibility {
        alt_text: format!(
            "{} for {} with no detections",
            kind.chart_type().label(),
            kind.title().to_lowercase()
        ),
        summary: "No detections to analyze yet".to_string(),
        key_insights: vec![
            "No detections recorded".to_string(),
            "Start a producer or import data to populate this chart".to_string(),
            "Charts refresh automatically as detections arrive".to_string(),
        ],
    };
    (justification, accessibility)
}

pub fn confidence(ranges: &[RangeCount]) -> (String, Accessibility) {
    let total: usize = ranges.iter().map(|r| r.count).sum();
    let top = ranges.iter().max_by_key(|r| r.count).map_or("n/a", |r| r.range);
    let high = ranges.last().map_or(0, |r| r.count);
    let low = ranges.first().map_or(0, |r| r.count);

    let justification = format!(
        "Confidence distribution across {} detections. {} at 85%+ are reliable enough for \
         immediate response; {} at 40-59% may be false positives that need human verification. \
         The spread shows how well detection thresholds are calibrated.",
        total, high, low
    );
    let accessibility = Accessibility {
        alt_text: format!(
            "Bar chart showing detection confidence distribution with {} total detections",
            total
        ),
        summary: format!("Most detections fall in the {} range", top),
        key_insights: vec![
            format!("{} range has the most detections", top),
            format!("{} high-confidence detections require immediate attention", high),
            format!("{} low-confidence detections may be false positives", low),
        ],
    };
    (justification, accessibility)
}

pub fn severity(counts: &[SeverityCount]) -> (String, Accessibility) {
    let count_of = |severity: Severity| {
        counts
            .iter()
            .find(|c| c.severity == severity)
            .map_or(0, |c| c.count)
    };
    let total: usize = counts.iter().map(|c| c.count).sum();
    let critical = count_of(Severity::Critical);
    let high = count_of(Severity::High);
    let routine = count_of(Severity::Medium) + count_of(Severity::Low);

    let justification = format!(
        "Severity breakdown of {} threats for response prioritization: {} critical demand \
         immediate intervention, {} high need rapid response and {} medium or low can be monitored.",
        total, critical, high, routine
    );
    let accessibility = Accessibility {
        alt_text: format!(
            "Pie chart showing threat severity breakdown with {} total threats",
            total
        ),
        summary: format!("{} critical threats require immediate response", critical),
        key_insights: vec![
            format!("{} critical threats need immediate attention", critical),
            format!("{} high-priority threats require investigation", high),
            format!("{} medium/low priority threats for monitoring", routine),
        ],
    };
    (justification, accessibility)
}

pub fn timeline(hours: &[HourCount]) -> (String, Accessibility) {
    let peak = hours.iter().max_by_key(|h| h.count).map_or("n/a", |h| h.hour.as_str());
    let total: usize = hours.iter().map(|h| h.count).sum();
    let active_hours = hours.iter().filter(|h| h.count > 0).count();

    let justification = format!(
        "Hourly activity over {} detections peaks at {}. Peak hours show when staffing should be \
         heightened; quiet hours may point at coverage gaps.",
        total, peak
    );
    let accessibility = Accessibility {
        alt_text: format!(
            "Line chart showing detection frequency over time with peak at {}",
            peak
        ),
        summary: format!("Peak detection activity at {}", peak),
        key_insights: vec![
            format!("Peak activity at {}", peak),
            format!("{} total detections across all hours", total),
            format!(
                "Activity recorded in {} of 24 hours, {} coverage",
                active_hours,
                if active_hours >= 12 { "consistent" } else { "sporadic" }
            ),
        ],
    };
    (justification, accessibility)
}

pub fn camera(cameras: &[CameraCount]) -> (String, Accessibility) {
    let busiest = cameras
        .iter()
        .max_by_key(|c| c.count)
        .map_or("n/a", |c| c.camera.as_str());
    let total: usize = cameras.iter().map(|c| c.count).sum();
    let average = if cameras.is_empty() {
        0
    } else {
        (total as f64 / cameras.len() as f64).round() as usize
    };

    let justification = format!(
        "Detection counts across {} cameras. {} is the most active location; cameras with few \
         detections may need repositioning or maintenance.",
        cameras.len(),
        busiest
    );
    let accessibility = Accessibility {
        alt_text: format!(
            "Area chart showing camera performance with {} cameras",
            cameras.len()
        ),
        summary: format!("{} has highest detection count", busiest),
        key_insights: vec![
            format!("{} is most active camera", busiest),
            format!("{} cameras providing coverage", cameras.len()),
            format!("Average {} detections per camera", average),
        ],
    };
    (justification, accessibility)
}

pub fn correlation(pairs: &[CorrelationPair]) -> (String, Accessibility) {
    let strongest = pairs
        .iter()
        .find(|p| p.correlation > 0.8)
        .map_or("No strong correlations found", |p| p.pair.as_str());
    let weakest = pairs
        .iter()
        .find(|p| p.correlation < 0.3)
        .map_or("All correlations are moderate", |p| p.pair.as_str());
    let strong = pairs.iter().filter(|p| p.correlation > 0.7).count();

    let justification = format!(
        "Co-occurrence of person, vehicle, object and behavior mentions across {} threat pairs. \
         {} pairs correlate strongly and point at risks that tend to happen together.",
        pairs.len(),
        strong
    );
    let accessibility = Accessibility {
        alt_text: format!(
            "Heatmap showing threat correlations across {} threat types",
            pairs.len()
        ),
        summary: format!("Strongest correlation: {}", strongest),
        key_insights: vec![
            format!("Identified {} strong correlations", strong),
            format!("Weakest correlation: {}", weakest),
            "Correlation analysis helps predict co-occurring threats".to_string(),
        ],
    };
    (justification, accessibility)
}

pub fn scatter(points: &[ScatterPoint], coefficient: f64) -> (String, Accessibility) {
    let high = points.iter().filter(|p| p.confidence > 80).count();
    let high_critical = points
        .iter()
        .any(|p| p.confidence > 80 && p.severity_label == Severity::Critical);
    let low = points.iter().filter(|p| p.confidence < 60).count();
    let low_low = points
        .iter()
        .any(|p| p.confidence < 60 && p.severity_label == Severity::Low);
    let strength = if coefficient > 0.5 { "strong" } else { "weak" };

    let justification = format!(
        "Confidence against severity for {} detections, Pearson r = {}. A {} relationship \
         suggests {} threat assessment.",
        points.len(),
        coefficient,
        strength,
        if coefficient > 0.5 { "well calibrated" } else { "loosely calibrated" }
    );
    let accessibility = Accessibility {
        alt_text: format!(
            "Scatter plot showing {} data points for confidence vs severity analysis",
            points.len()
        ),
        summary: format!(
            "Correlation coefficient: {} between confidence and severity",
            coefficient
        ),
        key_insights: vec![
            format!(
                "High confidence ({}) detections tend to be {}",
                high,
                if high_critical { "critical" } else { "high severity" }
            ),
            format!(
                "Low confidence ({}) detections are mostly {}",
                low,
                if low_low { "low severity" } else { "medium severity" }
            ),
            format!(
                "Data shows {} correlation between confidence and severity",
                strength
            ),
        ],
    };
    (justification, accessibility)
}

pub fn radar(periods: &[PeriodIntensity]) -> (String, Accessibility) {
    let peak = periods
        .iter()
        .max_by_key(|p| p.intensity)
        .map_or("n/a", |p| p.period);
    // Last of the equally quiet periods
    let quietest = periods
        .iter()
        .rev()
        .min_by_key(|p| p.intensity)
        .map_or("n/a", |p| p.period);

    let justification = format!(
        "Threat intensity over {} three-hour periods. The heaviest window is {}, which is \
         where shift planning should concentrate.",
        periods.len(),
        peak
    );
    let accessibility = Accessibility {
        alt_text: format!(
            "Radar chart showing threat patterns across {} time periods",
            periods.len()
        ),
        summary: format!("Peak threat period: {}", peak),
        key_insights: vec![
            format!("Peak activity during {}", peak),
            format!("Lowest activity during {}", quietest),
            format!(
                "Pattern analysis reveals {} distinct time-based threat clusters",
                periods.iter().filter(|p| p.intensity > 0).count()
            ),
        ],
    };
    (justification, accessibility)
}
