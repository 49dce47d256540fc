//! Featured chart selection.
//!
//! Strict priority, first match wins:
//! 1. any critical detection: severity breakdown
//! 2. more than 30% of detections at confidence 85+: confidence histogram
//! 3. oldest detection more than an hour before now: timeline trend
//! 4. otherwise: camera performance

use super::aggregate::high_confidence_count;
use super::{build_chart, ChartData, ChartKind};
use crate::detection::{parse_display_time, Detection, Severity};
use chrono::{DateTime, Duration, Local};
use serde::Serialize;

const HIGH_CONFIDENCE_SHARE: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "camelCase")]
pub enum SelectionReason {
    CriticalThreats { count: usize },
    HighConfidence { count: usize, total: usize },
    LongTimeSpan { minutes: i64 },
    CameraCoverage,
    /// Picked by hand rather than by the priority rule
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeaturedChart {
    pub chart: ChartData,
    pub reason: SelectionReason,
}

/// Time from the detection's display time to `now`.
///
/// The time of day is placed on `now`'s date; a time later than `now` is
/// taken to be from the previous day. `None` when the text is not a clock time.
pub fn time_span(time: &str, now: &DateTime<Local>) -> Option<Duration> {
    let time_of_day = parse_display_time(time)?;
    let now = now.naive_local();
    let mut at = now.date().and_time(time_of_day);
    if at > now {
        at -= Duration::days(1);
    }
    Some(now - at)
}

/// Which chart to feature and why; `None` for an empty list.
///
/// `detections` is newest-first, so the oldest detection is the last one.
pub fn featured_kind(
    detections: &[Detection],
    now: &DateTime<Local>,
) -> Option<(ChartKind, SelectionReason)> {
    let oldest = detections.last()?;
    let total = detections.len();

    let critical = detections
        .iter()
        .filter(|d| d.severity == Severity::Critical)
        .count();
    if critical > 0 {
        return Some((
            ChartKind::SeverityPie,
            SelectionReason::CriticalThreats { count: critical },
        ));
    }

    let high = high_confidence_count(detections);
    if high as f64 > total as f64 * HIGH_CONFIDENCE_SHARE {
        return Some((
            ChartKind::ConfidenceDist,
            SelectionReason::HighConfidence { count: high, total },
        ));
    }

    if let Some(span) = time_span(&oldest.time, now) {
        if span > Duration::hours(1) {
            return Some((
                ChartKind::TimelineTrend,
                SelectionReason::LongTimeSpan {
                    minutes: span.num_minutes(),
                },
            ));
        }
    }

    Some((ChartKind::CameraPerformance, SelectionReason::CameraCoverage))
}

pub fn select_featured(detections: &[Detection], now: &DateTime<Local>) -> Option<FeaturedChart> {
    let (kind, reason) = featured_kind(detections, now)?;
    Some(FeaturedChart {
        chart: build_chart(kind, detections),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 1, h, m, 0).unwrap()
    }

    fn det(confidence: i64, severity: Severity, time: &str) -> Detection {
        Detection::new("x", 0.0, 0.0, time, confidence, "Cam", severity, "desc")
    }

    #[test]
    fn empty_list_has_no_featured_chart() {
        assert!(select_featured(&[], &at(12, 0)).is_none());
    }

    #[test]
    fn critical_beats_everything() {
        let detections = vec![
            det(95, Severity::High, "08:00"),
            det(95, Severity::High, "07:00"),
            det(40, Severity::Critical, "06:00"),
        ];
        let (kind, reason) = featured_kind(&detections, &at(12, 0)).unwrap();
        assert_eq!(kind, ChartKind::SeverityPie);
        assert_eq!(reason, SelectionReason::CriticalThreats { count: 1 });
    }

    #[test]
    fn high_confidence_share_is_strict() {
        // 3 of 10 is exactly 30%, not more
        let mut detections: Vec<Detection> = (0..3).map(|_| det(90, Severity::High, "11:50")).collect();
        detections.extend((0..7).map(|_| det(50, Severity::Low, "11:50")));
        let now = at(12, 0);
        assert_eq!(featured_kind(&detections, &now).unwrap().0, ChartKind::CameraPerformance);

        detections[3] = det(85, Severity::Medium, "11:50");
        assert_eq!(featured_kind(&detections, &now).unwrap().0, ChartKind::ConfidenceDist);
    }

    #[test]
    fn old_detections_feature_the_timeline() {
        let detections = vec![det(50, Severity::Low, "11:30"), det(50, Severity::Low, "10:30")];
        let (kind, reason) = featured_kind(&detections, &at(12, 0)).unwrap();
        assert_eq!(kind, ChartKind::TimelineTrend);
        assert_eq!(reason, SelectionReason::LongTimeSpan { minutes: 90 });

        // Exactly one hour is not enough
        let detections = vec![det(50, Severity::Low, "11:00")];
        assert_eq!(featured_kind(&detections, &at(12, 0)).unwrap().0, ChartKind::CameraPerformance);
    }

    #[test]
    fn only_the_oldest_detection_counts() {
        // Newest is old, oldest is recent
        let detections = vec![det(50, Severity::Low, "08:00"), det(50, Severity::Low, "11:45")];
        assert_eq!(featured_kind(&detections, &at(12, 0)).unwrap().0, ChartKind::CameraPerformance);
    }

    #[test]
    fn future_time_wraps_to_yesterday() {
        let span = time_span("23:30", &at(0, 15)).unwrap();
        assert_eq!(span.num_minutes(), 45);
        let detections = vec![det(50, Severity::Low, "23:30")];
        assert_eq!(featured_kind(&detections, &at(0, 15)).unwrap().0, ChartKind::CameraPerformance);
        assert_eq!(featured_kind(&detections, &at(1, 0)).unwrap().0, ChartKind::TimelineTrend);
    }

    #[test]
    fn meridiem_times_are_understood() {
        let span = time_span("03:16 PM", &at(17, 16)).unwrap();
        assert_eq!(span.num_minutes(), 120);
    }

    #[test]
    fn unparseable_time_skips_the_span_rule() {
        let detections = vec![det(50, Severity::Low, "yesterday")];
        assert_eq!(featured_kind(&detections, &at(12, 0)).unwrap().0, ChartKind::CameraPerformance);
    }

    #[test]
    fn featured_chart_carries_full_chart_data() {
        let detections = vec![det(90, Severity::Critical, "11:59")];
        let featured = select_featured(&detections, &at(12, 0)).unwrap();
        assert_eq!(featured.chart.id, ChartKind::SeverityPie);
        assert_eq!(featured.chart.accessibility.key_insights.len(), 3);
    }
}
