//! Auto Visual Agent
//!
//! Interval-driven probabilistic producer. On every tick the detector draws a
//! uniform sample in `[0, 100)` and reports a threat when the sample falls
//! below `sensitivity / 10`, so the per-tick emission chance ranges from 1%
//! (sensitivity 10) to 10% (sensitivity 100).

use super::{Detector, DetectorContext, ProducerStatus, Ticker};
use crate::detection::{
    clock_time_seconds, AuditEvent, Detection, IdGenerator, SceneAttributes, Severity, ThreatType,
    DEFAULT_LAT, DEFAULT_LNG,
};
use crate::store::DetectionStore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const THREAT_DESCRIPTIONS: [&str; 10] = [
    "Suspicious individual loitering near entrance",
    "Unattended package detected",
    "Person wearing mask and hood in restricted area",
    "Vehicle circling building multiple times",
    "Group of individuals gathering after hours",
    "Person attempting to access restricted door",
    "Suspicious behavior near security checkpoint",
    "Unknown individual in staff-only area",
    "Vehicle parked in no-parking zone for extended period",
    "Person taking photos of security infrastructure",
];

/// Spread of the synthesized location around the site centre, in degrees
const LOCATION_SPREAD: f64 = 0.01;

/// Agent settings; out-of-range values are clamped by [`AutoAgentSettings::clamped`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoAgentSettings {
    /// 10..=100
    pub sensitivity: u8,
    /// 500..=5000 ms in 500 ms steps
    pub analysis_interval_ms: u64,
    pub max_detections: usize,
    pub auto_alert: bool,
}

impl Default for AutoAgentSettings {
    fn default() -> Self {
        Self {
            sensitivity: 75,
            analysis_interval_ms: 2000,
            max_detections: 100,
            auto_alert: true,
        }
    }
}

impl AutoAgentSettings {
    pub fn clamped(mut self) -> Self {
        self.sensitivity = self.sensitivity.clamp(10, 100);
        // Clamp before rounding so huge values cannot overflow
        let ms = self.analysis_interval_ms.clamp(500, 5000);
        self.analysis_interval_ms = ((ms + 250) / 500 * 500).clamp(500, 5000);
        self.max_detections = self.max_detections.max(1);
        self
    }

    /// Draws below this value (out of 100) produce a detection
    pub fn emission_threshold(&self) -> f64 {
        self.sensitivity as f64 / 10.0
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.analysis_interval_ms)
    }
}

/// Session counters; survive pause/resume
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoAgentStats {
    pub total_detections: u64,
    pub threats_blocked: u64,
    pub uptime_seconds: u64,
}

/// Simulated visual threat detector
#[derive(Debug)]
pub struct VisualThreatDetector {
    rng: StdRng,
    sensitivity: u8,
    ids: IdGenerator,
}

impl VisualThreatDetector {
    pub fn new(sensitivity: u8) -> Self {
        Self::from_rng(sensitivity, StdRng::from_entropy())
    }

    /// Deterministic detector for reproducible runs
    pub fn with_seed(sensitivity: u8, seed: u64) -> Self {
        Self::from_rng(sensitivity, StdRng::seed_from_u64(seed))
    }

    fn from_rng(sensitivity: u8, rng: StdRng) -> Self {
        Self {
            rng,
            sensitivity: sensitivity.clamp(10, 100),
            ids: IdGenerator::new("auto"),
        }
    }

    fn synthesize(&mut self, ctx: &DetectorContext) -> Detection {
        let threat_type = ThreatType::ALL[self.rng.gen_range(0..ThreatType::ALL.len())];
        let severity = Severity::ALL[self.rng.gen_range(0..Severity::ALL.len())];
        let lat = DEFAULT_LAT + (self.rng.gen::<f64>() - 0.5) * LOCATION_SPREAD;
        let lng = DEFAULT_LNG + (self.rng.gen::<f64>() - 0.5) * LOCATION_SPREAD;
        let confidence = self.rng.gen_range(40..90);
        let camera = format!("Camera C{}", self.rng.gen_range(1..=10));
        let description = THREAT_DESCRIPTIONS[self.rng.gen_range(0..THREAT_DESCRIPTIONS.len())];

        Detection::new(
            self.ids.next_id(),
            lat,
            lng,
            clock_time_seconds(&ctx.now),
            confidence,
            camera,
            severity,
            description,
        )
        .with_attributes(SceneAttributes {
            threat_type: Some(threat_type),
            ..Default::default()
        })
    }
}

impl Detector for VisualThreatDetector {
    fn id(&self) -> &'static str {
        "visual-threat"
    }

    fn set_sensitivity(&mut self, sensitivity: u8) {
        self.sensitivity = sensitivity.clamp(10, 100);
    }

    fn generate(&mut self, ctx: &DetectorContext) -> Option<Detection> {
        let draw: f64 = self.rng.gen_range(0.0..100.0);
        if draw < self.sensitivity as f64 / 10.0 {
            Some(self.synthesize(ctx))
        } else {
            None
        }
    }
}

/// State owned by the agent and shared with its tick tasks
#[derive(Debug)]
struct AgentState {
    settings: AutoAgentSettings,
    stats: AutoAgentStats,
    /// Newest-first, capped at `settings.max_detections`
    history: VecDeque<Detection>,
    detector: Box<dyn Detector>,
    active: bool,
}

impl AgentState {
    fn run_tick(&mut self, ctx: &DetectorContext) -> Option<Detection> {
        if !self.active {
            return None;
        }
        let detection = self.detector.generate(ctx)?;
        self.record(&detection);
        Some(detection)
    }

    fn record(&mut self, detection: &Detection) {
        self.history.push_front(detection.clone());
        self.history.truncate(self.settings.max_detections);
        self.stats.total_detections += 1;
        if detection.severity == Severity::Critical {
            self.stats.threats_blocked += 1;
        }
    }
}

/// Interval-driven visual agent feeding the shared store
#[derive(Debug)]
pub struct AutoVisualAgent {
    state: Arc<Mutex<AgentState>>,
    store: DetectionStore,
    detection_ticker: Option<Ticker>,
    uptime_ticker: Option<Ticker>,
}

impl AutoVisualAgent {
    pub fn new(settings: AutoAgentSettings, store: DetectionStore) -> Self {
        let settings = settings.clamped();
        let detector = VisualThreatDetector::new(settings.sensitivity);
        Self::with_detector(settings, store, Box::new(detector))
    }

    /// Use a custom detector, e.g. a seeded one or a real inference backend
    pub fn with_detector(
        settings: AutoAgentSettings,
        store: DetectionStore,
        detector: Box<dyn Detector>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(AgentState {
                settings: settings.clamped(),
                stats: AutoAgentStats::default(),
                history: VecDeque::new(),
                detector,
                active: false,
            })),
            store,
            detection_ticker: None,
            uptime_ticker: None,
        }
    }

    pub async fn start(&mut self) {
        let interval = {
            let mut state = self.state.lock().await;
            if state.active {
                return;
            }
            state.active = true;
            state.settings.interval()
        };

        info!(
            interval_ms = interval.as_millis() as u64,
            "auto visual agent started"
        );
        self.detection_ticker = Some(self.spawn_detection_ticker(interval));
        self.uptime_ticker = Some(self.spawn_uptime_ticker());
    }

    /// Stop emitting. Once this returns no further detection reaches the store.
    pub async fn stop(&mut self) {
        {
            let mut state = self.state.lock().await;
            if !state.active {
                return;
            }
            state.active = false;
        }
        if let Some(ticker) = self.detection_ticker.take() {
            ticker.shutdown().await;
        }
        if let Some(ticker) = self.uptime_ticker.take() {
            ticker.shutdown().await;
        }
        info!("auto visual agent stopped");
    }

    pub async fn toggle(&mut self) -> ProducerStatus {
        if self.is_active().await {
            self.stop().await;
            ProducerStatus::Paused
        } else {
            self.start().await;
            ProducerStatus::Active
        }
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.active
    }

    pub async fn status(&self) -> ProducerStatus {
        if self.is_active().await {
            ProducerStatus::Active
        } else {
            ProducerStatus::Paused
        }
    }

    pub async fn stats(&self) -> AutoAgentStats {
        self.state.lock().await.stats.clone()
    }

    pub async fn settings(&self) -> AutoAgentSettings {
        self.state.lock().await.settings.clone()
    }

    /// The `limit` most recent detections of this agent, newest first
    pub async fn recent(&self, limit: usize) -> Vec<Detection> {
        self.state
            .lock()
            .await
            .history
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Apply new settings; a running agent picks up a new interval immediately.
    pub async fn update_settings(&mut self, settings: AutoAgentSettings) {
        let settings = settings.clamped();
        let (restart, interval) = {
            let mut state = self.state.lock().await;
            let interval_changed = state.settings.analysis_interval_ms != settings.analysis_interval_ms;
            state.detector.set_sensitivity(settings.sensitivity);
            let max = settings.max_detections;
            state.settings = settings;
            state.history.truncate(max);
            (state.active && interval_changed, state.settings.interval())
        };

        if restart {
            if let Some(ticker) = self.detection_ticker.take() {
                ticker.shutdown().await;
            }
            self.detection_ticker = Some(self.spawn_detection_ticker(interval));
            debug!(interval_ms = interval.as_millis() as u64, "analysis interval changed");
        }
    }

    fn spawn_detection_ticker(&self, interval: Duration) -> Ticker {
        let state = self.state.clone();
        let store = self.store.clone();
        Ticker::spawn(interval, move |token| {
            let state = state.clone();
            let store = store.clone();
            async move {
                let mut state = state.lock().await;
                if token.is_cancelled() || !state.active {
                    return;
                }
                let ctx = DetectorContext::now();
                let Some(detection) = state.run_tick(&ctx) else {
                    return;
                };

                if state.settings.auto_alert && detection.severity == Severity::Critical {
                    warn!(
                        camera = %detection.camera,
                        confidence = detection.confidence,
                        "critical threat: {}",
                        detection.description
                    );
                }
                debug!(id = %detection.id, severity = %detection.severity, "auto agent detection");

                let audit = audit_for(&detection);
                // Appended while the state lock is held so `stop` cannot slip in between
                store.append_with_audit(detection, audit).await;
            }
        })
    }

    fn spawn_uptime_ticker(&self) -> Ticker {
        let state = self.state.clone();
        Ticker::spawn(Duration::from_secs(1), move |token| {
            let state = state.clone();
            async move {
                let mut state = state.lock().await;
                if !token.is_cancelled() && state.active {
                    state.stats.uptime_seconds += 1;
                }
            }
        })
    }
}

fn audit_for(detection: &Detection) -> AuditEvent {
    let threat = detection
        .attributes
        .as_ref()
        .and_then(|a| a.threat_type)
        .map(|t| t.as_str())
        .unwrap_or("threat");
    AuditEvent::new(
        detection.time.clone(),
        "AutoVisualAgent",
        format!("Detected {}", threat),
    )
    .with_detail(format!(
        "{} ({} severity)",
        detection.description, detection.severity
    ))
}

/// `HH:MM:SS` rendering of an uptime counter
pub fn format_uptime(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct EveryTick {
        ids: IdGenerator,
        severity: Severity,
    }

    impl Detector for EveryTick {
        fn id(&self) -> &'static str {
            "every-tick"
        }

        fn generate(&mut self, _ctx: &DetectorContext) -> Option<Detection> {
            Some(Detection::new(
                self.ids.next_id(),
                DEFAULT_LAT,
                DEFAULT_LNG,
                "12:00:00",
                80,
                "Camera C1",
                self.severity,
                "Unattended package detected",
            ))
        }
    }

    fn every_tick(severity: Severity) -> Box<dyn Detector> {
        Box::new(EveryTick {
            ids: IdGenerator::new("test"),
            severity,
        })
    }

    fn fast_settings() -> AutoAgentSettings {
        AutoAgentSettings {
            analysis_interval_ms: 500,
            ..Default::default()
        }
    }

    #[test]
    fn emission_rate_tracks_sensitivity() {
        let ctx = DetectorContext::now();
        let mut detector = VisualThreatDetector::with_seed(100, 7);
        let n = 100_000;
        let emitted = (0..n).filter(|_| detector.generate(&ctx).is_some()).count();
        // p = 100 / 1000 = 0.1
        assert!((9_500..=10_500).contains(&emitted), "emitted {}", emitted);

        let mut detector = VisualThreatDetector::with_seed(10, 11);
        let emitted = (0..n).filter(|_| detector.generate(&ctx).is_some()).count();
        // p = 0.01
        assert!((850..=1_150).contains(&emitted), "emitted {}", emitted);
    }

    #[test]
    fn synthesized_detections_stay_in_range() {
        let ctx = DetectorContext::now();
        let mut detector = VisualThreatDetector::with_seed(100, 3);
        for _ in 0..2_000 {
            if let Some(d) = detector.generate(&ctx) {
                assert!((40..90).contains(&d.confidence));
                assert!((d.lat - DEFAULT_LAT).abs() <= LOCATION_SPREAD / 2.0);
                assert!(d.camera.starts_with("Camera C"));
                assert!(d.id.starts_with("auto_"));
                assert!(d.attributes.unwrap().threat_type.is_some());
            }
        }
    }

    #[test]
    fn settings_are_clamped() {
        let s = AutoAgentSettings {
            sensitivity: 3,
            analysis_interval_ms: 7300,
            max_detections: 0,
            auto_alert: false,
        }
        .clamped();
        assert_eq!(s.sensitivity, 10);
        assert_eq!(s.analysis_interval_ms, 5000);
        assert_eq!(s.max_detections, 1);

        let s = AutoAgentSettings {
            analysis_interval_ms: 1240,
            ..Default::default()
        }
        .clamped();
        assert_eq!(s.analysis_interval_ms, 1000);
        assert_eq!(s.emission_threshold(), 7.5);
    }

    #[test]
    fn extreme_intervals_clamp_without_overflow() {
        let s = AutoAgentSettings {
            analysis_interval_ms: u64::MAX,
            ..Default::default()
        }
        .clamped();
        assert_eq!(s.analysis_interval_ms, 5000);

        let s = AutoAgentSettings {
            analysis_interval_ms: 0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(s.analysis_interval_ms, 500);
    }

    #[test]
    fn stats_serialize_only_tracked_counters() {
        let stats = AutoAgentStats {
            total_detections: 4,
            threats_blocked: 1,
            uptime_seconds: 9,
        };
        assert_eq!(
            serde_json::to_value(&stats).unwrap(),
            serde_json::json!({ "totalDetections": 4, "threatsBlocked": 1, "uptimeSeconds": 9 })
        );
    }

    #[test]
    fn uptime_formats_as_clock() {
        assert_eq!(format_uptime(0), "00:00:00");
        assert_eq!(format_uptime(3723), "01:02:03");
    }

    #[tokio::test(start_paused = true)]
    async fn emits_into_store_while_active() {
        let store = DetectionStore::new();
        let mut agent =
            AutoVisualAgent::with_detector(fast_settings(), store.clone(), every_tick(Severity::Critical));

        agent.start().await;
        tokio::time::sleep(Duration::from_millis(1_600)).await;

        assert_eq!(store.len().await, 3);
        assert_eq!(store.audit_log().await.len(), 3);
        let stats = agent.stats().await;
        assert_eq!(stats.total_detections, 3);
        assert_eq!(stats.threats_blocked, 3);
        assert_eq!(stats.uptime_seconds, 1);
        assert_eq!(agent.recent(5).await.len(), 3);

        agent.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_lands_after_stop_and_counters_survive_restart() {
        let store = DetectionStore::new();
        let mut agent =
            AutoVisualAgent::with_detector(fast_settings(), store.clone(), every_tick(Severity::Low));

        agent.start().await;
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        agent.stop().await;
        let after_stop = store.len().await;
        assert_eq!(after_stop, 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.len().await, after_stop);
        assert_eq!(agent.status().await, ProducerStatus::Paused);

        agent.start().await;
        tokio::time::sleep(Duration::from_millis(600)).await;
        agent.stop().await;

        let stats = agent.stats().await;
        assert_eq!(stats.total_detections, 3);
        assert_eq!(stats.threats_blocked, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn history_is_capped() {
        let store = DetectionStore::new();
        let settings = AutoAgentSettings {
            max_detections: 2,
            ..fast_settings()
        };
        let mut agent =
            AutoVisualAgent::with_detector(settings, store.clone(), every_tick(Severity::High));

        agent.start().await;
        tokio::time::sleep(Duration::from_millis(2_100)).await;
        agent.stop().await;

        assert_eq!(agent.recent(10).await.len(), 2);
        assert_eq!(store.len().await, 4);
    }
}
