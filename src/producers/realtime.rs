//! Real-Time Scenario Generator
//!
//! Emits scenario-flavoured detections (campus, retail, airport) at a fixed
//! frequency. Each tick rolls against `intensity` as a direct percentage,
//! then samples a camera location by weight and dresses the detection with
//! scenario-specific behaviors, clothing and descriptions.

use super::{Detector, DetectorContext, ProducerStatus, Ticker};
use crate::detection::{clock_time, AuditEvent, Detection, IdGenerator, SceneAttributes, Severity};
use crate::store::DetectionStore;
use chrono::Timelike;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Maximum coordinate perturbation per axis, in degrees
pub const COORDINATE_NOISE: f64 = 0.0005;

/// Confidence bonus applied between 23:00 and 05:59
pub const NIGHT_BONUS: f64 = 5.0;

const VEHICLE_TYPES: [&str; 5] = ["car", "truck", "van", "motorcycle", "bicycle"];

/// A camera position inside a scenario, with its selection weight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioLocation {
    pub lat: f64,
    pub lng: f64,
    pub camera: &'static str,
    pub weight: f64,
}

/// Fixed catalogue for one simulated site
#[derive(Debug)]
pub struct Scenario {
    pub name: &'static str,
    pub locations: &'static [ScenarioLocation],
    pub behaviors: &'static [&'static str],
    pub clothing: &'static [&'static str],
    pub descriptions: &'static [&'static str],
}

const fn loc(lat: f64, lng: f64, camera: &'static str, weight: f64) -> ScenarioLocation {
    ScenarioLocation {
        lat,
        lng,
        camera,
        weight,
    }
}

pub static CAMPUS: Scenario = Scenario {
    name: "campus",
    locations: &[
        loc(37.2296, -80.4139, "Main Entrance", 0.3),
        loc(37.2301, -80.4145, "Library", 0.2),
        loc(37.2290, -80.4130, "Parking Lot", 0.2),
        loc(37.2305, -80.4140, "Dormitory", 0.15),
        loc(37.2285, -80.4150, "Cafeteria", 0.15),
    ],
    behaviors: &["walking", "running", "loitering", "gathering", "sitting"],
    clothing: &["backpack", "hoodie", "jeans", "sweatshirt", "shorts"],
    descriptions: &[
        "Student with backpack near library",
        "Group gathering after hours",
        "Person loitering near dormitory",
        "Suspicious activity in parking lot",
        "Individual running across campus",
    ],
};

pub static RETAIL: Scenario = Scenario {
    name: "retail",
    locations: &[
        loc(37.2285, -80.4150, "Store Entrance", 0.4),
        loc(37.2288, -80.4148, "Aisle 1", 0.2),
        loc(37.2290, -80.4145, "Aisle 3", 0.2),
        loc(37.2287, -80.4152, "Checkout", 0.2),
    ],
    behaviors: &["shopping", "loitering", "concealing", "running", "arguing"],
    clothing: &["dark clothing", "hat", "sunglasses", "backpack", "jacket"],
    descriptions: &[
        "Customer concealing items",
        "Suspicious behavior in aisle",
        "Person loitering near entrance",
        "Group causing disturbance",
        "Individual with concealed items",
    ],
};

pub static AIRPORT: Scenario = Scenario {
    name: "airport",
    locations: &[
        loc(37.2310, -80.4120, "Security Checkpoint", 0.3),
        loc(37.2305, -80.4115, "Terminal 1", 0.25),
        loc(37.2315, -80.4125, "Terminal 2", 0.25),
        loc(37.2300, -80.4110, "Baggage Claim", 0.2),
    ],
    behaviors: &["waiting", "rushing", "loitering", "arguing", "suspicious movement"],
    clothing: &["suit", "casual", "backpack", "carry-on", "jacket"],
    descriptions: &[
        "Suspicious behavior at checkpoint",
        "Unattended luggage detected",
        "Person rushing through terminal",
        "Group causing disturbance",
        "Individual loitering near gates",
    ],
};

/// Every concrete scenario, in the order `Mixed` samples from
pub static SCENARIOS: [&Scenario; 3] = [&CAMPUS, &RETAIL, &AIRPORT];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioMode {
    Campus,
    Retail,
    Airport,
    #[default]
    Mixed,
}

impl ScenarioMode {
    /// The fixed scenario, or `None` for mixed mode
    pub fn scenario(&self) -> Option<&'static Scenario> {
        match self {
            ScenarioMode::Campus => Some(&CAMPUS),
            ScenarioMode::Retail => Some(&RETAIL),
            ScenarioMode::Airport => Some(&AIRPORT),
            ScenarioMode::Mixed => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioMode::Campus => "campus",
            ScenarioMode::Retail => "retail",
            ScenarioMode::Airport => "airport",
            ScenarioMode::Mixed => "mixed",
        }
    }
}

impl fmt::Display for ScenarioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "campus" => Ok(ScenarioMode::Campus),
            "retail" => Ok(ScenarioMode::Retail),
            "airport" => Ok(ScenarioMode::Airport),
            "mixed" => Ok(ScenarioMode::Mixed),
            other => Err(format!("Unknown scenario: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// 1000..=10000 ms
    pub frequency_ms: u64,
    /// 10..=100, percentage chance per tick
    pub intensity: u8,
    pub scenario: ScenarioMode,
    pub include_vehicles: bool,
    pub include_groups: bool,
    pub include_behavior: bool,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            frequency_ms: 3000,
            intensity: 50,
            scenario: ScenarioMode::Mixed,
            include_vehicles: true,
            include_groups: true,
            include_behavior: true,
        }
    }
}

impl GeneratorSettings {
    pub fn clamped(mut self) -> Self {
        self.frequency_ms = self.frequency_ms.clamp(1000, 10_000);
        self.intensity = self.intensity.clamp(10, 100);
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.frequency_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorStats {
    pub total_generated: u64,
    /// Display time of the most recent emission
    pub last_detection: Option<String>,
}

/// Cumulative-weight selection.
///
/// Returns the first location whose running weight reaches `draw`. When the
/// weights sum to less than `draw` the last location is used. `None` only for
/// an empty slice.
pub fn pick_weighted(locations: &[ScenarioLocation], draw: f64) -> Option<&ScenarioLocation> {
    let mut cumulative = 0.0;
    for location in locations {
        cumulative += location.weight;
        if draw <= cumulative {
            return Some(location);
        }
    }
    locations.last()
}

/// Severity from the unrounded confidence
pub fn severity_for_confidence(confidence: f64) -> Severity {
    if confidence > 85.0 {
        Severity::Critical
    } else if confidence > 75.0 {
        Severity::High
    } else if confidence > 60.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn night_bonus(hour: u32) -> f64 {
    if hour < 6 || hour > 22 {
        NIGHT_BONUS
    } else {
        0.0
    }
}

/// Scenario-driven detector; the intensity roll happens inside `generate`
#[derive(Debug)]
pub struct ScenarioDetector {
    rng: StdRng,
    settings: GeneratorSettings,
    ids: IdGenerator,
}

impl ScenarioDetector {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self::from_rng(settings, StdRng::from_entropy())
    }

    pub fn with_seed(settings: GeneratorSettings, seed: u64) -> Self {
        Self::from_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn from_rng(settings: GeneratorSettings, rng: StdRng) -> Self {
        Self {
            rng,
            settings: settings.clamped(),
            ids: IdGenerator::new("realtime"),
        }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    fn pick_scenario(&mut self) -> &'static Scenario {
        match self.settings.scenario.scenario() {
            Some(scenario) => scenario,
            None => SCENARIOS[self.rng.gen_range(0..SCENARIOS.len())],
        }
    }

    /// Build one detection unconditionally
    pub fn synthesize(&mut self, ctx: &DetectorContext) -> Detection {
        let scenario = self.pick_scenario();
        let draw: f64 = self.rng.gen();
        // Scenario tables are never empty
        let location = pick_weighted(scenario.locations, draw)
            .copied()
            .unwrap_or(scenario.locations[0]);

        let lat = location.lat + (self.rng.gen::<f64>() - 0.5) * 2.0 * COORDINATE_NOISE;
        let lng = location.lng + (self.rng.gen::<f64>() - 0.5) * 2.0 * COORDINATE_NOISE;

        let base: f64 = self.rng.gen_range(40.0..90.0);
        let confidence = base + night_bonus(ctx.now.hour());
        let severity = severity_for_confidence(confidence);

        let person_count = if self.settings.include_groups {
            self.rng.gen_range(1..=5)
        } else {
            1
        };

        let vehicle_type = if self.settings.include_vehicles && self.rng.gen::<f64>() > 0.7 {
            Some(VEHICLE_TYPES[self.rng.gen_range(0..VEHICLE_TYPES.len())].to_string())
        } else {
            None
        };

        let behavior = if self.settings.include_behavior && self.rng.gen::<f64>() > 0.5 {
            prefix(scenario.behaviors, self.rng.gen_range(1..=3))
        } else {
            Vec::new()
        };

        let clothing = if self.rng.gen::<f64>() > 0.6 {
            prefix(scenario.clothing, self.rng.gen_range(1..=3))
        } else {
            Vec::new()
        };

        let description = scenario.descriptions[self.rng.gen_range(0..scenario.descriptions.len())];

        Detection::new(
            self.ids.next_id(),
            lat,
            lng,
            clock_time(&ctx.now),
            confidence.round() as i64,
            location.camera,
            severity,
            description,
        )
        .with_attributes(SceneAttributes {
            threat_type: None,
            person_count: Some(person_count),
            vehicle_type,
            behavior,
            clothing,
        })
    }
}

fn prefix(list: &[&str], len: usize) -> Vec<String> {
    list.iter().take(len).map(|s| s.to_string()).collect()
}

impl Detector for ScenarioDetector {
    fn id(&self) -> &'static str {
        "scenario"
    }

    fn set_sensitivity(&mut self, sensitivity: u8) {
        self.settings.intensity = sensitivity.clamp(10, 100);
    }

    fn configure(&mut self, settings: &GeneratorSettings) {
        self.settings = settings.clone().clamped();
    }

    fn generate(&mut self, ctx: &DetectorContext) -> Option<Detection> {
        let roll = self.rng.gen::<f64>() * 100.0;
        if roll < self.settings.intensity as f64 {
            Some(self.synthesize(ctx))
        } else {
            None
        }
    }
}

#[derive(Debug)]
struct GeneratorState {
    settings: GeneratorSettings,
    stats: GeneratorStats,
    detector: Box<dyn Detector>,
    active: bool,
}

impl GeneratorState {
    fn run_tick(&mut self, ctx: &DetectorContext) -> Option<Detection> {
        if !self.active {
            return None;
        }
        let detection = self.detector.generate(ctx)?;
        self.stats.total_generated += 1;
        self.stats.last_detection = Some(detection.time.clone());
        Some(detection)
    }
}

/// Timer-driven scenario producer feeding the shared store
#[derive(Debug)]
pub struct RealTimeGenerator {
    state: Arc<Mutex<GeneratorState>>,
    store: DetectionStore,
    ticker: Option<Ticker>,
}

impl RealTimeGenerator {
    pub fn new(settings: GeneratorSettings, store: DetectionStore) -> Self {
        let detector = ScenarioDetector::new(settings.clone());
        Self::with_detector(settings, store, Box::new(detector))
    }

    pub fn with_detector(
        settings: GeneratorSettings,
        store: DetectionStore,
        detector: Box<dyn Detector>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(GeneratorState {
                settings: settings.clamped(),
                stats: GeneratorStats::default(),
                detector,
                active: false,
            })),
            store,
            ticker: None,
        }
    }

    pub async fn start(&mut self) {
        let (interval, scenario) = {
            let mut state = self.state.lock().await;
            if state.active {
                return;
            }
            state.active = true;
            (state.settings.interval(), state.settings.scenario)
        };
        info!(
            frequency_ms = interval.as_millis() as u64,
            scenario = %scenario,
            "real-time generator started"
        );
        self.ticker = Some(self.spawn_ticker(interval));
    }

    /// Stop generating. No detection reaches the store after this returns.
    pub async fn stop(&mut self) {
        {
            let mut state = self.state.lock().await;
            if !state.active {
                return;
            }
            state.active = false;
        }
        if let Some(ticker) = self.ticker.take() {
            ticker.shutdown().await;
        }
        info!("real-time generator stopped");
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

    pub async fn stats(&self) -> GeneratorStats {
        self.state.lock().await.stats.clone()
    }

    pub async fn settings(&self) -> GeneratorSettings {
        self.state.lock().await.settings.clone()
    }

    /// Apply new settings to the current detector; counters are kept.
    pub async fn update_settings(&mut self, settings: GeneratorSettings) {
        let settings = settings.clamped();
        let (running, interval) = {
            let mut state = self.state.lock().await;
            state.detector.configure(&settings);
            state.settings = settings;
            (state.active, state.settings.interval())
        };
        if running {
            if let Some(ticker) = self.ticker.take() {
                ticker.shutdown().await;
            }
            self.ticker = Some(self.spawn_ticker(interval));
        }
    }

    fn spawn_ticker(&self, interval: Duration) -> Ticker {
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
                if let Some(detection) = state.run_tick(&ctx) {
                    debug!(id = %detection.id, camera = %detection.camera, "generated detection");
                    let audit = audit_for(&detection);
                    store.append_with_audit(detection, audit).await;
                }
            }
        })
    }
}

fn audit_for(detection: &Detection) -> AuditEvent {
    let people = detection
        .attributes
        .as_ref()
        .and_then(|a| a.person_count)
        .unwrap_or(1);
    let noun = if people == 1 { "person" } else { "persons" };
    AuditEvent::new(
        detection.time.clone(),
        "RealTimeGenerator",
        format!("Generated {} threat", detection.severity),
    )
    .with_detail(format!("{} ({} {})", detection.description, people, noun))
}
