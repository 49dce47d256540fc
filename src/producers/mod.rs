//! Event Producers
//!
//! Independent sources that create detections and hand them to the shared
//! [`DetectionStore`](crate::store::DetectionStore). Producers never talk to
//! each other; every bit of coordination happens through the store.
//!
//! The timer-driven producers ([`auto_visual`] and [`realtime`]) are built on
//! a pluggable [`Detector`] and a cancellable [`Ticker`], so a real inference
//! backend could replace the simulated detectors without touching the store.

pub mod analyze;
pub mod auto_visual;
pub mod importer;
pub mod realtime;
pub mod visual_analyze;

use crate::detection::Detection;
use chrono::{DateTime, Local};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

pub use analyze::{AnalyzeError, AnalyzeOutcome, ManualAnalyzer};
pub use auto_visual::{
    format_uptime, AutoAgentSettings, AutoAgentStats, AutoVisualAgent, VisualThreatDetector,
};
pub use importer::{
    DataImporter, ImportError, ImportFormat, ImportReport, ImportSource, ManualEntry, SampleDataset,
};
pub use realtime::{GeneratorSettings, GeneratorStats, RealTimeGenerator, ScenarioDetector, ScenarioMode};
pub use visual_analyze::{AnalysisType, VisualAnalysisReport, VisualAnalysisRequest, VisualAnalyzer};

/// Inputs available to a detector on each tick
#[derive(Debug, Clone)]
pub struct DetectorContext {
    pub now: DateTime<Local>,
}

impl DetectorContext {
    pub fn now() -> Self {
        Self { now: Local::now() }
    }

    pub fn at(now: DateTime<Local>) -> Self {
        Self { now }
    }
}

/// Source of detections for a timer-driven producer.
///
/// Returning `None` means "nothing seen this tick".
pub trait Detector: Send + fmt::Debug {
    fn id(&self) -> &'static str;

    /// Detectors without a sensitivity knob ignore this
    fn set_sensitivity(&mut self, _sensitivity: u8) {}

    /// Take new generator settings in place, keeping any internal state
    /// such as a seeded RNG. Detectors that do not use them ignore this.
    fn configure(&mut self, _settings: &GeneratorSettings) {}

    fn generate(&mut self, ctx: &DetectorContext) -> Option<Detection>;
}

/// Lifecycle of a producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProducerStatus {
    Active,
    Paused,
}

/// Periodic task bound to a cancellation token.
///
/// The first tick fires one full period after [`Ticker::spawn`]. Cancelling
/// stops future ticks; a tick already running is allowed to finish, so
/// callers that need "nothing after stop" must also guard inside the tick body.
#[derive(Debug)]
pub struct Ticker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn spawn<F, Fut>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = interval.tick() => {
                        if task_token.is_cancelled() {
                            break;
                        }
                        on_tick(task_token.clone()).await;
                    }
                }
            }
            trace!("ticker stopped");
        });

        Self { token, handle }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel and wait for the loop to exit
    pub async fn shutdown(mut self) {
        self.token.cancel();
        let _ = (&mut self.handle).await;
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn ticker_fires_once_per_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let ticker = Ticker::spawn(Duration::from_millis(100), move |_| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        ticker.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn no_ticks_after_shutdown() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let ticker = Ticker::spawn(Duration::from_millis(10), move |_| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(35)).await;
        ticker.shutdown().await;
        let seen = count.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }
}
