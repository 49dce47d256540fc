//! Visualization Agent
//!
//! Keeps the featured chart up to date as the store changes and remembers the
//! last few picks.

use super::{build_chart, select_featured, ChartKind, FeaturedChart, SelectionReason};
use crate::detection::Detection;
use crate::store::DetectionStore;
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug)]
struct AgentState {
    active: bool,
    auto_mode: bool,
    featured: Option<FeaturedChart>,
    /// Newest first
    history: VecDeque<FeaturedChart>,
}

#[derive(Debug, Clone)]
pub struct VisualizationAgent {
    state: Arc<RwLock<AgentState>>,
}

impl Default for VisualizationAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl VisualizationAgent {
    /// Active, in auto mode, with nothing featured yet
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(AgentState {
                active: true,
                auto_mode: true,
                featured: None,
                history: VecDeque::new(),
            })),
        }
    }

    pub async fn set_active(&self, active: bool) {
        self.state.write().await.active = active;
    }

    pub async fn is_active(&self) -> bool {
        self.state.read().await.active
    }

    pub async fn set_auto_mode(&self, auto_mode: bool) {
        self.state.write().await.auto_mode = auto_mode;
    }

    pub async fn featured(&self) -> Option<FeaturedChart> {
        self.state.read().await.featured.clone()
    }

    pub async fn history(&self) -> Vec<FeaturedChart> {
        self.state.read().await.history.iter().cloned().collect()
    }

    /// Re-run selection. Does nothing while inactive or out of auto mode,
    /// or when there are no detections.
    pub async fn refresh(
        &self,
        detections: &[Detection],
        now: &DateTime<Local>,
    ) -> Option<FeaturedChart> {
        let mut state = self.state.write().await;
        if !state.active || !state.auto_mode {
            return None;
        }
        let featured = select_featured(detections, now)?;
        debug!(chart = %featured.chart.id, "featured chart selected");
        Self::record(&mut state, featured.clone());
        Some(featured)
    }

    /// Featured chart for exactly this snapshot, without touching history.
    ///
    /// A manual pick keeps its kind but is rebuilt from `detections`; in auto
    /// mode the priority rule runs on `detections` rather than trusting the
    /// last value the watcher cached.
    pub async fn featured_for(
        &self,
        detections: &[Detection],
        now: &DateTime<Local>,
    ) -> Option<FeaturedChart> {
        if detections.is_empty() {
            return None;
        }
        let state = self.state.read().await;
        match (&state.featured, state.auto_mode) {
            (Some(pinned), false) => Some(FeaturedChart {
                chart: build_chart(pinned.chart.id, detections),
                reason: SelectionReason::Manual,
            }),
            _ => select_featured(detections, now),
        }
    }

    /// Pin a chart by hand; leaves auto mode.
    pub async fn select(&self, kind: ChartKind, detections: &[Detection]) -> FeaturedChart {
        let featured = FeaturedChart {
            chart: build_chart(kind, detections),
            reason: SelectionReason::Manual,
        };
        let mut state = self.state.write().await;
        state.auto_mode = false;
        Self::record(&mut state, featured.clone());
        featured
    }

    fn record(state: &mut AgentState, featured: FeaturedChart) {
        state.featured = Some(featured.clone());
        state.history.push_front(featured);
        state.history.truncate(HISTORY_LIMIT);
    }

    /// Recompute on every store change until `token` is cancelled.
    pub fn watch(&self, store: DetectionStore, token: CancellationToken) -> JoinHandle<()> {
        let agent = self.clone();
        let mut events = store.subscribe();
        tokio::spawn(async move {
            agent.refresh(&store.detections().await, &Local::now()).await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "visualization agent lagged behind store events");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
                agent.refresh(&store.detections().await, &Local::now()).await;
            }
            debug!("visualization agent stopped watching");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Severity;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn critical() -> Detection {
        Detection::new("c", 0.0, 0.0, "12:00", 90, "Gate", Severity::Critical, "Person at gate")
    }

    #[tokio::test]
    async fn history_keeps_last_ten() {
        let agent = VisualizationAgent::new();
        let detections = vec![critical()];
        for _ in 0..15 {
            agent.refresh(&detections, &Local::now()).await;
        }
        assert_eq!(agent.history().await.len(), HISTORY_LIMIT);
        assert_eq!(agent.featured().await.unwrap().chart.id, ChartKind::SeverityPie);
    }

    #[tokio::test]
    async fn inactive_agent_does_not_select() {
        let agent = VisualizationAgent::new();
        agent.set_active(false).await;
        assert!(agent.refresh(&[critical()], &Local::now()).await.is_none());
        assert!(agent.featured().await.is_none());
    }

    #[tokio::test]
    async fn manual_selection_leaves_auto_mode() {
        let agent = VisualizationAgent::new();
        let picked = agent.select(ChartKind::TemporalPatterns, &[critical()]).await;
        assert_eq!(picked.reason, SelectionReason::Manual);
        assert!(agent.refresh(&[critical()], &Local::now()).await.is_none());
        assert_eq!(agent.featured().await.unwrap().chart.id, ChartKind::TemporalPatterns);
    }

    #[tokio::test]
    async fn featured_for_uses_the_given_snapshot() {
        let agent = VisualizationAgent::new();
        agent.refresh(&[critical()], &Local::now()).await;

        let calm = Detection::new("l", 0.0, 0.0, "xx", 50, "Lobby", Severity::Low, "Quiet");
        let featured = agent.featured_for(&[calm.clone()], &Local::now()).await.unwrap();
        assert_eq!(featured.chart.id, ChartKind::CameraPerformance);
        assert_eq!(featured.reason, SelectionReason::CameraCoverage);
        // The cached pick is left alone
        assert_eq!(agent.featured().await.unwrap().chart.id, ChartKind::SeverityPie);

        agent.select(ChartKind::ConfidenceDist, &[critical()]).await;
        let pinned = agent.featured_for(&[calm.clone(), calm], &Local::now()).await.unwrap();
        assert_eq!(pinned.chart.id, ChartKind::ConfidenceDist);
        assert_eq!(pinned.reason, SelectionReason::Manual);
        assert!(agent.featured_for(&[], &Local::now()).await.is_none());
    }

    #[tokio::test]
    async fn watch_follows_the_store() {
        let store = DetectionStore::new();
        let agent = VisualizationAgent::new();
        let token = CancellationToken::new();
        let handle = agent.watch(store.clone(), token.clone());

        store.append(critical()).await;

        let featured = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Some(featured) = agent.featured().await {
                    return featured;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("agent picked a chart");
        assert_eq!(featured.chart.id, ChartKind::SeverityPie);

        token.cancel();
        handle.await.unwrap();
    }
}
