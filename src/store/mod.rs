//! Detection Store
//!
//! The single source of truth for every view: the current detections and the
//! audit log, both kept newest-first. All mutation goes through the methods on
//! [`DetectionStore`], which take the write lock, apply the change and then
//! publish a [`StoreEvent`] to every subscriber.

use crate::detection::{AuditEvent, Detection, IdGenerator};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Change notifications published after each mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum StoreEvent {
    Appended { id: String },
    Imported { count: usize },
    Replaced { count: usize },
    AuditAppended(AuditEvent),
    /// Carries the audit entry describing the clear; it is not kept in the log
    Cleared(AuditEvent),
}

/// Store tuning
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum audit entries kept; `None` keeps everything
    pub audit_capacity: Option<usize>,
}

/// Point-in-time copy of the store contents
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub detections: Vec<Detection>,
    pub audit_log: Vec<AuditEvent>,
}

#[derive(Debug, Default)]
struct StoreState {
    detections: VecDeque<Detection>,
    audit: VecDeque<AuditEvent>,
    /// Every id ever admitted; survives `clear`
    admitted: HashSet<String>,
}

#[derive(Debug)]
struct StoreInner {
    state: RwLock<StoreState>,
    events: broadcast::Sender<StoreEvent>,
    ids: IdGenerator,
    config: StoreConfig,
}

/// Shared handle to the detection store. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct DetectionStore {
    inner: Arc<StoreInner>,
}

impl Default for DetectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(StoreState::default()),
                events,
                ids: IdGenerator::new("store"),
                config,
            }),
        }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    /// Insert one detection at the front. Returns the id it was stored under.
    pub async fn append(&self, detection: Detection) -> String {
        let id = {
            let mut state = self.inner.state.write().await;
            let detection = self.admit(&mut state, detection);
            let id = detection.id.clone();
            state.detections.push_front(detection);
            id
        };
        debug!(id = %id, "detection appended");
        self.publish(StoreEvent::Appended { id: id.clone() });
        id
    }

    /// Insert a detection and its audit entry under one lock acquisition.
    pub async fn append_with_audit(&self, detection: Detection, audit: AuditEvent) -> String {
        let id = {
            let mut state = self.inner.state.write().await;
            let detection = self.admit(&mut state, detection);
            let id = detection.id.clone();
            state.detections.push_front(detection);
            self.push_audit(&mut state, audit.clone());
            id
        };
        debug!(id = %id, actor = %audit.actor, "detection appended");
        self.publish(StoreEvent::Appended { id: id.clone() });
        self.publish(StoreEvent::AuditAppended(audit));
        id
    }

    /// Insert a batch in front of the current list, keeping batch order.
    pub async fn append_many(&self, detections: Vec<Detection>) -> usize {
        let count = detections.len();
        if count == 0 {
            return 0;
        }
        {
            let mut state = self.inner.state.write().await;
            let admitted: Vec<Detection> = detections
                .into_iter()
                .map(|d| self.admit(&mut state, d))
                .collect();
            for detection in admitted.into_iter().rev() {
                state.detections.push_front(detection);
            }
        }
        debug!(count, "detections imported");
        self.publish(StoreEvent::Imported { count });
        count
    }

    /// Replace the whole detection list. Only the manual analyzer does this.
    pub async fn replace_all(&self, detections: Vec<Detection>) -> usize {
        let count = detections.len();
        {
            let mut state = self.inner.state.write().await;
            let admitted: VecDeque<Detection> = detections
                .into_iter()
                .map(|d| self.admit(&mut state, d))
                .collect();
            state.detections = admitted;
        }
        debug!(count, "detections replaced");
        self.publish(StoreEvent::Replaced { count });
        count
    }

    pub async fn append_audit(&self, event: AuditEvent) {
        {
            let mut state = self.inner.state.write().await;
            self.push_audit(&mut state, event.clone());
        }
        self.publish(StoreEvent::AuditAppended(event));
    }

    /// Empty both lists.
    ///
    /// The returned audit entry describes the clear and is broadcast as
    /// [`StoreEvent::Cleared`]; the log itself stays empty afterwards.
    pub async fn clear(&self) -> AuditEvent {
        let removed = {
            let mut state = self.inner.state.write().await;
            let removed = state.detections.len();
            state.detections.clear();
            state.audit.clear();
            removed
        };
        let event = AuditEvent::now("DetectionStore", "Cleared all data")
            .with_detail("All detections and logs have been reset");
        debug!(removed, "store cleared");
        self.publish(StoreEvent::Cleared(event.clone()));
        event
    }

    pub async fn detections(&self) -> Vec<Detection> {
        self.inner.state.read().await.detections.iter().cloned().collect()
    }

    pub async fn audit_log(&self) -> Vec<AuditEvent> {
        self.inner.state.read().await.audit.iter().cloned().collect()
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        let state = self.inner.state.read().await;
        StoreSnapshot {
            detections: state.detections.iter().cloned().collect(),
            audit_log: state.audit.iter().cloned().collect(),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.state.read().await.detections.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Record the id, re-keying the detection if the id was seen before.
    fn admit(&self, state: &mut StoreState, mut detection: Detection) -> Detection {
        if !state.admitted.insert(detection.id.clone()) {
            let fresh = self.inner.ids.next_id();
            debug!(old = %detection.id, new = %fresh, "duplicate detection id re-keyed");
            detection.id = fresh;
            state.admitted.insert(detection.id.clone());
        }
        detection
    }

    fn push_audit(&self, state: &mut StoreState, event: AuditEvent) {
        state.audit.push_front(event);
        if let Some(capacity) = self.inner.config.audit_capacity {
            state.audit.truncate(capacity);
        }
    }

    fn publish(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Severity;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn detection(id: &str) -> Detection {
        Detection::new(id, 37.0, -80.0, "14:00", 70, "Cam", Severity::Medium, "desc")
    }

    #[tokio::test]
    async fn append_prepends_newest_first() {
        let store = DetectionStore::new();
        store.append(detection("a")).await;
        store.append(detection("b")).await;
        store.append(detection("c")).await;

        let ids: Vec<String> = store.detections().await.into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn append_many_keeps_batch_order_in_front() {
        let store = DetectionStore::new();
        store.append(detection("old")).await;
        let count = store
            .append_many(vec![detection("n1"), detection("n2")])
            .await;

        assert_eq!(count, 2);
        let ids: Vec<String> = store.detections().await.into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["n1", "n2", "old"]);
    }

    #[tokio::test]
    async fn replace_all_discards_previous_list() {
        let store = DetectionStore::new();
        store.append(detection("a")).await;
        store.replace_all(vec![detection("x"), detection("y")]).await;

        let ids: Vec<String> = store.detections().await.into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn clear_empties_both_lists_and_reports_the_clear() {
        let store = DetectionStore::new();
        let mut events = store.subscribe();
        store
            .append_with_audit(detection("a"), AuditEvent::now("Test", "added"))
            .await;
        let cleared = store.clear().await;

        assert!(store.detections().await.is_empty());
        assert_eq!(store.audit_log().await.len(), 0);
        assert_eq!(cleared.action, "Cleared all data");

        let mut saw_clear = false;
        while let Ok(event) = events.try_recv() {
            if let StoreEvent::Cleared(audit) = event {
                assert_eq!(audit, cleared);
                saw_clear = true;
            }
        }
        assert!(saw_clear);
    }

    #[tokio::test]
    async fn ids_are_never_reused_after_clear() {
        let store = DetectionStore::new();
        store.append(detection("d1")).await;
        store.clear().await;
        let id = store.append(detection("d1")).await;

        assert_ne!(id, "d1");
        assert!(id.starts_with("store_"));
    }

    #[tokio::test]
    async fn duplicate_ids_inside_a_batch_are_rekeyed() {
        let store = DetectionStore::new();
        store.replace_all(vec![detection("dup"), detection("dup")]).await;
        let detections = store.detections().await;
        assert_eq!(detections[0].id, "dup");
        assert_ne!(detections[1].id, "dup");
    }

    #[tokio::test]
    async fn audit_capacity_evicts_oldest() {
        let store = DetectionStore::with_config(StoreConfig {
            audit_capacity: Some(2),
        });
        for action in ["one", "two", "three"] {
            store.append_audit(AuditEvent::new("10:00", "Test", action)).await;
        }
        let actions: Vec<String> = store.audit_log().await.into_iter().map(|e| e.action).collect();
        assert_eq!(actions, vec!["three", "two"]);
    }

    #[tokio::test]
    async fn subscribers_see_appends() {
        let store = DetectionStore::new();
        let mut events = store.subscribe();
        let id = store.append(detection("a")).await;
        assert_eq!(events.recv().await.unwrap(), StoreEvent::Appended { id });
    }

    proptest! {
        #[test]
        fn append_sequence_is_reversed_call_order(count in 0usize..64) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = DetectionStore::new();
                for i in 0..count {
                    store.append(detection(&format!("id{}", i))).await;
                }
                let ids: Vec<String> = store.detections().await.into_iter().map(|d| d.id).collect();
                let expected: Vec<String> = (0..count).rev().map(|i| format!("id{}", i)).collect();
                prop_assert_eq!(ids, expected);
                Ok(())
            })?;
        }
    }
}
