//! Manual Analyze
//!
//! Free-text query producer. One proxy call per query; a successful answer
//! replaces the whole detection list, a failure leaves it untouched.

use crate::ai::{AnalysisDetails, AnalysisProxy, AnalyzeRequest, ProxyError};
use crate::detection::AuditEvent;
use crate::store::DetectionStore;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("An analysis is already in progress")]
    InFlight,

    #[error("Analysis failed: {0}")]
    Proxy(#[from] ProxyError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOutcome {
    pub query: String,
    pub count: usize,
    pub message: String,
    pub provider: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_details: Option<AnalysisDetails>,
}

pub struct ManualAnalyzer {
    proxy: Arc<dyn AnalysisProxy>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag on every exit path
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ManualAnalyzer {
    pub fn new(proxy: Arc<dyn AnalysisProxy>) -> Self {
        Self {
            proxy,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn proxy(&self) -> &Arc<dyn AnalysisProxy> {
        &self.proxy
    }

    /// Run one analysis and replace the store contents with its result.
    ///
    /// A second call while one is outstanding is rejected with
    /// [`AnalyzeError::InFlight`]. There is no retry.
    pub async fn analyze(
        &self,
        query: &str,
        store: &DetectionStore,
    ) -> Result<AnalyzeOutcome, AnalyzeError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AnalyzeError::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        info!(query, provider = self.proxy.name(), "running analysis");
        let response = match self.proxy.analyze(&AnalyzeRequest::new(query)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "analysis failed, store left untouched");
                return Err(e.into());
            }
        };

        let count = store.replace_all(response.detections).await;
        store
            .append_audit(
                AuditEvent::now("Aegis", "Analysis completed")
                    .with_detail(format!("Found {} detections for query: \"{}\"", count, query)),
            )
            .await;

        Ok(AnalyzeOutcome {
            query: query.to_string(),
            count,
            message: response.message,
            provider: self.proxy.name(),
            analysis_details: response.analysis_details,
        })
    }
}
