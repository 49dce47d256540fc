//! Router assembly and server lifecycle.

use super::{handlers, WebError};
use crate::ai::AnalysisProxy;
use crate::charts::VisualizationAgent;
use crate::config::{AegisConfig, WebConfig};
use crate::producers::{
    AutoVisualAgent, DataImporter, ManualAnalyzer, RealTimeGenerator, VisualAnalyzer,
};
use crate::store::DetectionStore;
use axum::routing::{get, post, put};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared handles behind every route
#[derive(Clone)]
pub struct AppState {
    pub store: DetectionStore,
    pub analyzer: Arc<ManualAnalyzer>,
    pub proxy: Arc<dyn AnalysisProxy>,
    pub visualization: VisualizationAgent,
    pub auto_agent: Arc<Mutex<AutoVisualAgent>>,
    pub generator: Arc<Mutex<RealTimeGenerator>>,
    pub importer: Arc<DataImporter>,
    pub visual: Arc<Mutex<VisualAnalyzer>>,
}

impl AppState {
    pub fn new(store: DetectionStore, proxy: Arc<dyn AnalysisProxy>, config: &AegisConfig) -> Self {
        Self {
            analyzer: Arc::new(ManualAnalyzer::new(proxy.clone())),
            visualization: VisualizationAgent::new(),
            auto_agent: Arc::new(Mutex::new(AutoVisualAgent::new(
                config.auto_agent.clone(),
                store.clone(),
            ))),
            generator: Arc::new(Mutex::new(RealTimeGenerator::new(
                config.generator.clone(),
                store.clone(),
            ))),
            importer: Arc::new(DataImporter::new()),
            visual: Arc::new(Mutex::new(VisualAnalyzer::new())),
            store,
            proxy,
        }
    }
}

/// Web server for the dashboard API
pub struct WebServer {
    config: WebConfig,
    app_state: AppState,
}

impl WebServer {
    pub fn new(config: WebConfig, app_state: AppState) -> Self {
        Self { config, app_state }
    }

    pub fn state(&self) -> &AppState {
        &self.app_state
    }

    /// Serve until `shutdown` resolves, then stop both producers.
    pub async fn start<F>(self, shutdown: F) -> Result<(), WebError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("{}:{}", self.config.host, self.config.port)
            .parse::<SocketAddr>()
            .map_err(|e| WebError::StartupFailed(format!("Invalid address: {}", e)))?;

        let state = self.app_state.clone();
        let watch_token = CancellationToken::new();
        let watcher = state
            .visualization
            .watch(state.store.clone(), watch_token.clone());

        if self.config.start_auto_agent {
            state.auto_agent.lock().await.start().await;
        }
        if self.config.start_generator {
            state.generator.lock().await.start().await;
        }

        let app = router(state.clone(), self.config.cors);

        info!("Starting Aegis dashboard API on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| WebError::StartupFailed(format!("Failed to bind to {}: {}", addr, e)))?;

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| WebError::StartupFailed(format!("Server error: {}", e)));

        state.auto_agent.lock().await.stop().await;
        state.generator.lock().await.stop().await;
        watch_token.cancel();
        let _ = watcher.await;
        info!("dashboard API stopped");

        served
    }
}

/// Build the router; exposed so tests can drive it without a socket.
pub fn router(state: AppState, cors: bool) -> Router {
    let api_routes = Router::new()
        .route(
            "/detections",
            get(handlers::list_detections).delete(handlers::clear_detections),
        )
        .route("/audit", get(handlers::audit_log))
        .route("/events", get(handlers::events))
        .route("/charts", get(handlers::charts))
        .route("/charts/:kind", post(handlers::select_chart))
        .route("/agents/analyze", post(handlers::analyze))
        .route("/agents/visual-analyze", post(handlers::visual_analyze))
        .route("/agents/auto", get(handlers::auto_agent_status))
        .route("/agents/auto/start", post(handlers::start_auto_agent))
        .route("/agents/auto/stop", post(handlers::stop_auto_agent))
        .route("/agents/auto/settings", put(handlers::update_auto_agent))
        .route("/agents/generator", get(handlers::generator_status))
        .route("/agents/generator/start", post(handlers::start_generator))
        .route("/agents/generator/stop", post(handlers::stop_generator))
        .route("/agents/generator/settings", put(handlers::update_generator))
        .route("/import/csv", post(handlers::import_csv))
        .route("/import/json", post(handlers::import_json))
        .route("/import/sample/:dataset", post(handlers::import_sample))
        .route("/import/manual", post(handlers::import_manual))
        .route("/gemini/analyze-detections", post(handlers::assess_detections))
        .route("/gemini/predict-threats", post(handlers::predict_threats))
        .route("/alerts/publish", post(handlers::publish_alert))
        .route("/chat", post(handlers::chat));

    let mut app = Router::new()
        .nest("/api", api_routes)
        .route("/health", get(handlers::health))
        .with_state(state);

    if cors {
        app = app.layer(ServiceBuilder::new().layer(CorsLayer::permissive()));
    }
    app
}
