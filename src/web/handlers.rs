//! HTTP API handlers for the Aegis dashboard

use super::{ApiResponse, AppState, WebError};
use crate::ai::{
    ThreatAnalysisRequest, ThreatAnalysisResponse, ThreatPredictionRequest,
    ThreatPredictionResponse,
};
use crate::charts::{generate_charts, ChartData, ChartKind, FeaturedChart};
use crate::detection::{AuditEvent, Detection};
use crate::error::AegisError;
use crate::producers::{
    format_uptime, AnalyzeOutcome, AutoAgentSettings, AutoAgentStats, GeneratorSettings,
    GeneratorStats, ImportReport, ImportSource, ManualEntry, ProducerStatus, SampleDataset,
    VisualAnalysisReport, VisualAnalysisRequest,
};
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

type ApiResult<T> = Result<Json<ApiResponse<T>>, WebError>;

/// Detections shown in the auto agent panel
const RECENT_LIMIT: usize = 10;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub detections: usize,
}

#[derive(Debug, Serialize)]
pub struct ChartsResponse {
    pub charts: Vec<ChartData>,
    pub featured: Option<FeaturedChart>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeBody {
    #[serde(alias = "q", default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoAgentView {
    pub status: ProducerStatus,
    pub stats: AutoAgentStats,
    pub uptime: String,
    pub settings: AutoAgentSettings,
    pub recent: Vec<Detection>,
}

#[derive(Debug, Serialize)]
pub struct GeneratorView {
    pub status: ProducerStatus,
    pub stats: GeneratorStats,
    pub settings: GeneratorSettings,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Platforms an alert goes to when the request names none
const DEFAULT_PLATFORMS: [&str; 1] = ["X"];

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub platforms: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct PublishReceipt {
    pub ok: bool,
    pub posted: Vec<String>,
    pub text: String,
}

pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        detections: state.store.len().await,
    }))
}

pub async fn list_detections(State(state): State<AppState>) -> Json<ApiResponse<Vec<Detection>>> {
    Json(ApiResponse::success(state.store.detections().await))
}

/// Clear everything. The returned audit entry describes the clear but is not kept.
pub async fn clear_detections(State(state): State<AppState>) -> Json<ApiResponse<AuditEvent>> {
    Json(ApiResponse::success(state.importer.clear_all(&state.store).await))
}

pub async fn audit_log(State(state): State<AppState>) -> Json<ApiResponse<Vec<AuditEvent>>> {
    Json(ApiResponse::success(state.store.audit_log().await))
}

/// Store changes as server-sent events, one JSON payload per mutation
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = BroadcastStream::new(state.store.subscribe())
        .filter_map(|event| match event {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(error = %e, "event stream lagged");
                None
            }
        })
        .map(|event| Event::default().json_data(&event));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn charts(State(state): State<AppState>) -> Json<ApiResponse<ChartsResponse>> {
    let detections = state.store.detections().await;
    // Charts and featured pick come from the same snapshot
    let featured = state
        .visualization
        .featured_for(&detections, &Local::now())
        .await;
    Json(ApiResponse::success(ChartsResponse {
        charts: generate_charts(&detections),
        featured,
    }))
}

pub async fn select_chart(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<FeaturedChart> {
    let kind = ChartKind::from_id(&kind)
        .ok_or_else(|| WebError::NotFound(format!("Unknown chart: {}", kind)))?;
    let detections = state.store.detections().await;
    Ok(Json(ApiResponse::success(
        state.visualization.select(kind, &detections).await,
    )))
}

pub async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeBody>,
) -> ApiResult<AnalyzeOutcome> {
    let query = body.query.trim();
    if query.is_empty() {
        return Err(AegisError::invalid_input("Query cannot be empty").into());
    }
    let outcome = state.analyzer.analyze(query, &state.store).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

pub async fn visual_analyze(
    State(state): State<AppState>,
    Json(request): Json<VisualAnalysisRequest>,
) -> ApiResult<VisualAnalysisReport> {
    let report = state.visual.lock().await.analyze(&request)?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn auto_agent_status(State(state): State<AppState>) -> Json<ApiResponse<AutoAgentView>> {
    let agent = state.auto_agent.lock().await;
    let stats = agent.stats().await;
    Json(ApiResponse::success(AutoAgentView {
        status: agent.status().await,
        uptime: format_uptime(stats.uptime_seconds),
        stats,
        settings: agent.settings().await,
        recent: agent.recent(RECENT_LIMIT).await,
    }))
}

pub async fn start_auto_agent(State(state): State<AppState>) -> Json<ApiResponse<ProducerStatus>> {
    let mut agent = state.auto_agent.lock().await;
    agent.start().await;
    Json(ApiResponse::success(agent.status().await))
}

pub async fn stop_auto_agent(State(state): State<AppState>) -> Json<ApiResponse<ProducerStatus>> {
    let mut agent = state.auto_agent.lock().await;
    agent.stop().await;
    Json(ApiResponse::success(agent.status().await))
}

/// Out-of-range values are clamped, not rejected
pub async fn update_auto_agent(
    State(state): State<AppState>,
    Json(settings): Json<AutoAgentSettings>,
) -> Json<ApiResponse<AutoAgentSettings>> {
    let mut agent = state.auto_agent.lock().await;
    agent.update_settings(settings).await;
    Json(ApiResponse::success(agent.settings().await))
}

pub async fn generator_status(State(state): State<AppState>) -> Json<ApiResponse<GeneratorView>> {
    let generator = state.generator.lock().await;
    Json(ApiResponse::success(GeneratorView {
        status: generator.status().await,
        stats: generator.stats().await,
        settings: generator.settings().await,
    }))
}

pub async fn start_generator(State(state): State<AppState>) -> Json<ApiResponse<ProducerStatus>> {
    let mut generator = state.generator.lock().await;
    generator.start().await;
    Json(ApiResponse::success(generator.status().await))
}

pub async fn stop_generator(State(state): State<AppState>) -> Json<ApiResponse<ProducerStatus>> {
    let mut generator = state.generator.lock().await;
    generator.stop().await;
    Json(ApiResponse::success(generator.status().await))
}

pub async fn update_generator(
    State(state): State<AppState>,
    Json(settings): Json<GeneratorSettings>,
) -> Json<ApiResponse<GeneratorSettings>> {
    let mut generator = state.generator.lock().await;
    generator.update_settings(settings).await;
    Json(ApiResponse::success(generator.settings().await))
}

pub async fn import_csv(State(state): State<AppState>, body: String) -> ApiResult<ImportReport> {
    let report = state.importer.import(ImportSource::Csv(body), &state.store).await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn import_json(State(state): State<AppState>, body: String) -> ApiResult<ImportReport> {
    let report = state.importer.import(ImportSource::Json(body), &state.store).await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn import_sample(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
) -> ApiResult<ImportReport> {
    let dataset: SampleDataset = dataset.parse()?;
    let report = state
        .importer
        .import(ImportSource::Sample(dataset), &state.store)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn import_manual(
    State(state): State<AppState>,
    Json(entry): Json<ManualEntry>,
) -> ApiResult<ImportReport> {
    let report = state
        .importer
        .import(ImportSource::Manual(entry), &state.store)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Threat assessment; an empty `detections` list means "what is in the store".
pub async fn assess_detections(
    State(state): State<AppState>,
    Json(mut request): Json<ThreatAnalysisRequest>,
) -> ApiResult<ThreatAnalysisResponse> {
    if request.detections.is_empty() {
        request.detections = state.store.detections().await;
    }
    let response = state.proxy.assess(&request).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    if request.message.trim().is_empty() {
        return Err(AegisError::invalid_input("Message cannot be empty").into());
    }
    Ok(Json(ApiResponse::success(ChatResponse {
        response: state.proxy.ask(&request.message).await,
    })))
}

/// Forecast; an empty `detections` list means "what is in the store".
pub async fn predict_threats(
    State(state): State<AppState>,
    Json(mut request): Json<ThreatPredictionRequest>,
) -> ApiResult<ThreatPredictionResponse> {
    if request.detections.is_empty() {
        request.detections = state.store.detections().await;
    }
    let response = state.proxy.predict(&request).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// No outlet is contacted; the post is acknowledged as-is.
pub async fn publish_alert(
    State(state): State<AppState>,
    Json(request): Json<PublishRequest>,
) -> ApiResult<PublishReceipt> {
    let text = request.text.trim().to_string();
    if text.is_empty() {
        return Err(AegisError::invalid_input("Alert text cannot be empty").into());
    }
    let posted = request
        .platforms
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_PLATFORMS.iter().map(|p| p.to_string()).collect());

    info!(platforms = ?posted, "alert published");
    state
        .store
        .append_audit(
            AuditEvent::now("Operator", "Published alert").with_detail(format!(
                "{} ({})",
                text,
                posted.join(", ")
            )),
        )
        .await;

    Ok(Json(ApiResponse::success(PublishReceipt {
        ok: true,
        posted,
        text,
    })))
}
