//! Dashboard API driven through the router without binding a socket

use aegis_dashboard::ai::{AnalysisProxy, MockProxy};
use aegis_dashboard::config::AegisConfig;
use aegis_dashboard::store::DetectionStore;
use aegis_dashboard::web::server::router;
use aegis_dashboard::web::AppState;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> (Router, AppState) {
    let proxy: Arc<dyn AnalysisProxy> = Arc::new(MockProxy::new());
    let state = AppState::new(DetectionStore::new(), proxy, &AegisConfig::default());
    (router(state.clone(), true), state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn send_text(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "text/plain")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_detection_count() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["detections"], 0);
}

#[tokio::test]
async fn analyze_replaces_detections_and_audits() {
    let (app, state) = app();
    send(&app, Method::POST, "/api/import/sample/campus_security", None).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/agents/analyze",
        Some(json!({ "query": "person near the gate" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 3);
    assert_eq!(body["data"]["provider"], "mock");

    assert_eq!(state.store.len().await, 3);
    let (_, audit) = send(&app, Method::GET, "/api/audit", None).await;
    assert_eq!(audit["data"][0]["action"], "Analysis completed");
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::POST, "/api/agents/analyze", Some(json!({ "query": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn csv_and_json_imports() {
    let (app, state) = app();
    let csv = "lat,lng,time,confidence,camera,description,severity\n37.1,-80.1,14:00,90,CamX,Test desc,high\n1,2,3\n";
    let (status, body) = send_text(&app, "/api/import/csv", csv).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "imported": 1, "skipped": 1 }));

    let (status, body) = send_text(&app, "/api/import/json", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Error parsing file"));
    assert_eq!(state.store.len().await, 1);
}

#[tokio::test]
async fn unknown_sample_dataset_is_not_found() {
    let (app, _) = app();
    let (status, _) = send(&app, Method::POST, "/api/import/sample/harbor", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn clear_empties_store_and_audit_log() {
    let (app, state) = app();
    send(&app, Method::POST, "/api/import/sample/retail", None).await;
    assert!(!state.store.is_empty().await);

    let (status, body) = send(&app, Method::DELETE, "/api/detections", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["actor"], "DetectionStore");

    let (_, detections) = send(&app, Method::GET, "/api/detections", None).await;
    let (_, audit) = send(&app, Method::GET, "/api/audit", None).await;
    assert_eq!(detections["data"], json!([]));
    assert_eq!(audit["data"], json!([]));
}

#[tokio::test]
async fn charts_feature_severity_when_critical_present() {
    let (app, _) = app();
    let (_, empty) = send(&app, Method::GET, "/api/charts", None).await;
    assert_eq!(empty["data"]["charts"].as_array().unwrap().len(), 7);
    assert_eq!(empty["data"]["featured"], Value::Null);

    // The campus sample contains a critical detection
    send(&app, Method::POST, "/api/import/sample/campus", None).await;
    let (_, charts) = send(&app, Method::GET, "/api/charts", None).await;
    assert_eq!(charts["data"]["featured"]["chart"]["id"], "severity-pie");
    assert_eq!(charts["data"]["featured"]["reason"]["rule"], "criticalThreats");
    assert_eq!(charts["data"]["featured"]["chart"], charts["data"]["charts"][1]);

    let (status, picked) = send(&app, Method::POST, "/api/charts/temporal-patterns", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(picked["data"]["reason"]["rule"], "manual");

    // A manual pick survives new data but is rebuilt from the same snapshot
    send(&app, Method::POST, "/api/import/sample/retail", None).await;
    let (_, charts) = send(&app, Method::GET, "/api/charts", None).await;
    assert_eq!(charts["data"]["featured"]["reason"]["rule"], "manual");
    assert_eq!(charts["data"]["featured"]["chart"]["id"], "temporal-patterns");
    assert_eq!(charts["data"]["featured"]["chart"], charts["data"]["charts"][6]);
}

#[tokio::test]
async fn huge_interval_setting_is_clamped() {
    let (app, _) = app();
    let (status, settings) = send(
        &app,
        Method::PUT,
        "/api/agents/auto/settings",
        Some(json!({ "analysis_interval_ms": u64::MAX })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["data"]["analysis_interval_ms"], 5000);
}

#[tokio::test]
async fn producers_start_and_stop() {
    let (app, _) = app();
    let (_, started) = send(&app, Method::POST, "/api/agents/generator/start", None).await;
    assert_eq!(started["data"], "active");
    let (_, view) = send(&app, Method::GET, "/api/agents/generator", None).await;
    assert_eq!(view["data"]["status"], "active");
    let (_, stopped) = send(&app, Method::POST, "/api/agents/generator/stop", None).await;
    assert_eq!(stopped["data"], "paused");

    send(&app, Method::POST, "/api/agents/auto/start", None).await;
    let (_, view) = send(&app, Method::GET, "/api/agents/auto", None).await;
    assert_eq!(view["data"]["status"], "active");
    assert_eq!(view["data"]["uptime"], "00:00:00");
    send(&app, Method::POST, "/api/agents/auto/stop", None).await;

    let (_, settings) = send(
        &app,
        Method::PUT,
        "/api/agents/auto/settings",
        Some(json!({ "sensitivity": 5, "analysis_interval_ms": 1200 })),
    )
    .await;
    assert_eq!(settings["data"]["sensitivity"], 10);
    assert_eq!(settings["data"]["analysis_interval_ms"], 1000);
}

#[tokio::test]
async fn threat_assessment_uses_store_when_no_detections_sent() {
    let (app, _) = app();
    send(&app, Method::POST, "/api/import/sample/airport", None).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/gemini/analyze-detections",
        Some(json!({ "analysisType": "comprehensive" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], true);

    let (status, chat) = send(&app, Method::POST, "/api/chat", Some(json!({ "message": "status?" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!chat["data"]["response"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn store_changes_are_streamed() {
    let (app, _) = app();
    let request = Request::builder().uri("/api/events").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
}

#[tokio::test]
async fn visual_analysis_requires_camera_timestamp_and_type() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/agents/visual-analyze",
        Some(json!({ "cameraId": "Camera C4", "analysisType": "object_detection" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields: cameraId, timestamp, analysisType");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/agents/visual-analyze",
        Some(json!({ "cameraId": "Camera C4", "timestamp": "14:05", "analysisType": "x_ray" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn visual_analysis_reports_without_touching_the_store() {
    let (app, state) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/agents/visual-analyze",
        Some(json!({
            "cameraId": "Camera C4",
            "timestamp": "2024-03-01T14:05:00Z",
            "analysisType": "behavior_analysis",
            "imageUrl": "/frames/c4.jpg"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let report = &body["data"];
    assert_eq!(report["success"], true);
    assert_eq!(report["analysis"]["cameraId"], "Camera C4");
    assert_eq!(report["analysis"]["analysisType"], "behavior_analysis");
    assert!(report["detections"].as_array().unwrap().len() <= 1);
    assert!(state.store.is_empty().await);
}

#[tokio::test]
async fn threat_prediction_scales_the_sent_history() {
    let (app, _) = app();
    let detections = json!([
        { "id": "a", "lat": 37.0, "lng": -80.0, "time": "10:00", "confidence": 90,
          "camera": "Camera C1", "severity": "critical", "description": "x" },
        { "id": "b", "lat": 37.0, "lng": -80.0, "time": "10:05", "confidence": 70,
          "camera": "Camera C2", "severity": "high", "description": "y" }
    ]);
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/gemini/predict-threats",
        Some(json!({ "detections": detections, "predictionHorizon": "Next 2 hours" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["metadata"]["model"], "mock-prediction-engine");
    assert_eq!(data["metadata"]["predictionHorizon"], "Next 2 hours");
    assert_eq!(data["metadata"]["historicalIncidents"], 2);
    assert_eq!(data["predictions"]["predictiveInsights"]["expectedDetectionVolume"], 2);
    assert_eq!(
        data["predictions"]["predictiveInsights"]["severityDistribution"],
        json!({ "critical": 1, "high": 1, "medium": 0, "low": 0 })
    );
}

#[tokio::test]
async fn threat_prediction_falls_back_to_the_store() {
    let (app, state) = app();
    send(&app, Method::POST, "/api/import/sample/airport", None).await;
    let (status, body) = send(&app, Method::POST, "/api/gemini/predict-threats", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["metadata"]["historicalIncidents"],
        state.store.len().await
    );
    assert_eq!(body["data"]["metadata"]["predictionHorizon"], "Next 6 hours");
}

#[tokio::test]
async fn alerts_are_acknowledged_and_audited() {
    let (app, state) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/alerts/publish",
        Some(json!({ "text": "Gate 3 closed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "ok": true, "posted": ["X"], "text": "Gate 3 closed" }));

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/alerts/publish",
        Some(json!({ "text": "Gate 3 open", "platforms": ["X", "Local News"] })),
    )
    .await;
    assert_eq!(body["data"]["posted"], json!(["X", "Local News"]));

    let audit = state.store.audit_log().await;
    assert_eq!(audit[0].action, "Published alert");
    assert_eq!(audit[0].detail.as_deref(), Some("Gate 3 open (X, Local News)"));

    let (status, _) = send(&app, Method::POST, "/api/alerts/publish", Some(json!({ "text": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
