//! Web dashboard module
//!
//! JSON API over the detection store, the producers and the chart selector.
//! The browser front end is not part of this crate.

pub mod handlers;
pub mod server;

pub use crate::config::WebConfig;
pub use server::{AppState, WebServer};

use crate::ai::ProxyError;
use crate::error::AegisError;
use crate::producers::{AnalyzeError, ImportError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }
}

/// Error types for web operations
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Server startup failed: {0}")]
    StartupFailed(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Upstream failure: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::Conflict(_) => StatusCode::CONFLICT,
            WebError::Upstream(_) => StatusCode::BAD_GATEWAY,
            WebError::StartupFailed(_) | WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Clients see the inner message, without the variant prefix
        let message = match self {
            WebError::StartupFailed(m)
            | WebError::BadRequest(m)
            | WebError::NotFound(m)
            | WebError::Conflict(m)
            | WebError::Upstream(m)
            | WebError::Internal(m) => m,
        };
        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

impl From<AegisError> for WebError {
    fn from(err: AegisError) -> Self {
        match err {
            AegisError::Web(err) => err,
            AegisError::Import(err) => {
                let message = err.to_string();
                match err {
                    ImportError::Parse(_) | ImportError::UnknownFormat(_) => WebError::BadRequest(message),
                    ImportError::UnknownDataset(_) => WebError::NotFound(message),
                    ImportError::Io(_) => WebError::Internal(message),
                }
            }
            AegisError::Analyze(AnalyzeError::InFlight) => {
                WebError::Conflict(AnalyzeError::InFlight.to_string())
            }
            AegisError::Analyze(err) => WebError::Upstream(err.to_string()),
            AegisError::Proxy(err) => WebError::Upstream(err.to_string()),
            AegisError::InvalidInput { message } => WebError::BadRequest(message),
            other => WebError::Internal(other.to_string()),
        }
    }
}

impl From<ImportError> for WebError {
    fn from(err: ImportError) -> Self {
        AegisError::from(err).into()
    }
}

impl From<AnalyzeError> for WebError {
    fn from(err: AnalyzeError) -> Self {
        AegisError::from(err).into()
    }
}

impl From<ProxyError> for WebError {
    fn from(err: ProxyError) -> Self {
        AegisError::from(err).into()
    }
}
