//! Crate-wide error type.
//!
//! Each concern keeps its own error enum next to the code that raises it;
//! [`AegisError`] collects them for callers that drive several at once.

use thiserror::Error;

/// Main error type that encompasses all possible errors in the system
#[derive(Debug, Error)]
pub enum AegisError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Import error: {0}")]
    Import(#[from] crate::producers::ImportError),

    #[error("AI proxy error: {0}")]
    Proxy(#[from] crate::ai::ProxyError),

    #[error("{0}")]
    Analyze(#[from] crate::producers::AnalyzeError),

    #[error("Web error: {0}")]
    Web(#[from] crate::web::WebError),

    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl AegisError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Whether retrying the same operation later might succeed
    pub fn is_transient(&self) -> bool {
        use crate::ai::ProxyError;
        use crate::producers::AnalyzeError;

        matches!(
            self,
            AegisError::Proxy(ProxyError::Network(_))
                | AegisError::Analyze(AnalyzeError::InFlight)
                | AegisError::Analyze(AnalyzeError::Proxy(ProxyError::Network(_)))
        )
    }
}

/// Result type alias for convenience
pub type AegisResult<T> = Result<T, AegisError>;
