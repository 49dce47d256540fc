// Aegis Dashboard Core Library
//
// Detection store, simulated event producers, chart selection and the AI
// proxy behind the Aegis CCTV analytics dashboard.

pub mod ai;
pub mod charts;
pub mod config;
pub mod detection;
pub mod error;
pub mod logging;
pub mod producers;
pub mod store;
pub mod web;

// Re-export commonly used types
pub use ai::{proxy_from_config, AnalysisProxy, MockProxy, ProxyError};
pub use charts::{generate_charts, select_featured, ChartData, ChartKind, FeaturedChart};
pub use config::{AegisConfig, ConfigError, ConfigManager};
pub use detection::{AuditEvent, Detection, Severity, ThreatType};
pub use error::{AegisError, AegisResult};
pub use producers::{
    AutoVisualAgent, DataImporter, Detector, DetectorContext, ManualAnalyzer, RealTimeGenerator,
};
pub use store::{DetectionStore, StoreEvent};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
