//! aegis - detection simulation and dashboard API
//!
//! Runs the Aegis event producers against an in-memory detection store,
//! imports detection files, queries the AI proxy and serves the dashboard API.

use aegis_dashboard::ai::proxy_from_config;
use aegis_dashboard::charts::{select_featured, FeaturedChart, SelectionReason};
use aegis_dashboard::config::{AegisConfig, ConfigError, ConfigManager};
use aegis_dashboard::detection::{AuditEvent, Severity};
use aegis_dashboard::error::{AegisError, AegisResult};
use aegis_dashboard::logging::{self, LogFormat, LogLevel};
use aegis_dashboard::producers::{
    AutoVisualAgent, DataImporter, ImportFormat, ImportSource, ManualAnalyzer, RealTimeGenerator,
    SampleDataset, ScenarioDetector, ScenarioMode, VisualThreatDetector,
};
use aegis_dashboard::store::DetectionStore;
use aegis_dashboard::web::{AppState, WebServer};
use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::Colorize;
use is_terminal::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// aegis - CCTV detection simulation and dashboard API
#[derive(Parser)]
#[command(name = "aegis")]
#[command(about = "Simulated CCTV detections, chart selection and the Aegis dashboard API")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the producers against a fresh store and summarize the result
    Simulate {
        /// How long to run
        #[arg(short, long, default_value_t = 10)]
        seconds: u64,

        /// Leave the auto visual agent off
        #[arg(long)]
        no_auto: bool,

        /// Leave the real-time generator off
        #[arg(long)]
        no_generator: bool,

        #[arg(long, value_enum)]
        scenario: Option<ScenarioMode>,

        /// Generator emission chance per tick, 10-100
        #[arg(long)]
        intensity: Option<u8>,

        /// Auto agent sensitivity, 10-100
        #[arg(long)]
        sensitivity: Option<u8>,

        /// Seed both producers for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Import detections from a file or a built-in sample dataset
    Import {
        /// CSV or JSON file
        #[arg(required_unless_present = "sample")]
        file: Option<PathBuf>,

        /// File format; guessed from the extension when omitted
        #[arg(short, long, value_enum)]
        format: Option<ImportFormat>,

        /// campus_security, retail_security or airport_security
        #[arg(long, conflicts_with = "file")]
        sample: Option<SampleDataset>,
    },

    /// Ask the configured AI proxy for detections matching a query
    Analyze {
        query: String,
    },

    /// Serve the dashboard API
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        /// Start the auto visual agent immediately
        #[arg(long)]
        auto: bool,

        /// Start the real-time generator immediately
        #[arg(long)]
        generator: bool,
    },

    /// Show or initialize the configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Write the current configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    if let Err(err) = run(cli).await {
        if err.is_transient() {
            eprintln!(
                "{} this failure is temporary; trying again may succeed",
                "hint:".yellow().bold()
            );
        }
        return Err(err.into());
    }
    Ok(())
}

async fn run(cli: Cli) -> AegisResult<()> {
    let mut manager = ConfigManager::new(cli.config.clone())?;

    let level_text = cli
        .log_level
        .clone()
        .unwrap_or_else(|| manager.config().general.log_level.clone());
    let level: LogLevel = level_text.parse().map_err(AegisError::invalid_input)?;
    let format: LogFormat = manager
        .config()
        .general
        .log_format
        .parse()
        .map_err(AegisError::invalid_input)?;
    logging::init(level, format)?;

    match cli.command {
        Commands::Simulate {
            seconds,
            no_auto,
            no_generator,
            scenario,
            intensity,
            sensitivity,
            seed,
        } => {
            if seconds == 0 {
                return Err(AegisError::invalid_input("--seconds must be at least 1"));
            }
            manager.update(|c| {
                if let Some(scenario) = scenario {
                    c.generator.scenario = scenario;
                }
                if let Some(intensity) = intensity {
                    c.generator.intensity = intensity;
                }
                if let Some(sensitivity) = sensitivity {
                    c.auto_agent.sensitivity = sensitivity;
                }
            })?;
            simulate(manager.config(), seconds, !no_auto, !no_generator, seed).await
        }
        Commands::Import {
            file,
            format,
            sample,
        } => {
            let store = DetectionStore::with_config(manager.config().store.clone());
            let importer = DataImporter::new();
            let source = match (sample, file) {
                (Some(dataset), _) => ImportSource::Sample(dataset),
                (None, Some(path)) => importer.load_file(&path, format).await?,
                (None, None) => {
                    return Err(AegisError::invalid_input("Either a file or --sample is required"))
                }
            };
            let report = importer.import(source, &store).await?;
            println!(
                "{} {} detections ({} rows skipped)",
                "Imported".green().bold(),
                report.imported,
                report.skipped
            );
            print_summary(&store).await;
            Ok(())
        }
        Commands::Analyze { query } => {
            let store = DetectionStore::with_config(manager.config().store.clone());
            let analyzer = ManualAnalyzer::new(proxy_from_config(&manager.config().ai));
            let outcome = analyzer.analyze(&query, &store).await.map_err(|e| {
                eprintln!("{} {}", "✗".red(), e);
                e
            })?;
            println!("{} {}", "✓".green(), outcome.message);
            println!("  provider: {}", outcome.provider);
            print_summary(&store).await;
            Ok(())
        }
        Commands::Serve {
            host,
            port,
            auto,
            generator,
        } => {
            manager.update(|c| {
                if let Some(host) = host {
                    c.web.host = host;
                }
                if let Some(port) = port {
                    c.web.port = port;
                }
                c.web.start_auto_agent |= auto;
                c.web.start_generator |= generator;
            })?;
            let config = manager.config().clone();
            let store = DetectionStore::with_config(config.store.clone());
            let state = AppState::new(store, proxy_from_config(&config.ai), &config);
            let server = WebServer::new(config.web.clone(), state);
            server
                .start(async {
                    let _ = tokio::signal::ctrl_c().await;
                    info!("shutdown requested");
                })
                .await?;
            Ok(())
        }
        Commands::Config { show, init } => {
            if init {
                manager.save()?;
                println!(
                    "{} Configuration written to {}",
                    "✓".green(),
                    manager.path().display()
                );
            }
            if show || !init {
                let mut shown = manager.config().clone();
                if shown.ai.api_key.is_some() {
                    shown.ai.api_key = Some("***".to_string());
                }
                let text = toml::to_string_pretty(&shown).map_err(ConfigError::from)?;
                println!("{}", text);
            }
            Ok(())
        }
    }
}

async fn simulate(
    config: &AegisConfig,
    seconds: u64,
    run_auto: bool,
    run_generator: bool,
    seed: Option<u64>,
) -> AegisResult<()> {
    let store = DetectionStore::with_config(config.store.clone());

    let mut auto = match seed {
        Some(seed) => AutoVisualAgent::with_detector(
            config.auto_agent.clone(),
            store.clone(),
            Box::new(VisualThreatDetector::with_seed(config.auto_agent.sensitivity, seed)),
        ),
        None => AutoVisualAgent::new(config.auto_agent.clone(), store.clone()),
    };
    let mut generator = match seed {
        Some(seed) => RealTimeGenerator::with_detector(
            config.generator.clone(),
            store.clone(),
            Box::new(ScenarioDetector::with_seed(
                config.generator.clone(),
                seed.wrapping_add(1),
            )),
        ),
        None => RealTimeGenerator::new(config.generator.clone(), store.clone()),
    };

    if run_auto {
        auto.start().await;
    }
    if run_generator {
        generator.start().await;
    }

    println!(
        "{} for {}s (scenario: {})...",
        "Simulating".cyan().bold(),
        seconds,
        config.generator.scenario
    );
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => info!("simulation interrupted"),
    }

    auto.stop().await;
    generator.stop().await;

    if run_auto {
        let stats = auto.stats().await;
        println!(
            "Auto agent: {} detections, {} threats blocked",
            stats.total_detections, stats.threats_blocked
        );
    }
    if run_generator {
        let stats = generator.stats().await;
        println!("Generator: {} detections", stats.total_generated);
    }
    print_summary(&store).await;
    Ok(())
}

async fn print_summary(store: &DetectionStore) {
    let detections = store.detections().await;
    println!();
    println!("{} {}", "Detections:".bold(), detections.len());
    for severity in Severity::ALL.iter().rev() {
        let count = detections.iter().filter(|d| d.severity == *severity).count();
        println!("  {:<10} {}", paint(*severity), count);
    }

    for detection in detections.iter().take(5) {
        println!(
            "  {} {} [{}] {} ({}%)",
            detection.time.dimmed(),
            detection.camera,
            paint(detection.severity),
            detection.description,
            detection.confidence
        );
    }

    let audit = store.audit_log().await;
    if let Some(latest) = audit.first() {
        println!("{} {}", "Last audit entry:".bold(), describe_audit(latest));
    }

    match select_featured(&detections, &Local::now()) {
        Some(featured) => print_featured(&featured),
        None => println!("{}", "No detections to chart".dimmed()),
    }
}

fn print_featured(featured: &FeaturedChart) {
    println!();
    println!(
        "{} {} ({})",
        "Featured chart:".bold(),
        featured.chart.title.cyan(),
        reason_text(&featured.reason)
    );
    println!("  {}", featured.chart.justification);
    for insight in &featured.chart.accessibility.key_insights {
        println!("  • {}", insight);
    }
}

fn reason_text(reason: &SelectionReason) -> String {
    match reason {
        SelectionReason::CriticalThreats { count } => format!("{} critical threats", count),
        SelectionReason::HighConfidence { count, total } => {
            format!("{} of {} detections at high confidence", count, total)
        }
        SelectionReason::LongTimeSpan { minutes } => format!("detections span {} minutes", minutes),
        SelectionReason::CameraCoverage => "camera coverage".to_string(),
        SelectionReason::Manual => "selected manually".to_string(),
    }
}

fn describe_audit(event: &AuditEvent) -> String {
    match &event.detail {
        Some(detail) => format!("{} {}: {} ({})", event.time, event.actor, event.action, detail),
        None => format!("{} {}: {}", event.time, event.actor, event.action),
    }
}

fn paint(severity: Severity) -> colored::ColoredString {
    let label = severity.as_str();
    match severity {
        Severity::Critical => label.red().bold(),
        Severity::High => label.red(),
        Severity::Medium => label.yellow(),
        Severity::Low => label.green(),
    }
}
