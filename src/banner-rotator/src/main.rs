//! Banner Rotator: epsilon-greedy banner rotation service.
//!
//! Loads configuration, wires the catalog, statistics backend, selector and
//! event stream together, then serves the REST API until Ctrl-C.

use clap::Parser;
use rotator_api::{ApiServer, AppState};
use rotator_bandit::new_bandit;
use rotator_catalog::CatalogStore;
use rotator_core::config::AppConfig;
use rotator_events::EventStream;
use rotator_stats::build_stats_store;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "banner-rotator")]
#[command(about = "Epsilon-greedy banner rotation service")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "BANNER_ROTATOR__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "BANNER_ROTATOR__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Exploration probability (overrides config)
    #[arg(long, env = "BANNER_ROTATOR__BANDIT__EPSILON")]
    epsilon: Option<f64>,

    /// Log level used when RUST_LOG is unset (overrides config)
    #[arg(long, env = "BANNER_ROTATOR__LOG_LEVEL")]
    log_level: Option<String>,
}

/// Crates whose verbosity follows `log_level` when RUST_LOG is unset.
const LOG_TARGETS: &[&str] = &[
    "banner_rotator",
    "rotator_api",
    "rotator_bandit",
    "rotator_catalog",
    "rotator_stats",
    "rotator_events",
];

fn default_filter(level: &str) -> String {
    let mut directives: Vec<String> = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect();
    directives.push("tower_http=info".to_string());
    directives.join(",")
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(level).into()),
        )
        .json()
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = AppConfig::load();
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => AppConfig::default(),
    };

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(epsilon) = cli.epsilon {
        config.bandit.epsilon = epsilon;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_tracing(&config.log_level);

    if let Err(e) = &loaded {
        warn!(error = %e, "Failed to load config, using defaults");
    }

    info!("Banner Rotator starting up");
    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        epsilon = config.bandit.epsilon,
        stats_backend = ?config.stats.backend,
        nats = config.nats.enabled,
        "Configuration loaded"
    );

    if !(0.0..=1.0).contains(&config.bandit.epsilon) {
        warn!(
            epsilon = config.bandit.epsilon,
            "Epsilon outside [0, 1]; selection will always explore or always exploit"
        );
    }

    let catalog = Arc::new(CatalogStore::new());
    let stats = build_stats_store(&config).await?;
    let selector = new_bandit(&config.bandit, stats, catalog.clone());

    let events = match EventStream::connect(&config.nats).await {
        Ok(stream) => stream,
        Err(e) => {
            error!(error = %e, "Failed to connect to NATS, banner events disabled");
            EventStream::disabled()
        }
    };

    let state = AppState::new(selector, catalog, events.sink(), config.node_id.clone());
    let api_server = ApiServer::new(config.clone(), state);

    if let Err(e) = api_server.start_metrics() {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Banner Rotator is ready to serve traffic");

    // Blocks until shutdown
    let served = api_server.start_http(shutdown_signal()).await;

    // Deliver events queued by the last requests before the runtime goes away.
    events.close().await;
    served?;

    info!("Banner Rotator stopped");
    Ok(())
}
