//! PopReach — delivery server for embeddable popup and notification
//! widgets.
//!
//! Serves widget configuration to embed scripts and collects their leads
//! and analytics events.

use clap::Parser;
use popreach_api::ApiServer;
use popreach_core::AppConfig;
use popreach_delivery::{seed_demo_widgets, LeadStore, StatsStore, WidgetCatalog};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "popreach")]
#[command(about = "Delivery server for embeddable popup and notification widgets")]
#[command(version)]
struct Cli {
    /// HTTP port (overrides config)
    #[arg(long, env = "POPREACH__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Seed the catalog with demo widgets for local development
    #[arg(long, default_value_t = false)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "popreach=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("PopReach starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }

    info!(
        host = %config.api.host,
        http_port = config.api.http_port,
        "Configuration loaded"
    );

    let catalog = Arc::new(WidgetCatalog::new());
    let leads = Arc::new(LeadStore::new());
    let stats = Arc::new(StatsStore::new());

    if cli.seed_demo {
        seed_demo_widgets(&catalog);
    }

    let api_server = ApiServer::new(config, catalog, leads, stats);
    api_server.start_http().await
}
