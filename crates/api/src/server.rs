//! HTTP server wiring for the delivery endpoints. The embed script is
//! served from third-party pages, so CORS is permissive by design.

use crate::rest::{self, AppState};
use axum::routing::{get, post};
use axum::Router;
use popreach_core::AppConfig;
use popreach_delivery::{LeadStore, StatsStore, WidgetCatalog};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(
        config: AppConfig,
        catalog: Arc<WidgetCatalog>,
        leads: Arc<LeadStore>,
        stats: Arc<StatsStore>,
    ) -> Self {
        Self {
            config,
            state: AppState {
                catalog,
                leads,
                stats,
                start_time: Instant::now(),
            },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/v1/embed/:site_id", get(rest::get_embed_config))
            .route("/v1/leads", post(rest::save_lead))
            .route("/v1/events", post(rest::track_event))
            .route("/v1/stats/:widget_id", get(rest::get_widget_stats))
            .route("/health", get(rest::health_check))
            .route("/live", get(rest::liveness))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    pub async fn start_http(&self) -> anyhow::Result<()> {
        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);
        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}
