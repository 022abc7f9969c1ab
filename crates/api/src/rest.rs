//! REST handlers for the embed, leads, and events endpoints, plus
//! operational probes.
//!
//! Responses use the `{ success, data }` envelope the embed script
//! expects. Lead saves answer 201 on create and 200 on merge.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use popreach_core::types::{
    ConfigResponse, LeadRecord, LeadSaveRequest, TrackEventRequest, WidgetStats,
};
use popreach_delivery::{LeadStore, StatsStore, WidgetCatalog};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<WidgetCatalog>,
    pub leads: Arc<LeadStore>,
    pub stats: Arc<StatsStore>,
    pub start_time: Instant,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedQuery {
    pub last_variant_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

fn error_response(status: StatusCode, error: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: error.to_string(),
        }),
    )
}

/// GET /v1/embed/{siteId} — the widget configuration for one page view.
/// `lastVariantId` drives experiment rotation.
pub async fn get_embed_config(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
    Query(query): Query<EmbedQuery>,
) -> Json<ConfigResponse> {
    metrics::counter!("api.embed_requests").increment(1);
    let data = state
        .catalog
        .config_for_site(&site_id, query.last_variant_id.as_deref());
    Json(ConfigResponse {
        success: true,
        data,
    })
}

/// POST /v1/leads — create-or-merge lead save. The same shape serves
/// partial and final saves.
pub async fn save_lead(
    State(state): State<AppState>,
    Json(request): Json<LeadSaveRequest>,
) -> Result<(StatusCode, Json<Envelope<LeadRecord>>), (StatusCode, Json<ErrorResponse>)> {
    match state.leads.save(&request) {
        Ok((record, created)) => {
            metrics::counter!("api.leads_saved").increment(1);
            let status = if created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            Ok((
                status,
                Json(Envelope {
                    success: true,
                    data: record,
                }),
            ))
        }
        Err(e) => {
            warn!(site_id = %request.site_id, error = %e, "Lead save rejected");
            metrics::counter!("api.validation_errors").increment(1);
            Err(error_response(StatusCode::BAD_REQUEST, &e.to_string()))
        }
    }
}

/// POST /v1/events — fire-and-forget analytics tracking.
pub async fn track_event(
    State(state): State<AppState>,
    Json(request): Json<TrackEventRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    if request.site_id.is_empty() || request.popup_id.is_empty() {
        metrics::counter!("api.validation_errors").increment(1);
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "siteId and popupId are required",
        ));
    }
    metrics::counter!("api.events_tracked").increment(1);
    state.stats.record(&request.popup_id, request.kind);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/stats/{widgetId} — aggregate counters for one widget.
pub async fn get_widget_stats(
    State(state): State<AppState>,
    Path(widget_id): Path<String>,
) -> Json<Envelope<WidgetStats>> {
    Json(Envelope {
        success: true,
        data: state.stats.for_widget(&widget_id),
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}

/// GET /health — health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /live — liveness probe.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use popreach_core::types::EventKind;
    use popreach_delivery::seed_demo_widgets;

    fn state() -> AppState {
        let catalog = Arc::new(WidgetCatalog::new());
        seed_demo_widgets(&catalog);
        AppState {
            catalog,
            leads: Arc::new(LeadStore::new()),
            stats: Arc::new(StatsStore::new()),
            start_time: Instant::now(),
        }
    }

    #[tokio::test]
    async fn test_embed_config_returns_envelope() {
        let response = get_embed_config(
            State(state()),
            Path("demo-site".into()),
            Query(EmbedQuery {
                last_variant_id: None,
            }),
        )
        .await;
        assert!(response.0.success);
        assert!(!response.0.data.is_empty());
    }

    #[tokio::test]
    async fn test_embed_config_for_unknown_site_is_empty_success() {
        let response = get_embed_config(
            State(state()),
            Path("nobody".into()),
            Query(EmbedQuery {
                last_variant_id: None,
            }),
        )
        .await;
        assert!(response.0.success);
        assert!(response.0.data.is_empty());
    }

    #[tokio::test]
    async fn test_lead_create_then_merge_status_codes() {
        let state = state();
        let (status, body) = save_lead(
            State(state.clone()),
            Json(LeadSaveRequest {
                site_id: "demo-site".into(),
                popup_id: "demo-newsletter".into(),
                email: Some("a@b.co".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = save_lead(
            State(state),
            Json(LeadSaveRequest {
                site_id: "demo-site".into(),
                popup_id: "demo-newsletter".into(),
                lead_id: Some(body.0.data.id),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_lead_save_without_site_is_rejected() {
        let result = save_lead(
            State(state()),
            Json(LeadSaveRequest {
                popup_id: "w-1".into(),
                ..Default::default()
            }),
        )
        .await;
        let (status, _) = result.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_event_tracking_feeds_stats() {
        let state = state();
        let status = track_event(
            State(state.clone()),
            Json(TrackEventRequest {
                site_id: "demo-site".into(),
                popup_id: "demo-newsletter".into(),
                kind: EventKind::View,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let stats = get_widget_stats(State(state), Path("demo-newsletter".into())).await;
        assert_eq!(stats.0.data.views, 1);
    }
}
