//! REST handlers for banner rotation and operational endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rotator_bandit::{BannerSelector, SelectionError};
use rotator_catalog::CatalogStore;
use rotator_core::event_bus::EventSink;
use rotator_core::types::BannerEvent;
use rotator_core::{BannerId, RotatorError, SegmentId, SlotId};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub selector: Arc<dyn BannerSelector>,
    pub catalog: Arc<CatalogStore>,
    pub events: Arc<dyn EventSink>,
    pub node_id: String,
    pub start_time: Instant,
    ready: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(
        selector: Arc<dyn BannerSelector>,
        catalog: Arc<CatalogStore>,
        events: Arc<dyn EventSink>,
        node_id: String,
    ) -> Self {
        Self {
            selector,
            catalog,
            events,
            node_id,
            start_time: Instant::now(),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flip the readiness probe to 200. Set once the listener is bound.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, error: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.into(),
        }),
    )
}

/// Map a catalog error onto a status code. Internal details stay in the logs.
pub(crate) fn catalog_error(e: RotatorError, endpoint: &'static str) -> ApiError {
    match e {
        RotatorError::NotFound { .. } => {
            api_error(StatusCode::NOT_FOUND, "not_found", e.to_string())
        }
        RotatorError::Conflict(msg) => api_error(StatusCode::CONFLICT, "conflict", msg),
        other => {
            error!(error = %other, endpoint, "Catalog operation failed");
            metrics::counter!("api.errors", "endpoint" => endpoint).increment(1);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal processing error",
            )
        }
    }
}

fn selection_error(e: SelectionError, endpoint: &'static str) -> ApiError {
    match e {
        SelectionError::NoCandidates { slot } => {
            debug!(slot = %slot, "No banners to rotate");
            api_error(StatusCode::NOT_FOUND, "no_candidates", e.to_string())
        }
        SelectionError::Cancelled => {
            warn!(endpoint, "Selection cancelled");
            api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "cancelled",
                "Selection was cancelled",
            )
        }
        SelectionError::Lookup(_) | SelectionError::Accounting(_) => {
            error!(error = %e, kind = e.kind(), endpoint, "Selection failed");
            metrics::counter!("api.errors", "endpoint" => endpoint).increment(1);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "selection_failed",
                "Internal processing error",
            )
        }
    }
}

// ─── Rotation ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddBannerRequest {
    pub banner_id: BannerId,
}

#[derive(Debug, Deserialize)]
pub struct ShowRequest {
    #[serde(alias = "group_id")]
    pub segment_id: SegmentId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShowResponse {
    pub banner_id: BannerId,
}

#[derive(Debug, Deserialize)]
pub struct ClickRequest {
    pub banner_id: BannerId,
    #[serde(alias = "group_id")]
    pub segment_id: SegmentId,
}

/// POST /slots/:slot_id/banners: Put a banner into rotation in a slot.
pub async fn add_banner(
    State(state): State<AppState>,
    Path(slot_id): Path<SlotId>,
    Json(request): Json<AddBannerRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog
        .add_banner_to_slot(request.banner_id, slot_id)
        .map_err(|e| catalog_error(e, "add_banner"))?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /slots/:slot_id/banners/:banner_id: Take a banner out of rotation.
pub async fn remove_banner(
    State(state): State<AppState>,
    Path((slot_id, banner_id)): Path<(SlotId, BannerId)>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog
        .remove_banner_from_slot(banner_id, slot_id)
        .map_err(|e| catalog_error(e, "remove_banner"))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /slots/:slot_id/show: Pick a banner for the segment and count the impression.
pub async fn show_banner(
    State(state): State<AppState>,
    Path(slot_id): Path<SlotId>,
    Json(request): Json<ShowRequest>,
) -> Result<Json<ShowResponse>, ApiError> {
    let banner_id = state
        .selector
        .select(slot_id, request.segment_id)
        .await
        .map_err(|e| selection_error(e, "show_banner"))?;

    state
        .events
        .emit(BannerEvent::impression(slot_id, banner_id, request.segment_id));

    Ok(Json(ShowResponse { banner_id }))
}

/// POST /slots/:slot_id/click: Count a click on a shown banner.
pub async fn click_banner(
    State(state): State<AppState>,
    Path(slot_id): Path<SlotId>,
    Json(request): Json<ClickRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .selector
        .record_click(slot_id, request.banner_id, request.segment_id)
        .await
        .map_err(|e| selection_error(e, "click_banner"))?;

    state.events.emit(BannerEvent::click(
        slot_id,
        request.banner_id,
        request.segment_id,
    ));

    Ok(StatusCode::NO_CONTENT)
}

// ─── Operational ───────────────────────────────────────────────────────────

/// GET /health: Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready: Readiness probe for Kubernetes.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /live: Liveness probe for Kubernetes.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}
