//! Catalog CRUD endpoints for banners, slots and segments.
//! `DELETE` soft-deletes; the row disappears from reads and rotation.

use crate::rest::{api_error, catalog_error, ApiError, AppState};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rotator_catalog::models::*;
use rotator_core::{BannerId, SegmentId, SlotId};

fn missing(entity: &str, id: i64) -> ApiError {
    api_error(
        StatusCode::NOT_FOUND,
        "not_found",
        format!("{entity} {id} not found"),
    )
}

// ─── Banners ───────────────────────────────────────────────────────────────

/// GET /banners
pub async fn list_banners(State(state): State<AppState>) -> Json<Vec<Banner>> {
    Json(state.catalog.list_banners())
}

/// POST /banners
pub async fn create_banner(
    State(state): State<AppState>,
    Json(request): Json<CreateBannerRequest>,
) -> Result<(StatusCode, Json<Banner>), ApiError> {
    if request.title.trim().is_empty() {
        metrics::counter!("api.validation_errors").increment(1);
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "invalid_banner",
            "banner 'title' must not be empty",
        ));
    }
    let banner = state.catalog.create_banner(request);
    Ok((StatusCode::CREATED, Json(banner)))
}

/// GET /banners/:banner_id
pub async fn get_banner(
    State(state): State<AppState>,
    Path(id): Path<BannerId>,
) -> Result<Json<Banner>, ApiError> {
    state
        .catalog
        .get_banner(id)
        .map(Json)
        .ok_or_else(|| missing("banner", id.0))
}

/// PUT /banners/:banner_id
pub async fn update_banner(
    State(state): State<AppState>,
    Path(id): Path<BannerId>,
    Json(request): Json<UpdateBannerRequest>,
) -> Result<Json<Banner>, ApiError> {
    state
        .catalog
        .update_banner(id, request)
        .map(Json)
        .map_err(|e| catalog_error(e, "update_banner"))
}

/// DELETE /banners/:banner_id
pub async fn delete_banner(
    State(state): State<AppState>,
    Path(id): Path<BannerId>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog
        .soft_delete_banner(id)
        .map_err(|e| catalog_error(e, "delete_banner"))?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Slots ─────────────────────────────────────────────────────────────────

/// GET /slots
pub async fn list_slots(State(state): State<AppState>) -> Json<Vec<Slot>> {
    Json(state.catalog.list_slots())
}

/// POST /slots
pub async fn create_slot(
    State(state): State<AppState>,
    Json(request): Json<CreateSlotRequest>,
) -> (StatusCode, Json<Slot>) {
    (StatusCode::CREATED, Json(state.catalog.create_slot(request)))
}

/// GET /slots/:slot_id
pub async fn get_slot(
    State(state): State<AppState>,
    Path(id): Path<SlotId>,
) -> Result<Json<Slot>, ApiError> {
    state
        .catalog
        .get_slot(id)
        .map(Json)
        .ok_or_else(|| missing("slot", id.0))
}

/// PUT /slots/:slot_id
pub async fn update_slot(
    State(state): State<AppState>,
    Path(id): Path<SlotId>,
    Json(request): Json<UpdateSlotRequest>,
) -> Result<Json<Slot>, ApiError> {
    state
        .catalog
        .update_slot(id, request)
        .map(Json)
        .map_err(|e| catalog_error(e, "update_slot"))
}

/// DELETE /slots/:slot_id
pub async fn delete_slot(
    State(state): State<AppState>,
    Path(id): Path<SlotId>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog
        .soft_delete_slot(id)
        .map_err(|e| catalog_error(e, "delete_slot"))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /slots/:slot_id/banners: Banners linked to the slot, in link order.
pub async fn slot_banners(
    State(state): State<AppState>,
    Path(id): Path<SlotId>,
) -> Result<Json<Vec<BannerId>>, ApiError> {
    if state.catalog.get_slot(id).is_none() {
        return Err(missing("slot", id.0));
    }
    Ok(Json(state.catalog.banners_in_slot(id)))
}

// ─── Segments ──────────────────────────────────────────────────────────────

/// GET /segments
pub async fn list_segments(State(state): State<AppState>) -> Json<Vec<Segment>> {
    Json(state.catalog.list_segments())
}

/// POST /segments
pub async fn create_segment(
    State(state): State<AppState>,
    Json(request): Json<CreateSegmentRequest>,
) -> (StatusCode, Json<Segment>) {
    (StatusCode::CREATED, Json(state.catalog.create_segment(request)))
}

/// GET /segments/:segment_id
pub async fn get_segment(
    State(state): State<AppState>,
    Path(id): Path<SegmentId>,
) -> Result<Json<Segment>, ApiError> {
    state
        .catalog
        .get_segment(id)
        .map(Json)
        .ok_or_else(|| missing("segment", id.0))
}

/// PUT /segments/:segment_id
pub async fn update_segment(
    State(state): State<AppState>,
    Path(id): Path<SegmentId>,
    Json(request): Json<UpdateSegmentRequest>,
) -> Result<Json<Segment>, ApiError> {
    state
        .catalog
        .update_segment(id, request)
        .map(Json)
        .map_err(|e| catalog_error(e, "update_segment"))
}

/// DELETE /segments/:segment_id
pub async fn delete_segment(
    State(state): State<AppState>,
    Path(id): Path<SegmentId>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog
        .soft_delete_segment(id)
        .map_err(|e| catalog_error(e, "delete_segment"))?;
    Ok(StatusCode::NO_CONTENT)
}
