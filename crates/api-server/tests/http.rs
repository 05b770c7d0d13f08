#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use rotator_api::{router, AppState};
use rotator_bandit::{new_bandit, StatsStore};
use rotator_catalog::models::{CreateBannerRequest, CreateSlotRequest};
use rotator_catalog::CatalogStore;
use rotator_core::config::BanditConfig;
use rotator_core::event_bus::{capture_sink, CaptureSink};
use rotator_core::types::EventType;
use rotator_core::{
    BannerId, PerformanceRecord, RotatorError, RotatorResult, SegmentId, SlotId,
};
use rotator_stats::MemoryStatsStore;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const TIMEOUT: Duration = Duration::from_secs(5);

struct Harness {
    app: Router,
    state: AppState,
    catalog: Arc<CatalogStore>,
    stats: Arc<MemoryStatsStore>,
    events: Arc<CaptureSink>,
}

/// Pure-exploit selector over fresh in-memory stores.
fn harness() -> Harness {
    let catalog = Arc::new(CatalogStore::new());
    let stats = Arc::new(MemoryStatsStore::new());
    let events = capture_sink();
    let config = BanditConfig {
        epsilon: 0.0,
        seed: Some(7),
    };
    let selector = new_bandit(&config, stats.clone(), catalog.clone());
    let state = AppState::new(selector, catalog.clone(), events.clone(), "test-node".into());
    Harness {
        app: router(state.clone(), TIMEOUT),
        state,
        catalog,
        stats,
        events,
    }
}

fn seed_slot(catalog: &CatalogStore, banners: usize) -> (SlotId, Vec<BannerId>) {
    let slot = catalog
        .create_slot(CreateSlotRequest {
            description: "homepage hero".into(),
        })
        .id;
    let ids = (0..banners)
        .map(|i| {
            let id = catalog
                .create_banner(CreateBannerRequest {
                    title: format!("banner-{i}"),
                    content: String::new(),
                    description: String::new(),
                })
                .id;
            catalog.add_banner_to_slot(id, slot).unwrap();
            id
        })
        .collect();
    (slot, ids)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn show_returns_best_banner_and_emits_impression() {
    let h = harness();
    let (slot, ids) = seed_slot(&h.catalog, 3);
    let segment = SegmentId(4);
    for _ in 0..10 {
        h.stats.record_impression(slot, ids[1], segment).await.unwrap();
    }
    h.stats.record_click(slot, ids[1], segment).await.unwrap();

    let (status, body) = send(
        &h.app,
        "POST",
        &format!("/slots/{slot}/show"),
        Some(json!({ "segment_id": 4 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["banner_id"], ids[1].0);

    let record = h.stats.get(slot, ids[1], segment).await.unwrap();
    assert_eq!(record, PerformanceRecord::new(11, 1));

    let events = h.events.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Impression);
    assert_eq!(events[0].banner_id, ids[1]);
    assert_eq!(events[0].segment_id, segment);
}

#[tokio::test]
async fn show_accepts_group_id_alias() {
    let h = harness();
    let (slot, ids) = seed_slot(&h.catalog, 1);

    let (status, body) = send(
        &h.app,
        "POST",
        &format!("/slots/{slot}/show"),
        Some(json!({ "group_id": 9 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["banner_id"], ids[0].0);
    assert_eq!(h.events.events()[0].segment_id, SegmentId(9));
}

#[tokio::test]
async fn show_on_empty_slot_is_not_found() {
    let h = harness();
    let (slot, _) = seed_slot(&h.catalog, 0);

    let (status, body) = send(
        &h.app,
        "POST",
        &format!("/slots/{slot}/show"),
        Some(json!({ "segment_id": 1 })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no_candidates");
    assert_eq!(h.events.count(), 0);
}

#[tokio::test]
async fn click_records_and_emits() {
    let h = harness();
    let (slot, ids) = seed_slot(&h.catalog, 2);

    let (status, _) = send(
        &h.app,
        "POST",
        &format!("/slots/{slot}/click"),
        Some(json!({ "banner_id": ids[0].0, "segment_id": 2 })),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(
        h.stats.get(slot, ids[0], SegmentId(2)).await.unwrap(),
        PerformanceRecord::new(0, 1)
    );
    assert_eq!(h.events.count_type(EventType::Click), 1);
}

#[tokio::test]
async fn add_and_remove_banner_in_slot() {
    let h = harness();
    let (slot, _) = seed_slot(&h.catalog, 0);
    let banner = h
        .catalog
        .create_banner(CreateBannerRequest {
            title: "spring sale".into(),
            content: String::new(),
            description: String::new(),
        })
        .id;
    let uri = format!("/slots/{slot}/banners");

    let (status, _) = send(&h.app, "POST", &uri, Some(json!({ "banner_id": banner.0 }))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(h.catalog.is_banner_in_slot(banner, slot));

    let (status, body) = send(&h.app, "POST", &uri, Some(json!({ "banner_id": banner.0 }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, body) = send(&h.app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([banner.0]));

    let remove = format!("/slots/{slot}/banners/{banner}");
    let (status, _) = send(&h.app, "DELETE", &remove, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&h.app, "DELETE", &remove, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn add_unknown_banner_is_not_found() {
    let h = harness();
    let (slot, _) = seed_slot(&h.catalog, 0);

    let (status, _) = send(
        &h.app,
        "POST",
        &format!("/slots/{slot}/banners"),
        Some(json!({ "banner_id": 404 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn banner_crud_round_trip() {
    let h = harness();

    let (status, created) = send(
        &h.app,
        "POST",
        "/banners",
        Some(json!({ "title": "autumn", "content": "<img>" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], 1);
    assert_eq!(created["description"], "");

    let (status, updated) = send(
        &h.app,
        "PUT",
        "/banners/1",
        Some(json!({ "description": "seasonal" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "autumn");
    assert_eq!(updated["description"], "seasonal");

    let (status, list) = send(&h.app, "GET", "/banners", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = send(&h.app, "DELETE", "/banners/1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&h.app, "GET", "/banners/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "banner 1 not found");

    let (status, _) = send(&h.app, "DELETE", "/banners/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_banner_title_is_rejected() {
    let h = harness();
    let (status, body) = send(&h.app, "POST", "/banners", Some(json!({ "title": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_banner");
}

#[tokio::test]
async fn slot_and_segment_crud() {
    let h = harness();

    let (status, slot) =
        send(&h.app, "POST", "/slots", Some(json!({ "description": "footer" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(slot["id"], 1);

    let (status, segment) =
        send(&h.app, "POST", "/segments", Some(json!({ "description": "students" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(segment["id"], 1);

    let (status, fetched) = send(&h.app, "GET", "/segments/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["description"], "students");

    let (status, _) = send(&h.app, "DELETE", "/slots/1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, slots) = send(&h.app, "GET", "/slots", None).await;
    assert_eq!(slots, json!([]));

    let (status, _) = send(&h.app, "PUT", "/slots/1", Some(json!({ "description": "x" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn soft_deleted_banner_leaves_rotation() {
    let h = harness();
    let (slot, ids) = seed_slot(&h.catalog, 2);
    let segment = SegmentId(1);
    // Make the first banner the leader, then retire it.
    h.stats.record_click(slot, ids[0], segment).await.unwrap();

    let (status, _) = send(&h.app, "DELETE", &format!("/banners/{}", ids[0]), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &h.app,
        "POST",
        &format!("/slots/{slot}/show"),
        Some(json!({ "segment_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["banner_id"], ids[1].0);
}

struct BrokenStats;

#[async_trait]
impl StatsStore for BrokenStats {
    async fn get(&self, _: SlotId, _: BannerId, _: SegmentId) -> RotatorResult<PerformanceRecord> {
        Err(RotatorError::Storage("connection refused".into()))
    }

    async fn record_impression(&self, _: SlotId, _: BannerId, _: SegmentId) -> RotatorResult<()> {
        Err(RotatorError::Storage("connection refused".into()))
    }

    async fn record_click(&self, _: SlotId, _: BannerId, _: SegmentId) -> RotatorResult<()> {
        Err(RotatorError::Storage("connection refused".into()))
    }
}

/// Reads never complete.
struct StalledStats;

#[async_trait]
impl StatsStore for StalledStats {
    async fn get(&self, _: SlotId, _: BannerId, _: SegmentId) -> RotatorResult<PerformanceRecord> {
        std::future::pending().await
    }

    async fn record_impression(&self, _: SlotId, _: BannerId, _: SegmentId) -> RotatorResult<()> {
        Ok(())
    }

    async fn record_click(&self, _: SlotId, _: BannerId, _: SegmentId) -> RotatorResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn slow_show_times_out() {
    let catalog = Arc::new(CatalogStore::new());
    let (slot, _) = seed_slot(&catalog, 2);
    let events = capture_sink();
    let config = BanditConfig {
        epsilon: 0.0,
        seed: Some(1),
    };
    let selector = new_bandit(&config, Arc::new(StalledStats), catalog.clone());
    let app = router(
        AppState::new(selector, catalog, events.clone(), "test-node".into()),
        Duration::from_millis(50),
    );

    let (status, _) = tokio::time::timeout(
        Duration::from_secs(2),
        send(
            &app,
            "POST",
            &format!("/slots/{slot}/show"),
            Some(json!({ "segment_id": 1 })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(events.count(), 0);
}

#[tokio::test]
async fn stats_failures_map_to_internal_error() {
    let catalog = Arc::new(CatalogStore::new());
    let (slot, ids) = seed_slot(&catalog, 2);
    let events = capture_sink();
    let config = BanditConfig {
        epsilon: 0.0,
        seed: Some(1),
    };
    let selector = new_bandit(&config, Arc::new(BrokenStats), catalog.clone());
    let app = router(
        AppState::new(selector, catalog, events.clone(), "test-node".into()),
        TIMEOUT,
    );

    let (status, body) = send(
        &app,
        "POST",
        &format!("/slots/{slot}/show"),
        Some(json!({ "segment_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "selection_failed");
    assert!(!body["message"].as_str().unwrap().contains("connection refused"));

    let (status, _) = send(
        &app,
        "POST",
        &format!("/slots/{slot}/click"),
        Some(json!({ "banner_id": ids[0].0, "segment_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(events.count(), 0);
}

#[tokio::test]
async fn operational_endpoints() {
    let h = harness();

    let (status, health) = send(&h.app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["node_id"], "test-node");

    let (status, _) = send(&h.app, "GET", "/live", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&h.app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    h.state.mark_ready();
    let (status, _) = send(&h.app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}
