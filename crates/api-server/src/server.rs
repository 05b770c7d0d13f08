//! API server: HTTP REST surface plus the Prometheus exporter.

use crate::catalog_rest;
use crate::rest::{self, AppState};
use axum::routing::{delete, get, post};
use axum::Router;
use rotator_core::config::AppConfig;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the full router over `state`. Requests exceeding `request_timeout`
/// get 408 Request Timeout.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        // Rotation
        .route(
            "/slots/:slot_id/banners",
            get(catalog_rest::slot_banners).post(rest::add_banner),
        )
        .route(
            "/slots/:slot_id/banners/:banner_id",
            delete(rest::remove_banner),
        )
        .route("/slots/:slot_id/show", post(rest::show_banner))
        .route("/slots/:slot_id/click", post(rest::click_banner))
        // Catalog
        .route(
            "/banners",
            get(catalog_rest::list_banners).post(catalog_rest::create_banner),
        )
        .route(
            "/banners/:banner_id",
            get(catalog_rest::get_banner)
                .put(catalog_rest::update_banner)
                .delete(catalog_rest::delete_banner),
        )
        .route(
            "/slots",
            get(catalog_rest::list_slots).post(catalog_rest::create_slot),
        )
        .route(
            "/slots/:slot_id",
            get(catalog_rest::get_slot)
                .put(catalog_rest::update_slot)
                .delete(catalog_rest::delete_slot),
        )
        .route(
            "/segments",
            get(catalog_rest::list_segments).post(catalog_rest::create_segment),
        )
        .route(
            "/segments/:segment_id",
            get(catalog_rest::get_segment)
                .put(catalog_rest::update_segment)
                .delete(catalog_rest::delete_segment),
        )
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        // Middleware
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Serve HTTP until `shutdown` resolves, then drain in-flight requests.
    pub async fn start_http<F>(&self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(
            self.state.clone(),
            Duration::from_millis(self.config.api.request_timeout_ms),
        );

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        self.state.mark_ready();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    /// Install the Prometheus recorder and its scrape listener on `metrics.port`.
    pub fn start_metrics(&self) -> anyhow::Result<()> {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
