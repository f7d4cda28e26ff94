use crate::infra::{AppState, Services};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use santurist::auth::auth_router;
use santurist::bookings::tour_router;
use santurist::cart::cart_router;
use santurist::onboarding::onboarding_router;
use santurist::payments::payment_router;
use santurist::providers::provider_router;
use santurist::seeds::admin_router;
use serde_json::json;

/// Every domain router plus the operational endpoints.
pub(crate) fn with_domain_routes(services: &Services) -> Router {
    Router::new()
        .merge(auth_router(services.auth.clone()))
        .merge(tour_router(services.tour_state()))
        .merge(payment_router(services.payment_state()))
        .merge(cart_router(services.carts.clone()))
        .merge(provider_router(services.provider_state()))
        .merge(onboarding_router(services.onboarding.clone()))
        .merge(admin_router(services.admin_state()))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
