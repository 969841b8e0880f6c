use crate::infra::{AppState, Marketplace};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json, Router};
use dirt_marketplace::accounts::account_router;
use dirt_marketplace::companies::company_router;
use dirt_marketplace::geo::Geocoder;
use dirt_marketplace::listings::listing_router;
use serde_json::json;

/// Marketplace API plus operational endpoints. Listing and company routes
/// authenticate through the account service's sessions.
pub(crate) fn with_marketplace_routes<G>(marketplace: &Marketplace<G>) -> Router
where
    G: Geocoder + 'static,
{
    account_router(marketplace.accounts.clone())
        .merge(listing_router(
            marketplace.listings.clone(),
            marketplace.accounts.clone(),
        ))
        .merge(company_router(
            marketplace.companies.clone(),
            marketplace.accounts.clone(),
        ))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
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
