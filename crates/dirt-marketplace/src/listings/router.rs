use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use serde_json::json;

use super::domain::{CompletionRequest, ListingId, ListingUpdate, NewListing, StatusChange};
use super::filter::ListingQuery;
use super::repository::ListingRepository;
use super::service::{ListingService, ListingServiceError};
use crate::accounts::{require_user, Authenticator};
use crate::geo::Geocoder;

/// Shared handler state: the listing service plus whoever vouches for tokens.
pub struct ListingEndpoints<L, G, A> {
    pub service: Arc<ListingService<L, G>>,
    pub auth: Arc<A>,
}

type Endpoints<L, G, A> = State<Arc<ListingEndpoints<L, G, A>>>;

/// Router builder exposing listing CRUD, search, completion and analytics.
pub fn listing_router<L, G, A>(service: Arc<ListingService<L, G>>, auth: Arc<A>) -> Router
where
    L: ListingRepository + 'static,
    G: Geocoder + 'static,
    A: Authenticator + 'static,
{
    let state = Arc::new(ListingEndpoints { service, auth });
    Router::new()
        .route("/api/listings", post(create_handler::<L, G, A>))
        .route("/api/listings/nearby", get(nearby_handler::<L, G, A>))
        .route("/api/listings/user", get(mine_handler::<L, G, A>))
        .route(
            "/api/listings/:listing_id",
            get(fetch_handler::<L, G, A>)
                .put(update_handler::<L, G, A>)
                .delete(delete_handler::<L, G, A>),
        )
        .route(
            "/api/listings/:listing_id/status",
            patch(status_handler::<L, G, A>),
        )
        .route(
            "/api/listings/:listing_id/complete",
            patch(complete_handler::<L, G, A>),
        )
        .route("/api/analytics", get(analytics_handler::<L, G, A>))
        .with_state(state)
}

pub fn listing_error_response(error: ListingServiceError) -> Response {
    let status = match &error {
        ListingServiceError::MissingFields(_)
        | ListingServiceError::BlankField(_)
        | ListingServiceError::InvalidQuantity
        | ListingServiceError::InvalidCoordinates
        | ListingServiceError::NotEditable(_)
        | ListingServiceError::InvalidTransition { .. }
        | ListingServiceError::UnknownLocation(_)
        | ListingServiceError::Completion(_)
        | ListingServiceError::Filter(_) => StatusCode::BAD_REQUEST,
        ListingServiceError::Forbidden => StatusCode::FORBIDDEN,
        ListingServiceError::NotFound => StatusCode::NOT_FOUND,
        ListingServiceError::Conflict => StatusCode::CONFLICT,
        ListingServiceError::Geocoder(err) => {
            tracing::error!(error = %err, "geocoder failure");
            StatusCode::BAD_GATEWAY
        }
        ListingServiceError::Repository(err) => {
            tracing::error!(error = %err, "listing repository failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = match &error {
        ListingServiceError::MissingFields(fields) => json!({
            "error": error.to_string(),
            "details": fields,
        }),
        _ => json!({ "error": error.to_string() }),
    };
    (status, axum::Json(payload)).into_response()
}

fn rejection_response(rejection: JsonRejection) -> Response {
    let payload = json!({ "error": rejection.body_text() });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

pub(crate) async fn create_handler<L, G, A>(
    State(endpoints): Endpoints<L, G, A>,
    headers: HeaderMap,
    body: Result<axum::Json<NewListing>, JsonRejection>,
) -> Response
where
    L: ListingRepository + 'static,
    G: Geocoder + 'static,
    A: Authenticator + 'static,
{
    let caller = match require_user(endpoints.auth.as_ref(), &headers) {
        Ok(profile) => profile,
        Err(response) => return response,
    };
    let axum::Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match endpoints.service.create(&caller, request).await {
        Ok(listing) => {
            (StatusCode::CREATED, axum::Json(json!({ "listing": listing }))).into_response()
        }
        Err(error) => listing_error_response(error),
    }
}

pub(crate) async fn nearby_handler<L, G, A>(
    State(endpoints): Endpoints<L, G, A>,
    headers: HeaderMap,
    Query(query): Query<ListingQuery>,
) -> Response
where
    L: ListingRepository + 'static,
    G: Geocoder + 'static,
    A: Authenticator + 'static,
{
    let caller = match require_user(endpoints.auth.as_ref(), &headers) {
        Ok(profile) => profile,
        Err(response) => return response,
    };
    match endpoints.service.nearby(&caller, &query).await {
        Ok(listings) => (StatusCode::OK, axum::Json(listings)).into_response(),
        Err(error) => listing_error_response(error),
    }
}

pub(crate) async fn mine_handler<L, G, A>(
    State(endpoints): Endpoints<L, G, A>,
    headers: HeaderMap,
    Query(query): Query<ListingQuery>,
) -> Response
where
    L: ListingRepository + 'static,
    G: Geocoder + 'static,
    A: Authenticator + 'static,
{
    let caller = match require_user(endpoints.auth.as_ref(), &headers) {
        Ok(profile) => profile,
        Err(response) => return response,
    };
    match endpoints.service.mine(&caller, &query).await {
        Ok(listings) => (StatusCode::OK, axum::Json(listings)).into_response(),
        Err(error) => listing_error_response(error),
    }
}

pub(crate) async fn fetch_handler<L, G, A>(
    State(endpoints): Endpoints<L, G, A>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
) -> Response
where
    L: ListingRepository + 'static,
    G: Geocoder + 'static,
    A: Authenticator + 'static,
{
    if let Err(response) = require_user(endpoints.auth.as_ref(), &headers) {
        return response;
    }
    match endpoints.service.get(&ListingId(listing_id)) {
        Ok(listing) => (StatusCode::OK, axum::Json(json!({ "listing": listing }))).into_response(),
        Err(error) => listing_error_response(error),
    }
}

pub(crate) async fn update_handler<L, G, A>(
    State(endpoints): Endpoints<L, G, A>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
    body: Result<axum::Json<ListingUpdate>, JsonRejection>,
) -> Response
where
    L: ListingRepository + 'static,
    G: Geocoder + 'static,
    A: Authenticator + 'static,
{
    let caller = match require_user(endpoints.auth.as_ref(), &headers) {
        Ok(profile) => profile,
        Err(response) => return response,
    };
    let axum::Json(update) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match endpoints
        .service
        .update(&caller, &ListingId(listing_id), update)
        .await
    {
        Ok(listing) => (StatusCode::OK, axum::Json(json!({ "listing": listing }))).into_response(),
        Err(error) => listing_error_response(error),
    }
}

pub(crate) async fn status_handler<L, G, A>(
    State(endpoints): Endpoints<L, G, A>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
    body: Result<axum::Json<StatusChange>, JsonRejection>,
) -> Response
where
    L: ListingRepository + 'static,
    G: Geocoder + 'static,
    A: Authenticator + 'static,
{
    let caller = match require_user(endpoints.auth.as_ref(), &headers) {
        Ok(profile) => profile,
        Err(response) => return response,
    };
    let axum::Json(change) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match endpoints
        .service
        .set_status(&caller, &ListingId(listing_id), change)
    {
        Ok(listing) => (StatusCode::OK, axum::Json(json!({ "listing": listing }))).into_response(),
        Err(error) => listing_error_response(error),
    }
}

pub(crate) async fn complete_handler<L, G, A>(
    State(endpoints): Endpoints<L, G, A>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
    body: Result<axum::Json<CompletionRequest>, JsonRejection>,
) -> Response
where
    L: ListingRepository + 'static,
    G: Geocoder + 'static,
    A: Authenticator + 'static,
{
    let caller = match require_user(endpoints.auth.as_ref(), &headers) {
        Ok(profile) => profile,
        Err(response) => return response,
    };
    let axum::Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match endpoints
        .service
        .complete(&caller, &ListingId(listing_id), request)
    {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => listing_error_response(error),
    }
}

pub(crate) async fn delete_handler<L, G, A>(
    State(endpoints): Endpoints<L, G, A>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
) -> Response
where
    L: ListingRepository + 'static,
    G: Geocoder + 'static,
    A: Authenticator + 'static,
{
    let caller = match require_user(endpoints.auth.as_ref(), &headers) {
        Ok(profile) => profile,
        Err(response) => return response,
    };
    match endpoints.service.delete(&caller, &ListingId(listing_id)) {
        Ok(listing) => (
            StatusCode::OK,
            axum::Json(json!({ "message": "listing deleted", "id": listing.id })),
        )
            .into_response(),
        Err(error) => listing_error_response(error),
    }
}

pub(crate) async fn analytics_handler<L, G, A>(
    State(endpoints): Endpoints<L, G, A>,
    headers: HeaderMap,
) -> Response
where
    L: ListingRepository + 'static,
    G: Geocoder + 'static,
    A: Authenticator + 'static,
{
    let caller = match require_user(endpoints.auth.as_ref(), &headers) {
        Ok(profile) => profile,
        Err(response) => return response,
    };
    match endpoints.service.analytics(&caller) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => listing_error_response(error),
    }
}
