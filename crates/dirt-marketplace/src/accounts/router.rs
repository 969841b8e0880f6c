use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::auth::{account_error_response, bearer_token, require_user};
use super::domain::{LoginRequest, ProfileUpdate, SignupRequest};
use super::repository::{SessionStore, UserRepository};
use super::service::{AccountError, AccountService};

/// Router builder exposing signup, session and profile endpoints.
pub fn account_router<U, S>(service: Arc<AccountService<U, S>>) -> Router
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    Router::new()
        .route("/api/signup", post(signup_handler::<U, S>))
        .route("/api/login", post(login_handler::<U, S>))
        .route("/api/logout", post(logout_handler::<U, S>))
        .route(
            "/api/users/me",
            get(profile_handler::<U, S>).put(update_profile_handler::<U, S>),
        )
        .with_state(service)
}

fn rejection_response(rejection: JsonRejection) -> Response {
    let payload = json!({ "error": rejection.body_text() });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

pub(crate) async fn signup_handler<U, S>(
    State(service): State<Arc<AccountService<U, S>>>,
    body: Result<axum::Json<SignupRequest>, JsonRejection>,
) -> Response
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let axum::Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match service.signup(request) {
        Ok(profile) => (StatusCode::CREATED, axum::Json(json!({ "user": profile }))).into_response(),
        Err(error) => account_error_response(error),
    }
}

pub(crate) async fn login_handler<U, S>(
    State(service): State<Arc<AccountService<U, S>>>,
    body: Result<axum::Json<LoginRequest>, JsonRejection>,
) -> Response
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let axum::Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match service.login(request) {
        Ok(grant) => (StatusCode::OK, axum::Json(grant)).into_response(),
        Err(error) => account_error_response(error),
    }
}

pub(crate) async fn logout_handler<U, S>(
    State(service): State<Arc<AccountService<U, S>>>,
    headers: HeaderMap,
) -> Response
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let Some(token) = bearer_token(&headers) else {
        return account_error_response(AccountError::Unauthenticated);
    };
    match service.logout(token) {
        Ok(()) => (StatusCode::OK, axum::Json(json!({ "message": "logged out" }))).into_response(),
        Err(error) => account_error_response(error),
    }
}

pub(crate) async fn profile_handler<U, S>(
    State(service): State<Arc<AccountService<U, S>>>,
    headers: HeaderMap,
) -> Response
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    match require_user(service.as_ref(), &headers) {
        Ok(profile) => (StatusCode::OK, axum::Json(profile)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn update_profile_handler<U, S>(
    State(service): State<Arc<AccountService<U, S>>>,
    headers: HeaderMap,
    body: Result<axum::Json<ProfileUpdate>, JsonRejection>,
) -> Response
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let caller = match require_user(service.as_ref(), &headers) {
        Ok(profile) => profile,
        Err(response) => return response,
    };
    let axum::Json(update) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match service.update_profile(&caller.id, update) {
        Ok(profile) => (StatusCode::OK, axum::Json(profile)).into_response(),
        Err(error) => account_error_response(error),
    }
}
