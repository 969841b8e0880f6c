use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;

use super::domain::NewCompany;
use super::repository::CompanyRepository;
use super::service::{CompanyError, CompanyService};
use crate::accounts::{require_user, Authenticator};

pub struct CompanyEndpoints<C, A> {
    pub service: Arc<CompanyService<C>>,
    pub auth: Arc<A>,
}

/// Router builder for the partner company directory.
pub fn company_router<C, A>(service: Arc<CompanyService<C>>, auth: Arc<A>) -> Router
where
    C: CompanyRepository + 'static,
    A: Authenticator + 'static,
{
    Router::new()
        .route(
            "/api/companies",
            get(list_handler::<C, A>).post(create_handler::<C, A>),
        )
        .with_state(Arc::new(CompanyEndpoints { service, auth }))
}

pub fn company_error_response(error: CompanyError) -> Response {
    let status = match &error {
        CompanyError::BlankName | CompanyError::Duplicate => StatusCode::BAD_REQUEST,
        CompanyError::Repository(err) => {
            tracing::error!(error = %err, "company repository failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, axum::Json(json!({ "error": error.to_string() }))).into_response()
}

pub(crate) async fn list_handler<C, A>(
    State(endpoints): State<Arc<CompanyEndpoints<C, A>>>,
    headers: HeaderMap,
) -> Response
where
    C: CompanyRepository + 'static,
    A: Authenticator + 'static,
{
    if let Err(response) = require_user(endpoints.auth.as_ref(), &headers) {
        return response;
    }
    match endpoints.service.list() {
        Ok(companies) => (StatusCode::OK, axum::Json(companies)).into_response(),
        Err(error) => company_error_response(error),
    }
}

pub(crate) async fn create_handler<C, A>(
    State(endpoints): State<Arc<CompanyEndpoints<C, A>>>,
    headers: HeaderMap,
    body: Result<axum::Json<NewCompany>, JsonRejection>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: Authenticator + 'static,
{
    if let Err(response) = require_user(endpoints.auth.as_ref(), &headers) {
        return response;
    }
    let request = match body {
        Ok(axum::Json(request)) => request,
        Err(rejection) => {
            let payload = json!({ "error": rejection.body_text() });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
    };
    match endpoints.service.create(request) {
        Ok(company) => (StatusCode::CREATED, axum::Json(company)).into_response(),
        Err(error) => company_error_response(error),
    }
}
