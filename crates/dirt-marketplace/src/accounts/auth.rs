use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use super::domain::UserProfile;
use super::service::{AccountError, Authenticator};

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolves the caller or produces the 401/500 response to return instead.
pub fn require_user<A: Authenticator + ?Sized>(
    auth: &A,
    headers: &HeaderMap,
) -> Result<UserProfile, Response> {
    let Some(token) = bearer_token(headers) else {
        return Err(account_error_response(AccountError::Unauthenticated));
    };
    auth.authenticate(token).map_err(account_error_response)
}

pub fn account_error_response(error: AccountError) -> Response {
    let status = match &error {
        AccountError::MissingFields(_)
        | AccountError::InvalidEmail
        | AccountError::InvalidZip
        | AccountError::WeakPassword
        | AccountError::EmailTaken => StatusCode::BAD_REQUEST,
        AccountError::InvalidCredentials | AccountError::Unauthenticated => {
            StatusCode::UNAUTHORIZED
        }
        AccountError::Repository(crate::repository::RepositoryError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        AccountError::SessionLifetime => {
            tracing::error!("configured session lifetime overflows the clock");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        AccountError::Repository(err) => {
            tracing::error!(error = %err, "account repository failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = match &error {
        AccountError::MissingFields(fields) => json!({
            "error": error.to_string(),
            "details": fields,
        }),
        _ => json!({ "error": error.to_string() }),
    };
    (status, axum::Json(payload)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(value).expect("valid header"),
        );
        headers
    }

    #[test]
    fn extracts_bearer_tokens_case_insensitively() {
        assert_eq!(bearer_token(&headers("Bearer abc123")), Some("abc123"));
        assert_eq!(bearer_token(&headers("bearer   abc123 ")), Some("abc123"));
    }

    #[test]
    fn ignores_other_schemes_and_blank_tokens() {
        assert_eq!(bearer_token(&headers("Basic Zm9vOmJhcg==")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn missing_fields_are_listed_in_details() {
        let response =
            account_error_response(AccountError::MissingFields(vec!["email", "zip_code"]));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
