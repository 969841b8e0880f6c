use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::{
    account_router, AccountError, AccountService, Authenticator, ContactPreference, LoginRequest,
    ProfileUpdate, Role, SignupRequest,
};
use crate::memory::{InMemorySessionStore, InMemoryUserRepository};
use crate::repository::RepositoryError;

type MemoryAccounts = AccountService<InMemoryUserRepository, InMemorySessionStore>;

fn service() -> MemoryAccounts {
    AccountService::new(
        Arc::new(InMemoryUserRepository::default()),
        Arc::new(InMemorySessionStore::default()),
        Duration::hours(24),
    )
}

fn signup(email: &str) -> SignupRequest {
    SignupRequest {
        first_name: Some("Jordan".into()),
        last_name: Some("Reyes".into()),
        email: Some(email.into()),
        password: Some("gravel-pit-42".into()),
        phone: Some("555-0123".into()),
        zip_code: Some("66952".into()),
        company_name: Some("Reyes Excavation".into()),
        role: Some(Role::ProjectManager),
        contact_preference: None,
    }
}

fn login(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.into(),
        password: password.into(),
    }
}

#[test]
fn signup_lists_missing_fields() {
    match service().signup(SignupRequest::default()) {
        Err(AccountError::MissingFields(fields)) => assert_eq!(
            fields,
            [
                "first_name",
                "last_name",
                "email",
                "password",
                "phone",
                "zip_code",
                "company_name",
                "role"
            ]
        ),
        other => panic!("expected missing fields, got {other:?}"),
    }
}

#[test]
fn signup_normalizes_email_and_defaults_contact_preference() {
    let profile = service()
        .signup(signup("  Jordan@Example.COM "))
        .expect("signup succeeds");
    assert_eq!(profile.email, "jordan@example.com");
    assert_eq!(profile.contact_preference, ContactPreference::Email);
}

#[test]
fn signup_validates_shape() {
    let accounts = service();
    let mut weak = signup("a@example.com");
    weak.password = Some("short".into());
    assert!(matches!(accounts.signup(weak), Err(AccountError::WeakPassword)));

    let mut bad_zip = signup("b@example.com");
    bad_zip.zip_code = Some("6695".into());
    assert!(matches!(accounts.signup(bad_zip), Err(AccountError::InvalidZip)));

    assert!(matches!(
        accounts.signup(signup("not-an-email")),
        Err(AccountError::InvalidEmail)
    ));
}

#[test]
fn duplicate_email_is_rejected_ignoring_case() {
    let accounts = service();
    accounts
        .signup(signup("jordan@example.com"))
        .expect("first signup");
    assert!(matches!(
        accounts.signup(signup("JORDAN@example.com")),
        Err(AccountError::EmailTaken)
    ));
}

#[test]
fn login_issues_token_that_authenticates() {
    let accounts = service();
    let profile = accounts
        .signup(signup("jordan@example.com"))
        .expect("signup");

    let grant = accounts
        .login(login("Jordan@example.com", "gravel-pit-42"))
        .expect("login");
    assert_eq!(grant.user.id, profile.id);
    assert!(grant.expires_at > Utc::now());

    let caller = accounts.authenticate(&grant.token).expect("token valid");
    assert_eq!(caller.id, profile.id);
}

#[test]
fn wrong_password_and_unknown_user_look_the_same() {
    let accounts = service();
    accounts
        .signup(signup("jordan@example.com"))
        .expect("signup");

    assert!(matches!(
        accounts.login(login("jordan@example.com", "wrong-password")),
        Err(AccountError::InvalidCredentials)
    ));
    assert!(matches!(
        accounts.login(login("nobody@example.com", "gravel-pit-42")),
        Err(AccountError::InvalidCredentials)
    ));
}

#[test]
fn sessions_expire_after_ttl() {
    let accounts = service();
    accounts
        .signup(signup("jordan@example.com"))
        .expect("signup");
    let grant = accounts
        .login(login("jordan@example.com", "gravel-pit-42"))
        .expect("login");

    let later = grant.expires_at + Duration::seconds(1);
    assert!(matches!(
        accounts.authenticate_at(&grant.token, later),
        Err(AccountError::Unauthenticated)
    ));
}

#[test]
fn session_lifetime_past_the_calendar_fails_cleanly() {
    let accounts = AccountService::new(
        Arc::new(InMemoryUserRepository::default()),
        Arc::new(InMemorySessionStore::default()),
        Duration::hours(10_000_000_000),
    );
    accounts
        .signup(signup("jordan@example.com"))
        .expect("signup");

    assert!(matches!(
        accounts.login(login("jordan@example.com", "gravel-pit-42")),
        Err(AccountError::SessionLifetime)
    ));
}

#[test]
fn logout_revokes_the_session() {
    let accounts = service();
    accounts
        .signup(signup("jordan@example.com"))
        .expect("signup");
    let grant = accounts
        .login(login("jordan@example.com", "gravel-pit-42"))
        .expect("login");

    accounts.logout(&grant.token).expect("logout");
    assert!(matches!(
        accounts.authenticate(&grant.token),
        Err(AccountError::Unauthenticated)
    ));
    assert!(matches!(
        accounts.logout(&grant.token),
        Err(AccountError::Unauthenticated)
    ));
}

#[test]
fn profile_updates_validate_zip_and_keep_blank_fields() {
    let accounts = service();
    let profile = accounts
        .signup(signup("jordan@example.com"))
        .expect("signup");

    let invalid = ProfileUpdate {
        zip_code: Some("ABCDE".into()),
        ..ProfileUpdate::default()
    };
    assert!(matches!(
        accounts.update_profile(&profile.id, invalid),
        Err(AccountError::InvalidZip)
    ));

    let updated = accounts
        .update_profile(
            &profile.id,
            ProfileUpdate {
                first_name: Some("   ".into()),
                zip_code: Some("80202".into()),
                contact_preference: Some(ContactPreference::Text),
                ..ProfileUpdate::default()
            },
        )
        .expect("update succeeds");
    assert_eq!(updated.first_name, "Jordan");
    assert_eq!(updated.zip_code, "80202");
    assert_eq!(updated.contact_preference, ContactPreference::Text);
}

#[test]
fn unknown_profile_is_not_found() {
    let result = service().profile(&super::UserId("ghost".into()));
    assert!(matches!(
        result,
        Err(AccountError::Repository(RepositoryError::NotFound))
    ));
}

async fn send(router: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.expect("router responds");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn signup_login_and_profile_round_through_the_router() {
    let router = account_router(Arc::new(service()));
    let payload = json!({
        "first_name": "Jordan",
        "last_name": "Reyes",
        "email": "jordan@example.com",
        "password": "gravel-pit-42",
        "phone": "555-0123",
        "zip_code": "66952",
        "company_name": "Reyes Excavation",
        "role": "Site Manager",
        "contact_preference": "Phone"
    });

    let (status, body) =
        send(router.clone(), json_request("POST", "/api/signup", payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "Site Manager");
    assert!(body["user"].get("password").is_none());

    let (status, body) =
        send(router.clone(), json_request("POST", "/api/signup", payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "user already exists");

    let (status, body) = send(
        router.clone(),
        json_request(
            "POST",
            "/api/login",
            json!({ "email": "jordan@example.com", "password": "gravel-pit-42" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().expect("token").to_string();

    let (status, body) = send(
        router.clone(),
        Request::get("/api/users/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request builds"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "jordan@example.com");

    let (status, _) = send(
        router,
        Request::get("/api/users/me")
            .body(Body::empty())
            .expect("request builds"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let router = account_router(Arc::new(service()));
    let (status, body) = send(
        router,
        json_request(
            "POST",
            "/api/login",
            json!({ "email": "nobody@example.com", "password": "whatever1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid email or password");
}

#[tokio::test]
async fn malformed_bodies_are_json_bad_requests() {
    let router = account_router(Arc::new(service()));

    let (status, body) = send(router.clone(), json_request("POST", "/api/login", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some_and(|msg| msg.contains("email")));

    let (status, body) = send(
        router.clone(),
        json_request("POST", "/api/signup", json!({ "role": "Foreman" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        router.clone(),
        json_request(
            "POST",
            "/api/signup",
            json!({
                "first_name": "Jordan",
                "last_name": "Reyes",
                "email": "jordan@example.com",
                "password": "gravel-pit-42",
                "phone": "555-0123",
                "zip_code": "66952",
                "company_name": "Reyes Excavation",
                "role": "Estimator"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, grant) = send(
        router.clone(),
        json_request(
            "POST",
            "/api/login",
            json!({ "email": "jordan@example.com", "password": "gravel-pit-42" }),
        ),
    )
    .await;
    let token = grant["token"].as_str().expect("token").to_string();

    let (status, body) = send(
        router,
        Request::put("/api/users/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"zip_code\": 66952"))
            .expect("request builds"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
