use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;

use super::credentials::{generate_token, hash_token, PasswordHash, SESSION_TOKEN_BYTES};
use super::domain::{
    is_plausible_email, is_valid_zip, LoginRequest, ProfileUpdate, SessionGrant, SessionRecord,
    SignupRequest, StoredUser, UserId, UserProfile,
};
use super::repository::{SessionStore, UserRepository};
use crate::repository::RepositoryError;

const MIN_PASSWORD_LEN: usize = 8;

/// Error raised by the account service.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("missing required fields")]
    MissingFields(Vec<&'static str>),
    #[error("invalid email address")]
    InvalidEmail,
    #[error("zip code must be five digits")]
    InvalidZip,
    #[error("password must be at least 8 characters")]
    WeakPassword,
    #[error("user already exists")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("not authenticated")]
    Unauthenticated,
    #[error("session lifetime out of range")]
    SessionLifetime,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Resolves a bearer token to the calling user. Routers outside the accounts
/// module depend on this rather than on the concrete service.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<UserProfile, AccountError>;
}

/// Service owning signup, login and profile maintenance.
pub struct AccountService<U, S> {
    users: Arc<U>,
    sessions: Arc<S>,
    session_ttl: Duration,
}

impl<U, S> AccountService<U, S>
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    pub fn new(users: Arc<U>, sessions: Arc<S>, session_ttl: Duration) -> Self {
        Self {
            users,
            sessions,
            session_ttl,
        }
    }

    /// Register a new user and return the stored profile.
    pub fn signup(&self, request: SignupRequest) -> Result<UserProfile, AccountError> {
        let mut missing = Vec::new();
        let first_name = required(request.first_name, "first_name", &mut missing);
        let last_name = required(request.last_name, "last_name", &mut missing);
        let email = required(request.email, "email", &mut missing);
        let password = request
            .password
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| {
                missing.push("password");
                String::new()
            });
        let phone = required(request.phone, "phone", &mut missing);
        let zip_code = required(request.zip_code, "zip_code", &mut missing);
        let company_name = required(request.company_name, "company_name", &mut missing);
        if request.role.is_none() {
            missing.push("role");
        }
        if !missing.is_empty() {
            return Err(AccountError::MissingFields(missing));
        }

        let email = normalize_email(&email);
        if !is_plausible_email(&email) {
            return Err(AccountError::InvalidEmail);
        }
        if !is_valid_zip(&zip_code) {
            return Err(AccountError::InvalidZip);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AccountError::WeakPassword);
        }
        if self.users.find_by_email(&email)?.is_some() {
            return Err(AccountError::EmailTaken);
        }

        let profile = UserProfile {
            id: UserId::generate(),
            first_name,
            last_name,
            email,
            phone,
            zip_code,
            company_name,
            role: request.role.unwrap_or(super::domain::Role::Other),
            contact_preference: request.contact_preference.unwrap_or_default(),
            created_at: Utc::now(),
        };
        let stored = StoredUser {
            profile,
            password: PasswordHash::new(&mut OsRng, &password),
        };

        let stored = self.users.insert(stored).map_err(|err| match err {
            RepositoryError::Conflict => AccountError::EmailTaken,
            other => AccountError::Repository(other),
        })?;
        tracing::info!(user_id = %stored.profile.id.0, "user registered");
        Ok(stored.profile)
    }

    /// Exchange credentials for a fresh session token.
    pub fn login(&self, request: LoginRequest) -> Result<SessionGrant, AccountError> {
        let email = normalize_email(&request.email);
        let user = self
            .users
            .find_by_email(&email)?
            .filter(|user| user.password.verify(&request.password))
            .ok_or(AccountError::InvalidCredentials)?;

        let token = generate_token(&mut OsRng, SESSION_TOKEN_BYTES);
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.session_ttl)
            .ok_or(AccountError::SessionLifetime)?;
        self.sessions.insert(SessionRecord {
            token_hash: hash_token(&token),
            user_id: user.profile.id.clone(),
            created_at: now,
            expires_at,
        })?;
        tracing::info!(user_id = %user.profile.id.0, %expires_at, "session opened");

        Ok(SessionGrant {
            token,
            expires_at,
            user: user.profile,
        })
    }

    pub fn logout(&self, token: &str) -> Result<(), AccountError> {
        let hash = hash_token(token);
        match self.sessions.revoke(&hash) {
            Ok(()) => {
                tracing::info!("session revoked");
                Ok(())
            }
            Err(RepositoryError::NotFound) => Err(AccountError::Unauthenticated),
            Err(other) => Err(other.into()),
        }
    }

    pub(crate) fn authenticate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, AccountError> {
        let session = self
            .sessions
            .find(&hash_token(token))?
            .filter(|session| session.expires_at > now)
            .ok_or(AccountError::Unauthenticated)?;

        self.users
            .fetch(&session.user_id)?
            .map(|user| user.profile)
            .ok_or(AccountError::Unauthenticated)
    }

    pub fn profile(&self, id: &UserId) -> Result<UserProfile, AccountError> {
        self.users
            .fetch(id)?
            .map(|user| user.profile)
            .ok_or(AccountError::Repository(RepositoryError::NotFound))
    }

    pub fn update_profile(
        &self,
        id: &UserId,
        update: ProfileUpdate,
    ) -> Result<UserProfile, AccountError> {
        let mut profile = self.profile(id)?;

        if let Some(zip) = update.zip_code.as_deref().map(str::trim) {
            if !is_valid_zip(zip) {
                return Err(AccountError::InvalidZip);
            }
            profile.zip_code = zip.to_string();
        }
        apply_text(&mut profile.first_name, update.first_name);
        apply_text(&mut profile.last_name, update.last_name);
        apply_text(&mut profile.phone, update.phone);
        apply_text(&mut profile.company_name, update.company_name);
        if let Some(role) = update.role {
            profile.role = role;
        }
        if let Some(preference) = update.contact_preference {
            profile.contact_preference = preference;
        }

        Ok(self.users.update_profile(profile)?)
    }
}

impl<U, S> Authenticator for AccountService<U, S>
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    fn authenticate(&self, token: &str) -> Result<UserProfile, AccountError> {
        self.authenticate_at(token, Utc::now())
    }
}

fn required(value: Option<String>, field: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value.map(|raw| raw.trim().to_string()) {
        Some(value) if !value.is_empty() => value,
        _ => {
            missing.push(field);
            String::new()
        }
    }
}

fn apply_text(target: &mut String, value: Option<String>) {
    if let Some(value) = value.map(|raw| raw.trim().to_string()) {
        if !value.is_empty() {
            *target = value;
        }
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
