//! User accounts: signup, bearer sessions and profile maintenance.

pub mod auth;
pub mod credentials;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use auth::{account_error_response, bearer_token, require_user};
pub use domain::{
    ContactPreference, LoginRequest, ProfileUpdate, Role, SessionGrant, SessionRecord,
    SignupRequest, StoredUser, UserId, UserProfile,
};
pub use repository::{SessionStore, UserRepository};
pub use router::account_router;
pub use service::{AccountError, AccountService, Authenticator};
