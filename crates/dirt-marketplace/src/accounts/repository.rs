use super::domain::{SessionRecord, StoredUser, UserId, UserProfile};
use crate::repository::RepositoryError;

/// Storage abstraction for user profiles and their credentials.
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    fn insert(&self, user: StoredUser) -> Result<StoredUser, RepositoryError>;
    fn update_profile(&self, profile: UserProfile) -> Result<UserProfile, RepositoryError>;
    fn fetch(&self, id: &UserId) -> Result<Option<StoredUser>, RepositoryError>;
    /// Lookup by normalized (trimmed, lower-cased) email.
    fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, RepositoryError>;
}

/// Session persistence keyed by token hash.
pub trait SessionStore: Send + Sync {
    fn insert(&self, session: SessionRecord) -> Result<(), RepositoryError>;
    fn find(&self, token_hash: &[u8; 32]) -> Result<Option<SessionRecord>, RepositoryError>;
    fn revoke(&self, token_hash: &[u8; 32]) -> Result<(), RepositoryError>;
}
