use super::domain::{CompletionOutcome, Listing, ListingId};
use crate::accounts::UserId;
use crate::repository::RepositoryError;

/// Which owners a listing scan should cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingScope {
    All,
    OwnedBy(UserId),
    NotOwnedBy(UserId),
}

impl ListingScope {
    pub fn includes(&self, listing: &Listing) -> bool {
        match self {
            Self::All => true,
            Self::OwnedBy(owner) => listing.is_owned_by(owner),
            Self::NotOwnedBy(owner) => !listing.is_owned_by(owner),
        }
    }
}

/// Storage abstraction for listings.
///
/// Writes are guarded by `Listing::version`: `update` and `commit_completion`
/// only succeed when the stored version equals the one on the incoming
/// record, and they bump it on success.
pub trait ListingRepository: Send + Sync {
    /// Fails with `Conflict` when the id is already taken.
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError>;
    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError>;
    fn list(&self, scope: &ListingScope) -> Result<Vec<Listing>, RepositoryError>;
    /// Fails with `NotFound` or `Stale`.
    fn update(&self, listing: Listing) -> Result<Listing, RepositoryError>;
    /// Stores the updated parent and the optional spawned record as one unit;
    /// neither is visible unless both are written.
    fn commit_completion(
        &self,
        outcome: CompletionOutcome,
    ) -> Result<CompletionOutcome, RepositoryError>;
}
