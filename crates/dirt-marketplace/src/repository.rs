/// Error enumeration for repository failures, shared by every aggregate store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record was modified concurrently (expected version {expected}, found {found})")]
    Stale { expected: u64, found: u64 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
