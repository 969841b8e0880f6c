use super::domain::Company;
use crate::repository::RepositoryError;

/// Storage abstraction for the partner company directory.
pub trait CompanyRepository: Send + Sync {
    /// Fails with `Conflict` when a company with the same name (ignoring
    /// case) already exists.
    fn insert(&self, company: Company) -> Result<Company, RepositoryError>;
    fn list(&self) -> Result<Vec<Company>, RepositoryError>;
}
