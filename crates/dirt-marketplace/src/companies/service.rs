use std::sync::Arc;

use super::domain::{Company, CompanyId, NewCompany};
use super::repository::CompanyRepository;
use crate::repository::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum CompanyError {
    #[error("company name is required")]
    BlankName,
    #[error("company already exists")]
    Duplicate,
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CompanyError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict => Self::Duplicate,
            other => Self::Repository(other),
        }
    }
}

pub struct CompanyService<C> {
    repository: Arc<C>,
}

impl<C> CompanyService<C>
where
    C: CompanyRepository + 'static,
{
    pub fn new(repository: Arc<C>) -> Self {
        Self { repository }
    }

    /// All companies ordered by name, ignoring case.
    pub fn list(&self) -> Result<Vec<Company>, CompanyError> {
        let mut companies = self.repository.list()?;
        companies.sort_by_cached_key(|company| Company::name_key(&company.name));
        Ok(companies)
    }

    pub fn create(&self, request: NewCompany) -> Result<Company, CompanyError> {
        let name = request
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or(CompanyError::BlankName)?;

        let stored = self.repository.insert(Company {
            id: CompanyId::generate(),
            name,
        })?;
        tracing::info!(company = %stored.name, "company added");
        Ok(stored)
    }
}
