//! Mutex-guarded in-memory stores. Each call holds the lock for its whole
//! duration, so every trait method is atomic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::accounts::{
    SessionRecord, SessionStore, StoredUser, UserId, UserProfile, UserRepository,
};
use crate::companies::{Company, CompanyRepository};
use crate::listings::{CompletionOutcome, Listing, ListingId, ListingRepository, ListingScope};
use crate::repository::RepositoryError;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
}

#[derive(Default, Clone)]
pub struct InMemoryListingRepository {
    records: Arc<Mutex<HashMap<ListingId, Listing>>>,
}

fn check_version(stored: &Listing, incoming: &Listing) -> Result<(), RepositoryError> {
    if stored.version == incoming.version {
        Ok(())
    } else {
        Err(RepositoryError::Stale {
            expected: incoming.version,
            found: stored.version,
        })
    }
}

impl ListingRepository for InMemoryListingRepository {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(&listing.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(listing.id.clone(), listing.clone());
        Ok(listing)
    }

    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard.get(id).cloned())
    }

    fn list(&self, scope: &ListingScope) -> Result<Vec<Listing>, RepositoryError> {
        let guard = lock(&self.records)?;
        let mut listings: Vec<Listing> = guard
            .values()
            .filter(|listing| scope.includes(listing))
            .cloned()
            .collect();
        listings.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(listings)
    }

    fn update(&self, mut listing: Listing) -> Result<Listing, RepositoryError> {
        let mut guard = lock(&self.records)?;
        let stored = guard.get(&listing.id).ok_or(RepositoryError::NotFound)?;
        check_version(stored, &listing)?;
        listing.version += 1;
        guard.insert(listing.id.clone(), listing.clone());
        Ok(listing)
    }

    fn commit_completion(
        &self,
        outcome: CompletionOutcome,
    ) -> Result<CompletionOutcome, RepositoryError> {
        let CompletionOutcome {
            mut updated_listing,
            new_completed_listing,
        } = outcome;

        let mut guard = lock(&self.records)?;
        let stored = guard
            .get(&updated_listing.id)
            .ok_or(RepositoryError::NotFound)?;
        check_version(stored, &updated_listing)?;
        if let Some(spawned) = &new_completed_listing {
            if guard.contains_key(&spawned.id) {
                return Err(RepositoryError::Conflict);
            }
        }

        updated_listing.version += 1;
        guard.insert(updated_listing.id.clone(), updated_listing.clone());
        if let Some(spawned) = &new_completed_listing {
            guard.insert(spawned.id.clone(), spawned.clone());
        }
        Ok(CompletionOutcome {
            updated_listing,
            new_completed_listing,
        })
    }
}

#[derive(Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<Mutex<HashMap<UserId, StoredUser>>>,
}

impl UserRepository for InMemoryUserRepository {
    fn insert(&self, user: StoredUser) -> Result<StoredUser, RepositoryError> {
        let mut guard = lock(&self.users)?;
        let taken = guard.contains_key(&user.profile.id)
            || guard
                .values()
                .any(|existing| existing.profile.email == user.profile.email);
        if taken {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(user.profile.id.clone(), user.clone());
        Ok(user)
    }

    fn update_profile(&self, profile: UserProfile) -> Result<UserProfile, RepositoryError> {
        let mut guard = lock(&self.users)?;
        let stored = guard.get_mut(&profile.id).ok_or(RepositoryError::NotFound)?;
        stored.profile = profile.clone();
        Ok(profile)
    }

    fn fetch(&self, id: &UserId) -> Result<Option<StoredUser>, RepositoryError> {
        let guard = lock(&self.users)?;
        Ok(guard.get(id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, RepositoryError> {
        let guard = lock(&self.users)?;
        Ok(guard
            .values()
            .find(|user| user.profile.email == email)
            .cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<[u8; 32], SessionRecord>>>,
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, session: SessionRecord) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.sessions)?;
        if guard.contains_key(&session.token_hash) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(session.token_hash, session);
        Ok(())
    }

    fn find(&self, token_hash: &[u8; 32]) -> Result<Option<SessionRecord>, RepositoryError> {
        let guard = lock(&self.sessions)?;
        Ok(guard.get(token_hash).cloned())
    }

    fn revoke(&self, token_hash: &[u8; 32]) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.sessions)?;
        guard
            .remove(token_hash)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCompanyRepository {
    companies: Arc<Mutex<Vec<Company>>>,
}

impl CompanyRepository for InMemoryCompanyRepository {
    fn insert(&self, company: Company) -> Result<Company, RepositoryError> {
        let mut guard = lock(&self.companies)?;
        let key = Company::name_key(&company.name);
        if guard
            .iter()
            .any(|existing| Company::name_key(&existing.name) == key)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.push(company.clone());
        Ok(company)
    }

    fn list(&self) -> Result<Vec<Company>, RepositoryError> {
        Ok(lock(&self.companies)?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::UserId;
    use crate::companies::CompanyId;
    use crate::listings::{apply_completion, ListingStatus, Material, TransactionType};
    use chrono::Utc;

    fn open_listing(quantity: f64) -> Listing {
        let now = Utc::now();
        Listing {
            id: ListingId::generate(),
            user_id: UserId("owner".into()),
            user_name: "Pat Owner".into(),
            user_email: "pat@example.com".into(),
            user_phone: None,
            site_name: "Quarry Road".into(),
            material: Material::Gravel,
            quantity,
            quantity_moved: 0.0,
            unit: Material::Gravel.default_unit(),
            address: "1 Quarry Rd".into(),
            latitude: None,
            longitude: None,
            status: ListingStatus::Active,
            transaction_type: TransactionType::Export,
            partner_company: None,
            completed_from: None,
            completed_transactions: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            version: 0,
        }
    }

    #[test]
    fn completions_from_the_same_snapshot_commit_once() {
        let repository = InMemoryListingRepository::default();
        let snapshot = repository.insert(open_listing(400.0)).expect("insert");
        let now = Utc::now();
        let first = apply_completion(&snapshot, 100.0, "Acme Hauling", now).expect("valid");
        let second = apply_completion(&snapshot, 50.0, "Bravo Trucking", now).expect("valid");

        let committed = repository.commit_completion(first).expect("first commit");
        assert_eq!(committed.updated_listing.version, 1);
        assert!(matches!(
            repository.commit_completion(second),
            Err(RepositoryError::Stale {
                expected: 0,
                found: 1
            })
        ));

        let parent = repository
            .fetch(&snapshot.id)
            .expect("fetch")
            .expect("parent kept");
        assert_eq!(parent.quantity, 300.0);
        assert_eq!(repository.list(&ListingScope::All).expect("list").len(), 2);
    }

    #[test]
    fn company_names_are_unique_ignoring_case() {
        let repository = InMemoryCompanyRepository::default();
        let company = |name: &str| Company {
            id: CompanyId::generate(),
            name: name.to_string(),
        };
        repository.insert(company("Acme Hauling")).expect("first insert");
        assert_eq!(
            repository.insert(company("ACME hauling")),
            Err(RepositoryError::Conflict)
        );
        assert_eq!(repository.list().expect("list").len(), 1);
    }

    #[test]
    fn revoking_an_unknown_session_is_not_found() {
        let store = InMemorySessionStore::default();
        assert_eq!(store.revoke(&[7u8; 32]), Err(RepositoryError::NotFound));
    }
}
