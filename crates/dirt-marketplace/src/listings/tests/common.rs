use std::collections::HashMap;
use std::sync::Arc;

use axum::body::to_bytes;
use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::accounts::{AccountError, Authenticator, ContactPreference, Role, UserId, UserProfile};
use crate::geo::{Coordinates, MapboxGeocoder, StaticGeocoder};
use crate::listings::{
    CompletionOutcome, Listing, ListingId, ListingRepository, ListingScope, ListingService,
    Material, NewListing, TransactionType,
};
use crate::memory::InMemoryListingRepository;
use crate::repository::RepositoryError;

pub(super) const HAYS: Coordinates = Coordinates::new(38.8792, -99.3268);
pub(super) const KANSAS_CITY: Coordinates = Coordinates::new(39.1024, -94.5986);
pub(super) const DENVER: Coordinates = Coordinates::new(39.7525, -104.9995);

pub(super) type MemoryService = ListingService<InMemoryListingRepository, StaticGeocoder>;

pub(super) fn profile(id: &str, zip: &str) -> UserProfile {
    UserProfile {
        id: UserId(id.to_string()),
        first_name: "Casey".to_string(),
        last_name: id.to_string(),
        email: format!("{id}@example.com"),
        phone: "555-0100".to_string(),
        zip_code: zip.to_string(),
        company_name: "Prairie Earthworks".to_string(),
        role: Role::SiteManager,
        contact_preference: ContactPreference::Email,
        created_at: Utc::now(),
    }
}

pub(super) fn seller() -> UserProfile {
    profile("seller", "67601")
}

pub(super) fn buyer() -> UserProfile {
    profile("buyer", "66952")
}

pub(super) fn geocoder() -> StaticGeocoder {
    StaticGeocoder::central_us().with_address("401 Main St, Hays, KS", HAYS)
}

/// Mapbox client aimed at a local port nobody listens on, so every lookup
/// fails in transport.
pub(super) fn unreachable_geocoder() -> MapboxGeocoder {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .expect("free local port")
        .port();
    MapboxGeocoder::new(
        &format!("http://127.0.0.1:{port}"),
        "pk.test",
        std::time::Duration::from_secs(2),
    )
    .expect("client builds")
}

pub(super) fn offline_service() -> Arc<ListingService<InMemoryListingRepository, MapboxGeocoder>> {
    Arc::new(ListingService::new(
        Arc::new(InMemoryListingRepository::default()),
        Arc::new(unreachable_geocoder()),
    ))
}

pub(super) fn build_service() -> (Arc<MemoryService>, Arc<InMemoryListingRepository>) {
    let repository = Arc::new(InMemoryListingRepository::default());
    let service = Arc::new(ListingService::new(repository.clone(), Arc::new(geocoder())));
    (service, repository)
}

pub(super) fn new_listing(site: &str, quantity: f64, at: Option<Coordinates>) -> NewListing {
    NewListing {
        site_name: Some(site.to_string()),
        material: Some(Material::Topsoil),
        quantity: Some(quantity),
        unit: None,
        address: Some(format!("{site} yard")),
        latitude: at.map(|point| point.latitude),
        longitude: at.map(|point| point.longitude),
        transaction_type: Some(TransactionType::Export),
    }
}

pub(super) async fn post(
    service: &MemoryService,
    owner: &UserProfile,
    request: NewListing,
) -> Listing {
    service
        .create(owner, request)
        .await
        .expect("listing is created")
}

/// Resolves fixed tokens to fixed profiles.
#[derive(Default)]
pub(super) struct TokenTable {
    tokens: HashMap<String, UserProfile>,
}

impl TokenTable {
    pub(super) fn with(mut self, token: &str, profile: UserProfile) -> Self {
        self.tokens.insert(token.to_string(), profile);
        self
    }
}

impl Authenticator for TokenTable {
    fn authenticate(&self, token: &str) -> Result<UserProfile, AccountError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AccountError::Unauthenticated)
    }
}

/// Reads like the in-memory store but rejects every completion as stale, as
/// if another request had committed first.
#[derive(Default)]
pub(super) struct RacingRepository {
    pub(super) inner: InMemoryListingRepository,
}

impl ListingRepository for RacingRepository {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError> {
        self.inner.insert(listing)
    }

    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list(&self, scope: &ListingScope) -> Result<Vec<Listing>, RepositoryError> {
        self.inner.list(scope)
    }

    fn update(&self, listing: Listing) -> Result<Listing, RepositoryError> {
        self.inner.update(listing)
    }

    fn commit_completion(
        &self,
        outcome: CompletionOutcome,
    ) -> Result<CompletionOutcome, RepositoryError> {
        Err(RepositoryError::Stale {
            expected: outcome.updated_listing.version,
            found: outcome.updated_listing.version + 1,
        })
    }
}

pub(super) struct UnavailableRepository;

impl ListingRepository for UnavailableRepository {
    fn insert(&self, _listing: Listing) -> Result<Listing, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".into()))
    }

    fn fetch(&self, _id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".into()))
    }

    fn list(&self, _scope: &ListingScope) -> Result<Vec<Listing>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".into()))
    }

    fn update(&self, _listing: Listing) -> Result<Listing, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".into()))
    }

    fn commit_completion(
        &self,
        _outcome: CompletionOutcome,
    ) -> Result<CompletionOutcome, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".into()))
    }
}

pub(super) async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}
