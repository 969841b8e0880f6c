use std::cmp::Reverse;
use std::sync::Arc;

use chrono::Utc;

use super::analytics::{summarize, ListingAnalytics};
use super::completion::{apply_completion, CompletionError};
use super::domain::{
    CompletionOutcome, CompletionRequest, Listing, ListingId, ListingStatus, ListingUpdate,
    NewListing, StatusChange, TransactionType,
};
use super::filter::{FilterError, ListingQuery};
use super::repository::{ListingRepository, ListingScope};
use crate::accounts::UserProfile;
use crate::geo::{
    annotate, sort_by_distance, within, Coordinates, GeocodeError, Geocoder, WithDistance,
};
use crate::repository::RepositoryError;

/// Error raised by the listing service.
#[derive(Debug, thiserror::Error)]
pub enum ListingServiceError {
    #[error("missing required fields")]
    MissingFields(Vec<&'static str>),
    #[error("{0} cannot be blank")]
    BlankField(&'static str),
    #[error("quantity must be a positive number")]
    InvalidQuantity,
    #[error("latitude and longitude must be given together and within range")]
    InvalidCoordinates,
    #[error("listing not found")]
    NotFound,
    #[error("only the listing owner can change it")]
    Forbidden,
    #[error("{0} listings cannot be edited")]
    NotEditable(ListingStatus),
    #[error("cannot change status from {from} to {to}")]
    InvalidTransition {
        from: ListingStatus,
        to: ListingStatus,
    },
    #[error("could not locate zip code {0}")]
    UnknownLocation(String),
    #[error("listing was changed by another request; reload and retry")]
    Conflict,
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("geocoding failed: {0}")]
    Geocoder(#[from] GeocodeError),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ListingServiceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Stale { .. } => Self::Conflict,
            other => Self::Repository(other),
        }
    }
}

/// Service owning listing lifecycle, search and completion.
pub struct ListingService<L, G> {
    repository: Arc<L>,
    geocoder: Arc<G>,
}

impl<L, G> ListingService<L, G>
where
    L: ListingRepository + 'static,
    G: Geocoder + 'static,
{
    pub fn new(repository: Arc<L>, geocoder: Arc<G>) -> Self {
        Self {
            repository,
            geocoder,
        }
    }

    /// Post a new active listing for `owner`.
    pub async fn create(
        &self,
        owner: &UserProfile,
        request: NewListing,
    ) -> Result<Listing, ListingServiceError> {
        let mut missing = Vec::new();
        let site_name = trimmed(request.site_name);
        if site_name.is_none() {
            missing.push("site_name");
        }
        if request.material.is_none() {
            missing.push("material");
        }
        if request.quantity.is_none() {
            missing.push("quantity");
        }
        let address = trimmed(request.address);
        if address.is_none() {
            missing.push("address");
        }
        let (Some(site_name), Some(material), Some(quantity), Some(address)) =
            (site_name, request.material, request.quantity, address)
        else {
            return Err(ListingServiceError::MissingFields(missing));
        };
        let quantity = positive(quantity)?;

        let coordinates = match explicit_coordinates(request.latitude, request.longitude)? {
            Some(point) => Some(point),
            None => self.geocode_address(&address).await,
        };

        let now = Utc::now();
        let mut listing = Listing {
            id: ListingId::generate(),
            user_id: owner.id.clone(),
            user_name: owner.display_name(),
            user_email: owner.email.clone(),
            user_phone: Some(owner.phone.clone()).filter(|phone| !phone.is_empty()),
            site_name,
            material,
            quantity,
            quantity_moved: 0.0,
            unit: request.unit.unwrap_or_else(|| material.default_unit()),
            address,
            latitude: None,
            longitude: None,
            status: ListingStatus::Active,
            transaction_type: request.transaction_type.unwrap_or(TransactionType::Export),
            partner_company: None,
            completed_from: None,
            completed_transactions: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            version: 0,
        };
        listing.set_coordinates(coordinates);

        let stored = self.repository.insert(listing)?;
        tracing::info!(
            listing_id = %stored.id,
            material = stored.material.label(),
            "listing created"
        );
        Ok(stored)
    }

    /// Fetch a listing; deleted listings read as missing.
    pub fn get(&self, id: &ListingId) -> Result<Listing, ListingServiceError> {
        self.repository
            .fetch(id)?
            .filter(|listing| listing.status != ListingStatus::Deleted)
            .ok_or(ListingServiceError::NotFound)
    }

    fn owned(&self, actor: &UserProfile, id: &ListingId) -> Result<Listing, ListingServiceError> {
        let listing = self.get(id)?;
        if !listing.is_owned_by(&actor.id) {
            return Err(ListingServiceError::Forbidden);
        }
        Ok(listing)
    }

    /// Owner edit of an open listing. A new address without coordinates is
    /// geocoded again.
    pub async fn update(
        &self,
        actor: &UserProfile,
        id: &ListingId,
        update: ListingUpdate,
    ) -> Result<Listing, ListingServiceError> {
        let mut listing = self.owned(actor, id)?;
        if matches!(
            listing.status,
            ListingStatus::Completed | ListingStatus::Deleted
        ) {
            return Err(ListingServiceError::NotEditable(listing.status));
        }

        if let Some(site_name) = update.site_name {
            listing.site_name =
                non_blank(site_name).ok_or(ListingServiceError::BlankField("site_name"))?;
        }
        if let Some(material) = update.material {
            listing.material = material;
        }
        if let Some(quantity) = update.quantity {
            listing.quantity = positive(quantity)?;
        }
        if let Some(unit) = update.unit {
            listing.unit = unit;
        }
        if let Some(kind) = update.transaction_type {
            listing.transaction_type = kind;
        }

        let explicit = explicit_coordinates(update.latitude, update.longitude)?;
        let mut relocated = false;
        if let Some(address) = update.address {
            let address = non_blank(address).ok_or(ListingServiceError::BlankField("address"))?;
            relocated = address != listing.address;
            listing.address = address;
        }
        match explicit {
            Some(point) => listing.set_coordinates(Some(point)),
            None if relocated => {
                let point = self.geocode_address(&listing.address).await;
                listing.set_coordinates(point);
            }
            None => {}
        }

        listing.updated_at = Utc::now();
        let stored = self.repository.update(listing)?;
        tracing::info!(listing_id = %stored.id, "listing updated");
        Ok(stored)
    }

    /// Toggle between `active` and `inactive`.
    pub fn set_status(
        &self,
        actor: &UserProfile,
        id: &ListingId,
        change: StatusChange,
    ) -> Result<Listing, ListingServiceError> {
        let mut listing = self.owned(actor, id)?;
        let toggleable =
            |status: ListingStatus| matches!(status, ListingStatus::Active | ListingStatus::Inactive);
        if !toggleable(listing.status) || !toggleable(change.status) {
            return Err(ListingServiceError::InvalidTransition {
                from: listing.status,
                to: change.status,
            });
        }
        if listing.status == change.status {
            return Ok(listing);
        }

        listing.status = change.status;
        listing.updated_at = Utc::now();
        let stored = self.repository.update(listing)?;
        tracing::info!(listing_id = %stored.id, status = %stored.status, "listing status changed");
        Ok(stored)
    }

    /// Soft delete: the record stays but drops out of default searches.
    pub fn delete(&self, actor: &UserProfile, id: &ListingId) -> Result<Listing, ListingServiceError> {
        let mut listing = self.owned(actor, id)?;
        listing.status = ListingStatus::Deleted;
        listing.updated_at = Utc::now();
        let stored = self.repository.update(listing)?;
        tracing::info!(listing_id = %stored.id, "listing deleted");
        Ok(stored)
    }

    /// Record material moved to a partner, fully or partially closing the
    /// listing. The parent and any spawned record are committed together
    /// against the version that was read.
    pub fn complete(
        &self,
        actor: &UserProfile,
        id: &ListingId,
        request: CompletionRequest,
    ) -> Result<CompletionOutcome, ListingServiceError> {
        let listing = self.owned(actor, id)?;
        let quantity_moved = request
            .quantity_moved
            .ok_or(ListingServiceError::MissingFields(vec!["quantity_moved"]))?;
        let partner = request.partner_company.unwrap_or_default();

        let outcome = apply_completion(&listing, quantity_moved, &partner, Utc::now())?;
        let stored = self.repository.commit_completion(outcome)?;
        tracing::info!(
            listing_id = %stored.updated_listing.id,
            quantity_moved,
            partial = stored.new_completed_listing.is_some(),
            "listing completion recorded"
        );
        Ok(stored)
    }

    /// Other users' listings around the caller's zip, nearest first.
    /// Status defaults to `active`.
    pub async fn nearby(
        &self,
        caller: &UserProfile,
        query: &ListingQuery,
    ) -> Result<Vec<WithDistance<Listing>>, ListingServiceError> {
        let filter = query.parse(Some(ListingStatus::Active))?;
        let origin = self
            .geocoder
            .locate_postcode(&caller.zip_code)
            .await?
            .ok_or_else(|| ListingServiceError::UnknownLocation(caller.zip_code.clone()))?;

        let candidates: Vec<Listing> = self
            .repository
            .list(&ListingScope::NotOwnedBy(caller.id.clone()))?
            .into_iter()
            .filter(|listing| filter.matches(listing))
            .collect();

        let mut results = within(annotate(Some(origin), candidates), filter.max_distance_miles);
        sort_by_distance(&mut results);
        Ok(results)
    }

    /// The caller's own listings, newest first. Distances are included when
    /// the caller's zip can be located.
    pub async fn mine(
        &self,
        caller: &UserProfile,
        query: &ListingQuery,
    ) -> Result<Vec<WithDistance<Listing>>, ListingServiceError> {
        let filter = query.parse(None)?;
        let origin = match self.geocoder.locate_postcode(&caller.zip_code).await {
            Ok(origin) => origin,
            Err(error) => {
                tracing::warn!(error = %error, zip = %caller.zip_code, "zip lookup failed; omitting distances");
                None
            }
        };

        let mut owned: Vec<Listing> = self
            .repository
            .list(&ListingScope::OwnedBy(caller.id.clone()))?
            .into_iter()
            .filter(|listing| filter.matches(listing))
            .collect();
        owned.sort_by_key(|listing| Reverse(listing.created_at));

        Ok(within(annotate(origin, owned), filter.max_distance_miles))
    }

    pub fn analytics(&self, caller: &UserProfile) -> Result<ListingAnalytics, ListingServiceError> {
        let owned = self
            .repository
            .list(&ListingScope::OwnedBy(caller.id.clone()))?;
        Ok(summarize(&owned, Utc::now()))
    }

    async fn geocode_address(&self, address: &str) -> Option<Coordinates> {
        match self.geocoder.locate_address(address).await {
            Ok(Some(point)) => Some(point),
            Ok(None) => {
                tracing::warn!(address, "address could not be geocoded");
                None
            }
            Err(error) => {
                tracing::warn!(error = %error, address, "geocoding request failed");
                None
            }
        }
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.and_then(non_blank)
}

fn non_blank(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn positive(quantity: f64) -> Result<f64, ListingServiceError> {
    if quantity.is_finite() && quantity > 0.0 {
        Ok(quantity)
    } else {
        Err(ListingServiceError::InvalidQuantity)
    }
}

fn explicit_coordinates(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<Option<Coordinates>, ListingServiceError> {
    match (latitude, longitude) {
        (None, None) => Ok(None),
        (latitude, longitude) => Coordinates::from_parts(latitude, longitude)
            .map(Some)
            .ok_or(ListingServiceError::InvalidCoordinates),
    }
}
