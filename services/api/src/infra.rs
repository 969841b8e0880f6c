use chrono::Duration;
use dirt_marketplace::accounts::AccountService;
use dirt_marketplace::companies::CompanyService;
use dirt_marketplace::geo::{Coordinates, Geocoder};
use dirt_marketplace::listings::ListingService;
use dirt_marketplace::memory::{
    InMemoryCompanyRepository, InMemoryListingRepository, InMemorySessionStore,
    InMemoryUserRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type Accounts = AccountService<InMemoryUserRepository, InMemorySessionStore>;
pub(crate) type Listings<G> = ListingService<InMemoryListingRepository, G>;
pub(crate) type Companies = CompanyService<InMemoryCompanyRepository>;

/// The three services wired over in-memory stores.
pub(crate) struct Marketplace<G> {
    pub(crate) accounts: Arc<Accounts>,
    pub(crate) listings: Arc<Listings<G>>,
    pub(crate) companies: Arc<Companies>,
}

impl<G> Marketplace<G>
where
    G: Geocoder + 'static,
{
    pub(crate) fn in_memory(geocoder: G, session_ttl: Duration) -> Self {
        let accounts = Arc::new(AccountService::new(
            Arc::new(InMemoryUserRepository::default()),
            Arc::new(InMemorySessionStore::default()),
            session_ttl,
        ));
        let listings = Arc::new(ListingService::new(
            Arc::new(InMemoryListingRepository::default()),
            Arc::new(geocoder),
        ));
        let companies = Arc::new(CompanyService::new(Arc::new(
            InMemoryCompanyRepository::default(),
        )));
        Self {
            accounts,
            listings,
            companies,
        }
    }
}

/// Parses `LAT,LON` in decimal degrees.
pub(crate) fn parse_coordinates(raw: &str) -> Result<Coordinates, String> {
    let (lat, lon) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON but got '{raw}'"))?;
    let latitude = lat
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid latitude '{lat}' ({err})"))?;
    let longitude = lon
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid longitude '{lon}' ({err})"))?;
    let point = Coordinates::new(latitude, longitude);
    if point.is_valid() {
        Ok(point)
    } else {
        Err(format!("coordinates out of range: '{raw}'"))
    }
}
