//! Forward geocoding for zip codes and street addresses.
//!
//! - `MapboxGeocoder` talks to the Mapbox Places API and memoizes answers.
//! - `StaticGeocoder` serves a fixed table for tests, demos and offline runs.
//! - `ConfiguredGeocoder` picks one of the two from `GeocoderConfig`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, Url};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

use super::distance::Coordinates;
use crate::config::GeocoderConfig;

const USER_AGENT: &str = concat!("dirt-marketplace/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("base URL cannot carry a path: {0}")]
    InvalidBaseUrl(String),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("empty geocoding query")]
    EmptyQuery,
}

/// Resolves zip codes and addresses to coordinates. `Ok(None)` means the
/// provider answered but found nothing.
pub trait Geocoder: Send + Sync {
    fn locate_postcode(
        &self,
        zip: &str,
    ) -> impl Future<Output = Result<Option<Coordinates>, GeocodeError>> + Send;

    fn locate_address(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<Coordinates>, GeocodeError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum QueryKind {
    Postcode,
    Address,
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    features: Vec<PlaceFeature>,
}

#[derive(Debug, Deserialize)]
struct PlaceFeature {
    // Mapbox orders the pair as [longitude, latitude].
    center: [f64; 2],
}

impl PlacesResponse {
    fn first_center(&self) -> Option<Coordinates> {
        self.features
            .first()
            .map(|feature| Coordinates::new(feature.center[1], feature.center[0]))
            .filter(Coordinates::is_valid)
    }
}

const CACHE_CAPACITY: usize = 4096;
const CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

type CacheKey = (QueryKind, String);

/// Answers (including misses) kept for `CACHE_TTL`. When full, expired
/// entries go first, then the oldest one.
#[derive(Debug, Default)]
struct LookupCache {
    entries: HashMap<CacheKey, (Option<Coordinates>, Instant)>,
}

impl LookupCache {
    fn get(&self, key: &CacheKey, now: Instant) -> Option<Option<Coordinates>> {
        self.entries
            .get(key)
            .filter(|(_, stored_at)| now.duration_since(*stored_at) < CACHE_TTL)
            .map(|(found, _)| *found)
    }

    fn insert(&mut self, key: CacheKey, found: Option<Coordinates>, now: Instant) {
        if self.entries.len() >= CACHE_CAPACITY && !self.entries.contains_key(&key) {
            self.entries
                .retain(|_, (_, stored_at)| now.duration_since(*stored_at) < CACHE_TTL);
            if self.entries.len() >= CACHE_CAPACITY {
                let oldest = self
                    .entries
                    .iter()
                    .min_by_key(|(_, (_, stored_at))| *stored_at)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    self.entries.remove(&oldest);
                }
            }
        }
        self.entries.insert(key, (found, now));
    }
}

#[derive(Clone)]
pub struct MapboxGeocoder {
    http: Client,
    base_url: Url,
    access_token: String,
    cache: Arc<Mutex<LookupCache>>,
}

impl MapboxGeocoder {
    pub fn new(
        base_url: &str,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(GeocodeError::InvalidBaseUrl(base_url.to_string()));
        }
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            access_token: access_token.into(),
            cache: Arc::new(Mutex::new(LookupCache::default())),
        })
    }

    fn request_url(&self, query: &str, kind: QueryKind) -> Result<Url, GeocodeError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GeocodeError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend([
                "geocoding",
                "v5",
                "mapbox.places",
                &format!("{query}.json"),
            ]);

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("access_token", &self.access_token)
                .append_pair("country", "US")
                .append_pair("limit", "1");
            if kind == QueryKind::Postcode {
                pairs.append_pair("types", "postcode");
            }
        }

        Ok(url)
    }

    async fn lookup(
        &self,
        query: String,
        kind: QueryKind,
    ) -> Result<Option<Coordinates>, GeocodeError> {
        if query.is_empty() {
            return Err(GeocodeError::EmptyQuery);
        }

        let key = (kind, query.to_ascii_lowercase());
        if let Some(hit) = self.cache.lock().await.get(&key, Instant::now()) {
            return Ok(hit);
        }

        let url = self.request_url(&query, kind)?;
        let body: PlacesResponse = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let found = body.first_center();

        if found.is_none() {
            tracing::debug!(?kind, query = %query, "mapbox returned no features");
        }
        self.cache.lock().await.insert(key, found, Instant::now());
        Ok(found)
    }
}

impl Geocoder for MapboxGeocoder {
    fn locate_postcode(
        &self,
        zip: &str,
    ) -> impl Future<Output = Result<Option<Coordinates>, GeocodeError>> + Send {
        self.lookup(zip.trim().to_string(), QueryKind::Postcode)
    }

    fn locate_address(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<Coordinates>, GeocodeError>> + Send {
        self.lookup(address.trim().to_string(), QueryKind::Address)
    }
}

/// Fixed lookup table keyed by zip code or lower-cased address.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    postcodes: HashMap<String, Coordinates>,
    addresses: HashMap<String, Coordinates>,
}

impl StaticGeocoder {
    pub fn with_postcode(mut self, zip: &str, at: Coordinates) -> Self {
        self.postcodes.insert(zip.trim().to_string(), at);
        self
    }

    pub fn with_address(mut self, address: &str, at: Coordinates) -> Self {
        self.addresses
            .insert(address.trim().to_ascii_lowercase(), at);
        self
    }

    /// A handful of central-US zip centroids, enough for demos and local runs.
    pub fn central_us() -> Self {
        Self::default()
            .with_postcode("66952", Coordinates::new(39.8097, -98.5556))
            .with_postcode("67601", Coordinates::new(38.8792, -99.3268))
            .with_postcode("68102", Coordinates::new(41.2587, -95.9378))
            .with_postcode("64105", Coordinates::new(39.1024, -94.5986))
            .with_postcode("73102", Coordinates::new(35.4720, -97.5210))
            .with_postcode("80202", Coordinates::new(39.7525, -104.9995))
    }
}

impl Geocoder for StaticGeocoder {
    fn locate_postcode(
        &self,
        zip: &str,
    ) -> impl Future<Output = Result<Option<Coordinates>, GeocodeError>> + Send {
        std::future::ready(Ok(self.postcodes.get(zip.trim()).copied()))
    }

    fn locate_address(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<Coordinates>, GeocodeError>> + Send {
        let key = address.trim().to_ascii_lowercase();
        std::future::ready(Ok(self.addresses.get(&key).copied()))
    }
}

/// Runtime choice between the live provider and the static table.
#[derive(Clone)]
pub enum ConfiguredGeocoder {
    Mapbox(MapboxGeocoder),
    Static(StaticGeocoder),
}

impl ConfiguredGeocoder {
    pub fn from_config(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        match &config.access_token {
            Some(token) => Ok(Self::Mapbox(MapboxGeocoder::new(
                &config.base_url,
                token.clone(),
                config.timeout,
            )?)),
            None => Ok(Self::Static(StaticGeocoder::central_us())),
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            Self::Mapbox(_) => "mapbox",
            Self::Static(_) => "static",
        }
    }
}

impl Geocoder for ConfiguredGeocoder {
    fn locate_postcode(
        &self,
        zip: &str,
    ) -> impl Future<Output = Result<Option<Coordinates>, GeocodeError>> + Send {
        async move {
            match self {
                Self::Mapbox(inner) => inner.locate_postcode(zip).await,
                Self::Static(inner) => inner.locate_postcode(zip).await,
            }
        }
    }

    fn locate_address(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<Coordinates>, GeocodeError>> + Send {
        async move {
            match self {
                Self::Mapbox(inner) => inner.locate_address(address).await,
                Self::Static(inner) => inner.locate_address(address).await,
            }
        }
    }
}
