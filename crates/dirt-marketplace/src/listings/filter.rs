use serde::Deserialize;

use super::domain::{Listing, ListingStatus, Material, TransactionType};

/// Raw query-string parameters accepted by the listing search endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListingQuery {
    pub status: Option<String>,
    pub material: Option<String>,
    pub quantity: Option<String>,
    pub distance: Option<String>,
    pub transaction_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("invalid status filter '{0}'")]
    InvalidStatus(String),
    #[error("invalid material filter '{0}'")]
    InvalidMaterial(String),
    #[error("invalid quantity range '{0}'")]
    InvalidQuantity(String),
    #[error("invalid distance '{0}'")]
    InvalidDistance(String),
    #[error("invalid transaction type '{0}'")]
    InvalidTransactionType(String),
}

/// Inclusive bounds on remaining quantity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum QuantityRange {
    #[default]
    Any,
    Between { min: f64, max: f64 },
    AtLeast(f64),
}

impl QuantityRange {
    /// Parses `min-max`, `min+` or `all`.
    pub fn parse(raw: &str) -> Result<Self, FilterError> {
        let trimmed = raw.trim();
        let invalid = || FilterError::InvalidQuantity(raw.to_string());
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::Any);
        }
        if let Some(min) = trimmed.strip_suffix('+') {
            let min = parse_bound(min).ok_or_else(invalid)?;
            return Ok(Self::AtLeast(min));
        }
        let (min, max) = trimmed.split_once('-').ok_or_else(invalid)?;
        let min = parse_bound(min).ok_or_else(invalid)?;
        let max = parse_bound(max).ok_or_else(invalid)?;
        if min > max {
            return Err(invalid());
        }
        Ok(Self::Between { min, max })
    }

    pub fn contains(&self, quantity: f64) -> bool {
        match *self {
            Self::Any => true,
            Self::Between { min, max } => quantity >= min && quantity <= max,
            Self::AtLeast(min) => quantity >= min,
        }
    }
}

fn parse_bound(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

/// Validated search criteria. `None` means "no constraint".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingFilter {
    pub status: Option<ListingStatus>,
    pub material: Option<Material>,
    pub quantity: QuantityRange,
    pub transaction_type: Option<TransactionType>,
    pub max_distance_miles: Option<f64>,
}

impl ListingQuery {
    /// Validates every parameter. An absent `status` falls back to
    /// `default_status`; `status=all` lifts the constraint entirely.
    pub fn parse(&self, default_status: Option<ListingStatus>) -> Result<ListingFilter, FilterError> {
        let status = match non_blank(&self.status) {
            None => default_status,
            Some(raw) if raw.eq_ignore_ascii_case("all") => None,
            Some(raw) => Some(
                raw.parse::<ListingStatus>()
                    .map_err(FilterError::InvalidStatus)?,
            ),
        };

        let material = match non_blank(&self.material) {
            None => None,
            Some(raw) if raw.eq_ignore_ascii_case("all") => None,
            Some(raw) => Some(raw.parse::<Material>().map_err(FilterError::InvalidMaterial)?),
        };

        let quantity = match non_blank(&self.quantity) {
            None => QuantityRange::Any,
            Some(raw) => QuantityRange::parse(raw)?,
        };

        let transaction_type = match non_blank(&self.transaction_type) {
            None => None,
            Some(raw) if raw.eq_ignore_ascii_case("all") => None,
            Some(raw) => Some(
                raw.parse::<TransactionType>()
                    .map_err(FilterError::InvalidTransactionType)?,
            ),
        };

        let max_distance_miles = match non_blank(&self.distance) {
            None => None,
            Some(raw) if raw.eq_ignore_ascii_case("all") => None,
            Some(raw) => Some(
                raw.parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite() && *value >= 0.0)
                    .ok_or_else(|| FilterError::InvalidDistance(raw.to_string()))?,
            ),
        };

        Ok(ListingFilter {
            status,
            material,
            quantity,
            transaction_type,
            max_distance_miles,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|raw| !raw.is_empty())
}

impl ListingFilter {
    /// Attribute match only; distance is applied once origins are known.
    /// Deleted listings only match when asked for by status.
    pub fn matches(&self, listing: &Listing) -> bool {
        self.status.map_or(listing.status != ListingStatus::Deleted, |status| {
            listing.status == status
        })
            && self.material.map_or(true, |material| listing.material == material)
            && self.quantity.contains(listing.quantity)
            && self
                .transaction_type
                .map_or(true, |kind| listing.transaction_type == kind)
    }
}
