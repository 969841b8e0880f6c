use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::UserId;
use crate::geo::{Coordinates, Located};

/// Identifier wrapper for posted listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub String);

impl ListingId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Material {
    Topsoil,
    #[serde(rename = "Structural Fill")]
    StructuralFill,
    #[serde(rename = "Crushed Rock")]
    CrushedRock,
    Gravel,
    Sand,
    Concrete,
}

impl Material {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Topsoil,
            Self::StructuralFill,
            Self::CrushedRock,
            Self::Gravel,
            Self::Sand,
            Self::Concrete,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Topsoil => "Topsoil",
            Self::StructuralFill => "Structural Fill",
            Self::CrushedRock => "Crushed Rock",
            Self::Gravel => "Gravel",
            Self::Sand => "Sand",
            Self::Concrete => "Concrete",
        }
    }

    /// Topsoil trades by volume and structural fill by weight.
    pub const fn default_unit(self) -> MeasurementUnit {
        match self {
            Self::StructuralFill => MeasurementUnit::Tons,
            _ => MeasurementUnit::CubicYards,
        }
    }
}

impl FromStr for Material {
    type Err = String;

    /// Accepts display names as well as snake/kebab spellings, ignoring case.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self::ordered()
            .into_iter()
            .find(|material| {
                material
                    .label()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .map(|c| c.to_ascii_lowercase())
                    .eq(wanted.chars())
            })
            .ok_or_else(|| raw.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasurementUnit {
    #[serde(rename = "Cubic Yards")]
    CubicYards,
    Tons,
}

impl MeasurementUnit {
    pub const fn label(self) -> &'static str {
        match self {
            Self::CubicYards => "Cubic Yards",
            Self::Tons => "Tons",
        }
    }
}

/// Whether the poster needs material brought in or hauled away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Import,
    Export,
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "import" => Ok(Self::Import),
            "export" => Ok(Self::Export),
            _ => Err(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Completed,
    Inactive,
    Deleted,
}

impl ListingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Inactive => "inactive",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ListingStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "inactive" => Ok(Self::Inactive),
            "deleted" => Ok(Self::Deleted),
            _ => Err(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    Full,
    Partial,
}

/// One recorded hand-off of material against a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTransaction {
    pub id: String,
    pub quantity_moved: f64,
    pub partner_company: String,
    pub kind: CompletionKind,
    pub created_at: DateTime<Utc>,
}

/// A posted offer of material at a site.
///
/// `quantity` is what remains available; `quantity_moved` only grows when the
/// listing itself is closed out, so summing it across listings never counts
/// a load twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_phone: Option<String>,
    pub site_name: String,
    pub material: Material,
    pub quantity: f64,
    pub quantity_moved: f64,
    pub unit: MeasurementUnit,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: ListingStatus,
    pub transaction_type: TransactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_from: Option<ListingId>,
    #[serde(default)]
    pub completed_transactions: Vec<CompletedTransaction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl Listing {
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.user_id == user
    }

    pub fn set_coordinates(&mut self, at: Option<Coordinates>) {
        self.latitude = at.map(|point| point.latitude);
        self.longitude = at.map(|point| point.longitude);
    }
}

impl Located for Listing {
    fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }
}

/// Create-listing form. Fields are optional on the wire so that every missing
/// one can be reported at once.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewListing {
    pub site_name: Option<String>,
    pub material: Option<Material>,
    pub quantity: Option<f64>,
    pub unit: Option<MeasurementUnit>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub transaction_type: Option<TransactionType>,
}

/// Owner edit; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListingUpdate {
    pub site_name: Option<String>,
    pub material: Option<Material>,
    pub quantity: Option<f64>,
    pub unit: Option<MeasurementUnit>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub transaction_type: Option<TransactionType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: ListingStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompletionRequest {
    pub quantity_moved: Option<f64>,
    pub partner_company: Option<String>,
}

/// Result of a completion: the parent as stored, plus the record spawned for
/// a partial hand-off.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionOutcome {
    pub updated_listing: Listing,
    pub new_completed_listing: Option<Listing>,
}
