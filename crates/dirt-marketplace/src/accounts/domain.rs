use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::credentials::PasswordHash;

/// Identifier wrapper for registered users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Job function selected at signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Project Manager")]
    ProjectManager,
    #[serde(rename = "Site Manager")]
    SiteManager,
    #[serde(rename = "Procurement Manager")]
    ProcurementManager,
    #[serde(rename = "Inventory Manager")]
    InventoryManager,
    Estimator,
    #[serde(rename = "Sustainability Officer")]
    SustainabilityOfficer,
    Other,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ProjectManager => "Project Manager",
            Self::SiteManager => "Site Manager",
            Self::ProcurementManager => "Procurement Manager",
            Self::InventoryManager => "Inventory Manager",
            Self::Estimator => "Estimator",
            Self::SustainabilityOfficer => "Sustainability Officer",
            Self::Other => "Other",
        }
    }
}

/// How a user prefers trading partners to reach them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactPreference {
    #[default]
    Email,
    Phone,
    Text,
}

/// Public profile; safe to serialize to any authenticated caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub zip_code: String,
    pub company_name: String,
    pub role: Role,
    pub contact_preference: ContactPreference,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Profile plus credentials as kept by the user repository.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub profile: UserProfile,
    pub password: PasswordHash,
}

/// Signup form. Every field is optional on the wire so missing ones can be
/// reported together.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub zip_code: Option<String>,
    pub company_name: Option<String>,
    pub role: Option<Role>,
    pub contact_preference: Option<ContactPreference>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Partial profile edit; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub zip_code: Option<String>,
    pub company_name: Option<String>,
    pub role: Option<Role>,
    pub contact_preference: Option<ContactPreference>,
}

/// Token handed back on login. Only its hash is ever stored.
#[derive(Debug, Clone, Serialize)]
pub struct SessionGrant {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

/// Stored session keyed by the SHA-256 of the bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token_hash: [u8; 32],
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub(crate) fn is_valid_zip(zip: &str) -> bool {
    zip.len() == 5 && zip.bytes().all(|b| b.is_ascii_digit())
}

pub(crate) fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
