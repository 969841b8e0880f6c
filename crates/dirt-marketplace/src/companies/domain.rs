use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub String);

impl CompanyId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// A trading partner users can pick when closing out a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
}

impl Company {
    /// Key used for the case-insensitive uniqueness check.
    pub fn name_key(name: &str) -> String {
        name.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewCompany {
    pub name: Option<String>,
}
