use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCategory {
    Lodging,
    Tours,
    Food,
    Marketplace,
}

impl ProviderCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            ProviderCategory::Lodging => "lodging",
            ProviderCategory::Tours => "tours",
            ProviderCategory::Food => "food",
            ProviderCategory::Marketplace => "marketplace",
        }
    }
}

impl fmt::Display for ProviderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the English keys plus the Spanish labels used in lead spreadsheets.
impl FromStr for ProviderCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "lodging" | "alojamiento" | "hospedaje" | "stay" => Ok(Self::Lodging),
            "tours" | "tour" | "turismo" => Ok(Self::Tours),
            "food" | "comida" | "gastronomía" | "gastronomia" | "restaurant" => Ok(Self::Food),
            "marketplace" | "artesanía" | "artesania" | "tienda" => Ok(Self::Marketplace),
            _ => Err(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    Manual,
    Scraped,
    Seed,
    Import,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Invited,
    Converted,
    Rejected,
}

impl LeadStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Invited => "invited",
            LeadStatus::Converted => "converted",
            LeadStatus::Rejected => "rejected",
        }
    }
}

/// A business we would like to onboard but who has no account yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderLead {
    pub id: String,
    pub business_name: String,
    pub category: ProviderCategory,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    pub source: LeadSource,
    pub status: LeadStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_id: Option<String>,
}

impl Document for ProviderLead {
    const COLLECTION: &'static str = "providerLeads";

    fn id(&self) -> &str {
        &self.id
    }

    fn seed_id(&self) -> Option<&str> {
        self.seed_id.as_deref()
    }
}

/// Lead fields supplied by a form, an import row, or a scraped page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLead {
    pub business_name: String,
    pub category: ProviderCategory,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    pub id: String,
    #[serde(default)]
    pub lead_id: Option<String>,
    /// Empty while the stay is an unclaimed mock.
    #[serde(default)]
    pub owner_id: Option<String>,
    pub name: String,
    pub stay_type: String,
    pub description: String,
    pub price_per_night: u64,
    pub location: String,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub is_mock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_id: Option<String>,
}

impl Document for Stay {
    const COLLECTION: &'static str = "stays";

    fn id(&self) -> &str {
        &self.id
    }

    fn seed_id(&self) -> Option<&str> {
        self.seed_id.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceListing {
    pub id: String,
    #[serde(default)]
    pub provider_lead_id: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    pub title: String,
    pub category: String,
    pub price: u64,
    pub stock: u32,
    pub is_mock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_id: Option<String>,
}

impl Document for MarketplaceListing {
    const COLLECTION: &'static str = "marketplaceListings";

    fn id(&self) -> &str {
        &self.id
    }

    fn seed_id(&self) -> Option<&str> {
        self.seed_id.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Redeemed,
    Expired,
    Revoked,
}

/// Single-use code letting a lead claim the mock provider seeded for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub code: String,
    pub lead_id: String,
    #[serde(default)]
    pub stay_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub redeemed_by: Option<String>,
    #[serde(default)]
    pub redeemed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_id: Option<String>,
}

impl Document for Invitation {
    const COLLECTION: &'static str = "invitations";

    fn id(&self) -> &str {
        &self.code
    }

    fn seed_id(&self) -> Option<&str> {
        self.seed_id.as_deref()
    }
}

/// Audit record written when a mock provider is claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionLog {
    pub id: String,
    pub invitation_code: String,
    pub lead_id: String,
    pub user_id: String,
    #[serde(default)]
    pub claimed_stays: Vec<String>,
    #[serde(default)]
    pub claimed_listings: Vec<String>,
    pub converted_at: DateTime<Utc>,
}

impl Document for ConversionLog {
    const COLLECTION: &'static str = "mockConversionLogs";

    fn id(&self) -> &str {
        &self.id
    }
}
