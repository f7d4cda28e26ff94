use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Tourist,
    Provider,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_id: Option<String>,
}

impl Document for UserAccount {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        &self.uid
    }

    fn seed_id(&self) -> Option<&str> {
        self.seed_id.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub preferred_language: String,
    /// Set once the user claims a mock provider through an invitation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_lead_id: Option<String>,
}

impl Document for UserProfile {
    const COLLECTION: &'static str = "userProfiles";

    fn id(&self) -> &str {
        &self.uid
    }
}
