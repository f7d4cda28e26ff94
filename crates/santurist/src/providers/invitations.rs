use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::domain::{ConversionLog, Invitation, InvitationStatus, LeadStatus, Stay};
use crate::auth::{UserProfile, UserRole};
use crate::store::{RepositoryError, Store};

pub const CODE_PREFIX: &str = "ATK";

/// `ATK-{year}-{SLUG}-{NNN}`; the slug keeps ASCII alphanumerics, uppercased.
pub fn invitation_code(year: i32, slug: &str, sequence: u16) -> String {
    format!("{}{:03}", code_prefix(year, slug), sequence)
}

fn code_prefix(year: i32, slug: &str) -> String {
    let slug: String = slug
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    format!("{CODE_PREFIX}-{year}-{slug}-")
}

/// What a successful redemption claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redemption {
    pub invitation: Invitation,
    pub stay: Option<Stay>,
    pub claimed_listings: Vec<String>,
    pub conversion_log_id: String,
}

pub struct InvitationService {
    store: Store,
    /// Serializes every status change so a code is claimed at most once.
    transitions: Mutex<()>,
}

impl InvitationService {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            transitions: Mutex::new(()),
        }
    }

    fn serialized(&self) -> MutexGuard<'_, ()> {
        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Issues the next free code for the slug and marks the lead as invited.
    pub fn generate(
        &self,
        lead_id: &str,
        stay_id: Option<&str>,
        slug: &str,
        year: i32,
        ttl_days: i64,
        now: DateTime<Utc>,
    ) -> Result<Invitation, InvitationError> {
        let prefix = code_prefix(year, slug);
        if prefix.ends_with("--") {
            return Err(InvitationError::InvalidSlug(slug.to_string()));
        }
        let _guard = self.serialized();

        let mut lead = self.store.provider_leads.require(lead_id)?;
        if let Some(stay_id) = stay_id {
            self.store.stays.require(stay_id)?;
        }

        let used = self
            .store
            .invitations
            .find(&|invitation| invitation.code.starts_with(&prefix))?
            .iter()
            .filter_map(|invitation| invitation.code[prefix.len()..].parse::<u16>().ok())
            .max()
            .unwrap_or(0);
        if used >= 999 {
            return Err(InvitationError::SequenceExhausted(prefix));
        }

        let invitation = self.store.invitations.insert(Invitation {
            code: invitation_code(year, slug, used + 1),
            lead_id: lead.id.clone(),
            stay_id: stay_id.map(str::to_string),
            email: lead.email.clone(),
            status: InvitationStatus::Pending,
            created_at: now,
            expires_at: now + Duration::days(ttl_days),
            redeemed_by: None,
            redeemed_at: None,
            seed_id: None,
        })?;

        if lead.status != LeadStatus::Converted {
            lead.status = LeadStatus::Invited;
            self.store.provider_leads.update(lead)?;
        }

        info!(code = %invitation.code, lead_id, "invitation generated");
        Ok(invitation)
    }

    /// Returns a redeemable invitation. Stale pending codes are flipped to expired on read.
    pub fn validate(&self, code: &str, now: DateTime<Utc>) -> Result<Invitation, InvitationError> {
        let code = code.trim().to_ascii_uppercase();
        let mut invitation = self
            .store
            .invitations
            .fetch(&code)?
            .ok_or_else(|| InvitationError::UnknownCode(code.clone()))?;

        match invitation.status {
            InvitationStatus::Pending if now >= invitation.expires_at => {
                warn!(code = %invitation.code, "invitation expired");
                invitation.status = InvitationStatus::Expired;
                self.store.invitations.update(invitation)?;
                Err(InvitationError::Expired(code))
            }
            InvitationStatus::Pending => Ok(invitation),
            InvitationStatus::Expired => Err(InvitationError::Expired(code)),
            InvitationStatus::Redeemed => Err(InvitationError::AlreadyRedeemed(code)),
            InvitationStatus::Revoked => Err(InvitationError::Revoked(code)),
        }
    }

    /// Hands the mock provider to `uid`: stay and listings change owner, the lead converts,
    /// and the user becomes a provider.
    pub fn redeem(
        &self,
        code: &str,
        uid: &str,
        now: DateTime<Utc>,
    ) -> Result<Redemption, InvitationError> {
        let _guard = self.serialized();
        let mut invitation = self.validate(code, now)?;
        let mut user = self
            .store
            .users
            .fetch(uid)?
            .ok_or_else(|| InvitationError::UnknownUser(uid.to_string()))?;

        let stay = match invitation.stay_id.as_deref() {
            Some(stay_id) => {
                let mut stay = self.store.stays.require(stay_id)?;
                stay.owner_id = Some(uid.to_string());
                stay.is_mock = false;
                self.store.stays.update(stay.clone())?;
                Some(stay)
            }
            None => None,
        };

        let lead_id = invitation.lead_id.clone();
        let mut claimed_listings = Vec::new();
        for mut listing in self
            .store
            .marketplace_listings
            .find(&|listing| listing.provider_lead_id.as_deref() == Some(lead_id.as_str()))?
        {
            listing.owner_id = Some(uid.to_string());
            listing.is_mock = false;
            claimed_listings.push(listing.id.clone());
            self.store.marketplace_listings.update(listing)?;
        }

        let mut lead = self.store.provider_leads.require(&lead_id)?;
        lead.status = LeadStatus::Converted;
        self.store.provider_leads.update(lead)?;

        invitation.status = InvitationStatus::Redeemed;
        invitation.redeemed_by = Some(uid.to_string());
        invitation.redeemed_at = Some(now);
        self.store.invitations.update(invitation.clone())?;

        let log = self.store.conversion_logs.insert(ConversionLog {
            id: Uuid::new_v4().to_string(),
            invitation_code: invitation.code.clone(),
            lead_id: lead_id.clone(),
            user_id: uid.to_string(),
            claimed_stays: stay.iter().map(|stay| stay.id.clone()).collect(),
            claimed_listings: claimed_listings.clone(),
            converted_at: now,
        })?;

        if user.role == UserRole::Tourist {
            user.role = UserRole::Provider;
            self.store.users.update(user)?;
        }
        let mut profile = self.store.user_profiles.fetch(uid)?.unwrap_or(UserProfile {
            uid: uid.to_string(),
            phone: None,
            preferred_language: "es".to_string(),
            provider_lead_id: None,
        });
        profile.provider_lead_id = Some(lead_id);
        self.store.user_profiles.upsert(profile)?;

        info!(code = %invitation.code, uid, listings = claimed_listings.len(), "mock provider claimed");
        Ok(Redemption {
            invitation,
            stay,
            claimed_listings,
            conversion_log_id: log.id,
        })
    }

    pub fn revoke(&self, code: &str) -> Result<Invitation, InvitationError> {
        let code = code.trim().to_ascii_uppercase();
        let _guard = self.serialized();
        let mut invitation = self
            .store
            .invitations
            .fetch(&code)?
            .ok_or_else(|| InvitationError::UnknownCode(code.clone()))?;
        if invitation.status == InvitationStatus::Redeemed {
            return Err(InvitationError::AlreadyRedeemed(code));
        }
        invitation.status = InvitationStatus::Revoked;
        self.store.invitations.update(invitation.clone())?;
        Ok(invitation)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InvitationError {
    #[error("invitation code {0} does not exist")]
    UnknownCode(String),
    #[error("invitation code {0} has expired")]
    Expired(String),
    #[error("invitation code {0} was already redeemed")]
    AlreadyRedeemed(String),
    #[error("invitation code {0} was revoked")]
    Revoked(String),
    #[error("slug '{0}' has no usable characters")]
    InvalidSlug(String),
    #[error("no invitation codes left for {0}")]
    SequenceExhausted(String),
    #[error("user {0} must sign up before redeeming")]
    UnknownUser(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
