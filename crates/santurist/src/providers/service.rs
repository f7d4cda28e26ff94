use std::io::Read;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::domain::{LeadSource, LeadStatus, NewLead, ProviderLead};
use super::import::{parse_leads, ParsedRow, RejectedRow};
use crate::onboarding::{OnboardingError, OnboardingProgress, OnboardingService, OnboardingStep};
use crate::store::{RepositoryError, Store};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub created: Vec<String>,
    pub duplicates: Vec<String>,
    pub rejected: Vec<RejectedRow>,
}

/// Lead pipeline plus the provider-side hook into onboarding progress.
pub struct ProviderService {
    store: Store,
    onboarding: OnboardingService,
}

impl ProviderService {
    pub fn new(store: Store) -> Self {
        Self {
            onboarding: OnboardingService::new(store.clone()),
            store,
        }
    }

    pub fn create_lead(
        &self,
        lead: NewLead,
        source: LeadSource,
        now: DateTime<Utc>,
    ) -> Result<ProviderLead, ProviderError> {
        self.create_lead_with_id(Uuid::new_v4().to_string(), lead, source, None, now)
    }

    /// Used by seeds, which need stable ids and a seed tag.
    pub fn create_lead_with_id(
        &self,
        id: String,
        lead: NewLead,
        source: LeadSource,
        seed_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ProviderLead, ProviderError> {
        let business_name = lead.business_name.trim().to_string();
        if business_name.is_empty() {
            return Err(ProviderError::InvalidLead("business name is required"));
        }
        let email = clean(lead.email).map(|email| email.to_ascii_lowercase());
        if email.as_deref().is_some_and(|email| !email.contains('@')) {
            return Err(ProviderError::InvalidLead("email must be a valid address"));
        }

        if let Some(existing) = self.find_duplicate(&business_name, email.as_deref())? {
            return Err(ProviderError::DuplicateLead {
                existing_id: existing.id,
            });
        }

        let lead = self.store.provider_leads.insert(ProviderLead {
            id,
            business_name,
            category: lead.category,
            contact_name: clean(lead.contact_name),
            email,
            phone: clean(lead.phone),
            website: clean(lead.website),
            source,
            status: LeadStatus::New,
            notes: clean(lead.notes),
            created_at: now,
            seed_id,
        })?;
        info!(lead_id = %lead.id, business = %lead.business_name, ?source, "provider lead created");
        Ok(lead)
    }

    pub fn get_lead(&self, lead_id: &str) -> Result<ProviderLead, ProviderError> {
        Ok(self.store.provider_leads.require(lead_id)?)
    }

    /// Oldest first, optionally filtered by status.
    pub fn list_leads(&self, status: Option<LeadStatus>) -> Result<Vec<ProviderLead>, ProviderError> {
        let mut leads = self
            .store
            .provider_leads
            .find(&|lead| status.map_or(true, |status| lead.status == status))?;
        leads.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.business_name.cmp(&b.business_name))
        });
        Ok(leads)
    }

    /// Converted leads are final; every other move is allowed.
    pub fn update_lead_status(
        &self,
        lead_id: &str,
        status: LeadStatus,
    ) -> Result<ProviderLead, ProviderError> {
        let mut lead = self.store.provider_leads.require(lead_id)?;
        if lead.status == LeadStatus::Converted && status != LeadStatus::Converted {
            return Err(ProviderError::InvalidStatusChange {
                from: lead.status,
                to: status,
            });
        }
        lead.status = status;
        self.store.provider_leads.update(lead.clone())?;
        Ok(lead)
    }

    pub fn import_csv<R: Read>(&self, reader: R, now: DateTime<Utc>) -> Result<ImportReport, ProviderError> {
        let mut report = ImportReport::default();

        for row in parse_leads(reader)? {
            match row {
                ParsedRow::Lead { line, lead } => {
                    let name = lead.business_name.clone();
                    match self.create_lead(lead, LeadSource::Import, now) {
                        Ok(created) => report.created.push(created.id),
                        Err(ProviderError::DuplicateLead { .. }) => report.duplicates.push(name),
                        Err(ProviderError::InvalidLead(reason)) => {
                            report.rejected.push(RejectedRow {
                                line,
                                reason: format!("{name}: {reason}"),
                            })
                        }
                        Err(other) => return Err(other),
                    }
                }
                ParsedRow::Rejected(rejected) => report.rejected.push(rejected),
            }
        }

        info!(
            created = report.created.len(),
            duplicates = report.duplicates.len(),
            rejected = report.rejected.len(),
            "provider lead import finished"
        );
        Ok(report)
    }

    pub fn update_onboarding_progress(
        &self,
        uid: &str,
        step: OnboardingStep,
        now: DateTime<Utc>,
    ) -> Result<OnboardingProgress, ProviderError> {
        Ok(self.onboarding.complete_step(uid, step, now)?)
    }

    fn find_duplicate(
        &self,
        business_name: &str,
        email: Option<&str>,
    ) -> Result<Option<ProviderLead>, RepositoryError> {
        let name = business_name.to_lowercase();
        let mut matches = self.store.provider_leads.find(&|lead| {
            lead.business_name.to_lowercase() == name
                || (email.is_some() && lead.email.as_deref() == email)
        })?;
        Ok(matches.pop())
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("invalid lead: {0}")]
    InvalidLead(&'static str),
    #[error("lead already exists ({existing_id})")]
    DuplicateLead { existing_id: String },
    #[error("lead cannot move from {} to {}", from.as_str(), to.as_str())]
    InvalidStatusChange { from: LeadStatus, to: LeadStatus },
    #[error("lead import failed: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Onboarding(#[from] OnboardingError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
