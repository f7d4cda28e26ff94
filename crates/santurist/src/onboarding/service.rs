use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::domain::{OnboardingDraft, OnboardingProgress, OnboardingStep};
use crate::store::{RepositoryError, Store};

/// Draft and progress as the wizard loads them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnboardingState {
    pub draft: Option<OnboardingDraft>,
    pub progress: Option<OnboardingProgress>,
    pub percent: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    InSync,
    Resynced { revision: u64 },
    MissingDraft,
}

#[derive(Clone)]
pub struct OnboardingService {
    store: Store,
}

impl OnboardingService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn update_draft(
        &self,
        uid: &str,
        step: OnboardingStep,
        value: Value,
        now: DateTime<Utc>,
    ) -> Result<OnboardingDraft, OnboardingError> {
        let Value::Object(fields) = value else {
            return Err(OnboardingError::InvalidDraft(step));
        };

        let mut draft = match self.store.onboarding_drafts.fetch(uid)? {
            Some(draft) => draft,
            None => {
                // Revisions stay monotonic across a cleared draft.
                let mut draft = OnboardingDraft::new(uid, now);
                draft.revision = self
                    .store
                    .onboarding_progress
                    .fetch(uid)?
                    .map_or(0, |progress| progress.synced_revision);
                draft
            }
        };
        draft.merge(step, fields, now);
        self.store.onboarding_drafts.upsert(draft.clone())?;
        Ok(draft)
    }

    /// Marks a step done and pins progress to the current draft revision.
    pub fn complete_step(
        &self,
        uid: &str,
        step: OnboardingStep,
        now: DateTime<Utc>,
    ) -> Result<OnboardingProgress, OnboardingError> {
        let revision = self
            .store
            .onboarding_drafts
            .fetch(uid)?
            .map_or(0, |draft| draft.revision);

        let mut progress = self.load_progress(uid, now)?;
        progress.record(step);
        progress.synced_revision = revision;
        progress.updated_at = now;
        self.store.onboarding_progress.upsert(progress.clone())?;

        info!(uid, %step, percent = progress.percent(), "onboarding step completed");
        Ok(progress)
    }

    /// Brings progress up to the draft when the draft was written after the last sync.
    pub fn reconcile(&self, uid: &str, now: DateTime<Utc>) -> Result<ReconcileOutcome, OnboardingError> {
        let Some(draft) = self.store.onboarding_drafts.fetch(uid)? else {
            return Ok(ReconcileOutcome::MissingDraft);
        };

        let mut progress = self.load_progress(uid, now)?;
        if progress.synced_revision >= draft.revision {
            return Ok(ReconcileOutcome::InSync);
        }

        warn!(
            uid,
            draft_revision = draft.revision,
            synced_revision = progress.synced_revision,
            "onboarding progress behind draft, resyncing"
        );
        progress.completed_steps.retain(|step| draft.data.contains_key(step));
        progress.current_step = progress
            .next_incomplete()
            .unwrap_or(OnboardingStep::Review);
        progress.synced_revision = draft.revision;
        progress.updated_at = now;
        self.store.onboarding_progress.upsert(progress)?;

        Ok(ReconcileOutcome::Resynced {
            revision: draft.revision,
        })
    }

    pub fn state(&self, uid: &str) -> Result<OnboardingState, OnboardingError> {
        let draft = self.store.onboarding_drafts.fetch(uid)?;
        let progress = self.store.onboarding_progress.fetch(uid)?;
        let percent = progress.as_ref().map_or(0, OnboardingProgress::percent);
        Ok(OnboardingState {
            draft,
            progress,
            percent,
        })
    }

    pub fn progress_percent(&self, uid: &str) -> Result<u8, OnboardingError> {
        Ok(self
            .store
            .onboarding_progress
            .fetch(uid)?
            .map_or(0, |progress| progress.percent()))
    }

    /// Drops the draft after final submission. Returns whether one existed.
    pub fn clear_draft(&self, uid: &str) -> Result<bool, OnboardingError> {
        Ok(self.store.onboarding_drafts.delete(uid)?)
    }

    fn load_progress(&self, uid: &str, now: DateTime<Utc>) -> Result<OnboardingProgress, OnboardingError> {
        Ok(self
            .store
            .onboarding_progress
            .fetch(uid)?
            .unwrap_or_else(|| OnboardingProgress::new(uid, now)))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("draft for step {0} must be a JSON object")]
    InvalidDraft(OnboardingStep),
    #[error("unknown onboarding step '{0}'")]
    UnknownStep(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
