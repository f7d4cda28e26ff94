use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    BusinessInfo,
    Services,
    Media,
    Payments,
    Review,
}

impl OnboardingStep {
    pub const ALL: [OnboardingStep; 5] = [
        OnboardingStep::BusinessInfo,
        OnboardingStep::Services,
        OnboardingStep::Media,
        OnboardingStep::Payments,
        OnboardingStep::Review,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            OnboardingStep::BusinessInfo => "business_info",
            OnboardingStep::Services => "services",
            OnboardingStep::Media => "media",
            OnboardingStep::Payments => "payments",
            OnboardingStep::Review => "review",
        }
    }
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts both `business_info` and the wizard's `businessInfo` spelling.
impl FromStr for OnboardingStep {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        OnboardingStep::ALL
            .into_iter()
            .find(|step| step.as_str().replace('_', "") == normalized)
            .ok_or_else(|| value.to_string())
    }
}

/// Wizard form state, one JSON object per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingDraft {
    pub uid: String,
    #[serde(default)]
    pub data: BTreeMap<OnboardingStep, Map<String, Value>>,
    /// Bumped on every draft write.
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

impl OnboardingDraft {
    pub fn new(uid: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            uid: uid.into(),
            data: BTreeMap::new(),
            revision: 0,
            updated_at: now,
        }
    }

    /// Shallow merge: keys in `fields` replace keys of the same step, other keys and steps stay.
    pub fn merge(&mut self, step: OnboardingStep, fields: Map<String, Value>, now: DateTime<Utc>) {
        self.data.entry(step).or_default().extend(fields);
        self.revision += 1;
        self.updated_at = now;
    }
}

impl Document for OnboardingDraft {
    const COLLECTION: &'static str = "onboardingDrafts";

    fn id(&self) -> &str {
        &self.uid
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingProgress {
    pub uid: String,
    #[serde(default)]
    pub completed_steps: Vec<OnboardingStep>,
    pub current_step: OnboardingStep,
    /// Draft revision this progress was last written against.
    pub synced_revision: u64,
    pub updated_at: DateTime<Utc>,
}

impl OnboardingProgress {
    pub fn new(uid: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            uid: uid.into(),
            completed_steps: Vec::new(),
            current_step: OnboardingStep::BusinessInfo,
            synced_revision: 0,
            updated_at: now,
        }
    }

    pub fn record(&mut self, step: OnboardingStep) {
        if !self.completed_steps.contains(&step) {
            self.completed_steps.push(step);
            self.completed_steps.sort();
        }
        self.current_step = self.next_incomplete().unwrap_or(OnboardingStep::Review);
    }

    pub fn next_incomplete(&self) -> Option<OnboardingStep> {
        OnboardingStep::ALL
            .into_iter()
            .find(|step| !self.completed_steps.contains(step))
    }

    pub fn is_complete(&self) -> bool {
        self.next_incomplete().is_none()
    }

    /// Completed steps out of five, rounded down.
    pub fn percent(&self) -> u8 {
        (self.completed_steps.len() * 100 / OnboardingStep::ALL.len()) as u8
    }
}

impl Document for OnboardingProgress {
    const COLLECTION: &'static str = "onboardingProgress";

    fn id(&self) -> &str {
        &self.uid
    }
}
