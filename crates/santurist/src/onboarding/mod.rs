//! Provider onboarding wizard: server-side drafts, step progress, and their reconciliation.

pub mod domain;
pub mod router;
pub mod service;

pub use domain::{OnboardingDraft, OnboardingProgress, OnboardingStep};
pub use router::onboarding_router;
pub use service::{OnboardingError, OnboardingService, OnboardingState, ReconcileOutcome};
