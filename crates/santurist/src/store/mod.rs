//! Document store abstraction shaped after the marketplace collections.
//!
//! Every persisted entity implements [`Document`] so services can stay generic over the
//! backing storage. The in-memory implementation backs the HTTP service and the tests;
//! [`StoreSnapshot`] serializes the collections for seed files.

mod memory;
mod snapshot;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::{UserAccount, UserProfile};
use crate::bookings::TourBooking;
use crate::cart::{Cart, Order};
use crate::onboarding::{OnboardingDraft, OnboardingProgress};
use crate::providers::{ConversionLog, Invitation, MarketplaceListing, ProviderLead, Stay};
use crate::tours::{Tour, TourInstance};

pub use memory::InMemoryRepository;
pub use snapshot::StoreSnapshot;

/// A record stored in a named collection.
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    /// Seed tag used to clean up fixtures; `None` for organic data.
    fn seed_id(&self) -> Option<&str> {
        None
    }
}

/// Storage abstraction so services can be exercised in isolation.
pub trait Repository<T: Document>: Send + Sync {
    fn insert(&self, document: T) -> Result<T, RepositoryError>;
    fn update(&self, document: T) -> Result<(), RepositoryError>;
    fn upsert(&self, document: T) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &str) -> Result<Option<T>, RepositoryError>;
    fn delete(&self, id: &str) -> Result<bool, RepositoryError>;
    fn list(&self) -> Result<Vec<T>, RepositoryError>;

    fn find(&self, predicate: &dyn Fn(&T) -> bool) -> Result<Vec<T>, RepositoryError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|document| predicate(document))
            .collect())
    }

    fn require(&self, id: &str) -> Result<T, RepositoryError> {
        self.fetch(id)?.ok_or_else(|| RepositoryError::NotFound {
            collection: T::COLLECTION,
            id: id.to_string(),
        })
    }

    /// Removes seeded documents, either for one seed or for all of them.
    fn delete_seeded(&self, seed_id: Option<&str>) -> Result<usize, RepositoryError> {
        let targets = self.find(&|document| match (document.seed_id(), seed_id) {
            (Some(tag), Some(wanted)) => tag == wanted,
            (Some(_), None) => true,
            (None, _) => false,
        })?;

        let mut removed = 0;
        for document in targets {
            if self.delete(document.id())? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("{collection}/{id} already exists")]
    Conflict { collection: &'static str, id: String },
    #[error("{collection}/{id} not found")]
    NotFound { collection: &'static str, id: String },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Handles to every collection used by the marketplace.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn Repository<UserAccount>>,
    pub user_profiles: Arc<dyn Repository<UserProfile>>,
    pub provider_leads: Arc<dyn Repository<ProviderLead>>,
    pub invitations: Arc<dyn Repository<Invitation>>,
    pub stays: Arc<dyn Repository<Stay>>,
    pub marketplace_listings: Arc<dyn Repository<MarketplaceListing>>,
    pub tours: Arc<dyn Repository<Tour>>,
    pub tour_instances: Arc<dyn Repository<TourInstance>>,
    pub tour_bookings: Arc<dyn Repository<TourBooking>>,
    pub carts: Arc<dyn Repository<Cart>>,
    pub orders: Arc<dyn Repository<Order>>,
    pub onboarding_drafts: Arc<dyn Repository<OnboardingDraft>>,
    pub onboarding_progress: Arc<dyn Repository<OnboardingProgress>>,
    pub conversion_logs: Arc<dyn Repository<ConversionLog>>,
}

impl Store {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryRepository::default()),
            user_profiles: Arc::new(InMemoryRepository::default()),
            provider_leads: Arc::new(InMemoryRepository::default()),
            invitations: Arc::new(InMemoryRepository::default()),
            stays: Arc::new(InMemoryRepository::default()),
            marketplace_listings: Arc::new(InMemoryRepository::default()),
            tours: Arc::new(InMemoryRepository::default()),
            tour_instances: Arc::new(InMemoryRepository::default()),
            tour_bookings: Arc::new(InMemoryRepository::default()),
            carts: Arc::new(InMemoryRepository::default()),
            orders: Arc::new(InMemoryRepository::default()),
            onboarding_drafts: Arc::new(InMemoryRepository::default()),
            onboarding_progress: Arc::new(InMemoryRepository::default()),
            conversion_logs: Arc::new(InMemoryRepository::default()),
        }
    }

    /// Removes seeded documents from every seedable collection.
    pub fn delete_seeded(&self, seed_id: Option<&str>) -> Result<CleanupReport, RepositoryError> {
        let mut removed = BTreeMap::new();
        let mut record = |collection: &str, count: usize| {
            if count > 0 {
                removed.insert(collection.to_string(), count);
            }
        };

        record(
            ProviderLead::COLLECTION,
            self.provider_leads.delete_seeded(seed_id)?,
        );
        record(Invitation::COLLECTION, self.invitations.delete_seeded(seed_id)?);
        record(Stay::COLLECTION, self.stays.delete_seeded(seed_id)?);
        record(
            MarketplaceListing::COLLECTION,
            self.marketplace_listings.delete_seeded(seed_id)?,
        );
        record(Tour::COLLECTION, self.tours.delete_seeded(seed_id)?);
        record(
            TourInstance::COLLECTION,
            self.tour_instances.delete_seeded(seed_id)?,
        );
        record(UserAccount::COLLECTION, self.users.delete_seeded(seed_id)?);

        Ok(CleanupReport { removed })
    }
}

/// Per-collection count of removed seed documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub removed: BTreeMap<String, usize>,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.removed.values().sum()
    }
}
