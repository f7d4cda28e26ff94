use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Tour, TourInstance};
use super::inventory::InventoryPolicy;
use super::pricing::{quote, Quote, TourInstanceView};
use crate::store::{RepositoryError, Store};

/// A tour with the rendered view of each scheduled instance.
#[derive(Debug, Clone, Serialize)]
pub struct TourListing {
    pub tour: Tour,
    pub instances: Vec<TourInstanceView>,
}

/// Read side of the tour catalog.
pub struct TourCatalogService {
    store: Store,
    policy: InventoryPolicy,
}

impl TourCatalogService {
    pub fn new(store: Store, policy: InventoryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &InventoryPolicy {
        &self.policy
    }

    pub fn list(&self, now: DateTime<Utc>) -> Result<Vec<TourListing>, RepositoryError> {
        let instances = self.store.tour_instances.list()?;
        let mut listings: Vec<TourListing> = self
            .store
            .tours
            .list()?
            .into_iter()
            .map(|tour| {
                let views = self.views_for(&tour, &instances, now);
                TourListing {
                    tour,
                    instances: views,
                }
            })
            .collect();
        listings.sort_by(|a, b| a.tour.title.cmp(&b.tour.title));
        Ok(listings)
    }

    pub fn get(&self, tour_id: &str, now: DateTime<Utc>) -> Result<TourListing, RepositoryError> {
        let tour = self.store.tours.require(tour_id)?;
        let instances = self
            .store
            .tour_instances
            .find(&|instance| instance.tour_id == tour_id)?;
        let views = self.views_for(&tour, &instances, now);
        Ok(TourListing {
            tour,
            instances: views,
        })
    }

    pub fn quote(
        &self,
        instance_id: &str,
        requested: u32,
        now: DateTime<Utc>,
    ) -> Result<Quote, RepositoryError> {
        let stored = self.store.tour_instances.require(instance_id)?;
        let tour = self.store.tours.require(&stored.tour_id)?;
        let instance = self.current(&tour, &stored, now);
        Ok(quote(&tour, &instance, requested, now))
    }

    /// Stored status and pricing reflect the last write; both are re-derived for `now`.
    fn current(&self, tour: &Tour, instance: &TourInstance, now: DateTime<Utc>) -> TourInstance {
        let mut instance = instance.clone();
        self.policy.refresh(&mut instance, tour.base_price, now);
        instance
    }

    fn views_for(
        &self,
        tour: &Tour,
        instances: &[TourInstance],
        now: DateTime<Utc>,
    ) -> Vec<TourInstanceView> {
        let mut matching: Vec<TourInstance> = instances
            .iter()
            .filter(|instance| instance.tour_id == tour.id)
            .map(|instance| self.current(tour, instance, now))
            .collect();
        matching.sort_by_key(|instance| instance.starts_at());
        matching
            .iter()
            .map(|instance| TourInstanceView::new(tour, instance, now))
            .collect()
    }
}
