use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use super::{Document, Repository, RepositoryError, Store};
use crate::auth::UserAccount;
use crate::providers::{Invitation, MarketplaceListing, ProviderLead, Stay};
use crate::tours::{Tour, TourInstance};

/// Serializable export of the seedable collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub users: Vec<UserAccount>,
    #[serde(default, rename = "providerLeads")]
    pub provider_leads: Vec<ProviderLead>,
    #[serde(default)]
    pub invitations: Vec<Invitation>,
    #[serde(default)]
    pub stays: Vec<Stay>,
    #[serde(default, rename = "marketplaceListings")]
    pub marketplace_listings: Vec<MarketplaceListing>,
    #[serde(default)]
    pub tours: Vec<Tour>,
    #[serde(default, rename = "tourInstances")]
    pub tour_instances: Vec<TourInstance>,
}

impl StoreSnapshot {
    /// Captures the store. With `seeded_only` only documents carrying a seed tag are kept.
    pub fn capture(store: &Store, seeded_only: bool) -> Result<Self, RepositoryError> {
        Ok(Self {
            users: collect(store.users.as_ref(), seeded_only)?,
            provider_leads: collect(store.provider_leads.as_ref(), seeded_only)?,
            invitations: collect(store.invitations.as_ref(), seeded_only)?,
            stays: collect(store.stays.as_ref(), seeded_only)?,
            marketplace_listings: collect(store.marketplace_listings.as_ref(), seeded_only)?,
            tours: collect(store.tours.as_ref(), seeded_only)?,
            tour_instances: collect(store.tour_instances.as_ref(), seeded_only)?,
        })
    }

    /// Writes every document into the store, replacing documents with the same id.
    pub fn restore(self, store: &Store) -> Result<usize, RepositoryError> {
        let mut written = 0;
        written += restore_into(store.users.as_ref(), self.users)?;
        written += restore_into(store.provider_leads.as_ref(), self.provider_leads)?;
        written += restore_into(store.invitations.as_ref(), self.invitations)?;
        written += restore_into(store.stays.as_ref(), self.stays)?;
        written += restore_into(
            store.marketplace_listings.as_ref(),
            self.marketplace_listings,
        )?;
        written += restore_into(store.tours.as_ref(), self.tours)?;
        written += restore_into(store.tour_instances.as_ref(), self.tour_instances)?;
        Ok(written)
    }

    pub fn document_count(&self) -> usize {
        self.users.len()
            + self.provider_leads.len()
            + self.invitations.len()
            + self.stays.len()
            + self.marketplace_listings.len()
            + self.tours.len()
            + self.tour_instances.len()
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), serde_json::Error> {
        serde_json::to_writer_pretty(writer, self)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }
}

fn collect<T: Document>(
    repository: &dyn Repository<T>,
    seeded_only: bool,
) -> Result<Vec<T>, RepositoryError> {
    if seeded_only {
        repository.find(&|document| document.seed_id().is_some())
    } else {
        repository.list()
    }
}

fn restore_into<T: Document>(
    repository: &dyn Repository<T>,
    documents: Vec<T>,
) -> Result<usize, RepositoryError> {
    let count = documents.len();
    for document in documents {
        repository.upsert(document)?;
    }
    Ok(count)
}
