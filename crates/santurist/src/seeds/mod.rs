//! Mock marketplace data: fixture seeds, cleanup, snapshot export, and provider page scraping.
//!
//! Every seeded document carries a seed id so a single seed can be removed without touching
//! real data.

mod casa_voyage;
mod marketplace;
pub mod router;
mod runner;
pub mod scrape;
mod tours;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::store::{Document, Repository, RepositoryError};

pub use casa_voyage::{seed_casa_voyage, CasaVoyageSeed, CASA_VOYAGE_CODE};
pub use marketplace::{seed_marketplace, MarketplaceSeed};
pub use router::{admin_router, AdminRoutesState};
pub use runner::{cleanup_all, cleanup_seed, generate_seed_file, run_all, run_seed, SeedOutcome, SeedSummary};
pub use scrape::{scrape_provider, HttpPageFetcher, PageFetcher, ScrapeError, ScrapedProvider};
pub use tours::{seed_tours, TourSeed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeedKind {
    CasaVoyage,
    Tours,
    Marketplace,
}

impl SeedKind {
    pub const ALL: [SeedKind; 3] = [SeedKind::CasaVoyage, SeedKind::Tours, SeedKind::Marketplace];

    /// Tag stored on every document the seed writes.
    pub const fn seed_id(self) -> &'static str {
        match self {
            SeedKind::CasaVoyage => "casa-voyage",
            SeedKind::Tours => "tours",
            SeedKind::Marketplace => "marketplace",
        }
    }
}

impl fmt::Display for SeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.seed_id())
    }
}

impl FromStr for SeedKind {
    type Err = SeedError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        SeedKind::ALL
            .into_iter()
            .find(|kind| kind.seed_id().replace('-', "") == normalized)
            .ok_or_else(|| SeedError::UnknownSeed(value.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("unknown seed '{0}' (expected casa-voyage, tours or marketplace)")]
    UnknownSeed(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("seed file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("seed file encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Inserts the document unless one with the same id exists. Returns whether it was written.
fn insert_missing<T: Document>(
    repository: &dyn Repository<T>,
    document: T,
) -> Result<bool, RepositoryError> {
    if repository.fetch(document.id())?.is_some() {
        return Ok(false);
    }
    repository.insert(document)?;
    Ok(true)
}
