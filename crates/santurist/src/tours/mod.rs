//! Tour catalog, scheduled instances, and the inventory rules deriving their status.

mod catalog;
pub mod domain;
pub mod inventory;
pub mod pricing;

pub use catalog::{TourCatalogService, TourListing};
pub use domain::{
    CancellationPolicy, Difficulty, DynamicPricing, InstanceStatus, Tour, TourCategory,
    TourInstance,
};
pub use inventory::{InventoryError, InventoryPolicy};
pub use pricing::{quote, Quote, TourInstanceView};
