//! Provider leads, mock providers, and the invitation codes that let a lead claim them.

pub mod domain;
mod import;
pub mod invitations;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ConversionLog, Invitation, InvitationStatus, LeadSource, LeadStatus, MarketplaceListing,
    NewLead, ProviderCategory, ProviderLead, Stay,
};
pub use import::RejectedRow;
pub use invitations::{invitation_code, InvitationError, InvitationService, Redemption};
pub use router::{provider_router, ProviderRoutesState};
pub use service::{ImportReport, ProviderError, ProviderService};
