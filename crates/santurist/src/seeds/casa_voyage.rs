use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use super::{insert_missing, SeedError, SeedKind};
use crate::providers::{
    Invitation, InvitationStatus, LeadSource, LeadStatus, ProviderCategory, ProviderLead, Stay,
};
use crate::store::Store;

pub const CASA_VOYAGE_CODE: &str = "ATK-2025-VOYAGE-001";
const LEAD_ID: &str = "lead-casa-voyage";
const STAY_ID: &str = "stay-casa-voyage";
const INVITATION_TTL_DAYS: i64 = 365;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CasaVoyageSeed {
    pub lead_id: String,
    pub stay_id: String,
    pub invitation_code: String,
}

/// One lead, one mock stay, and the invitation that lets the owner claim it.
pub fn seed_casa_voyage(store: &Store, now: DateTime<Utc>) -> Result<CasaVoyageSeed, SeedError> {
    let seed_id = Some(SeedKind::CasaVoyage.seed_id().to_string());

    let lead = ProviderLead {
        id: LEAD_ID.to_string(),
        business_name: "Casa Voyage".to_string(),
        category: ProviderCategory::Lodging,
        contact_name: Some("Valentina Cruz".to_string()),
        email: Some("contacto@casavoyage.cl".to_string()),
        phone: Some("+56 9 8765 4321".to_string()),
        website: Some("https://casavoyage.cl".to_string()),
        source: LeadSource::Seed,
        status: LeadStatus::Invited,
        notes: Some("Hostal boutique a pasos de la calle Caracoles".to_string()),
        created_at: now,
        seed_id: seed_id.clone(),
    };

    let stay = Stay {
        id: STAY_ID.to_string(),
        lead_id: Some(LEAD_ID.to_string()),
        owner_id: None,
        name: "Casa Voyage".to_string(),
        stay_type: "hostal".to_string(),
        description: "Habitaciones de adobe con patio interior y vista al Licancabur.".to_string(),
        price_per_night: 65_000,
        location: "Calle Caracoles 259, San Pedro de Atacama".to_string(),
        amenities: ["wifi", "desayuno", "estacionamiento", "terraza astronómica"]
            .into_iter()
            .map(str::to_string)
            .collect(),
        is_mock: true,
        seed_id: seed_id.clone(),
    };

    let invitation = Invitation {
        code: CASA_VOYAGE_CODE.to_string(),
        lead_id: LEAD_ID.to_string(),
        stay_id: Some(STAY_ID.to_string()),
        email: lead.email.clone(),
        status: InvitationStatus::Pending,
        created_at: now,
        expires_at: now + Duration::days(INVITATION_TTL_DAYS),
        redeemed_by: None,
        redeemed_at: None,
        seed_id,
    };

    let written = [
        insert_missing(store.provider_leads.as_ref(), lead)?,
        insert_missing(store.stays.as_ref(), stay)?,
        insert_missing(store.invitations.as_ref(), invitation)?,
    ]
    .into_iter()
    .filter(|written| *written)
    .count();
    info!(written, code = CASA_VOYAGE_CODE, "casa voyage seed applied");

    Ok(CasaVoyageSeed {
        lead_id: LEAD_ID.to_string(),
        stay_id: STAY_ID.to_string(),
        invitation_code: CASA_VOYAGE_CODE.to_string(),
    })
}
