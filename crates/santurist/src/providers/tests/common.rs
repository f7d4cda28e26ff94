use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::auth::{AuthService, UserRole};
use crate::providers::{
    InvitationService, LeadSource, MarketplaceListing, NewLead, ProviderCategory, ProviderLead,
    ProviderRoutesState, ProviderService, Stay,
};
use crate::store::Store;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn lead(store: &Store) -> ProviderLead {
    ProviderService::new(store.clone())
        .create_lead(
            NewLead {
                business_name: "Casa Voyage".to_string(),
                category: ProviderCategory::Lodging,
                contact_name: Some("Marta".to_string()),
                email: Some("hola@casavoyage.cl".to_string()),
                phone: None,
                website: None,
                notes: None,
            },
            LeadSource::Manual,
            now(),
        )
        .expect("lead created")
}

pub(super) fn mock_stay(store: &Store, lead_id: &str) -> Stay {
    store
        .stays
        .insert(Stay {
            id: "stay-voyage".to_string(),
            lead_id: Some(lead_id.to_string()),
            owner_id: None,
            name: "Casa Voyage".to_string(),
            stay_type: "hostal".to_string(),
            description: "Hostal boutique".to_string(),
            price_per_night: 55_000,
            location: "San Pedro de Atacama".to_string(),
            amenities: vec!["wifi".to_string()],
            is_mock: true,
            seed_id: None,
        })
        .expect("stay inserted")
}

pub(super) fn mock_listing(store: &Store, lead_id: &str) -> MarketplaceListing {
    store
        .marketplace_listings
        .insert(MarketplaceListing {
            id: "listing-tejido".to_string(),
            provider_lead_id: Some(lead_id.to_string()),
            owner_id: None,
            title: "Tejido de alpaca".to_string(),
            category: "artesania".to_string(),
            price: 18_000,
            stock: 4,
            is_mock: true,
            seed_id: None,
        })
        .expect("listing inserted")
}

pub(super) fn user(store: &Store, uid: &str, role: UserRole) {
    let auth = AuthService::new(store.clone());
    auth.register(uid, &format!("{uid}@example.cl"), uid, now())
        .expect("registered");
    auth.set_role(uid, role).expect("role set");
}

pub(super) fn routes_state(store: &Store) -> ProviderRoutesState {
    ProviderRoutesState {
        providers: Arc::new(ProviderService::new(store.clone())),
        invitations: Arc::new(InvitationService::new(store.clone())),
        auth: Arc::new(AuthService::new(store.clone())),
    }
}
