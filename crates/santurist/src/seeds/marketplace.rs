use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::{insert_missing, SeedError, SeedKind};
use crate::providers::{
    LeadSource, LeadStatus, MarketplaceListing, ProviderCategory, ProviderLead, Stay,
};
use crate::store::Store;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarketplaceSeed {
    pub leads: usize,
    pub stays: usize,
    pub listings: usize,
}

struct MockProvider {
    slug: &'static str,
    business_name: &'static str,
    category: ProviderCategory,
    email: &'static str,
}

const PROVIDERS: [MockProvider; 3] = [
    MockProvider {
        slug: "tejidos-lickanantay",
        business_name: "Tejidos Lickanantay",
        category: ProviderCategory::Marketplace,
        email: "ventas@tejidoslickanantay.cl",
    },
    MockProvider {
        slug: "cocina-dona-rosa",
        business_name: "Cocina Atacameña Doña Rosa",
        category: ProviderCategory::Food,
        email: "pedidos@donarosa.cl",
    },
    MockProvider {
        slug: "hostal-licancabur",
        business_name: "Hostal Licancabur",
        category: ProviderCategory::Lodging,
        email: "reservas@hostallicancabur.cl",
    },
];

/// (provider slug, listing slug, title, category, price, stock)
const LISTINGS: [(&str, &str, &str, &str, u64, u32); 4] = [
    ("tejidos-lickanantay", "chal-alpaca", "Chal de alpaca tejido a telar", "textiles", 38_000, 6),
    ("tejidos-lickanantay", "gorro-llama", "Gorro de lana de llama", "textiles", 15_000, 12),
    ("cocina-dona-rosa", "mermelada-chanar", "Mermelada de chañar", "gourmet", 6_500, 20),
    ("cocina-dona-rosa", "sal-de-mar-andina", "Sal de Atacama con hierbas", "gourmet", 4_800, 30),
];

/// Mock providers with their stays and listings, waiting to be claimed.
pub fn seed_marketplace(store: &Store, now: DateTime<Utc>) -> Result<MarketplaceSeed, SeedError> {
    let seed_id = Some(SeedKind::Marketplace.seed_id().to_string());
    let mut written = MarketplaceSeed::default();

    for provider in &PROVIDERS {
        let lead = ProviderLead {
            id: format!("lead-{}", provider.slug),
            business_name: provider.business_name.to_string(),
            category: provider.category,
            contact_name: None,
            email: Some(provider.email.to_string()),
            phone: None,
            website: None,
            source: LeadSource::Seed,
            status: LeadStatus::New,
            notes: None,
            created_at: now,
            seed_id: seed_id.clone(),
        };
        if insert_missing(store.provider_leads.as_ref(), lead)? {
            written.leads += 1;
        }
    }

    let stay = Stay {
        id: "stay-hostal-licancabur".to_string(),
        lead_id: Some("lead-hostal-licancabur".to_string()),
        owner_id: None,
        name: "Hostal Licancabur".to_string(),
        stay_type: "hostal".to_string(),
        description: "Habitaciones dobles con calefacción y desayuno andino.".to_string(),
        price_per_night: 42_000,
        location: "Calle Licancabur 120, San Pedro de Atacama".to_string(),
        amenities: vec!["wifi".to_string(), "desayuno".to_string()],
        is_mock: true,
        seed_id: seed_id.clone(),
    };
    if insert_missing(store.stays.as_ref(), stay)? {
        written.stays += 1;
    }

    for (provider, slug, title, category, price, stock) in LISTINGS {
        let listing = MarketplaceListing {
            id: format!("listing-{slug}"),
            provider_lead_id: Some(format!("lead-{provider}")),
            owner_id: None,
            title: title.to_string(),
            category: category.to_string(),
            price,
            stock,
            is_mock: true,
            seed_id: seed_id.clone(),
        };
        if insert_missing(store.marketplace_listings.as_ref(), listing)? {
            written.listings += 1;
        }
    }

    info!(
        leads = written.leads,
        stays = written.stays,
        listings = written.listings,
        "marketplace seed applied"
    );
    Ok(written)
}
